//! Compiled-schema store.
//!
//! Schemas live as `<name>.xsd` files in a configured directory and are
//! compiled through libxml2 at most once per process. The moka future cache
//! provides single-flight loading, so concurrent requests for the same schema
//! wait for one compilation instead of racing. Compilation across different
//! schema names is additionally serialized because libxml2's schema parser is
//! not thread-safe.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::future::Cache;
use tokio::sync::Mutex;

use crate::error::{GatewayError, Result};
use crate::libxml2::{LibXml2Wrapper, XmlSchemaPtr};

pub struct SchemaStore {
    directory: PathBuf,
    wrapper: Arc<LibXml2Wrapper>,
    cache: Cache<String, Arc<XmlSchemaPtr>>,
    parse_lock: Arc<Mutex<()>>,
}

impl SchemaStore {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            wrapper: Arc::new(LibXml2Wrapper::new()),
            cache: Cache::builder().max_capacity(16).build(),
            parse_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The libxml2 wrapper shared with validation call sites.
    pub fn wrapper(&self) -> &Arc<LibXml2Wrapper> {
        &self.wrapper
    }

    /// Path a schema name resolves to, by convention `<name>.xsd`.
    pub fn schema_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.xsd"))
    }

    /// Whether the schema file is present on disk.
    pub fn is_installed(&self, name: &str) -> bool {
        self.schema_path(name).is_file()
    }

    /// Get the compiled schema, loading and compiling it on first use.
    ///
    /// Failed loads are not cached; a schema file that appears later (or a
    /// transient read error) is retried on the next request.
    pub async fn load(&self, name: &str) -> Result<Arc<XmlSchemaPtr>> {
        let path = self.schema_path(name);
        let wrapper = Arc::clone(&self.wrapper);
        let parse_lock = Arc::clone(&self.parse_lock);

        self.cache
            .try_get_with(name.to_string(), async move {
                let data = tokio::fs::read(&path).await.map_err(GatewayError::Io)?;

                // Schema parsing is not thread-safe in libxml2; hold the lock
                // across the blocking parse so two names never compile at once.
                let _guard = parse_lock.lock().await;
                let ptr = tokio::task::spawn_blocking(move || {
                    wrapper.parse_schema_from_memory(&data)
                })
                .await
                .map_err(|e| GatewayError::Concurrency {
                    details: e.to_string(),
                })??;

                Ok::<_, GatewayError>(Arc::new(ptr))
            })
            .await
            .map_err(|e: Arc<GatewayError>| GatewayError::Internal {
                details: e.to_string(),
            })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
