//! Schema validation with per-schema structured results.
//!
//! One `SchemaCheckResult` is produced per requested schema, in request
//! order. A document that is not well-formed XML short-circuits to a single
//! `xml`-kind result; infrastructure problems with one schema (missing file,
//! compile failure) are reported against that schema without aborting the
//! remaining checks.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document;
use crate::error::{GatewayError, Result};
use crate::libxml2::SchemaValidation;
use crate::schema::SchemaStore;

/// Caller-selectable scope of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSet {
    All,
    Submit,
    General,
}

impl SchemaSet {
    /// Ordered schema names this set expands to. `All` is fixed as
    /// `submit` then `general`.
    pub fn schema_names(&self) -> &'static [&'static str] {
        match self {
            SchemaSet::All => &["submit", "general"],
            SchemaSet::Submit => &["submit"],
            SchemaSet::General => &["general"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaSet::All => "all",
            SchemaSet::Submit => "submit",
            SchemaSet::General => "general",
        }
    }
}

impl FromStr for SchemaSet {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(SchemaSet::All),
            "submit" => Ok(SchemaSet::Submit),
            "general" => Ok(SchemaSet::General),
            other => Err(GatewayError::client_input(format!(
                "Invalid validation type: {other}. Must be one of: all, submit, general"
            ))),
        }
    }
}

/// One schema's verdict.
///
/// `schema` is the schema name, or the sentinel `xml` for a syntax-level
/// failure, or `error` for an unexpected fault outside the per-schema loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCheckResult {
    #[serde(rename = "type")]
    pub schema: String,
    pub valid: bool,
    pub message: String,
}

impl SchemaCheckResult {
    fn passed(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            valid: true,
            message: format!("Validation against {schema} schema passed"),
        }
    }

    fn failed(schema: &str, message: String) -> Self {
        Self {
            schema: schema.to_string(),
            valid: false,
            message,
        }
    }
}

/// Validates a well-formed XML document against the configured schemas.
pub struct SchemaValidator {
    store: Arc<SchemaStore>,
}

impl SchemaValidator {
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self { store }
    }

    /// Validate `xml_path` against every schema in `schema_set`, producing one
    /// result per schema in request order.
    ///
    /// Never returns an error: faults are folded into result entries so that
    /// one failing sub-check cannot suppress sibling results.
    pub async fn validate(&self, xml_path: &Path, schema_set: SchemaSet) -> Vec<SchemaCheckResult> {
        match self.validate_inner(xml_path, schema_set).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, "validation error");
                vec![SchemaCheckResult::failed(
                    "error",
                    format!("Error during validation: {e}"),
                )]
            }
        }
    }

    async fn validate_inner(
        &self,
        xml_path: &Path,
        schema_set: SchemaSet,
    ) -> Result<Vec<SchemaCheckResult>> {
        // Syntax check first; schema checks are meaningless on a document
        // that does not parse.
        let probe_path = xml_path.to_path_buf();
        let well_formed = tokio::task::spawn_blocking(move || {
            document::check_well_formed(&probe_path)
        })
        .await
        .map_err(|e| GatewayError::Concurrency {
            details: e.to_string(),
        })?;

        if let Err(syntax_error) = well_formed {
            return Ok(vec![SchemaCheckResult::failed(
                "xml",
                format!("XML syntax error: {syntax_error}"),
            )]);
        }

        let mut results = Vec::with_capacity(schema_set.schema_names().len());

        for &name in schema_set.schema_names() {
            results.push(self.check_one(name, xml_path).await);
        }

        Ok(results)
    }

    /// Check the document against a single schema; every failure mode folds
    /// into the returned result so the caller's loop continues.
    async fn check_one(&self, name: &str, xml_path: &Path) -> SchemaCheckResult {
        let xsd_path = self.store.schema_path(name);
        if !self.store.is_installed(name) {
            return SchemaCheckResult::failed(
                name,
                format!("XSD schema file not found: {}", xsd_path.display()),
            );
        }

        let schema = match self.store.load(name).await {
            Ok(schema) => schema,
            Err(e) => {
                return SchemaCheckResult::failed(
                    name,
                    format!("Error validating against {name} schema: {e}"),
                );
            }
        };

        let wrapper = Arc::clone(self.store.wrapper());
        let target: PathBuf = xml_path.to_path_buf();
        let outcome =
            tokio::task::spawn_blocking(move || wrapper.validate_file(&schema, &target)).await;

        match outcome {
            Ok(Ok(SchemaValidation::Valid)) => SchemaCheckResult::passed(name),
            Ok(Ok(SchemaValidation::Invalid { violations })) => {
                let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                SchemaCheckResult::failed(
                    name,
                    format!(
                        "Validation against {name} schema failed:\n{}",
                        details.join("\n")
                    ),
                )
            }
            Ok(Ok(SchemaValidation::InternalError { code })) => SchemaCheckResult::failed(
                name,
                format!("Error validating against {name} schema: internal error code {code}"),
            ),
            Ok(Err(e)) => SchemaCheckResult::failed(
                name,
                format!("Error validating against {name} schema: {e}"),
            ),
            Err(e) => SchemaCheckResult::failed(
                name,
                format!("Error validating against {name} schema: {e}"),
            ),
        }
    }
}
