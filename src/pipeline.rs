//! The per-request validation pipeline.
//!
//! Stages the upload to scratch storage, converts non-XML input through the
//! isolated converter runner, validates the XML against the requested schema
//! set, extracts the root summary, and assembles the report. Temporary
//! artifacts are RAII guards owned by this invocation; they are removed on
//! every exit path, including early returns and a cancelled request future.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::{Builder, TempPath};

use crate::convert::{ConversionOutcome, ConverterRunner};
use crate::document::{self, XmlSummary};
use crate::error::{GatewayError, Result};
use crate::validator::{SchemaCheckResult, SchemaSet, SchemaValidator};

/// Declared source format of an upload, determined by caller-side extension
/// sniffing before the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xml,
    Psv,
    Mpc80Col,
}

impl SourceFormat {
    /// Conversion capability and diagnostic label, `None` for native XML.
    pub fn capability(&self) -> Option<(&'static str, &'static str)> {
        match self {
            SourceFormat::Xml => None,
            SourceFormat::Psv => Some(("psvtoxml", "PSV to XML")),
            SourceFormat::Mpc80Col => Some(("mpc80coltoxml", "MPC 80-col to XML")),
        }
    }

    /// Suffix for the staged input artifact.
    fn staging_suffix(&self) -> &'static str {
        match self {
            SourceFormat::Xml => ".xml",
            SourceFormat::Psv => ".psv",
            SourceFormat::Mpc80Col => ".80col",
        }
    }

    /// Reject filenames whose extension does not match the declared format.
    ///
    /// Runs before any artifact is created: a rejected request leaves no
    /// trace on scratch storage.
    pub fn check_filename(&self, filename: &str) -> Result<()> {
        let lower = filename.to_lowercase();
        match self {
            SourceFormat::Xml => {
                if lower.ends_with(".xml") {
                    Ok(())
                } else {
                    Err(GatewayError::client_input("File must be an XML document"))
                }
            }
            SourceFormat::Psv => {
                if lower.ends_with(".psv") {
                    Ok(())
                } else {
                    Err(GatewayError::client_input("File must be a PSV document"))
                }
            }
            SourceFormat::Mpc80Col => {
                // Some MPC files legitimately carry no extension at all.
                let ext = Path::new(&lower)
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match ext.as_str() {
                    "" | "txt" | "mpc" | "80col" => Ok(()),
                    other => Err(GatewayError::client_input(format!(
                        "File extension '.{other}' is not recognized as an MPC 80-column \
                         format. Expected: .txt, .mpc, .80col, or no extension"
                    ))),
                }
            }
        }
    }
}

/// Input to the pipeline: the upload plus its declared format and the
/// requested schema set.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub content: Vec<u8>,
    pub filename: String,
    pub format: SourceFormat,
    pub schema_set: SchemaSet,
}

/// The aggregate returned to the caller, serializable as the response body.
///
/// `validation_type` and `conversion` are absent for XML-native requests;
/// `xml_info` is absent when conversion failed before any XML existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionOutcome>,
    pub results: Vec<SchemaCheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_info: Option<XmlSummary>,
}

/// Sequences conversion and validation for one request and owns the scoped
/// lifetime of its temporary artifacts.
pub struct ValidationPipeline {
    converter: ConverterRunner,
    validator: SchemaValidator,
}

impl ValidationPipeline {
    pub fn new(converter: ConverterRunner, validator: SchemaValidator) -> Self {
        Self {
            converter,
            validator,
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// `Err` is reserved for client-input rejections and unexpected internal
    /// faults; conversion and validation failures are normal outcomes encoded
    /// in the report.
    pub async fn run(&self, request: ValidationRequest) -> Result<ValidationReport> {
        request.format.check_filename(&request.filename)?;

        // Stage the upload. The `TempPath` guards delete on drop, which is
        // what guarantees cleanup on every path out of this function.
        let staged = Builder::new()
            .prefix("ades-upload-")
            .suffix(request.format.staging_suffix())
            .tempfile()
            .map_err(GatewayError::Io)?;
        let input_path: TempPath = staged.into_temp_path();
        tokio::fs::write(&input_path, &request.content)
            .await
            .map_err(GatewayError::Io)?;

        let converted_path = TempPath::from_path(sibling_xml_path(&input_path));

        let (xml_path, conversion, validation_type): (&Path, Option<ConversionOutcome>, _) =
            match request.format.capability() {
                None => (input_path.as_ref(), None, None),
                Some((capability, label)) => {
                    let outcome = self
                        .converter
                        .convert(capability, label, input_path.as_ref(), converted_path.as_ref())
                        .await;

                    if !outcome.success {
                        tracing::info!(
                            filename = %request.filename,
                            message = %outcome.message,
                            "conversion failed"
                        );
                        return Ok(ValidationReport {
                            filename: request.filename,
                            validation_type: None,
                            conversion: Some(outcome),
                            results: Vec::new(),
                            xml_info: None,
                        });
                    }

                    (
                        converted_path.as_ref(),
                        Some(outcome),
                        Some(request.schema_set.as_str().to_string()),
                    )
                }
            };

        let results = self.validator.validate(xml_path, request.schema_set).await;
        let xml_info = extract_summary(xml_path).await;

        Ok(ValidationReport {
            filename: request.filename,
            validation_type,
            conversion,
            results,
            xml_info: Some(xml_info),
        })
    }
}

/// Best-effort summary extraction off the async scheduler; never fails the
/// request.
async fn extract_summary(xml_path: &Path) -> XmlSummary {
    let path = xml_path.to_path_buf();
    tokio::task::spawn_blocking(move || document::extract_summary(&path))
        .await
        .unwrap_or_default()
}

/// Output artifact path next to the staged input (`<input>.xml`), so
/// per-request unique naming carries over to the converter output.
fn sibling_xml_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".xml");
    PathBuf::from(path)
}
