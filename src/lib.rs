//! # ades-validator
//!
//! Validation gateway for astrometric observation submissions in the ADES
//! format family. Uploads arrive as native ADES XML, pipe-separated values
//! (PSV), or MPC 80-column fixed-width text; non-XML input is converted to
//! XML by external converter executables run as isolated subprocesses, and
//! the XML is validated against the configured XSD schemas with per-schema
//! structured diagnostics.

pub mod cli;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod libxml2;
pub mod pipeline;
pub mod schema;
pub mod server;
pub mod validator;

pub use cli::Cli;
pub use config::{GatewayConfig, SystemEnvProvider};
pub use convert::{ConversionOutcome, ConverterResolver, ConverterRunner, DirConverterResolver};
pub use document::XmlSummary;
pub use error::{GatewayError, LibXml2Error, Result};
pub use libxml2::{LibXml2Wrapper, SchemaValidation, SchemaViolation, XmlSchemaPtr};
pub use pipeline::{SourceFormat, ValidationPipeline, ValidationReport, ValidationRequest};
pub use schema::SchemaStore;
pub use validator::{SchemaCheckResult, SchemaSet, SchemaValidator};
