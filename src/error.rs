use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request rejected before any work began (bad schema set, bad extension).
    /// Maps to an HTTP 400 at the transport boundary.
    #[error("{message}")]
    ClientInput { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },

    #[error("Internal error: {details}")]
    Internal { details: String },
}

impl GatewayError {
    /// Construct a client-input rejection with the given message.
    pub fn client_input(message: impl Into<String>) -> Self {
        GatewayError::ClientInput {
            message: message.into(),
        }
    }

    /// True when the error is the caller's fault rather than the service's.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, GatewayError::ClientInput { .. })
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Invalid configuration value: {field} = {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("File validation failed with code {code}: {file}")]
    ValidationFailed { code: i32, file: PathBuf },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,
}

// Error conversion implementations
impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        GatewayError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for GatewayError {
    fn from(err: LibXml2Error) -> Self {
        GatewayError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
