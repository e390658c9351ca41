use clap::Parser;
use std::path::PathBuf;

use crate::config::GatewayConfig;

/// ADES validation gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "ades-validator")]
#[command(about = "Validate ADES XML, PSV and MPC 80-column submissions against XSD schemas")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long = "bind")]
    pub bind: Option<String>,

    /// Directory containing submit.xsd and general.xsd
    #[arg(long = "schema-dir")]
    pub schema_dir: Option<PathBuf>,

    /// Directory containing the converter executables
    #[arg(long = "converter-dir")]
    pub converter_dir: Option<PathBuf>,

    /// Converter timeout in seconds
    #[arg(long = "converter-timeout")]
    pub converter_timeout: Option<u64>,

    /// Maximum number of concurrently running converter subprocesses
    #[arg(long = "max-conversions")]
    pub max_conversions: Option<usize>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Overlay CLI flags onto an already loaded configuration; flags win over
    /// file and environment values.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(ref bind) = self.bind {
            config.server.bind_addr = bind.clone();
        }
        if let Some(ref dir) = self.schema_dir {
            config.schemas.directory = dir.clone();
        }
        if let Some(ref dir) = self.converter_dir {
            config.converter.directory = dir.clone();
        }
        if let Some(timeout) = self.converter_timeout {
            config.converter.timeout_seconds = timeout;
        }
        if let Some(max) = self.max_conversions {
            config.converter.max_concurrent = max;
        }
    }
}
