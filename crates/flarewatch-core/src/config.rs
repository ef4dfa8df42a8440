//! Configuration module
//!
//! Settings are read from the process environment (after loading an optional
//! `.env` file). Every value has a default so a bare `cargo run` serves on
//! port 8080 with `./data` and `./output` as working directories.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const SERVER_PORT: u16 = 8080;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const ANALYSIS_TIMEOUT_SECS: u64 = 300;
const DEFAULT_ALLOWED_EXTENSIONS: &str = ".fits,.csv,.lc";
const BYTES_PER_MB: usize = 1024 * 1024;

/// Bytes allowed on top of the file size for multipart framing
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Program and arguments joined with spaces, for log output
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// How the external analysis program is launched
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn command_line(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_upload_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub analysis: AnalysisConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let max_upload_size_mb = lookup("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let max_upload_size_bytes = max_upload_size_mb
            .checked_mul(BYTES_PER_MB)
            .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB is too large: {}", max_upload_size_mb))?;

        // Extensions are matched case-sensitively, so they are not lowercased here.
        let allowed_extensions = lookup("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let analysis = AnalysisConfig {
            program: lookup("ANALYSIS_PROGRAM").unwrap_or_else(|| "python3".to_string()),
            args: lookup("ANALYSIS_ARGS")
                .unwrap_or_else(|| "./model.py".to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            timeout_secs: lookup("ANALYSIS_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(ANALYSIS_TIMEOUT_SECS),
        };

        let config = Config {
            base: BaseConfig {
                server_port,
                cors_origins,
                environment,
            },
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
            max_upload_size_bytes,
            allowed_extensions,
            analysis,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.request_body_limit().is_none() {
            return Err(anyhow::anyhow!(
                "MAX_UPLOAD_SIZE_MB is too large: {} bytes leaves no room for the multipart body",
                self.max_upload_size_bytes
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must not be empty"));
        }

        if let Some(ext) = self
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS entry '{}' must look like '.ext'",
                ext
            ));
        }

        if self.analysis.program.trim().is_empty() {
            return Err(anyhow::anyhow!("ANALYSIS_PROGRAM must not be empty"));
        }

        if self.analysis.timeout_secs == 0 {
            return Err(anyhow::anyhow!("ANALYSIS_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }

    /// Largest accepted request body: the file limit plus multipart framing
    pub fn request_body_limit(&self) -> Option<usize> {
        self.max_upload_size_bytes.checked_add(MULTIPART_OVERHEAD_BYTES)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }
}
