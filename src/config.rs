// Mon Oct 19 2026 - Alex

use crate::emit::TargetWidth;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    pub fn as_cranelift(&self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `None` follows the host pointer width.
    pub target_width: Option<TargetWidth>,
    pub opt_level: OptLevel,
    pub verify_ir: bool,
    pub dump_ir: bool,
    pub use_skip_tables: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_width: None,
            opt_level: OptLevel::Speed,
            verify_ir: cfg!(debug_assertions),
            dump_ir: false,
            use_skip_tables: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_target_width(mut self, width: TargetWidth) -> Self {
        self.target_width = Some(width);
        self
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn with_verify_ir(mut self, verify: bool) -> Self {
        self.verify_ir = verify;
        self
    }

    pub fn with_dump_ir(mut self, dump: bool) -> Self {
        self.dump_ir = dump;
        self
    }

    pub fn with_skip_tables(mut self, enabled: bool) -> Self {
        self.use_skip_tables = enabled;
        self
    }

    pub fn effective_width(&self) -> TargetWidth {
        self.target_width.unwrap_or_else(TargetWidth::host)
    }

    pub fn validate(&self) -> Result<(), String> {
        let host = TargetWidth::host();
        if self.effective_width().pointer_bytes() > host.pointer_bytes() {
            return Err(format!(
                "target_width {} is wider than the {} host",
                self.effective_width(),
                host
            ));
        }
        Ok(())
    }
}
