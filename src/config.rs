//! Interpreter settings read from `config.yml`.
//!
//! Every field has a default, so a missing or partial file is never an
//! error; only unparseable YAML is reported.
use serde_yaml::{self, Value};
use std::fs::File;

use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
    zmachine::ErrorHandling,
};

#[derive(Debug)]
pub struct Config {
    logging: bool,
    error_handling: ErrorHandling,
    /// Maximum number of undo snapshots retained
    undo_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logging: false,
            error_handling: ErrorHandling::ContinueWarnOnce,
            undo_limit: 10,
        }
    }
}

impl From<&Value> for Config {
    fn from(data: &Value) -> Self {
        let defaults = Config::default();
        let logging = data["logging"]
            .as_str()
            .map_or(defaults.logging, |t| t == "enabled");
        let error_handling = match data["error_handling"].as_str() {
            Some("continue_warn_always") => ErrorHandling::ContinueWarnAlways,
            Some("continue_warn_once") => ErrorHandling::ContinueWarnOnce,
            Some("ignore") => ErrorHandling::Ignore,
            Some("abort") => ErrorHandling::Abort,
            _ => defaults.error_handling,
        };
        let undo_limit = data["undo_limit"]
            .as_u64()
            .map_or(defaults.undo_limit, |v| v as usize);
        Config::new(logging, error_handling, undo_limit)
    }
}

impl TryFrom<File> for Config {
    type Error = RuntimeError;

    fn try_from(value: File) -> Result<Self, Self::Error> {
        match serde_yaml::from_reader::<File, Value>(value) {
            Ok(data) => Ok(Config::from(&data)),
            Err(e) => recoverable_error!(ErrorCode::ConfigError, "{}", e),
        }
    }
}

impl Config {
    pub fn new(logging: bool, error_handling: ErrorHandling, undo_limit: usize) -> Self {
        Config {
            logging,
            error_handling,
            undo_limit,
        }
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    pub fn undo_limit(&self) -> usize {
        self.undo_limit
    }
}
