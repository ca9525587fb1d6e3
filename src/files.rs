//! File name helpers for the embedding application
use std::path::Path;

use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
};

/// Finds the first unused `{base}-{nn}.{suffix}` file name.
///
/// # Arguments
/// * `base` - Base file name, usually the story file name
/// * `suffix` - File extension
///
/// # Returns
/// [Result] with the file name or a [RuntimeError]
pub fn first_available(base: &str, suffix: &str) -> Result<String, RuntimeError> {
    let mut n = 1;
    loop {
        let filename = format!("{}-{:02}.{}", base, n, suffix);
        match Path::new(&filename).try_exists() {
            Ok(b) => {
                if !b {
                    return Ok(filename);
                }
            }
            Err(e) => return recoverable_error!(ErrorCode::System, "{}", e),
        }

        n += 1;
    }
}

/// Finds the most recent existing `{base}-{nn}.{suffix}` file name.
///
/// Falls back to `{base}.{suffix}` when no numbered file exists.
///
/// # Arguments
/// * `base` - Base file name, usually the story file name
/// * `suffix` - File extension
///
/// # Returns
/// [Result] with the file name or a [RuntimeError]
pub fn last_existing(base: &str, suffix: &str) -> Result<String, RuntimeError> {
    let mut n = 1;
    loop {
        let filename = format!("{}-{:02}.{}", base, n, suffix);
        match Path::new(&filename).try_exists() {
            Ok(b) => {
                if !b {
                    if n > 1 {
                        return Ok(format!("{}-{:02}.{}", base, n - 1, suffix));
                    } else {
                        return Ok(format!("{}.{}", base, suffix));
                    }
                }
            }
            Err(e) => return recoverable_error!(ErrorCode::System, "{}", e),
        }

        n += 1;
    }
}

/// Looks for a file in the `.zvm` configuration directory.
///
/// # Arguments
/// * `name` - File name, e.g. `config.yml`
///
/// # Returns
/// [Option] with the full path if the file exists
pub fn config_file(name: &str) -> Option<String> {
    if let Some(home) = dirs::home_dir() {
        let filename = format!("{}/.zvm/{}", home.to_str()?, name);
        match Path::new(&filename).try_exists() {
            Ok(b) => {
                if b {
                    Some(filename)
                } else {
                    None
                }
            }
            Err(e) => {
                info!(target: "app::trace", "Error checking existence of {}: {}", filename, e);
                None
            }
        }
    } else {
        None
    }
}
