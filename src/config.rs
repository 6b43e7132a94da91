use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use cross_xdg::BaseDirs;

use crate::driver::Settings;
use crate::machine::{DEFAULT_TAPE_SIZE, EofBehavior};

/// Configuration problems detected before a machine is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("tape size must be a positive number of cells")]
    ZeroTapeSize,
}

/// One layer of optional settings: command-line flags, environment or config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub tape_size: Option<usize>,
    pub max_steps: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub debug: Option<bool>,
    pub eof: Option<EofBehavior>,
}

/// Everything `bf run` needs once all layers are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub settings: Settings,
    pub timeout: Option<Duration>,
}

impl ConfigLayer {
    /// Fill any unset value from `fallback`.
    pub fn or(self, fallback: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            tape_size: self.tape_size.or(fallback.tape_size),
            max_steps: self.max_steps.or(fallback.max_steps),
            timeout_ms: self.timeout_ms.or(fallback.timeout_ms),
            debug: self.debug.or(fallback.debug),
            eof: self.eof.or(fallback.eof),
        }
    }

    /// Read `BF_TAPE_SIZE`, `BF_MAX_STEPS`, `BF_TIMEOUT_MS` and `BF_EOF` through `lookup`.
    pub fn from_env<F>(lookup: F) -> ConfigLayer
    where
        F: Fn(&str) -> Option<String>,
    {
        ConfigLayer {
            tape_size: lookup("BF_TAPE_SIZE").and_then(|s| parse_number(&s)),
            max_steps: lookup("BF_MAX_STEPS").and_then(|s| parse_number(&s)),
            timeout_ms: lookup("BF_TIMEOUT_MS").and_then(|s| parse_number(&s)),
            debug: None,
            eof: lookup("BF_EOF").and_then(|s| s.parse().ok()),
        }
    }

    pub fn from_process_env() -> ConfigLayer {
        Self::from_env(|key| std::env::var(key).ok())
    }

    /// Parse the `[interpreter]` table of a `bf.toml` file.
    ///
    /// Only flat `key = value` lines are understood; anything else is skipped.
    pub fn parse_toml(content: &str) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        let mut in_interpreter = false;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_interpreter = line[1..line.len() - 1].trim() == "interpreter";
                continue;
            }
            if !in_interpreter {
                continue;
            }
            let Some((key, raw)) = line.split_once('=') else {
                continue;
            };
            let raw = raw.trim();
            // Accept quoted or unquoted
            let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                &raw[1..raw.len() - 1]
            } else {
                raw
            };
            match key.trim() {
                "tape_size" => layer.tape_size = parse_number(value).or(layer.tape_size),
                "max_steps" => layer.max_steps = parse_number(value).or(layer.max_steps),
                "timeout_ms" => layer.timeout_ms = parse_number(value).or(layer.timeout_ms),
                "debug" => layer.debug = value.parse().ok().or(layer.debug),
                "eof" => layer.eof = value.parse().ok().or(layer.eof),
                _ => {}
            }
        }
        layer
    }

    /// Load `bf.toml` from the XDG config home, if there is one.
    pub fn from_config_file() -> ConfigLayer {
        config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|content| Self::parse_toml(&content))
            .unwrap_or_default()
    }

    /// Apply defaults to whatever is still unset.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let tape_size = match self.tape_size {
            Some(n) => NonZeroUsize::new(n).ok_or(ConfigError::ZeroTapeSize)?,
            None => DEFAULT_TAPE_SIZE,
        };
        let settings = Settings {
            debug: self.debug.unwrap_or(false),
            tape_size,
            max_steps: self.max_steps.unwrap_or(0),
            eof: self.eof.unwrap_or_default(),
        };
        let timeout = self.timeout_ms.filter(|&ms| ms > 0).map(Duration::from_millis);
        Ok(RunConfig { settings, timeout })
    }
}

fn config_path() -> Option<PathBuf> {
    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bf.toml");
    Some(path)
}

/// Numbers may use `_` separators, e.g. `30_000`.
fn parse_number<T: std::str::FromStr>(s: &str) -> Option<T> {
    s.trim().replace('_', "").parse().ok()
}
