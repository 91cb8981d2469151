//! Optional `reqtxt.toml` settings.

use crate::env::OnMissing;
use crate::resolver::{DEFAULT_MAX_DEPTH, Precedence, ResolveOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const FILE_NAME: &str = "reqtxt.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub resolve: ResolveConfig,
}

/// The `[resolve]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolveConfig {
    pub precedence: Precedence,
    pub max_depth: usize,
    /// Expand `${VAR}` placeholders while resolving
    pub expand_variables: bool,
    pub on_missing: OnMissing,
    /// Abort resolution after this many milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            precedence: Precedence::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            expand_variables: false,
            on_missing: OnMissing::default(),
            timeout_ms: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `reqtxt.toml` from `dir`, or defaults when there is none
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(FILE_NAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolver options for these settings; a timeout starts counting now
    pub fn resolve_options(&self) -> ResolveOptions {
        let options = ResolveOptions {
            precedence: self.resolve.precedence,
            max_depth: self.resolve.max_depth,
            expand: self
                .resolve
                .expand_variables
                .then_some(self.resolve.on_missing),
            deadline: None,
        };
        match self.resolve.timeout_ms {
            Some(ms) => options.with_timeout(Duration::from_millis(ms)),
            None => options,
        }
    }
}
