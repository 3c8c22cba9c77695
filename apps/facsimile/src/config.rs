//! # Configuration
//!
//! `facsimile.toml` loading and validation.
//!
//! ```toml
//! [clone]
//! circular = true
//! depth = 8
//! include_hidden = false
//! on_depth_exhausted = "alias"   # or "fail"
//! shape = "Snapshot"
//!
//! [output]
//! pretty = true
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use facsimile_core::{CloneOptions, DepthPolicy, FacsimileError, Shape};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "facsimile.toml";

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// `[clone]`: options of each clone invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloneSection {
    pub circular: bool,
    /// Signed so that negative values are reported instead of failing to parse.
    pub depth: Option<i64>,
    pub include_hidden: bool,
    pub on_depth_exhausted: DepthPolicy,
    /// Name of the shape every record copy receives.
    pub shape: Option<String>,
}

impl Default for CloneSection {
    fn default() -> Self {
        Self {
            circular: true,
            depth: None,
            include_hidden: false,
            on_depth_exhausted: DepthPolicy::Alias,
            shape: None,
        }
    }
}

impl CloneSection {
    /// Convert to library options, rejecting out-of-range values.
    pub fn to_options(&self) -> Result<CloneOptions, FacsimileError> {
        let mut options = CloneOptions::new()
            .with_circular(self.circular)
            .with_depth_policy(self.on_depth_exhausted);

        if let Some(depth) = self.depth {
            let depth = usize::try_from(depth).map_err(|_| {
                FacsimileError::Config(format!("clone.depth must not be negative (got {depth})"))
            })?;
            options = options.with_depth(depth);
        }
        if self.include_hidden {
            options = options.including_hidden();
        }
        if let Some(name) = &self.shape {
            if name.trim().is_empty() {
                return Err(FacsimileError::Config(
                    "clone.shape must not be empty".to_string(),
                ));
            }
            options = options.with_shape_override(Shape::named(name));
        }
        Ok(options)
    }
}

/// `[output]`: how documents are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { pretty: true }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Contents of `facsimile.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    #[serde(rename = "clone")]
    pub cloning: CloneSection,
    pub output: OutputSection,
}

impl AppConfig {
    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, FacsimileError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FacsimileError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, FacsimileError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            FacsimileError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(FacsimileError::Config(format!(
                "Config '{}' is {} bytes, larger than the {} byte limit",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            FacsimileError::Io(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&content).map_err(|e| match e {
            FacsimileError::Config(reason) => {
                FacsimileError::Config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Load `path` if given (it must exist), otherwise the default file if it
    /// exists, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, FacsimileError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            Self::load(default_path)
        } else {
            tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    /// Check ranges that TOML types cannot express.
    pub fn validate(&self) -> Result<(), FacsimileError> {
        self.cloning.to_options().map(|_| ())
    }
}
