//! Run configuration for view edits and bulk HTML conversion.
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! [edit]
//! verbose = false
//! create_missing_cows = true
//! website_id = 1          # or "unset", "notnull", "null"
//!
//! [html]
//! chunk_size = 500
//! ```

use crate::error::{Error, Result};
use crate::resolve::{ResolveOptions, WebsiteScope};
use serde::Deserialize;
use std::path::Path;

/// Default number of rows converted per page
pub const DEFAULT_CHUNK_SIZE: usize = 250;

/// Options of batch view edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditOptions {
    /// Log each patched view at info level instead of debug
    pub verbose: bool,
    /// Flag edited views as `arch_updated`
    pub update_arch: bool,
    /// Create missing website copies of keyed views
    pub create_missing_cows: bool,
    /// Website for keys given without one, and for created copies
    pub website_id: WebsiteScope,
}

impl Default for EditOptions {
    fn default() -> Self {
        EditOptions {
            verbose: true,
            update_arch: true,
            create_missing_cows: false,
            website_id: WebsiteScope::Unset,
        }
    }
}

impl EditOptions {
    /// Resolution settings for the views of a batch: every reference must
    /// resolve
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            ensure_exist: true,
            create_missing_cows: self.create_missing_cows,
            website_id: self.website_id,
        }
    }
}

/// Options of bulk HTML column conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HtmlConvertOptions {
    /// Rows read and written per page
    pub chunk_size: usize,
    pub verbose: bool,
}

impl Default for HtmlConvertOptions {
    fn default() -> Self {
        HtmlConvertOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbose: true,
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    pub edit: EditOptions,
    pub html: HtmlConvertOptions,
}

impl UpgradeConfig {
    /// Parse and validate TOML configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: UpgradeConfig = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.html.chunk_size == 0 {
            return Err(Error::Config("html.chunk_size must be positive".to_string()));
        }
        Ok(())
    }
}
