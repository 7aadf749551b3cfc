//! Runtime Configuration

use serde::Deserialize;

use crate::error::Result;

/// Knobs for the instruction runtime and the HTML serializer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Fail with `ExportNotFound` when a named local reference matches no
    /// directive, instead of falling back to the host node.
    pub strict_exports: bool,
    /// Emit container anchors as `<!--container-->` when serializing.
    pub serialize_comments: bool,
    /// Serialize attributes sorted by name rather than in insertion order.
    pub sort_attributes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strict_exports: false,
            serialize_comments: false,
            sort_attributes: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}
