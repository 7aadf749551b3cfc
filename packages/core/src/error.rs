//! Runtime Errors
//!
//! Every variant is a violation of the contract between compiled templates and
//! the runtime. They abort the current render pass and are never retried.

use thiserror::Error;

use crate::render3::view::NodeKind;

/// Errors raised while executing template instructions.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("slot {index} has not been created in this view")]
    SlotNotFound { index: usize },

    #[error("no directive at offset {offset} on slot {index}")]
    DirectiveNotFound { index: usize, offset: usize },

    #[error("container reconciliation failed: {0}")]
    ContainerReconciliation(String),

    #[error("slot {index} holds a {found} node, expected {expected}")]
    UnexpectedNodeKind {
        index: usize,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("unknown local reference '{name}'")]
    UnknownLocalRef { name: String },

    #[error("export of name '{export_as}' not found on slot {index}")]
    ExportNotFound { index: usize, export_as: String },

    #[error("element_end called without an open element")]
    UnbalancedElementEnd,

    #[error("render pass finished with {open} element(s) still open")]
    UnclosedElement { open: usize },

    #[error("multiple components match element <{tag}>: {first} and {second}")]
    MultipleComponents {
        tag: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl RenderError {
    pub(crate) fn reconciliation(message: impl Into<String>) -> Self {
        RenderError::ContainerReconciliation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
