//! Local References
//!
//! A local reference is recorded as a slot index when its element is created.
//! Resolution is a lookup into the node registry, so it is valid from any
//! point in a pass once the slot exists, whatever the textual order of the
//! template was.

use tracing::warn;

use super::definition::DirectiveRef;
use super::renderer::NodeHandle;
use super::value::Value;
use super::view::{LView, NodeRecord};
use crate::error::{RenderError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRef {
    pub index: usize,
    /// `None` for a bare `#name`, otherwise the requested `exportAs` name.
    pub export_as: Option<String>,
}

impl LocalRef {
    pub fn new(index: usize, export_as: &str) -> Self {
        Self {
            index,
            export_as: (!export_as.is_empty()).then(|| export_as.to_string()),
        }
    }
}

/// What a local reference resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum RefTarget {
    Node(NodeHandle),
    Directive(DirectiveRef),
}

impl RefTarget {
    pub fn as_node(&self) -> Option<NodeHandle> {
        match self {
            RefTarget::Node(node) => Some(*node),
            RefTarget::Directive(_) => None,
        }
    }

    pub fn as_directive(&self) -> Option<&DirectiveRef> {
        match self {
            RefTarget::Directive(directive) => Some(directive),
            RefTarget::Node(_) => None,
        }
    }
}

impl From<RefTarget> for Value {
    fn from(target: RefTarget) -> Self {
        match target {
            RefTarget::Node(node) => Value::Node(node),
            RefTarget::Directive(directive) => Value::Directive(directive),
        }
    }
}

pub(crate) fn resolve(view: &LView, name: &str, strict_exports: bool) -> Result<RefTarget> {
    let local_ref = view
        .local_refs
        .get(name)
        .ok_or_else(|| RenderError::UnknownLocalRef {
            name: name.to_string(),
        })?;
    let index = local_ref.index;

    let element = match view.record(index)? {
        NodeRecord::Element(element) => element,
        other => return Ok(RefTarget::Node(other.native())),
    };

    let Some(export_as) = local_ref.export_as.as_deref() else {
        return Ok(match element.component() {
            Some(component) => RefTarget::Directive(component.instance.clone()),
            None => RefTarget::Node(element.native),
        });
    };

    if let Some(directive) = element
        .directives
        .iter()
        .find(|d| d.def.export_as() == Some(export_as))
    {
        return Ok(RefTarget::Directive(directive.instance.clone()));
    }

    if strict_exports {
        return Err(RenderError::ExportNotFound {
            index,
            export_as: export_as.to_string(),
        });
    }
    warn!(
        reference = name,
        export_as, "no directive exports this name, resolving to the host element"
    );
    Ok(RefTarget::Node(element.native))
}
