//! Views and the Node Registry
//!
//! An `LView` is one instantiation of a template. Its node registry is a dense,
//! index-addressed arena: a slot assigned during the creation pass keeps the
//! same record for the lifetime of the view, only bindings and children change.

use bitflags::bitflags;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::bindings::BindingKey;
use super::container::ContainerRecord;
use super::definition::{DirectiveDef, DirectiveRef};
use super::refs::{self, LocalRef, RefTarget};
use super::renderer::NodeHandle;
use super::value::Value;
use crate::error::{RenderError, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ViewFlags: u8 {
        /// The next pass over this view is its creation pass.
        const CREATION_MODE = 0b01;
        const DESTROYED = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Container,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Container => "container",
        };
        write!(f, "{}", name)
    }
}

/// A directive instance attached to an element, together with its definition.
#[derive(Debug, Clone)]
pub struct DirectiveInstance {
    pub(crate) def: Rc<DirectiveDef>,
    pub(crate) instance: DirectiveRef,
}

#[derive(Debug)]
pub struct ElementRecord {
    pub(crate) native: NodeHandle,
    pub(crate) tag: String,
    pub(crate) directives: SmallVec<[DirectiveInstance; 2]>,
    pub(crate) component_view: Option<Box<LView>>,
}

impl ElementRecord {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn native(&self) -> NodeHandle {
        self.native
    }

    pub(crate) fn component(&self) -> Option<&DirectiveInstance> {
        self.directives.first().filter(|d| d.def.is_component())
    }

    pub fn component_view(&self) -> Option<&LView> {
        self.component_view.as_deref()
    }
}

#[derive(Debug)]
pub struct TextRecord {
    pub(crate) native: NodeHandle,
}

/// Registry slot contents. Directive instances are not slots of their own;
/// they live on the `ElementRecord` of their host, in match order.
#[derive(Debug)]
pub enum NodeRecord {
    Element(ElementRecord),
    Text(TextRecord),
    Container(ContainerRecord),
}

impl NodeRecord {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRecord::Element(_) => NodeKind::Element,
            NodeRecord::Text(_) => NodeKind::Text,
            NodeRecord::Container(_) => NodeKind::Container,
        }
    }

    /// The host node backing the slot. Containers report their anchor.
    pub fn native(&self) -> NodeHandle {
        match self {
            NodeRecord::Element(element) => element.native,
            NodeRecord::Text(text) => text.native,
            NodeRecord::Container(container) => container.anchor,
        }
    }
}

#[derive(Debug)]
pub struct LView {
    pub(crate) nodes: Vec<Option<NodeRecord>>,
    pub(crate) bindings: HashMap<BindingKey, Value>,
    pub(crate) local_refs: IndexMap<String, LocalRef>,
    /// Slots created with no parent element inside this view, in order.
    pub(crate) root_slots: Vec<usize>,
    pub(crate) render_parent: Option<NodeHandle>,
    /// Root nodes are inserted before this node during the creation pass.
    pub(crate) insert_before: Option<NodeHandle>,
    pub(crate) flags: ViewFlags,
    pub(crate) block_id: Option<usize>,
    /// Slots whose element hosts a component view.
    pub(crate) components: Vec<usize>,
}

impl Default for LView {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            bindings: HashMap::new(),
            local_refs: IndexMap::new(),
            root_slots: Vec::new(),
            render_parent: None,
            insert_before: None,
            flags: ViewFlags::CREATION_MODE,
            block_id: None,
            components: Vec::new(),
        }
    }
}

impl LView {
    /// A top-level view rendering into `host`.
    pub fn root(host: NodeHandle) -> Self {
        Self {
            render_parent: Some(host),
            ..Self::default()
        }
    }

    pub(crate) fn embedded(
        block_id: usize,
        render_parent: Option<NodeHandle>,
        insert_before: Option<NodeHandle>,
    ) -> Self {
        Self {
            render_parent,
            insert_before,
            block_id: Some(block_id),
            ..Self::default()
        }
    }

    pub(crate) fn component(host: NodeHandle) -> Self {
        Self::root(host)
    }

    pub fn is_creation_mode(&self) -> bool {
        self.flags.contains(ViewFlags::CREATION_MODE)
    }

    /// Ends the creation pass, whether or not it completed.
    pub(crate) fn leave_creation_mode(&mut self) {
        self.flags.remove(ViewFlags::CREATION_MODE);
        self.insert_before = None;
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(ViewFlags::DESTROYED)
    }

    pub fn block_id(&self) -> Option<usize> {
        self.block_id
    }

    /// Number of slots, including never-assigned gaps.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub(crate) fn allocate(&mut self, index: usize, record: NodeRecord) {
        if index >= self.nodes.len() {
            self.nodes.resize_with(index + 1, || None);
        }
        debug_assert!(
            self.nodes[index].is_none(),
            "slot {} allocated twice in one view",
            index
        );
        self.nodes[index] = Some(record);
    }

    pub fn record(&self, index: usize) -> Result<&NodeRecord> {
        self.nodes
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(RenderError::SlotNotFound { index })
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> Result<&mut NodeRecord> {
        self.nodes
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(RenderError::SlotNotFound { index })
    }

    pub fn element(&self, index: usize) -> Result<&ElementRecord> {
        match self.record(index)? {
            NodeRecord::Element(element) => Ok(element),
            other => Err(unexpected(index, NodeKind::Element, other)),
        }
    }

    pub(crate) fn element_mut(&mut self, index: usize) -> Result<&mut ElementRecord> {
        match self.record_mut(index)? {
            NodeRecord::Element(element) => Ok(element),
            other => Err(unexpected(index, NodeKind::Element, other)),
        }
    }

    pub(crate) fn text_node(&self, index: usize) -> Result<&TextRecord> {
        match self.record(index)? {
            NodeRecord::Text(text) => Ok(text),
            other => Err(unexpected(index, NodeKind::Text, other)),
        }
    }

    pub fn container(&self, index: usize) -> Result<&ContainerRecord> {
        match self.record(index)? {
            NodeRecord::Container(container) => Ok(container),
            other => Err(unexpected(index, NodeKind::Container, other)),
        }
    }

    pub(crate) fn container_mut(&mut self, index: usize) -> Result<&mut ContainerRecord> {
        match self.record_mut(index)? {
            NodeRecord::Container(container) => Ok(container),
            other => Err(unexpected(index, NodeKind::Container, other)),
        }
    }

    /// Host node of slot `index`.
    pub fn load(&self, index: usize) -> Result<NodeHandle> {
        Ok(self.record(index)?.native())
    }

    /// Directive attached to slot `index` at position `offset`.
    pub fn load_directive(&self, index: usize, offset: usize) -> Result<DirectiveRef> {
        let element = match self.record(index)? {
            NodeRecord::Element(element) => element,
            _ => return Err(RenderError::DirectiveNotFound { index, offset }),
        };
        element
            .directives
            .get(offset)
            .map(|d| d.instance.clone())
            .ok_or(RenderError::DirectiveNotFound { index, offset })
    }

    pub fn reference(&self, name: &str, strict_exports: bool) -> Result<RefTarget> {
        refs::resolve(self, name, strict_exports)
    }

    pub fn local_ref_names(&self) -> impl Iterator<Item = &str> {
        self.local_refs.keys().map(String::as_str)
    }

    /// Host nodes this view places under its render parent, in document
    /// order. Nested container views come before their anchor.
    pub fn root_natives(&self) -> Vec<NodeHandle> {
        let mut natives = Vec::new();
        self.collect_root_natives(&mut natives);
        natives
    }

    pub(crate) fn collect_root_natives(&self, out: &mut Vec<NodeHandle>) {
        for slot in &self.root_slots {
            match self.nodes.get(*slot).and_then(Option::as_ref) {
                Some(NodeRecord::Container(container)) => {
                    for view in &container.views {
                        view.collect_root_natives(out);
                    }
                    out.push(container.anchor);
                }
                Some(record) => out.push(record.native()),
                None => {}
            }
        }
    }

    pub(crate) fn first_native(&self) -> Option<NodeHandle> {
        self.root_natives().first().copied()
    }
}

fn unexpected(index: usize, expected: NodeKind, found: &NodeRecord) -> RenderError {
    RenderError::UnexpectedNodeKind {
        index,
        expected,
        found: found.kind(),
    }
}
