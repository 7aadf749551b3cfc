//! Host Platform Interface
//!
//! The runtime never touches host nodes directly; every creation, insertion
//! and mutation goes through a `Renderer`.

use std::fmt;

use super::value::Value;

/// Opaque handle to a host node owned by a `Renderer`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) u32);

impl NodeHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}

/// Host node API consumed by the instruction runtime.
pub trait Renderer {
    fn create_element(&mut self, tag: &str) -> NodeHandle;
    fn create_text(&mut self, value: &str) -> NodeHandle;
    fn create_comment(&mut self, value: &str) -> NodeHandle;

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle);
    /// Inserts `child` before `reference`, or appends when `reference` is `None`.
    fn insert_before(&mut self, parent: NodeHandle, child: NodeHandle, reference: Option<NodeHandle>);
    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle);

    fn set_property(&mut self, node: NodeHandle, name: &str, value: &Value);
    /// Reads the live value of a host property.
    fn property(&self, node: NodeHandle, name: &str) -> Value;

    fn set_attribute(&mut self, node: NodeHandle, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeHandle, name: &str);

    fn add_class(&mut self, node: NodeHandle, name: &str);
    fn remove_class(&mut self, node: NodeHandle, name: &str);

    fn set_text(&mut self, node: NodeHandle, value: &str);
}
