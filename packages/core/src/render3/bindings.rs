//! Binding Differ
//!
//! Every binding instruction compares its value with the one committed for the
//! same `(slot, kind, name)` during the previous pass and touches the host only
//! when the two are not identical.

use tracing::trace;

use super::renderer::Renderer;
use super::value::Value;
use super::view::LView;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Property,
    Attribute,
    Class,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub index: usize,
    pub kind: BindingKind,
    pub name: String,
}

impl BindingKey {
    pub fn new(index: usize, kind: BindingKind, name: &str) -> Self {
        Self {
            index,
            kind,
            name: name.to_string(),
        }
    }
}

impl LView {
    /// Commits `value` for `key`. Returns `false` when it is identical to the
    /// previously committed value.
    pub(crate) fn update_binding(&mut self, key: BindingKey, value: &Value) -> bool {
        match self.bindings.get_mut(&key) {
            Some(previous) if previous.identical(value) => false,
            Some(previous) => {
                *previous = value.clone();
                true
            }
            None => {
                self.bindings.insert(key, value.clone());
                true
            }
        }
    }

    pub fn binding(&self, index: usize, kind: BindingKind, name: &str) -> Option<&Value> {
        self.bindings.get(&BindingKey::new(index, kind, name))
    }
}

/// Binds `name` on the element at `index`. Inputs declared by directives on
/// the element take the value; otherwise it becomes a host property.
pub(crate) fn set_property(
    view: &mut LView,
    renderer: &mut dyn Renderer,
    index: usize,
    name: &str,
    value: Value,
) -> Result<()> {
    view.element(index)?;
    if !view.update_binding(BindingKey::new(index, BindingKind::Property, name), &value) {
        return Ok(());
    }

    let element = view.element(index)?;
    let mut consumed = false;
    for directive in &element.directives {
        if let Some(property) = directive.def.input(name) {
            trace!(index, input = name, "setting directive input");
            directive.instance.set_input(property, value.clone());
            consumed = true;
        }
    }
    if !consumed {
        renderer.set_property(element.native, name, &value);
    }
    Ok(())
}

pub(crate) fn set_attribute(
    view: &mut LView,
    renderer: &mut dyn Renderer,
    index: usize,
    name: &str,
    value: Value,
) -> Result<()> {
    let native = view.element(index)?.native;
    if !view.update_binding(BindingKey::new(index, BindingKind::Attribute, name), &value) {
        return Ok(());
    }
    if value.is_nullish() {
        renderer.remove_attribute(native, name);
    } else {
        renderer.set_attribute(native, name, &value.stringify());
    }
    Ok(())
}

pub(crate) fn set_class(
    view: &mut LView,
    renderer: &mut dyn Renderer,
    index: usize,
    name: &str,
    value: Value,
) -> Result<()> {
    let native = view.element(index)?.native;
    if !view.update_binding(BindingKey::new(index, BindingKind::Class, name), &value) {
        return Ok(());
    }
    if value.is_truthy() {
        renderer.add_class(native, name);
    } else {
        renderer.remove_class(native, name);
    }
    Ok(())
}

pub(crate) fn set_text(
    view: &mut LView,
    renderer: &mut dyn Renderer,
    index: usize,
    value: Value,
) -> Result<()> {
    let native = view.text_node(index)?.native;
    if !view.update_binding(BindingKey::new(index, BindingKind::Text, ""), &value) {
        return Ok(());
    }
    renderer.set_text(native, &value.stringify());
    Ok(())
}
