//! Directive and Component Definitions
//!
//! Definitions are plain data registered in a `DirectiveRegistry` and matched
//! against elements by selector when the element is created.

use indexmap::IndexMap;
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::instructions::Instructions;
use super::value::Value;
use crate::directive_matching::{CssSelector, SelectorMatcher};
use crate::error::{RenderError, Result};

/// Access to the concrete type behind a `dyn Directive`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour the runtime needs from a directive or component instance.
pub trait Directive: AsAny {
    /// Receives a bound input. `property` is the instance-side name from the
    /// definition's input map.
    fn set_input(&mut self, property: &str, value: Value) {
        let _ = (property, value);
    }

    /// Exposes instance state to templates reading through a local reference.
    fn property(&self, name: &str) -> Value {
        let _ = name;
        Value::Undefined
    }

    /// Called once when the owning view is destroyed.
    fn on_destroy(&mut self) {}
}

/// Shared handle to a directive instance. The element record that created the
/// instance owns it; handles obtained from lookups are plain aliases.
#[derive(Clone)]
pub struct DirectiveRef {
    instance: Rc<RefCell<dyn Directive>>,
    type_name: &'static str,
}

impl DirectiveRef {
    pub fn new<T: Directive>(instance: T) -> Self {
        Self {
            instance: Rc::new(RefCell::new(instance)),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &DirectiveRef) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.instance), Rc::as_ptr(&other.instance))
    }

    pub fn is<T: Directive>(&self) -> bool {
        (*self.instance.borrow()).as_any().is::<T>()
    }

    pub fn downcast<T: Directive>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.instance.borrow(), |d| d.as_any().downcast_ref::<T>()).ok()
    }

    pub fn downcast_mut<T: Directive>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.instance.borrow_mut(), |d| {
            d.as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    pub fn property(&self, name: &str) -> Value {
        self.instance.borrow().property(name)
    }

    pub(crate) fn set_input(&self, property: &str, value: Value) {
        self.instance.borrow_mut().set_input(property, value);
    }

    pub(crate) fn destroy(&self) {
        self.instance.borrow_mut().on_destroy();
    }
}

impl PartialEq for DirectiveRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for DirectiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectiveRef({})", self.type_name)
    }
}

/// Template of a component, invoked with the component instance as context.
pub type ComponentTemplate = Rc<dyn Fn(&mut Instructions<'_>, &DirectiveRef, bool) -> Result<()>>;

/// Metadata for a directive or, when it carries a template, a component.
#[derive(Clone)]
pub struct DirectiveDef {
    type_name: &'static str,
    selectors: Vec<CssSelector>,
    factory: Rc<dyn Fn() -> DirectiveRef>,
    inputs: IndexMap<String, String>,
    export_as: Option<String>,
    template: Option<ComponentTemplate>,
}

impl DirectiveDef {
    pub fn directive<T, F>(selector: &str, factory: F) -> Result<Self>
    where
        T: Directive,
        F: Fn() -> T + 'static,
    {
        Ok(Self {
            type_name: std::any::type_name::<T>(),
            selectors: CssSelector::parse(selector)?,
            factory: Rc::new(move || DirectiveRef::new(factory())),
            inputs: IndexMap::new(),
            export_as: None,
            template: None,
        })
    }

    pub fn component<T, F, C>(selector: &str, factory: F, template: C) -> Result<Self>
    where
        T: Directive,
        F: Fn() -> T + 'static,
        C: Fn(&mut Instructions<'_>, &T, bool) -> Result<()> + 'static,
    {
        let mut def = Self::directive(selector, factory)?;
        def.template = Some(Rc::new(
            move |rt: &mut Instructions<'_>, instance: &DirectiveRef, creation_mode: bool| {
                match instance.downcast::<T>() {
                    Some(component) => template(rt, &component, creation_mode),
                    None => Ok(()),
                }
            },
        ));
        Ok(def)
    }

    /// Maps the bound name `public` to the instance property `private`.
    pub fn with_input(mut self, public: &str, private: &str) -> Self {
        self.inputs.insert(public.to_string(), private.to_string());
        self
    }

    pub fn with_export_as(mut self, name: &str) -> Self {
        self.export_as = Some(name.to_string());
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn selectors(&self) -> &[CssSelector] {
        &self.selectors
    }

    pub fn export_as(&self) -> Option<&str> {
        self.export_as.as_deref()
    }

    pub fn is_component(&self) -> bool {
        self.template.is_some()
    }

    pub fn input(&self, public: &str) -> Option<&str> {
        self.inputs.get(public).map(String::as_str)
    }

    pub(crate) fn template(&self) -> Option<&ComponentTemplate> {
        self.template.as_ref()
    }

    pub(crate) fn create(&self) -> DirectiveRef {
        (self.factory)()
    }
}

impl fmt::Debug for DirectiveDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveDef")
            .field("type", &self.type_name)
            .field("selectors", &self.selectors)
            .field("inputs", &self.inputs)
            .field("export_as", &self.export_as)
            .field("component", &self.is_component())
            .finish()
    }
}

/// The set of definitions available to a render, indexed for selector matching.
#[derive(Default)]
pub struct DirectiveRegistry {
    defs: Vec<Rc<DirectiveDef>>,
    matcher: SelectorMatcher<usize>,
}

impl DirectiveRegistry {
    pub fn new(defs: impl IntoIterator<Item = DirectiveDef>) -> Self {
        let mut registry = Self::default();
        for def in defs {
            registry.register(def);
        }
        registry
    }

    pub fn register(&mut self, def: DirectiveDef) {
        let id = self.defs.len();
        for selector in def.selectors() {
            self.matcher.add_selectable(selector.clone(), id);
        }
        self.defs.push(Rc::new(def));
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions matching an element, in registration order with the
    /// component (at most one) moved to the front.
    pub fn matching(&self, tag: &str, attrs: &[(&str, &str)]) -> Result<Vec<Rc<DirectiveDef>>> {
        if self.defs.is_empty() {
            return Ok(Vec::new());
        }
        let element = CssSelector::for_element(tag, attrs);
        let mut ids = Vec::new();
        self.matcher.match_selector(&element, |_, id| {
            if !ids.contains(id) {
                ids.push(*id);
            }
        });
        ids.sort_unstable();

        let mut matched: Vec<Rc<DirectiveDef>> = ids.iter().map(|id| self.defs[*id].clone()).collect();
        let mut components = matched.iter().filter(|def| def.is_component());
        if let (Some(first), Some(second)) = (components.next(), components.next()) {
            return Err(RenderError::MultipleComponents {
                tag: tag.to_string(),
                first: first.type_name(),
                second: second.type_name(),
            });
        }
        if let Some(position) = matched.iter().position(|def| def.is_component()) {
            let component = matched.remove(position);
            matched.insert(0, component);
        }
        Ok(matched)
    }
}
