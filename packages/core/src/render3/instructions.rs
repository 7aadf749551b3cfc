//! Instruction Set
//!
//! Compiled templates drive the runtime through the methods of `Instructions`.
//! A template is called once per pass with a creation-mode flag: creation
//! instructions build the node registry on the first pass, binding and
//! container instructions run on every pass.
//!
//! Views whose template scope is open (embedded views between
//! `embedded_view_start`/`embedded_view_end`, component views while their
//! template runs) are moved out of their owner onto a frame stack and moved
//! back when the scope closes.

use smallvec::SmallVec;
use std::rc::Rc;
use tracing::{debug, trace};

use super::bindings;
use super::container::ContainerRecord;
use super::definition::{DirectiveDef, DirectiveRef, DirectiveRegistry};
use super::refs::{self, LocalRef, RefTarget};
use super::renderer::{NodeHandle, Renderer};
use super::value::Value;
use super::view::{DirectiveInstance, ElementRecord, LView, NodeRecord, TextRecord};
use crate::config::RuntimeConfig;
use crate::error::{RenderError, Result};

/// A compiled template.
pub trait Template<C: ?Sized> {
    fn render(&self, rt: &mut Instructions<'_>, ctx: &C, creation_mode: bool) -> Result<()>;
}

impl<C: ?Sized, F> Template<C> for F
where
    F: Fn(&mut Instructions<'_>, &C, bool) -> Result<()>,
{
    fn render(&self, rt: &mut Instructions<'_>, ctx: &C, creation_mode: bool) -> Result<()> {
        self(rt, ctx, creation_mode)
    }
}

/// Marks a template expression as a binding. Values pass through unchanged;
/// change detection happens in the binding instruction that receives them.
pub fn bind(value: impl Into<Value>) -> Value {
    value.into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    /// Embedded view of the container at this slot of the parent frame.
    Embedded { container: usize },
    /// Component view hosted by the element at this slot of the parent frame.
    Component { host: usize },
}

#[derive(Debug)]
struct Frame {
    view: LView,
    kind: FrameKind,
    open_elements: Vec<usize>,
    /// Container whose refresh window is open in this view.
    open_container: Option<usize>,
}

impl Frame {
    fn new(view: LView, kind: FrameKind) -> Self {
        Self {
            view,
            kind,
            open_elements: Vec::new(),
            open_container: None,
        }
    }
}

/// Instruction runtime for one render pass over a root view.
pub struct Instructions<'a> {
    renderer: &'a mut dyn Renderer,
    registry: &'a DirectiveRegistry,
    config: &'a RuntimeConfig,
    root: Frame,
    stack: Vec<Frame>,
}

impl<'a> Instructions<'a> {
    pub fn new(
        renderer: &'a mut dyn Renderer,
        registry: &'a DirectiveRegistry,
        config: &'a RuntimeConfig,
        root: LView,
    ) -> Self {
        Self {
            renderer,
            registry,
            config,
            root: Frame::new(root, FrameKind::Root),
            stack: Vec::new(),
        }
    }

    fn frame(&self) -> &Frame {
        self.stack.last().unwrap_or(&self.root)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    fn split(&mut self) -> (&mut Frame, &mut (dyn Renderer + 'a)) {
        let frame = self.stack.last_mut().unwrap_or(&mut self.root);
        (frame, &mut *self.renderer)
    }

    /// View of the innermost open template scope.
    pub fn view(&self) -> &LView {
        &self.frame().view
    }

    pub fn creation_mode(&self) -> bool {
        self.frame().view.is_creation_mode()
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.config
    }

    // ---------------------------------------------------------------------
    // Creation instructions
    // ---------------------------------------------------------------------

    /// Creates an element at slot `index` and opens it as the parent of
    /// subsequently created nodes. `attrs` are static attributes; they are
    /// applied immediately and take part in directive matching. `local_refs`
    /// pairs a reference name with the requested export name (`""` for none).
    pub fn element_start(
        &mut self,
        index: usize,
        tag: &str,
        attrs: &[(&str, &str)],
        local_refs: &[(&str, &str)],
    ) -> Result<NodeHandle> {
        debug_assert!(self.creation_mode(), "element_start called in update mode");
        let defs = self.registry.matching(tag, attrs)?;

        let native = self.renderer.create_element(tag);
        for (name, value) in attrs {
            self.renderer.set_attribute(native, name, value);
        }
        self.attach(index, native)?;

        let directives: SmallVec<[DirectiveInstance; 2]> = defs
            .into_iter()
            .map(|def| instantiate(index, def, attrs))
            .collect();
        let component_view = directives
            .first()
            .filter(|d| d.def.is_component())
            .map(|_| Box::new(LView::component(native)));

        let frame = self.frame_mut();
        if component_view.is_some() {
            frame.view.components.push(index);
        }
        frame.view.allocate(
            index,
            NodeRecord::Element(ElementRecord {
                native,
                tag: tag.to_string(),
                directives,
                component_view,
            }),
        );
        for (name, export_as) in local_refs {
            frame
                .view
                .local_refs
                .insert(name.to_string(), LocalRef::new(index, export_as));
        }
        frame.open_elements.push(index);
        Ok(native)
    }

    pub fn element_end(&mut self) -> Result<()> {
        self.frame_mut()
            .open_elements
            .pop()
            .map(|_| ())
            .ok_or(RenderError::UnbalancedElementEnd)
    }

    pub fn text(&mut self, index: usize, initial: Option<&str>) -> Result<NodeHandle> {
        debug_assert!(self.creation_mode(), "text called in update mode");
        let native = self.renderer.create_text(initial.unwrap_or(""));
        self.attach(index, native)?;
        self.frame_mut()
            .view
            .allocate(index, NodeRecord::Text(TextRecord { native }));
        Ok(native)
    }

    /// Creates a view container at slot `index`, anchored by a comment node.
    pub fn container(&mut self, index: usize) -> Result<NodeHandle> {
        debug_assert!(self.creation_mode(), "container called in update mode");
        let anchor = self.renderer.create_comment("container");
        self.attach(index, anchor)?;

        let frame = self.frame_mut();
        let render_parent = match frame.open_elements.last().copied() {
            Some(parent) => Some(frame.view.element(parent)?.native),
            None => frame.view.render_parent,
        };
        frame.view.allocate(
            index,
            NodeRecord::Container(ContainerRecord::new(anchor, render_parent)),
        );
        trace!(index, "created container");
        Ok(anchor)
    }

    /// Places a freshly created node under the open element, or among the
    /// view's root nodes when no element is open.
    fn attach(&mut self, index: usize, native: NodeHandle) -> Result<()> {
        let (frame, renderer) = self.split();
        match frame.open_elements.last().copied() {
            Some(parent) => {
                let parent = frame.view.element(parent)?.native;
                renderer.append_child(parent, native);
            }
            None => {
                frame.view.root_slots.push(index);
                if let Some(parent) = frame.view.render_parent {
                    renderer.insert_before(parent, native, frame.view.insert_before);
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Binding instructions
    // ---------------------------------------------------------------------

    pub fn element_property(&mut self, index: usize, name: &str, value: impl Into<Value>) -> Result<()> {
        let (frame, renderer) = self.split();
        bindings::set_property(&mut frame.view, renderer, index, name, value.into())
    }

    pub fn element_attribute(&mut self, index: usize, name: &str, value: impl Into<Value>) -> Result<()> {
        let (frame, renderer) = self.split();
        bindings::set_attribute(&mut frame.view, renderer, index, name, value.into())
    }

    pub fn element_class_named(&mut self, index: usize, name: &str, value: impl Into<Value>) -> Result<()> {
        let (frame, renderer) = self.split();
        bindings::set_class(&mut frame.view, renderer, index, name, value.into())
    }

    pub fn text_binding(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let (frame, renderer) = self.split();
        bindings::set_text(&mut frame.view, renderer, index, value.into())
    }

    // ---------------------------------------------------------------------
    // Container instructions
    // ---------------------------------------------------------------------

    pub fn container_refresh_start(&mut self, index: usize) -> Result<()> {
        let frame = self.frame_mut();
        if let Some(open) = frame.open_container {
            return Err(RenderError::reconciliation(format!(
                "container {} is still being refreshed",
                open
            )));
        }
        frame.view.container_mut(index)?.begin_refresh();
        frame.open_container = Some(index);
        Ok(())
    }

    /// Opens the embedded view for `block_id` at the container's cursor.
    /// Returns whether the view runs its creation pass.
    pub fn embedded_view_start(&mut self, block_id: usize) -> Result<bool> {
        let (frame, renderer) = self.split();
        let index = frame.open_container.ok_or_else(|| {
            RenderError::reconciliation("embedded_view_start called outside a container refresh")
        })?;
        let container = frame.view.container_mut(index)?;
        let view = match container.take_matching(block_id, renderer) {
            Some(view) => view,
            None => {
                debug!(container = index, block_id, "creating embedded view");
                LView::embedded(
                    block_id,
                    container.render_parent,
                    Some(container.next_reference()),
                )
            }
        };
        let creation_mode = view.is_creation_mode();
        self.stack
            .push(Frame::new(view, FrameKind::Embedded { container: index }));
        Ok(creation_mode)
    }

    pub fn embedded_view_end(&mut self) -> Result<()> {
        match self.stack.last().map(|frame| frame.kind) {
            Some(FrameKind::Embedded { .. }) => {}
            _ => {
                return Err(RenderError::reconciliation(
                    "embedded_view_end called without a matching embedded_view_start",
                ))
            }
        }
        self.end_view_pass()?;
        self.pop_frame();
        Ok(())
    }

    pub fn container_refresh_end(&mut self) -> Result<()> {
        let (frame, renderer) = self.split();
        let Some(index) = frame.open_container.take() else {
            let message = match frame.kind {
                FrameKind::Embedded { .. } => "container_refresh_end called with an embedded view still open",
                _ => "container_refresh_end called without container_refresh_start",
            };
            return Err(RenderError::reconciliation(message));
        };
        frame.view.container_mut(index)?.end_refresh(renderer);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lookup instructions
    // ---------------------------------------------------------------------

    pub fn load(&self, index: usize) -> Result<NodeHandle> {
        self.frame().view.load(index)
    }

    /// First directive attached to slot `index`. For a component host this is
    /// the component instance.
    pub fn load_directive(&self, index: usize) -> Result<DirectiveRef> {
        self.load_directive_at(index, 0)
    }

    pub fn load_directive_at(&self, index: usize, offset: usize) -> Result<DirectiveRef> {
        self.frame().view.load_directive(index, offset)
    }

    pub fn reference(&self, name: &str) -> Result<RefTarget> {
        refs::resolve(&self.frame().view, name, self.config.strict_exports)
    }

    /// Live value of a host property.
    pub fn property(&self, node: NodeHandle, name: &str) -> Value {
        self.renderer.property(node, name)
    }

    // ---------------------------------------------------------------------
    // Pass bookkeeping
    // ---------------------------------------------------------------------

    /// Completes the template pass of the innermost view: validates nesting,
    /// refreshes hosted components and leaves creation mode.
    pub(crate) fn end_view_pass(&mut self) -> Result<()> {
        let frame = self.frame();
        if !frame.open_elements.is_empty() {
            return Err(RenderError::UnclosedElement {
                open: frame.open_elements.len(),
            });
        }
        if let Some(index) = frame.open_container {
            return Err(RenderError::reconciliation(format!(
                "container {} was not closed with container_refresh_end",
                index
            )));
        }

        self.refresh_components()?;

        self.frame_mut().view.leave_creation_mode();
        Ok(())
    }

    fn refresh_components(&mut self) -> Result<()> {
        let hosts = self.frame().view.components.clone();
        for host in hosts {
            let element = self.frame_mut().view.element_mut(host)?;
            let Some(component) = element.component().cloned() else {
                continue;
            };
            let Some(template) = component.def.template().cloned() else {
                continue;
            };
            let Some(view) = element.component_view.take() else {
                continue;
            };

            trace!(host, component = component.def.type_name(), "refreshing component");
            let creation_mode = view.is_creation_mode();
            let depth = self.stack.len();
            self.stack.push(Frame::new(*view, FrameKind::Component { host }));

            let result = template(self, &component.instance, creation_mode)
                .and_then(|()| self.end_view_pass());
            self.unwind_to(depth);
            result?;
        }
        Ok(())
    }

    /// Moves the top frame's view back into its owner.
    fn pop_frame(&mut self) {
        let Some(mut frame) = self.stack.pop() else {
            return;
        };
        // A pass that failed part way still counts as the creation pass.
        frame.view.leave_creation_mode();
        let parent = self.stack.last_mut().unwrap_or(&mut self.root);
        match frame.kind {
            FrameKind::Root => {}
            FrameKind::Embedded { container } => {
                if let Ok(record) = parent.view.container_mut(container) {
                    record.insert_at_cursor(frame.view);
                }
            }
            FrameKind::Component { host } => {
                if let Ok(element) = parent.view.element_mut(host) {
                    element.component_view = Some(Box::new(frame.view));
                }
            }
        }
    }

    fn unwind_to(&mut self, depth: usize) {
        if self.stack.len() > depth {
            debug!(open = self.stack.len() - depth, "unwinding open views");
        }
        while self.stack.len() > depth {
            self.pop_frame();
        }
    }

    /// Ends the pass and hands the root view back, restoring any views left
    /// open by a failed template.
    pub fn finish(mut self) -> LView {
        self.unwind_to(0);
        self.root.view.leave_creation_mode();
        self.root.view
    }
}

fn instantiate(index: usize, def: Rc<DirectiveDef>, attrs: &[(&str, &str)]) -> DirectiveInstance {
    debug!(index, directive = def.type_name(), "instantiating directive");
    let instance = def.create();
    for (name, value) in attrs {
        if let Some(property) = def.input(name) {
            instance.set_input(property, Value::from(*value));
        }
    }
    DirectiveInstance { def, instance }
}

/// Runs one pass of `template` over `view`.
pub fn render_template<C, T>(
    view: &mut LView,
    renderer: &mut dyn Renderer,
    registry: &DirectiveRegistry,
    config: &RuntimeConfig,
    template: &T,
    ctx: &C,
) -> Result<()>
where
    C: ?Sized,
    T: Template<C> + ?Sized,
{
    let root = std::mem::take(view);
    let mut rt = Instructions::new(renderer, registry, config, root);
    let creation_mode = rt.creation_mode();
    let result = template
        .render(&mut rt, ctx, creation_mode)
        .and_then(|()| rt.end_view_pass());
    *view = rt.finish();
    result
}
