//! View Containers
//!
//! A container slot owns an ordered list of embedded views. Reconciliation is
//! positional: each refresh walks the list with a cursor, reusing views that
//! are re-affirmed in order and destroying everything the cursor skips or
//! never reaches.

use tracing::{debug, trace};

use super::renderer::{NodeHandle, Renderer};
use super::view::{LView, NodeRecord, ViewFlags};

#[derive(Debug)]
pub struct ContainerRecord {
    pub(crate) anchor: NodeHandle,
    pub(crate) render_parent: Option<NodeHandle>,
    pub(crate) views: Vec<LView>,
    /// Position of the next view to reconcile during a refresh.
    pub(crate) cursor: usize,
}

impl ContainerRecord {
    pub(crate) fn new(anchor: NodeHandle, render_parent: Option<NodeHandle>) -> Self {
        Self {
            anchor,
            render_parent,
            views: Vec::new(),
            cursor: 0,
        }
    }

    pub fn anchor(&self) -> NodeHandle {
        self.anchor
    }

    pub fn views(&self) -> &[LView] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub(crate) fn begin_refresh(&mut self) {
        self.cursor = 0;
    }

    /// Host node a view inserted at the cursor must precede: the first root
    /// node of the views from the cursor on, skipping views that render
    /// nothing, or the anchor.
    pub(crate) fn next_reference(&self) -> NodeHandle {
        self.views
            .get(self.cursor..)
            .and_then(|rest| rest.iter().find_map(LView::first_native))
            .unwrap_or(self.anchor)
    }

    /// Removes and returns the view for `block_id` at the cursor. Views with a
    /// lower block id sitting at the cursor belong to blocks the template
    /// skipped this pass and are destroyed on the way.
    pub(crate) fn take_matching(
        &mut self,
        block_id: usize,
        renderer: &mut dyn Renderer,
    ) -> Option<LView> {
        while let Some(candidate) = self.views.get(self.cursor) {
            let candidate_id = candidate.block_id;
            match candidate_id {
                Some(id) if id == block_id => return Some(self.views.remove(self.cursor)),
                Some(id) if id < block_id => {
                    let mut skipped = self.views.remove(self.cursor);
                    destroy_view(&mut skipped, renderer, true);
                }
                _ => break,
            }
        }
        None
    }

    /// Puts a rendered view back at the cursor and advances past it.
    pub(crate) fn insert_at_cursor(&mut self, view: LView) {
        let position = self.cursor.min(self.views.len());
        self.views.insert(position, view);
        self.cursor = position + 1;
    }

    /// Destroys every view the cursor did not reach.
    pub(crate) fn end_refresh(&mut self, renderer: &mut dyn Renderer) {
        let start = self.cursor.min(self.views.len());
        let removed: Vec<LView> = self.views.drain(start..).collect();
        if !removed.is_empty() {
            debug!(count = removed.len(), "removing views not re-affirmed by refresh");
        }
        for mut view in removed {
            destroy_view(&mut view, renderer, true);
        }
    }
}

/// Tears a view down: optionally detaches its root nodes from the host tree,
/// destroys nested container and component views, notifies directives and
/// drops the binding table.
pub(crate) fn destroy_view(view: &mut LView, renderer: &mut dyn Renderer, detach: bool) {
    if view.is_destroyed() {
        return;
    }
    trace!(block_id = ?view.block_id, "destroying view");

    if detach {
        if let Some(parent) = view.render_parent {
            for native in view.root_natives() {
                renderer.remove_child(parent, native);
            }
        }
    }

    for record in view.nodes.iter_mut().flatten() {
        match record {
            NodeRecord::Element(element) => {
                if let Some(component_view) = element.component_view.as_deref_mut() {
                    destroy_view(component_view, renderer, false);
                }
                for directive in &element.directives {
                    directive.instance.destroy();
                }
            }
            NodeRecord::Container(container) => {
                for child in container.views.iter_mut() {
                    destroy_view(child, renderer, false);
                }
            }
            NodeRecord::Text(_) => {}
        }
    }

    view.bindings.clear();
    view.flags.insert(ViewFlags::DESTROYED);
}
