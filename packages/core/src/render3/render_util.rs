//! Render Utilities
//!
//! Entry points that run a template against the in-memory `Document` and
//! serialize the result.

use std::marker::PhantomData;

use super::definition::{DirectiveDef, DirectiveRegistry};
use super::dom::Document;
use super::instructions::{render_template, Template};
use super::renderer::{NodeHandle, Renderer};
use super::view::LView;
use crate::config::RuntimeConfig;
use crate::error::Result;

/// A template bound to a host `<div>` that can be rendered repeatedly.
/// The first `render` is the creation pass, later ones are update passes.
pub struct TemplateFixture<C: ?Sized, T> {
    document: Document,
    host: NodeHandle,
    view: LView,
    registry: DirectiveRegistry,
    config: RuntimeConfig,
    template: T,
    _context: PhantomData<fn(&C)>,
}

impl<C, T> TemplateFixture<C, T>
where
    C: ?Sized,
    T: Template<C>,
{
    pub fn new(template: T, defs: impl IntoIterator<Item = DirectiveDef>) -> Self {
        Self::with_config(template, defs, RuntimeConfig::default())
    }

    pub fn with_config(
        template: T,
        defs: impl IntoIterator<Item = DirectiveDef>,
        config: RuntimeConfig,
    ) -> Self {
        let mut document = Document::new();
        let host = document.create_element("div");
        Self {
            document,
            host,
            view: LView::root(host),
            registry: DirectiveRegistry::new(defs),
            config,
            template,
            _context: PhantomData,
        }
    }

    /// Runs one pass and returns the host's inner HTML.
    pub fn render(&mut self, ctx: &C) -> Result<String> {
        render_template(
            &mut self.view,
            &mut self.document,
            &self.registry,
            &self.config,
            &self.template,
            ctx,
        )?;
        Ok(self.html())
    }

    pub fn html(&self) -> String {
        self.document.inner_html(self.host, &self.config)
    }

    pub fn view(&self) -> &LView {
        &self.view
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn host(&self) -> NodeHandle {
        self.host
    }
}

/// Renders `template` once in creation mode and returns the host's inner HTML.
pub fn render_to_html<C, T>(
    template: T,
    ctx: &C,
    defs: impl IntoIterator<Item = DirectiveDef>,
) -> Result<String>
where
    C: ?Sized,
    T: Template<C>,
{
    TemplateFixture::new(template, defs).render(ctx)
}
