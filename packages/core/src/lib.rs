#![deny(clippy::all)]

/**
 * Angular Core Runtime - render3 instruction engine
 *
 * Executes compiled template instruction streams against a host node tree
 */

// Core modules (root level - mirrors packages/core/src/*.ts)
mod config;
pub mod directive_matching;
mod error;

// Instruction runtime
pub mod render3;

// Re-exports
pub use config::RuntimeConfig;
pub use error::{RenderError, Result};

pub use render3::definition::{Directive, DirectiveDef, DirectiveRef, DirectiveRegistry};
pub use render3::dom::Document;
pub use render3::instructions::{bind, render_template, Instructions, Template};
pub use render3::refs::RefTarget;
pub use render3::render_util::{render_to_html, TemplateFixture};
pub use render3::renderer::{NodeHandle, Renderer};
pub use render3::value::Value;
pub use render3::view::LView;
