//! Render3 Module
//!
//! Corresponds to packages/core/src/render3/
//! The instruction runtime executed by compiled templates

pub mod bindings;
pub mod container;
pub mod definition;
pub mod dom;
pub mod instructions;
pub mod refs;
pub mod render_util;
pub mod renderer;
pub mod value;
pub mod view;

// Re-exports
pub use definition::{Directive, DirectiveDef, DirectiveRef, DirectiveRegistry};
pub use instructions::{bind, render_template, Instructions, Template};
pub use refs::RefTarget;
pub use renderer::{NodeHandle, Renderer};
pub use value::Value;
pub use view::LView;
