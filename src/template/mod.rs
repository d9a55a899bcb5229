//! Response templates.

pub mod render;

pub use render::{render, substitute, Rendered};
