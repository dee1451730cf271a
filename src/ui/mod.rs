pub mod charts;
pub mod render;

pub use render::{MarkupRenderer, Palette};
