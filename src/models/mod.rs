pub mod data;
pub mod geometry;

pub use data::*;
pub use geometry::{NormalizedRect, PixelRect};
