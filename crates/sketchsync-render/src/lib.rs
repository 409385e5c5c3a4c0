//! SketchSync Render Library
//!
//! Render engine implementations for SketchSync. [`PixelCanvas`] is a
//! deterministic software rasterizer with PNG export; [`VelloCanvas`] builds a
//! Vello scene for GPU presentation.

mod pixel;
mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use pixel::PixelCanvas;
pub use renderer::{RenderResult, RendererError};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloCanvas;
