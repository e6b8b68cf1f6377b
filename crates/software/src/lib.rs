//! A cpu implementation of the plsdraw [`Backend`](plsdraw_core::Backend).
//!
//! Every logical flush is rasterized in 32x32 tiles. Coverage is computed with 4x4 supersampling,
//! strokes are drawn as round-capped segments, and the clip buffer lives per tile for one flush.

mod backend;
mod blend;
mod buffer;
mod dispatch;
mod raster;
mod records;
mod scene;
mod simd;
mod texture;

pub use backend::SoftwareBackend;
pub use buffer::{Buffer, BufferMut, BufferRef};
