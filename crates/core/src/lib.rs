extern crate self as plsdraw_core;

pub mod allocator;
mod backend;
pub mod batch;
mod config;
mod context;
mod data;
pub mod draw;
mod error;
pub mod flush;
mod gpu;
pub mod gradient;
pub mod intersection;
pub mod math;
pub mod paint;
pub mod path;
mod record;
pub mod tessellation;

pub use allocator::{ResourceAllocationCounts, ResourceAllocator};
pub use backend::*;
pub use config::*;
pub use context::{FlushReport, FrameDescriptor, RenderContext};
pub use data::*;
pub use draw::{
    Draw, ImageMeshDraw, ImageRectDraw, InteriorTriangulationDraw, PathDraw, StrokeCap, StrokeJoin, StrokeStyle,
};
pub use error::*;
pub use flush::FlushSummary;
pub use gpu::*;
pub use math::{Aabb, Mat2d, Vec2};
pub use paint::{ColorInt, Gradient, Paint, color_argb};
pub use path::RawPath;
pub use plsdraw_derive::GpuRecord;
pub use record::*;
