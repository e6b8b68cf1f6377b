use crate::{
    Backend, FlushDescriptor, FlushType, ImageData, ImageTexture, InterlockMode, LoadAction, RenderBuffer,
    RenderBufferFlags, RenderBufferType, RenderContextConfig, RenderError, RenderTarget, ResourceAllocationCounts,
    allocator::{MappedResources, ResourceAllocator},
    draw::Draw,
    flush::{FlushSummary, LogicalFlush},
    gradient::GradientCache,
    intersection::IntersectionBoard,
    paint::{ColorInt, Paint},
};
use bumpalo::Bump;
use std::{any::Any, sync::Arc};

/// Everything [`RenderContext::begin_frame`] needs to know about a frame.
#[derive(Clone)]
pub struct FrameDescriptor {
    pub render_target: RenderTarget,
    pub load_action: LoadAction,
    /// `0xAARRGGBB`, used when `load_action` is [`LoadAction::Clear`].
    pub clear_color: ColorInt,
    /// Use [`InterlockMode::Atomics`] even if the platform supports raster ordering.
    pub atomic_mode: bool,
    pub wireframe: bool,
    pub fills_disabled: bool,
    pub strokes_disabled: bool,
    /// Opaque data handed to the backend with every flush of this frame.
    pub backend_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl FrameDescriptor {
    /// Clear `render_target` to transparent black.
    pub fn new(render_target: RenderTarget) -> Self {
        Self {
            render_target,
            load_action: LoadAction::Clear,
            clear_color: 0,
            atomic_mode: false,
            wireframe: false,
            fills_disabled: false,
            strokes_disabled: false,
            backend_data: None,
        }
    }

    pub fn with_clear_color(mut self, color: ColorInt) -> Self {
        self.load_action = LoadAction::Clear;
        self.clear_color = color;
        self
    }

    pub fn with_load_action(mut self, load_action: LoadAction) -> Self {
        self.load_action = load_action;
        self
    }

    pub fn with_atomic_mode(mut self, atomic_mode: bool) -> Self {
        self.atomic_mode = atomic_mode;
        self
    }
}

impl std::fmt::Debug for FrameDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDescriptor")
            .field("render_target", &self.render_target)
            .field("load_action", &self.load_action)
            .field("clear_color", &format_args!("{:#010x}", self.clear_color))
            .field("atomic_mode", &self.atomic_mode)
            .field("wireframe", &self.wireframe)
            .field("fills_disabled", &self.fills_disabled)
            .field("strokes_disabled", &self.strokes_disabled)
            .finish_non_exhaustive()
    }
}

/// What [`RenderContext::flush`] executed, one entry per logical flush.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlushReport {
    pub flushes: Vec<FlushSummary>,
}

impl FlushReport {
    pub fn path_count(&self) -> usize {
        self.flushes.iter().map(|x| x.path_count).sum()
    }
}

struct FrameState {
    desc: FrameDescriptor,
    interlock_mode: InterlockMode,
    load_action: LoadAction,
}

/// The frame session: owns the backend, the GPU resource allocator, the gradient cache and the
/// logical flushes of the open frame.
///
/// A frame is `begin_frame`, any number of draw pushes (with `logical_flush` whenever a push reports
/// that the active flush is full), then `flush(FlushType::EndOfFrame)`.
pub struct RenderContext<B: Backend> {
    backend: B,
    config: RenderContextConfig,
    allocator: ResourceAllocator,
    gradients: GradientCache,
    board: IntersectionBoard,
    arena: Bump,
    frame: Option<FrameState>,
    flushes: Vec<LogicalFlush>,
    last_generated_clip_id: u32,
    clip_content_id: u32,
    flush_count: usize,
}

impl<B: Backend> RenderContext<B> {
    pub fn new(backend: B) -> Self {
        let config = RenderContextConfig::default();
        Self {
            backend,
            allocator: ResourceAllocator::new(),
            gradients: GradientCache::new(config.max_gradient_texture_height),
            board: IntersectionBoard::default(),
            arena: Bump::new(),
            frame: None,
            flushes: Vec::new(),
            last_generated_clip_id: 0,
            clip_content_id: 0,
            flush_count: 0,
            config,
        }
    }

    /// Create a context with custom limits, allocating `config.initial_allocation` up front.
    pub fn with_config(backend: B, config: RenderContextConfig) -> Result<Self, RenderError> {
        let mut context = Self::new(backend);
        context.gradients = GradientCache::new(config.max_gradient_texture_height);
        context.config = config;

        if let Some(initial) = context.config.initial_allocation {
            context.allocator.reset(&mut context.backend, initial)?;
        }

        Ok(context)
    }

    pub fn config(&self) -> &RenderContextConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    pub fn begin_frame(&mut self, desc: FrameDescriptor) {
        debug_assert!(self.frame.is_none(), "begin_frame called twice");

        let interlock_mode = if desc.atomic_mode || !self.backend.platform_features().supports_raster_ordering {
            InterlockMode::Atomics
        } else {
            InterlockMode::RasterOrdering
        };

        log::debug!("begin frame {:?} ({interlock_mode:?})", desc.render_target);

        self.flushes.clear();
        self.flushes.push(LogicalFlush::new(interlock_mode));
        self.gradients.clear();
        self.last_generated_clip_id = 0;
        self.clip_content_id = 0;
        self.frame = Some(FrameState {
            load_action: desc.load_action,
            desc,
            interlock_mode,
        });
    }

    pub fn frame_is_open(&self) -> bool {
        self.frame.is_some()
    }

    pub fn interlock_mode(&self) -> Option<InterlockMode> {
        self.frame.as_ref().map(|x| x.interlock_mode)
    }

    /// A clip ID no other clip of the active logical flush uses, or `None` once they are used up.
    pub fn generate_clip_id(&mut self) -> Option<u32> {
        debug_assert!(self.frame.is_some(), "generate_clip_id outside of a frame");

        if self.last_generated_clip_id >= self.config.path_id_limit() {
            return None;
        }

        self.last_generated_clip_id += 1;
        Some(self.last_generated_clip_id)
    }

    /// The caller-defined identity of what the clip buffer holds. 0 after every logical flush.
    pub fn clip_content_id(&self) -> u32 {
        self.clip_content_id
    }

    pub fn set_clip_content_id(&mut self, id: u32) {
        self.clip_content_id = id;
    }

    /// Push all of `draws` into the active logical flush, or none of them.
    ///
    /// Returns `false` if the flush is full; call [`RenderContext::logical_flush`] and retry. On
    /// success `draws` is drained, on failure it is left as it was. Draws the frame disabled (see
    /// [`FrameDescriptor::fills_disabled`]) are skipped.
    pub fn push_draw_batch(&mut self, draws: &mut Vec<Draw>) -> bool {
        let Some(frame) = self.frame.as_ref() else {
            debug_assert!(false, "push_draw_batch outside of a frame");
            return false;
        };

        let Some(flush) = self.flushes.last_mut() else {
            return false;
        };

        let (fills_disabled, strokes_disabled) = (frame.desc.fills_disabled, frame.desc.strokes_disabled);
        let enabled = |draw: &Draw| !(fills_disabled && draw.is_fill()) && !(strokes_disabled && draw.is_stroke());
        if draws.iter().all(enabled) {
            return flush.push_draw_batch(draws, &mut self.gradients, &self.config);
        }

        let mut kept = draws.iter().filter(|draw| enabled(draw)).cloned().collect::<Vec<_>>();
        if !flush.push_draw_batch(&mut kept, &mut self.gradients, &self.config) {
            return false;
        }

        draws.clear();
        true
    }

    /// Push `draws`, starting a new logical flush if the active one is full.
    pub fn push_draws(&mut self, mut draws: Vec<Draw>) -> Result<(), RenderError> {
        if self.frame.is_none() {
            return Err(RenderError::FrameNotOpen);
        }

        if self.push_draw_batch(&mut draws) {
            return Ok(());
        }

        if !self.flushes.last().is_some_and(LogicalFlush::is_empty) {
            self.logical_flush();

            // The draws keep the clip IDs they were built with; the new flush must not hand them out again.
            self.last_generated_clip_id = max_clip_id(&draws);
            if self.push_draw_batch(&mut draws) {
                return Ok(());
            }
        }

        log::warn!("draw batch of {} draws does not fit into an empty logical flush", draws.len());
        Err(RenderError::DrawBatchTooLarge { draws: draws.len() })
    }

    /// Close the active logical flush and open a new one. Clip IDs start over.
    ///
    /// Does nothing if the active flush is empty.
    pub fn logical_flush(&mut self) {
        let Some(frame) = self.frame.as_ref() else {
            return;
        };

        let Some(active) = self.flushes.last_mut() else {
            return;
        };

        if active.is_empty() {
            return;
        }

        active.finalize(&mut self.gradients);
        self.flushes.push(LogicalFlush::new(frame.interlock_mode));
        self.last_generated_clip_id = 0;
        self.clip_content_id = 0;
        log::debug!("logical flush {} started", self.flushes.len() - 1);
    }

    /// Lay out, write and execute every logical flush of the frame.
    ///
    /// [`FlushType::EndOfFrame`] closes the frame. On error the frame is dropped.
    pub fn flush(&mut self, flush_type: FlushType) -> Result<FlushReport, RenderError> {
        if self.frame.is_none() {
            return Err(RenderError::FrameNotOpen);
        }

        let report = match self.execute_flushes(flush_type) {
            Ok(report) => report,
            Err(err) => {
                log::warn!("flush failed, dropping the frame: {err}");
                self.drop_frame();
                return Err(err);
            }
        };

        match flush_type {
            FlushType::EndOfFrame => {
                log::debug!("end frame after {} logical flushes", report.flushes.len());
                self.drop_frame();
            }
            FlushType::Intermediate => {
                if let Some(frame) = self.frame.as_mut() {
                    frame.load_action = LoadAction::Preserve;
                    self.flushes.push(LogicalFlush::new(frame.interlock_mode));
                }
                self.last_generated_clip_id = 0;
                self.clip_content_id = 0;
            }
        }

        Ok(report)
    }

    fn execute_flushes(&mut self, flush_type: FlushType) -> Result<FlushReport, RenderError> {
        let Some(frame) = self.frame.as_ref() else {
            return Err(RenderError::FrameNotOpen);
        };

        let mut flushes = std::mem::take(&mut self.flushes);
        if flushes.len() > 1 && flushes.last().is_some_and(LogicalFlush::is_empty) {
            flushes.pop();
        }

        if let Some(last) = flushes.last_mut() {
            last.finalize(&mut self.gradients);
        }

        let mut required = ResourceAllocationCounts::default();
        for flush in flushes.iter_mut() {
            flush.layout_resources(&mut required);
        }

        log::trace!("frame requires {required:?}");
        self.allocator.grow(&mut self.backend, &required)?;

        let mut mapped = MappedResources::map(&mut self.backend, &required)?;
        let mut descriptors: Vec<FlushDescriptor> = Vec::with_capacity(flushes.len());
        let mut report = FlushReport::default();
        let count = flushes.len();

        for (i, flush) in flushes.iter().enumerate() {
            let load_action = if i == 0 { frame.load_action } else { LoadAction::Preserve };
            let is_final = i + 1 == count && flush_type == FlushType::EndOfFrame;
            let (desc, summary) =
                flush.write_resources(&mut mapped, &frame.desc, load_action, &self.arena, &mut self.board, i, is_final);
            descriptors.push(desc);
            report.flushes.push(summary);
        }

        mapped.unmap(&mut self.backend);

        for desc in descriptors.iter() {
            self.backend.flush(desc)?;
            self.flush_count += 1;
        }

        Ok(report)
    }

    /// Discard the open frame and every draw pushed into it without flushing.
    pub fn drop_frame(&mut self) {
        self.frame = None;
        self.flushes.clear();
        self.gradients.clear();
        self.arena.reset();
        self.last_generated_clip_id = 0;
        self.clip_content_id = 0;
    }

    /// Release every GPU resource (back to `config.initial_allocation`).
    pub fn reset_gpu_resources(&mut self) -> Result<(), RenderError> {
        debug_assert!(self.frame.is_none(), "reset_gpu_resources inside a frame");
        let baseline = self.config.initial_allocation.unwrap_or_default();
        log::debug!("reset gpu resources");
        Ok(self.allocator.reset(&mut self.backend, baseline)?)
    }

    /// Shrink GPU resources to what recent frames used.
    pub fn shrink_gpu_resources_to_fit(&mut self) -> Result<(), RenderError> {
        debug_assert!(self.frame.is_none(), "shrink_gpu_resources_to_fit inside a frame");
        log::debug!("shrink gpu resources from {:?}", self.allocator.current());
        Ok(self.allocator.shrink_to_fit(&mut self.backend)?)
    }

    /// Paths pushed into the open frame so far.
    pub fn pending_path_count(&self) -> usize {
        self.flushes.iter().map(|x| x.counters().path_count).sum()
    }

    /// Logical flushes of the open frame, including the active one.
    pub fn logical_flush_count(&self) -> usize {
        self.flushes.len()
    }

    /// Logical flushes executed by the backend over the lifetime of the context.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn make_render_buffer(
        &mut self,
        kind: RenderBufferType,
        flags: RenderBufferFlags,
        size_in_bytes: usize,
    ) -> Result<RenderBuffer, RenderError> {
        Ok(self.backend.make_render_buffer(kind, flags, size_in_bytes)?)
    }

    pub fn map_render_buffer(&mut self, buffer: RenderBuffer) -> Result<&mut [u8], RenderError> {
        Ok(self.backend.map_render_buffer(buffer)?)
    }

    pub fn unmap_render_buffer(&mut self, buffer: RenderBuffer) {
        self.backend.unmap_render_buffer(buffer);
    }

    pub fn decode_image_texture(&mut self, encoded: &[u8]) -> Result<ImageTexture, RenderError> {
        Ok(self.backend.decode_image_texture(encoded)?)
    }

    pub fn make_image_texture(&mut self, data: ImageData) -> Result<ImageTexture, RenderError> {
        Ok(self.backend.make_image_texture(data)?)
    }
}

/// Largest clip ID `draws` read or write.
fn max_clip_id(draws: &[Draw]) -> u32 {
    draws
        .iter()
        .filter_map(Draw::paint)
        .map(|state| match state.paint {
            Paint::ClipUpdate { outer_clip_id } => state.clip_id.max(outer_clip_id),
            _ => state.clip_id,
        })
        .max()
        .unwrap_or(0)
}
