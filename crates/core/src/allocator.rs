use crate::{
    Backend, BackendError, BufferKind, ByteWriter, GRAD_TEXTURE_WIDTH, GpuRecord, MappedBuffer, TESS_TEXTURE_WIDTH,
};
use std::marker::PhantomData;

/// Capacities of every GPU resource, in elements (buffers) or rows (textures).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceAllocationCounts {
    pub flush_uniform_buffer_count: usize,
    pub image_draw_uniform_buffer_count: usize,
    pub path_buffer_count: usize,
    pub paint_buffer_count: usize,
    pub paint_aux_buffer_count: usize,
    pub contour_buffer_count: usize,
    pub simple_gradient_buffer_count: usize,
    pub complex_gradient_span_buffer_count: usize,
    pub tessellation_span_buffer_count: usize,
    pub triangle_vertex_buffer_count: usize,
    pub gradient_texture_height: usize,
    pub tessellation_texture_height: usize,
}

impl ResourceAllocationCounts {
    pub const FIELDS: usize = BufferKind::COUNT + 2;

    const GRADIENT_TEXTURE: usize = BufferKind::COUNT;
    const TESSELLATION_TEXTURE: usize = BufferKind::COUNT + 1;

    /// The buffer counts in [`BufferKind`] order, followed by the two texture heights.
    pub fn to_array(&self) -> [usize; Self::FIELDS] {
        [
            self.flush_uniform_buffer_count,
            self.image_draw_uniform_buffer_count,
            self.path_buffer_count,
            self.paint_buffer_count,
            self.paint_aux_buffer_count,
            self.contour_buffer_count,
            self.simple_gradient_buffer_count,
            self.complex_gradient_span_buffer_count,
            self.tessellation_span_buffer_count,
            self.triangle_vertex_buffer_count,
            self.gradient_texture_height,
            self.tessellation_texture_height,
        ]
    }

    pub fn from_array(x: [usize; Self::FIELDS]) -> Self {
        Self {
            flush_uniform_buffer_count: x[0],
            image_draw_uniform_buffer_count: x[1],
            path_buffer_count: x[2],
            paint_buffer_count: x[3],
            paint_aux_buffer_count: x[4],
            contour_buffer_count: x[5],
            simple_gradient_buffer_count: x[6],
            complex_gradient_span_buffer_count: x[7],
            tessellation_span_buffer_count: x[8],
            triangle_vertex_buffer_count: x[9],
            gradient_texture_height: x[10],
            tessellation_texture_height: x[11],
        }
    }

    pub fn buffer_count(&self, kind: BufferKind) -> usize {
        self.to_array()[kind.index()]
    }

    /// Element-wise maximum.
    pub fn max(&self, other: &Self) -> Self {
        let (a, b) = (self.to_array(), other.to_array());
        Self::from_array(std::array::from_fn(|i| a[i].max(b[i])))
    }

    /// Does every capacity cover `required`?
    pub fn covers(&self, required: &Self) -> bool {
        self.to_array().iter().zip(required.to_array()).all(|(have, need)| *have >= need)
    }
}

/// Tracks GPU resource capacities and resizes backend resources when they change.
///
/// Resources grow with 25% headroom and are only shrunk on request, to what was recently used.
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    current: ResourceAllocationCounts,
    max_recent: ResourceAllocationCounts,
}

impl ResourceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &ResourceAllocationCounts {
        &self.current
    }

    /// Largest requirement seen since the last shrink.
    pub fn max_recent(&self) -> &ResourceAllocationCounts {
        &self.max_recent
    }

    /// Make sure every resource covers `required`. Only resources that are too small are resized.
    pub fn grow<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        required: &ResourceAllocationCounts,
    ) -> Result<(), BackendError> {
        self.max_recent = self.max_recent.max(required);

        let current = self.current.to_array();
        let required = required.to_array();
        let target = std::array::from_fn(|i| {
            if required[i] > current[i] {
                required[i] * 5 / 4
            } else {
                current[i]
            }
        });

        self.apply(backend, ResourceAllocationCounts::from_array(target), false)
    }

    /// Shrink resources that are well above what was used since the last shrink.
    pub fn shrink_to_fit<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<(), BackendError> {
        let current = self.current.to_array();
        let recent = self.max_recent.to_array();
        let target = std::array::from_fn(|i| {
            if recent[i] <= current[i] * 2 / 3 {
                recent[i] * 5 / 4
            } else {
                current[i]
            }
        });

        self.max_recent = ResourceAllocationCounts::default();
        self.apply(backend, ResourceAllocationCounts::from_array(target), false)
    }

    /// Release everything, or allocate exactly `baseline`.
    pub fn reset<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        baseline: ResourceAllocationCounts,
    ) -> Result<(), BackendError> {
        self.max_recent = ResourceAllocationCounts::default();
        self.apply(backend, baseline, true)
    }

    fn apply<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        target: ResourceAllocationCounts,
        force: bool,
    ) -> Result<(), BackendError> {
        let current = self.current.to_array();
        let target = target.to_array();

        for (i, kind) in BufferKind::ALL.into_iter().enumerate() {
            if force || target[i] != current[i] {
                log::debug!("resize {kind:?}: {} -> {}", current[i], target[i]);
                backend.resize_buffer(kind, target[i] * kind.element_size(), kind.structure())?;
                self.set(i, target[i]);
            }
        }

        let i = ResourceAllocationCounts::GRADIENT_TEXTURE;
        if force || target[i] != current[i] {
            log::debug!("resize gradient texture: {} -> {} rows", current[i], target[i]);
            backend.resize_gradient_texture(GRAD_TEXTURE_WIDTH, target[i] as u32)?;
            self.set(i, target[i]);
        }

        let i = ResourceAllocationCounts::TESSELLATION_TEXTURE;
        if force || target[i] != current[i] {
            log::debug!("resize tessellation texture: {} -> {} rows", current[i], target[i]);
            backend.resize_tessellation_texture(TESS_TEXTURE_WIDTH, target[i] as u32)?;
            self.set(i, target[i]);
        }

        Ok(())
    }

    fn set(&mut self, i: usize, value: usize) {
        let mut counts = self.current.to_array();
        counts[i] = value;
        self.current = ResourceAllocationCounts::from_array(counts);
    }
}

/// Every per-frame buffer, mapped for writing.
///
/// Buffers with nothing to write are not mapped and hold no bytes.
#[derive(Debug)]
pub struct MappedResources {
    pub flush_uniforms: MappedBuffer,
    pub image_draw_uniforms: MappedBuffer,
    pub paths: MappedBuffer,
    pub paints: MappedBuffer,
    pub paint_aux: MappedBuffer,
    pub contours: MappedBuffer,
    pub simple_gradients: MappedBuffer,
    pub complex_gradient_spans: MappedBuffer,
    pub tess_spans: MappedBuffer,
    pub triangle_vertices: MappedBuffer,
}

impl MappedResources {
    /// Map the first `counts[kind]` elements of every buffer.
    ///
    /// On failure the buffers mapped so far are unmapped again.
    pub fn map<B: Backend + ?Sized>(backend: &mut B, counts: &ResourceAllocationCounts) -> Result<Self, BackendError> {
        let mut mapped: Vec<MappedBuffer> = Vec::with_capacity(BufferKind::COUNT);

        for kind in BufferKind::ALL {
            let size = counts.buffer_count(kind) * kind.element_size();
            if size == 0 {
                mapped.push(MappedBuffer::new(kind, Vec::new()));
                continue;
            }

            match backend.map_buffer(kind, size) {
                Ok(buffer) => mapped.push(buffer),
                Err(err) => {
                    for buffer in mapped {
                        if !buffer.bytes.is_empty() {
                            backend.unmap_buffer(buffer);
                        }
                    }
                    return Err(err);
                }
            }
        }

        let mut mapped = mapped.into_iter();
        let mut next = || mapped.next().unwrap_or_else(|| MappedBuffer::new(BufferKind::FlushUniform, Vec::new()));

        Ok(Self {
            flush_uniforms: next(),
            image_draw_uniforms: next(),
            paths: next(),
            paints: next(),
            paint_aux: next(),
            contours: next(),
            simple_gradients: next(),
            complex_gradient_spans: next(),
            tess_spans: next(),
            triangle_vertices: next(),
        })
    }

    /// Hand every mapped buffer back to the backend.
    pub fn unmap<B: Backend + ?Sized>(self, backend: &mut B) {
        for buffer in [
            self.flush_uniforms,
            self.image_draw_uniforms,
            self.paths,
            self.paints,
            self.paint_aux,
            self.contours,
            self.simple_gradients,
            self.complex_gradient_spans,
            self.tess_spans,
            self.triangle_vertices,
        ] {
            if !buffer.bytes.is_empty() {
                backend.unmap_buffer(buffer);
            }
        }
    }
}

/// Appends records of one type to a mapped buffer, starting at a given element.
pub struct RecordSink<'a, T> {
    bytes: &'a mut [u8],
    next: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: GpuRecord> RecordSink<'a, T> {
    pub fn new(buffer: &'a mut MappedBuffer, first: usize) -> Self {
        Self {
            bytes: &mut buffer.bytes,
            next: first,
            _marker: PhantomData,
        }
    }

    /// Write a record, returning its element index.
    pub fn push(&mut self, record: &T) -> usize {
        let index = self.next;
        debug_assert!(
            (index + 1) * T::BYTES <= self.bytes.len(),
            "record {index} past the end of a {} byte buffer",
            self.bytes.len()
        );

        if (index + 1) * T::BYTES <= self.bytes.len() {
            record.write(&mut ByteWriter::at::<T>(self.bytes, index));
        }

        self.next += 1;
        index
    }

    /// Index the next record will be written at.
    pub fn next_index(&self) -> usize {
        self.next
    }
}
