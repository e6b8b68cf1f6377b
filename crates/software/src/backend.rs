use crate::{
    buffer::Buffer,
    dispatch::Dispatcher,
    records::FlushRecords,
    scene::{SceneBuilder, SceneResources},
    texture::{TessellationTexture, render_gradients},
};
use bumpalo::Bump;
use plsdraw_core::{
    Backend, BackendError, BufferKind, BufferStructure, FlushDescriptor, ImageData, ImageFormat, ImageTexture,
    LoadAction, MappedBuffer, PlatformFeatures, RenderBuffer, RenderBufferFlags, RenderBufferType, RenderTarget, Size,
};
use slotmap::{DefaultKey, Key, KeyData, SlotMap};

pub struct RenderBufferStorage {
    pub kind: RenderBufferType,
    pub flags: RenderBufferFlags,
    pub bytes: Vec<u8>,
    pub mapped: bool,
}

/// A [`Backend`] that rasterizes flushes on the cpu into [`Buffer`] render targets.
pub struct SoftwareBackend {
    features: PlatformFeatures,

    buffers: [Vec<u8>; BufferKind::COUNT],
    sizes: [usize; BufferKind::COUNT],
    mapped: [bool; BufferKind::COUNT],

    gradient_texture: Buffer,
    tessellation: TessellationTexture,

    targets: SlotMap<DefaultKey, Buffer>,
    images: SlotMap<DefaultKey, Buffer>,
    render_buffers: SlotMap<DefaultKey, RenderBufferStorage>,

    arena: Bump,
    flush_count: usize,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// A backend that orders overlapping fragments, like a gpu with raster ordering.
    pub fn new() -> Self {
        Self::with_features(PlatformFeatures {
            supports_raster_ordering: true,
        })
    }

    /// A backend that makes the core fall back to atomic mode.
    pub fn atomics_only() -> Self {
        Self::with_features(PlatformFeatures {
            supports_raster_ordering: false,
        })
    }

    pub fn with_features(features: PlatformFeatures) -> Self {
        Self {
            features,
            buffers: Default::default(),
            sizes: [0; BufferKind::COUNT],
            mapped: [false; BufferKind::COUNT],
            gradient_texture: Buffer::default(),
            tessellation: TessellationTexture::default(),
            targets: SlotMap::new(),
            images: SlotMap::new(),
            render_buffers: SlotMap::new(),
            arena: Bump::new(),
            flush_count: 0,
        }
    }

    pub fn make_render_target(&mut self, size: Size) -> RenderTarget {
        let key = self.targets.insert(Buffer::new(size.width as usize, size.height as usize));
        RenderTarget {
            id: key.data().as_ffi(),
            size,
        }
    }

    pub fn render_target(&self, target: RenderTarget) -> Option<&Buffer> {
        self.targets.get(KeyData::from_ffi(target.id).into())
    }

    pub fn render_target_mut(&mut self, target: RenderTarget) -> Option<&mut Buffer> {
        self.targets.get_mut(KeyData::from_ffi(target.id).into())
    }

    pub fn delete_render_target(&mut self, target: RenderTarget) -> bool {
        self.targets.remove(KeyData::from_ffi(target.id).into()).is_some()
    }

    pub fn delete_image_texture(&mut self, texture: ImageTexture) -> bool {
        self.images.remove(KeyData::from_ffi(texture.0).into()).is_some()
    }

    pub fn delete_render_buffer(&mut self, buffer: RenderBuffer) -> bool {
        self.render_buffers.remove(KeyData::from_ffi(buffer.0).into()).is_some()
    }

    /// Allocated size of a per-frame buffer, in bytes.
    pub fn buffer_size(&self, kind: BufferKind) -> usize {
        self.sizes[kind.index()]
    }

    /// Logical flushes executed so far.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    fn insert_image(&mut self, buffer: Buffer) -> ImageTexture {
        ImageTexture(self.images.insert(buffer).data().as_ffi())
    }
}

impl Backend for SoftwareBackend {
    fn platform_features(&self) -> PlatformFeatures {
        self.features
    }

    fn resize_buffer(
        &mut self,
        kind: BufferKind,
        size_in_bytes: usize,
        _structure: BufferStructure,
    ) -> Result<(), BackendError> {
        let buffer = &mut self.buffers[kind.index()];
        buffer.clear();
        buffer.shrink_to(size_in_bytes);
        buffer
            .try_reserve_exact(size_in_bytes)
            .map_err(|_| BackendError::AllocationFailed {
                what: "buffer",
                size: size_in_bytes,
            })?;
        buffer.resize(size_in_bytes, 0);
        self.sizes[kind.index()] = size_in_bytes;
        Ok(())
    }

    fn map_buffer(&mut self, kind: BufferKind, size_in_bytes: usize) -> Result<MappedBuffer, BackendError> {
        let index = kind.index();
        if self.mapped[index] {
            return Err(BackendError::AlreadyMapped { kind });
        }

        if size_in_bytes > self.sizes[index] {
            return Err(BackendError::MapOutOfRange {
                kind,
                requested: size_in_bytes,
                allocated: self.sizes[index],
            });
        }

        let mut bytes = std::mem::take(&mut self.buffers[index]);
        bytes.truncate(size_in_bytes);
        self.mapped[index] = true;
        Ok(MappedBuffer::new(kind, bytes))
    }

    fn unmap_buffer(&mut self, buffer: MappedBuffer) {
        let index = buffer.kind.index();
        if !self.mapped[index] {
            log::warn!("unmapping {:?}, which is not mapped", buffer.kind);
        }

        self.buffers[index] = buffer.bytes;
        self.mapped[index] = false;
    }

    fn resize_gradient_texture(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        log::trace!("gradient texture {width}x{height}");
        self.gradient_texture.resize(width as usize, height as usize);
        Ok(())
    }

    fn resize_tessellation_texture(&mut self, _width: u32, height: u32) -> Result<(), BackendError> {
        log::trace!("tessellation texture height {height}");
        self.tessellation.resize(height);
        Ok(())
    }

    fn make_render_buffer(
        &mut self,
        kind: RenderBufferType,
        flags: RenderBufferFlags,
        size_in_bytes: usize,
    ) -> Result<RenderBuffer, BackendError> {
        let key = self.render_buffers.insert(RenderBufferStorage {
            kind,
            flags,
            bytes: vec![0; size_in_bytes],
            mapped: false,
        });
        Ok(RenderBuffer(key.data().as_ffi()))
    }

    fn map_render_buffer(&mut self, buffer: RenderBuffer) -> Result<&mut [u8], BackendError> {
        let storage = self
            .render_buffers
            .get_mut(KeyData::from_ffi(buffer.0).into())
            .ok_or(BackendError::UnknownHandle {
                what: "render buffer",
                id: buffer.0,
            })?;

        if storage.flags.contains(RenderBufferFlags::MAPPED_ONCE_AT_INITIALIZATION) && storage.mapped {
            log::warn!("{:?} render buffer {:#x} is mapped more than once", storage.kind, buffer.0);
        }

        storage.mapped = true;
        Ok(&mut storage.bytes)
    }

    fn unmap_render_buffer(&mut self, _buffer: RenderBuffer) {}

    fn decode_image_texture(&mut self, encoded: &[u8]) -> Result<ImageTexture, BackendError> {
        let image = image::load_from_memory(encoded)
            .map_err(|err| BackendError::ImageDecode(err.to_string()))?
            .to_rgba8();

        let buffer = Buffer::try_from(ImageData {
            width: image.width(),
            height: image.height(),
            format: ImageFormat::RGBA8,
            data: image.as_raw(),
        })?;

        Ok(self.insert_image(buffer))
    }

    fn make_image_texture(&mut self, data: ImageData) -> Result<ImageTexture, BackendError> {
        let buffer = Buffer::try_from(data)?;
        Ok(self.insert_image(buffer))
    }

    fn flush(&mut self, desc: &FlushDescriptor) -> Result<(), BackendError> {
        let target_key = KeyData::from_ffi(desc.render_target.id).into();
        let Some(target) = self.targets.get_mut(target_key) else {
            return Err(BackendError::UnknownHandle {
                what: "render target",
                id: desc.render_target.id,
            });
        };

        if desc.load_action == LoadAction::Clear {
            target.fill(desc.clear_color);
        }

        let records = FlushRecords::new(&self.buffers, desc);
        render_gradients(&mut self.gradient_texture, &records);
        self.tessellation.write_spans(&records);

        let mut dispatcher = Dispatcher::new(&self.arena);
        let mut scene = SceneBuilder::new(
            &self.arena,
            records,
            SceneResources {
                tessellation: &self.tessellation,
                gradients: self.gradient_texture.as_ref(),
                images: &self.images,
                render_buffers: &self.render_buffers,
            },
        );

        for batch in desc.draw_list.iter() {
            scene.push_batch(batch)?;
        }
        scene.finish(&mut dispatcher)?;

        log::debug!(
            "software flush {} ({:?}): {} batches, {} objects",
            desc.flush_index,
            desc.interlock_mode,
            desc.draw_list.len(),
            dispatcher.len()
        );

        dispatcher.dispatch(target.as_mut());

        self.arena.reset();
        self.flush_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_map_checks() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut backend = SoftwareBackend::new();
        backend.resize_buffer(BufferKind::Path, 64, BufferStructure::Storage).unwrap();

        assert!(matches!(
            backend.map_buffer(BufferKind::Path, 128),
            Err(BackendError::MapOutOfRange { requested: 128, allocated: 64, .. })
        ));

        let mut mapped = backend.map_buffer(BufferKind::Path, 32).unwrap();
        assert_eq!(mapped.bytes.len(), 32);
        assert!(matches!(
            backend.map_buffer(BufferKind::Path, 32),
            Err(BackendError::AlreadyMapped { kind: BufferKind::Path })
        ));

        mapped.bytes[0] = 7;
        backend.unmap_buffer(mapped);
        assert_eq!(backend.buffers[BufferKind::Path.index()][0], 7);
        assert!(backend.map_buffer(BufferKind::Path, 64).is_ok());
    }

    #[test]
    fn test_handles() {
        let mut backend = SoftwareBackend::new();
        let target = backend.make_render_target(Size { width: 4, height: 2 });
        assert_eq!(backend.render_target(target).map(Buffer::width), Some(4));

        let image = backend
            .make_image_texture(ImageData {
                width: 1,
                height: 1,
                format: ImageFormat::RGBA8,
                data: &[1, 2, 3, 4],
            })
            .unwrap();
        assert!(backend.delete_image_texture(image));
        assert!(!backend.delete_image_texture(image));

        let buffer = backend
            .make_render_buffer(RenderBufferType::Vertex, RenderBufferFlags::empty(), 16)
            .unwrap();
        assert_eq!(backend.map_render_buffer(buffer).unwrap().len(), 16);
        assert!(backend.delete_render_buffer(buffer));
        assert!(matches!(
            backend.map_render_buffer(buffer),
            Err(BackendError::UnknownHandle { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut backend = SoftwareBackend::new();
        assert!(matches!(
            backend.decode_image_texture(b"not an image"),
            Err(BackendError::ImageDecode(_))
        ));
    }

    #[test]
    fn test_flush_unknown_target() {
        let mut backend = SoftwareBackend::new();
        let target = backend.make_render_target(Size { width: 1, height: 1 });
        backend.delete_render_target(target);

        let desc = FlushDescriptor {
            render_target: target,
            ..Default::default()
        };
        assert!(matches!(
            backend.flush(&desc),
            Err(BackendError::UnknownHandle { what: "render target", .. })
        ));
    }
}
