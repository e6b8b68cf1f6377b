use crate::{DrawBatch, DrawType, ImageMeshBuffers, ImageTexture, ShaderFeatures};

/// Builds the draw list of a logical flush, merging consecutive compatible draws into one batch.
///
/// Draws merge when they have the same type and texture, their element ranges are contiguous and
/// no barrier separates them. Image draws never merge.
#[derive(Debug, Default)]
pub struct DrawBatcher {
    batches: Vec<DrawBatch>,
    combined_features: ShaderFeatures,
    pending_barrier: bool,
}

impl DrawBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `element_count` elements starting at `base_element`.
    pub fn push(
        &mut self,
        draw_type: DrawType,
        base_element: u32,
        element_count: u32,
        features: ShaderFeatures,
        image_texture: Option<ImageTexture>,
    ) {
        if element_count == 0 {
            return;
        }

        self.combined_features |= features;

        if !self.pending_barrier
            && let Some(last) = self.batches.last_mut()
            && last.draw_type == draw_type
            && Self::can_merge(draw_type)
            && last.image_texture == image_texture
            && last.base_element + last.element_count == base_element
        {
            last.element_count += element_count;
            last.shader_features |= features;
            return;
        }

        let mut batch = DrawBatch::new(draw_type, base_element);
        batch.element_count = element_count;
        batch.shader_features = features;
        batch.image_texture = image_texture;
        self.push_batch(batch);
    }

    /// Every batch pushed after this one waits for every batch pushed before it.
    pub fn push_barrier(&mut self) {
        if !self.batches.is_empty() {
            self.pending_barrier = true;
        }
    }

    pub fn push_image_rect(&mut self, texture: ImageTexture, image_draw_index: u32, features: ShaderFeatures) {
        self.combined_features |= features;

        let mut batch = DrawBatch::new(DrawType::ImageRect, 0);
        batch.element_count = 1;
        batch.shader_features = features;
        batch.image_texture = Some(texture);
        batch.image_draw_index = image_draw_index;
        self.push_batch(batch);
    }

    pub fn push_image_mesh(
        &mut self,
        texture: ImageTexture,
        mesh: ImageMeshBuffers,
        index_count: u32,
        image_draw_index: u32,
        features: ShaderFeatures,
    ) {
        self.combined_features |= features;

        let mut batch = DrawBatch::new(DrawType::ImageMesh, 0);
        batch.element_count = index_count;
        batch.shader_features = features;
        batch.image_texture = Some(texture);
        batch.image_draw_index = image_draw_index;
        batch.mesh = Some(mesh);
        self.push_batch(batch);
    }

    /// Resolve accumulated coverage into the render target. Always waits for the batches before it.
    pub fn push_atomic_resolve(&mut self) {
        let mut batch = DrawBatch::new(DrawType::AtomicResolve, 0);
        batch.element_count = 1;
        batch.shader_features = self.combined_features;
        batch.needs_barrier = !self.batches.is_empty();
        self.pending_barrier = false;
        self.batches.push(batch);
    }

    fn push_batch(&mut self, mut batch: DrawBatch) {
        batch.needs_barrier = std::mem::take(&mut self.pending_barrier);
        self.batches.push(batch);
    }

    fn can_merge(draw_type: DrawType) -> bool {
        matches!(
            draw_type,
            DrawType::MidpointFanPatches | DrawType::OuterCurvePatches | DrawType::InteriorTriangulation
        )
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn combined_features(&self) -> ShaderFeatures {
        self.combined_features
    }

    pub fn finish(self) -> (Vec<DrawBatch>, ShaderFeatures) {
        (self.batches, self.combined_features)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_contiguous_draws_merge() {
        let mut batcher = DrawBatcher::new();
        batcher.push(DrawType::MidpointFanPatches, 0, 2, ShaderFeatures::empty(), None);
        batcher.push(DrawType::MidpointFanPatches, 2, 3, ShaderFeatures::ENABLE_CLIPPING, None);
        batcher.push(DrawType::MidpointFanPatches, 5, 1, ShaderFeatures::ENABLE_EVEN_ODD, None);

        let (batches, features) = batcher.finish();
        assert_eq!(batches.len(), 1);
        assert_eq!((batches[0].base_element, batches[0].element_count), (0, 6));
        assert_eq!(features, ShaderFeatures::ENABLE_CLIPPING | ShaderFeatures::ENABLE_EVEN_ODD);
        assert_eq!(batches[0].shader_features, features);
    }

    #[test]
    fn test_breaks() {
        let mut batcher = DrawBatcher::new();
        let none = ShaderFeatures::empty();
        batcher.push(DrawType::MidpointFanPatches, 0, 2, none, None);
        // Not contiguous.
        batcher.push(DrawType::MidpointFanPatches, 4, 2, none, None);
        // Different type.
        batcher.push(DrawType::OuterCurvePatches, 0, 1, none, None);
        // Different texture.
        batcher.push(DrawType::OuterCurvePatches, 1, 1, none, Some(ImageTexture(3)));
        // Barrier.
        batcher.push_barrier();
        batcher.push(DrawType::OuterCurvePatches, 2, 1, none, Some(ImageTexture(3)));
        batcher.push(DrawType::OuterCurvePatches, 3, 0, none, None);

        let (batches, _) = batcher.finish();
        assert_eq!(batches.len(), 5);
        assert!(batches[4].needs_barrier);
        assert!(batches[..4].iter().all(|b| !b.needs_barrier));
    }

    #[test]
    fn test_images_never_merge() {
        let mut batcher = DrawBatcher::new();
        batcher.push_image_rect(ImageTexture(1), 0, ShaderFeatures::empty());
        batcher.push_image_rect(ImageTexture(1), 1, ShaderFeatures::empty());

        let (batches, _) = batcher.finish();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].image_draw_index, 1);
    }

    #[test]
    fn test_atomic_resolve_waits() {
        let mut batcher = DrawBatcher::new();
        batcher.push_barrier();
        batcher.push(DrawType::MidpointFanPatches, 0, 1, ShaderFeatures::ENABLE_CLIPPING, None);
        batcher.push_atomic_resolve();

        let (batches, _) = batcher.finish();
        assert!(!batches[0].needs_barrier);
        assert_eq!(batches[1].draw_type, DrawType::AtomicResolve);
        assert!(batches[1].needs_barrier);
        assert_eq!(batches[1].shader_features, ShaderFeatures::ENABLE_CLIPPING);
    }
}
