use crate::{MAX_PATH_ID, ResourceAllocationCounts};

/// Limits and initial sizes of a [`RenderContext`](crate::RenderContext).
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContextConfig {
    /// Largest path and clip ID a logical flush may use. Clamped to [`MAX_PATH_ID`].
    pub max_path_id: u32,
    /// Rows the gradient texture may grow to.
    pub max_gradient_texture_height: u32,
    /// Rows the tessellation texture may grow to.
    pub max_tessellation_texture_height: u32,
    /// Allocate these sizes up front instead of growing on the first frame.
    pub initial_allocation: Option<ResourceAllocationCounts>,
}

impl Default for RenderContextConfig {
    fn default() -> Self {
        Self {
            max_path_id: MAX_PATH_ID,
            max_gradient_texture_height: 2048,
            max_tessellation_texture_height: 2048,
            initial_allocation: None,
        }
    }
}

impl RenderContextConfig {
    pub fn with_max_path_id(mut self, max_path_id: u32) -> Self {
        self.max_path_id = max_path_id;
        self
    }

    pub fn with_max_gradient_texture_height(mut self, height: u32) -> Self {
        self.max_gradient_texture_height = height;
        self
    }

    pub fn with_max_tessellation_texture_height(mut self, height: u32) -> Self {
        self.max_tessellation_texture_height = height;
        self
    }

    /// The path ID limit actually in effect.
    pub fn path_id_limit(&self) -> u32 {
        self.max_path_id.clamp(1, MAX_PATH_ID)
    }
}
