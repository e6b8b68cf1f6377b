use crate::BackendError;
use thiserror::Error;

/// Errors surfaced by [`RenderContext`](crate::RenderContext).
///
/// Resource exhaustion is not an error: it is reported through `bool`/`Option` returns so the caller
/// can start a new logical flush and retry.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The backend failed. The frame has been dropped.
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    /// A draw batch does not fit even into an empty logical flush.
    #[error("draw batch of {draws} draws does not fit into an empty logical flush")]
    DrawBatchTooLarge { draws: usize },

    #[error("no frame is open")]
    FrameNotOpen,
}
