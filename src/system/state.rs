//! Per-frame processing state.

/// State of the frame processor.
///
/// Nothing is carried from one frame to the next: every synchronized pair
/// takes the processor from `Idle` to `Processing` and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessorState {
    /// Waiting for the next synchronized detection/depth pair.
    #[default]
    Idle,
    /// Segmenting, projecting and publishing the current pair.
    Processing,
}
