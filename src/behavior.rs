//! Overwrite semantics for `Fifo`.

/// Tagging trait for providing behaviors to `Fifo`.
pub trait Behavior {
    /// Whether a write to a full fifo replaces the oldest byte.
    #[doc(hidden)]
    const OVERWRITE: bool;
}

/// Behavior for `Fifo` that specifies wrapping write semantics.
///
/// Writing to a fifo that **has already reached its capacity** stores the new
/// byte over the **oldest** one. The oldest byte is lost and the write
/// succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wrapping;
impl Behavior for Wrapping {
    const OVERWRITE: bool = true;
}

/// Behavior for `Fifo` that specifies saturating write semantics.
///
/// Writing to a fifo that **has already reached its capacity** fails with
/// `Error::BufferFull` **without performing any mutation**.
#[derive(Clone, Copy, Debug, Default)]
pub struct Saturating;
impl Behavior for Saturating {
    const OVERWRITE: bool = false;
}
