/*!
 * # Anchor Buffer
 *
 * A mutable text container that can mint **anchors**: stable handles whose
 * resolved offset follows the text they were placed next to, no matter what
 * edits happen elsewhere in the document.
 *
 * ## Units
 *
 * Every offset crossing this module's public surface is counted in
 * characters (Unicode scalar values). The xi-rope storage underneath works
 * in UTF-8 bytes; conversion happens only inside [`TextBuffer`].
 *
 * ## Handles
 *
 * [`AnchorId`] is a generational slot key rather than a reference into
 * storage. Holders only ever look anchors up; rope reallocation or anchor
 * table growth never invalidates an id, and a released id can never alias a
 * newer anchor that reuses the same slot.
 *
 * ## Usage Pattern
 *
 * ```rust
 * use anchorage_engine::buffer::{AnchorBuffer, Bias, TextBuffer};
 *
 * let mut buffer = TextBuffer::from("hello world");
 * let anchor = buffer.create_anchor(6, Bias::Right).unwrap();
 *
 * buffer.insert(0, ">> ").unwrap();
 *
 * assert_eq!(buffer.resolve(anchor).unwrap(), 9);
 * ```
 */

pub mod patch;
pub mod text;

pub use patch::Patch;
pub use text::TextBuffer;

slotmap::new_key_type! {
    /// Generational handle to an anchor owned by a buffer
    pub struct AnchorId;
}

/// Which side of an insertion made exactly at an anchor the anchor ends up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bias {
    /// Text inserted at the anchor lands after it; the anchor stays put
    Left,
    /// Text inserted at the anchor lands before it; the anchor moves forward
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("Offset {offset} is outside the buffer (length {len})")]
    OutOfBounds { offset: usize, len: usize },
    #[error("Invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
    #[error("Anchor {0:?} has been released")]
    ReleasedAnchor(AnchorId),
}

/// The contract consumers rely on to keep positions stable across edits.
///
/// Implementations own their anchors; callers hold [`AnchorId`]s and resolve
/// them on demand. `resolve` must never return an offset beyond
/// [`AnchorBuffer::len_chars`], and an anchor whose surrounding text was
/// deleted collapses onto the deletion point instead of disappearing.
pub trait AnchorBuffer {
    /// Buffer length in characters
    fn len_chars(&self) -> usize;

    /// Place a new anchor at a character offset
    fn create_anchor(&mut self, offset: usize, bias: Bias) -> Result<AnchorId, BufferError>;

    /// Anchor both ends of a range.
    ///
    /// The start never resolves past the end. Once the text between them is
    /// deleted the range stays collapsed at the deletion point, even when new
    /// text is later inserted right there.
    fn create_range(&mut self, start: usize, end: usize)
    -> Result<(AnchorId, AnchorId), BufferError>;

    /// Current character offset of an anchor
    fn resolve(&self, id: AnchorId) -> Result<usize, BufferError>;
}
