use std::borrow::Cow;
use std::ops::Range;

use slotmap::SlotMap;
use xi_rope::delta::{Builder, Transformer};
use xi_rope::{Delta, LinesMetric, Rope, RopeInfo};

use crate::buffer::{AnchorBuffer, AnchorId, Bias, BufferError, Patch};

/// Stored state of one anchor: its byte offset in the rope and its bias
#[derive(Debug, Clone, Copy, PartialEq)]
struct AnchorSlot {
    offset: usize,
    bias: Bias,
    /// End anchor of the range this anchor starts, if any
    until: Option<AnchorId>,
}

/// xi-rope backed text buffer with edit-stable anchors
///
/// Every edit is compiled into an xi-rope `Delta`. After the delta is applied
/// to the rope, each live anchor is pushed through a `Transformer` built from
/// the same delta, so an anchor inside deleted text lands on the deletion
/// point.
#[derive(Clone)]
pub struct TextBuffer {
    rope: Rope,
    anchors: SlotMap<AnchorId, AnchorSlot>,
    len_chars: usize,
    version: u64,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::from("")
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self {
            rope: Rope::from(text),
            anchors: SlotMap::with_key(),
            len_chars: text.chars().count(),
            version: 0,
        }
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("len_chars", &self.len_chars)
            .field("anchors", &self.anchors.len())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl TextBuffer {
    /// Create a buffer from raw bytes, rejecting invalid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::from(text))
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.len_chars == 0
    }

    /// Number of live anchors
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Text between two character offsets
    pub fn slice(&self, range: Range<usize>) -> Result<Cow<'_, str>, BufferError> {
        let bytes = self.byte_range(range)?;
        Ok(self.rope.slice_to_cow(bytes))
    }

    pub fn insert(&mut self, at: usize, text: &str) -> Result<Patch, BufferError> {
        self.replace(at..at, text)
    }

    pub fn delete(&mut self, range: Range<usize>) -> Result<Patch, BufferError> {
        self.replace(range, "")
    }

    /// Replace a character range with new text
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Result<Patch, BufferError> {
        let bytes = self.byte_range(range.clone())?;
        let removed = range.end - range.start;
        let inserted = text.chars().count();

        if bytes.is_empty() && text.is_empty() {
            return Ok(Patch {
                changed: range.start..range.start,
                removed: 0,
                version: self.version,
            });
        }

        let mut builder = Builder::new(self.rope.len());
        if text.is_empty() {
            builder.delete(bytes);
        } else {
            builder.replace(bytes, Rope::from(text));
        }
        let delta = builder.build();

        self.rope = delta.apply(&self.rope);
        self.transform_anchors(&delta);
        self.len_chars = self.len_chars - removed + inserted;
        self.version += 1;

        log::debug!(
            "buffer v{}: replaced {} chars at {} with {} chars",
            self.version,
            removed,
            range.start,
            inserted
        );

        Ok(Patch {
            changed: range.start..range.start + inserted,
            removed,
            version: self.version,
        })
    }

    /// Drop an anchor; its id resolves to `ReleasedAnchor` from now on
    pub fn release(&mut self, id: AnchorId) -> Result<(), BufferError> {
        self.anchors
            .remove(id)
            .map(|_| ())
            .ok_or(BufferError::ReleasedAnchor(id))
    }

    /// Number of lines; a trailing newline starts a final empty line
    pub fn line_count(&self) -> usize {
        self.rope.measure::<LinesMetric>() + 1
    }

    /// Text of a line without its terminator, `None` past the last line
    pub fn line(&self, line: usize) -> Option<String> {
        if line >= self.line_count() {
            return None;
        }
        let start = self.rope.offset_of_line(line);
        let end = self.rope.offset_of_line(line + 1);
        let text = self.rope.slice_to_cow(start..end);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let text = text.strip_suffix('\r').unwrap_or(text);
        Some(text.to_string())
    }

    /// Zero-based line containing a character offset
    pub fn line_of(&self, offset: usize) -> Result<usize, BufferError> {
        let byte = self.char_to_byte(offset)?;
        Ok(self.rope.line_of_offset(byte))
    }

    fn transform_anchors(&mut self, delta: &Delta<RopeInfo>) {
        let mut transformer = Transformer::new(delta);
        let len = self.rope.len();

        for anchor in self.anchors.values_mut() {
            // Right-biased anchors jump over text inserted exactly at them
            let after = anchor.bias == Bias::Right;
            anchor.offset = transformer.transform(anchor.offset, after).min(len);
        }

        // Once a range's text is gone its ends sit together, and an insert
        // there would push the right-biased start past the left-biased end
        let inverted = self
            .anchors
            .iter()
            .filter_map(|(id, slot)| {
                let end = self.anchors.get(slot.until?)?.offset;
                (slot.offset > end).then_some((id, end))
            })
            .collect::<Vec<_>>();
        for (id, end) in inverted {
            if let Some(slot) = self.anchors.get_mut(id) {
                slot.offset = end;
            }
        }
    }

    fn byte_range(&self, range: Range<usize>) -> Result<Range<usize>, BufferError> {
        if range.start > range.end {
            return Err(BufferError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        let start = self.char_to_byte(range.start)?;
        let end = self.char_to_byte(range.end)?;
        Ok(start..end)
    }

    fn char_to_byte(&self, offset: usize) -> Result<usize, BufferError> {
        if offset > self.len_chars {
            return Err(BufferError::OutOfBounds {
                offset,
                len: self.len_chars,
            });
        }

        let mut chars_seen = 0;
        let mut bytes_seen = 0;
        for chunk in self.rope.iter_chunks(0..self.rope.len()) {
            let chunk_chars = chunk.chars().count();
            if chars_seen + chunk_chars >= offset {
                let within = offset - chars_seen;
                let byte_in_chunk = chunk
                    .char_indices()
                    .nth(within)
                    .map(|(index, _)| index)
                    .unwrap_or(chunk.len());
                return Ok(bytes_seen + byte_in_chunk);
            }
            chars_seen += chunk_chars;
            bytes_seen += chunk.len();
        }

        Ok(self.rope.len())
    }

    fn byte_to_char(&self, byte: usize) -> usize {
        let byte = byte.min(self.rope.len());
        self.rope.slice_to_cow(0..byte).chars().count()
    }
}

impl AnchorBuffer for TextBuffer {
    fn len_chars(&self) -> usize {
        self.len_chars
    }

    fn create_anchor(&mut self, offset: usize, bias: Bias) -> Result<AnchorId, BufferError> {
        let byte = self.char_to_byte(offset)?;
        Ok(self.anchors.insert(AnchorSlot {
            offset: byte,
            bias,
            until: None,
        }))
    }

    fn create_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(AnchorId, AnchorId), BufferError> {
        let bytes = self.byte_range(start..end)?;
        // A cursor range keeps both ends on the same side of new text
        let end_bias = if bytes.is_empty() {
            Bias::Right
        } else {
            Bias::Left
        };
        let end_id = self.anchors.insert(AnchorSlot {
            offset: bytes.end,
            bias: end_bias,
            until: None,
        });
        let start_id = self.anchors.insert(AnchorSlot {
            offset: bytes.start,
            bias: Bias::Right,
            until: Some(end_id),
        });
        Ok((start_id, end_id))
    }

    fn resolve(&self, id: AnchorId) -> Result<usize, BufferError> {
        let slot = self
            .anchors
            .get(id)
            .ok_or(BufferError::ReleasedAnchor(id))?;
        Ok(self.byte_to_char(slot.offset))
    }
}
