/// Result of applying an edit to a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Character range holding the replacement text, in post-edit coordinates
    pub changed: std::ops::Range<usize>,
    /// Number of characters removed by the edit
    pub removed: usize,
    pub version: u64,
}
