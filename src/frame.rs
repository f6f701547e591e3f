//! Newline-delimited frame reassembly.
//!
//! The response body is a sequence of frames separated by `\n`:
//! ```text
//! data: {"type": "id", "id": "abc123"}
//! data: {"answer": "Hel"}
//! data: {"type": "end"}
//! ```
//! Deliveries do not respect frame boundaries, so the incomplete tail of
//! each delivery is carried over and prepended to the next one.

/// Splits decoded text into complete frames, carrying the trailing
/// incomplete piece across deliveries.
///
/// # Example
/// ```
/// use askstream::frame::FrameReassembler;
///
/// let mut frames = FrameReassembler::new();
/// assert!(frames.push("data: {\"answer\":\"Hel").is_empty());
/// assert_eq!(frames.push("lo\"}\n"), vec!["data: {\"answer\":\"Hello\"}"]);
/// assert_eq!(frames.finish(), None);
/// ```
#[derive(Debug, Default)]
pub struct FrameReassembler {
    carry: String,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend the carry-over to `text`, split on `\n` and return every
    /// complete frame in split order. The last piece becomes the new
    /// carry-over, even when it is empty.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        if !text.contains('\n') {
            self.carry.push_str(text);
            return Vec::new();
        }

        let mut combined = std::mem::take(&mut self.carry);
        combined.push_str(text);

        let mut pieces: Vec<&str> = combined.split('\n').collect();
        // split always yields at least one piece
        let last = pieces.pop().unwrap_or_default();
        self.carry = last.to_string();

        pieces.into_iter().map(str::to_string).collect()
    }

    /// Drain the carry-over at end of input. Returns it only when it holds
    /// something other than whitespace.
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.carry);
        if tail.trim().is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    /// Text waiting for its terminating newline.
    pub fn carry_over(&self) -> &str {
        &self.carry
    }
}
