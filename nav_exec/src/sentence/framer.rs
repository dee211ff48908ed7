//! Reassembly of sentences from a serial byte stream.

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest sentence the framer will hold, longer runs are discarded.
pub const MAX_SENTENCE_LEN: usize = 256;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Accumulates arbitrary chunks of a byte stream and yields complete sentences.
///
/// A sentence runs from a `$` up to (not including) the next `\r` or `\n`. A `$` in the middle of
/// a sentence restarts framing, since the previous sentence was evidently cut short.
pub struct SentenceFramer {
    buf: [u8; MAX_SENTENCE_LEN],
    len: usize,
    in_sentence: bool,
    num_overflows: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SentenceFramer {
    pub fn new() -> Self {
        Self {
            buf: [0u8; MAX_SENTENCE_LEN],
            len: 0,
            in_sentence: false,
            num_overflows: 0,
        }
    }

    /// Feed a chunk of bytes, calling `on_sentence` with each sentence completed by the chunk.
    pub fn push<F: FnMut(&[u8])>(&mut self, bytes: &[u8], mut on_sentence: F) {
        for &b in bytes {
            match b {
                b'$' => {
                    self.len = 0;
                    self.in_sentence = true;
                    self.store(b);
                }
                b'\r' | b'\n' => {
                    if self.in_sentence && self.len > 0 {
                        on_sentence(&self.buf[..self.len]);
                    }
                    self.reset();
                }
                _ if self.in_sentence => self.store(b),
                _ => (),
            }
        }
    }

    /// Number of sentences discarded for exceeding [`MAX_SENTENCE_LEN`].
    pub fn num_overflows(&self) -> u64 {
        self.num_overflows
    }

    fn store(&mut self, b: u8) {
        if self.len >= MAX_SENTENCE_LEN {
            self.num_overflows += 1;
            self.reset();
            return;
        }

        self.buf[self.len] = b;
        self.len += 1;
    }

    fn reset(&mut self) {
        self.len = 0;
        self.in_sentence = false;
    }
}

impl Default for SentenceFramer {
    fn default() -> Self {
        Self::new()
    }
}
