
use std::collections::VecDeque;

use anyhow::{Context, Result};
use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::{debug, warn};

use crate::config::ChunkingConfig;

/// Separator priority for recursive splitting, coarsest first. Splitting
/// falls back to character boundaries when none of these occur.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Token-bounded recursive text splitter.
///
/// Documents are broken at the coarsest separator that brings each piece
/// within the token budget, then pieces are reassembled into chunks that
/// carry a bounded overlap into their successor. Token counts use the
/// cl100k_base encoding, matching what embedding models tokenize against.
pub struct TextSplitter {
    bpe: CoreBPE,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        let bpe = cl100k_base().context("Failed to load cl100k_base encoding")?;

        Ok(Self {
            bpe,
            max_tokens: config.max_tokens,
            overlap_tokens: config.overlap_tokens,
        })
    }

    /// Count tokens using the embedding tokenizer
    #[inline]
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split a document into chunks of at most `max_tokens` tokens, with up
    /// to `overlap_tokens` tokens repeated between adjacent chunks.
    ///
    /// Separators stay attached to the piece they precede, so concatenating
    /// the chunks with the overlapping prefixes removed reproduces the input
    /// byte for byte. An empty document yields no chunks.
    #[inline]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let pieces = self.decompose(text, 0);
        let chunks = self.merge(pieces);

        debug!(
            "Split {} bytes into {} chunks (max {} tokens, overlap {})",
            text.len(),
            chunks.len(),
            self.max_tokens,
            self.overlap_tokens
        );

        chunks
    }

    /// Break text into pieces that each fit the token budget, descending to
    /// finer separators only where a piece is still too large.
    fn decompose(&self, text: &str, depth: usize) -> Vec<(String, usize)> {
        let tokens = self.count_tokens(text);
        if tokens <= self.max_tokens {
            return vec![(text.to_string(), tokens)];
        }

        if depth >= SEPARATORS.len() {
            return self.decompose_chars(text);
        }

        let parts = split_keeping_separator(text, SEPARATORS[depth]);
        if parts.len() <= 1 {
            // Separator absent (or only leading), try the next finer one
            return self.decompose(text, depth + 1);
        }

        let mut pieces = Vec::new();
        for part in parts {
            let part_tokens = self.count_tokens(part);
            if part_tokens <= self.max_tokens {
                pieces.push((part.to_string(), part_tokens));
            } else {
                pieces.extend(self.decompose(part, depth + 1));
            }
        }
        pieces
    }

    /// Last-resort split into single characters, counted individually
    fn decompose_chars(&self, text: &str) -> Vec<(String, usize)> {
        warn!(
            "No separator found in a {} byte run, splitting at character boundaries",
            text.len()
        );

        text.chars()
            .map(|c| {
                let piece = c.to_string();
                let tokens = self.count_tokens(&piece);
                (piece, tokens)
            })
            .collect()
    }

    /// Reassemble pieces into chunks, retaining a tail of each emitted chunk
    /// as the start of the next one.
    fn merge(&self, pieces: Vec<(String, usize)>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_tokens = 0;

        for (piece, tokens) in pieces {
            if window_tokens + tokens > self.max_tokens && !window.is_empty() {
                chunks.push(join_pieces(&window));

                // Drop pieces from the front until the retained tail fits the
                // overlap budget and leaves room for the incoming piece
                while window_tokens > self.overlap_tokens
                    || (window_tokens + tokens > self.max_tokens && window_tokens > 0)
                {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    window_tokens -= dropped;
                }
            }

            window_tokens += tokens;
            window.push_back((piece, tokens));
        }

        if !window.is_empty() {
            chunks.push(join_pieces(&window));
        }

        chunks
    }
}

/// Split `text` at every occurrence of `separator`, attaching each separator
/// to the part it starts. Concatenating the parts yields `text` unchanged.
#[expect(
    clippy::string_slice,
    reason = "offsets are separator match positions, always char boundaries"
)]
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut from = 0;

    while let Some(found) = text[from..].find(separator) {
        let at = from + found;
        if at > start {
            parts.push(&text[start..at]);
            start = at;
        }
        from = at + separator.len();
    }

    if start < text.len() {
        parts.push(&text[start..]);
    }

    parts
}

fn join_pieces(window: &VecDeque<(String, usize)>) -> String {
    window.iter().map(|(piece, _)| piece.as_str()).collect()
}
