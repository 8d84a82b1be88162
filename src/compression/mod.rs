//! Compression oracle backed by a reusable deflate stream
//!
//! Every worker owns exactly one [`CompressionOracle`] for the lifetime of the
//! classifier. The underlying `flate2::Compress` is configured once with the
//! best compression level and then only reset between measurements.

mod arena;

pub use arena::ScratchArena;

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::{Error, Result};

/// Slack beyond the zlib bound, which already counts the 6-byte wrapper
const HEADER_SLACK: usize = 64;

/// Upper bound on the compressed size of `len` input bytes.
///
/// Same shape as zlib's `compressBound`, so incompressible input still fits.
pub fn deflate_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13 + HEADER_SLACK
}

/// Reports compressed sizes of byte spans.
pub struct CompressionOracle {
    stream: Compress,
}

impl CompressionOracle {
    pub fn new() -> Self {
        Self {
            stream: Compress::new(Compression::best(), true),
        }
    }

    /// Compressed size of `input`, using `arena` as output space
    pub fn compressed_size(&mut self, arena: &mut ScratchArena, input: &[u8]) -> Result<usize> {
        self.deflate(input, &mut arena.compressed)
    }

    /// Compressed size of `head ++ tail`, with no separator in between
    pub fn compressed_size_joined(
        &mut self,
        arena: &mut ScratchArena,
        head: &[u8],
        tail: &[u8],
    ) -> Result<usize> {
        arena.join(head, tail);
        let ScratchArena { joined, compressed } = arena;
        self.deflate(joined, compressed)
    }

    fn deflate(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        self.stream.reset();
        output.clear();
        output.reserve(deflate_bound(input.len()));

        let status = self
            .stream
            .compress_vec(input, output, FlushCompress::Finish)
            .map_err(|e| Error::compression(format!("deflate failed: {}", e)))?;

        if status != Status::StreamEnd {
            return Err(Error::compression(format!(
                "deflate did not finish ({:?}) after {} of {} input bytes",
                status,
                self.stream.total_in(),
                input.len()
            )));
        }

        Ok(self.stream.total_out() as usize)
    }
}

impl Default for CompressionOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x9e37_79b9;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    #[test]
    fn test_repetitive_input_compresses() {
        let mut oracle = CompressionOracle::new();
        let mut arena = ScratchArena::new();
        let input = b"the quick brown fox ".repeat(50);

        let size = oracle.compressed_size(&mut arena, &input).unwrap();
        assert!(size > 0);
        assert!(size < input.len() / 4);
    }

    #[test]
    fn test_sizes_are_stable_across_resets() {
        let mut oracle = CompressionOracle::new();
        let mut arena = ScratchArena::new();
        let first = oracle.compressed_size(&mut arena, b"hello world").unwrap();
        oracle.compressed_size(&mut arena, &[1u8; 10_000]).unwrap();
        let again = oracle.compressed_size(&mut arena, b"hello world").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_incompressible_input_fits_bound() {
        let mut oracle = CompressionOracle::new();
        let mut arena = ScratchArena::new();
        for len in [0, 1, 100, 70_000] {
            let input = pseudo_random(len);
            let size = oracle.compressed_size(&mut arena, &input).unwrap();
            assert!(size <= deflate_bound(len));
        }
    }

    #[test]
    fn test_empty_input_has_nonzero_size() {
        let mut oracle = CompressionOracle::new();
        let mut arena = ScratchArena::new();
        // zlib header and adler32 trailer
        assert!(oracle.compressed_size(&mut arena, b"").unwrap() > 0);
    }

    #[test]
    fn test_joined_matches_manual_concatenation() {
        let mut oracle = CompressionOracle::new();
        let mut arena = ScratchArena::new();
        let joined = oracle
            .compressed_size_joined(&mut arena, b"stocks fell ", b"on friday")
            .unwrap();
        let manual = oracle
            .compressed_size(&mut arena, b"stocks fell on friday")
            .unwrap();
        assert_eq!(joined, manual);
    }
}
