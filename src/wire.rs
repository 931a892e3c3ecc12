//! Explicit big/little-endian byte helpers for the packed binary layouts (identify
//! blocks, MODE SENSE pages, TOC entries, sense buffers) and DMA word packing (§9):
//! prefer these over a generic serializer for byte-level contracts.

use alloc::vec::Vec;

/// Packs a byte buffer into little-endian 32-bit DMA words (`buf.len()` rounded up to a
/// multiple of 4; a short final word is zero-padded in its high bytes).
///
/// # Arguments
///
/// * `buf` - The byte buffer to pack.
///
/// # Returns
///
/// * `Vec<u32>` - The little-endian DMA words.
#[must_use]
pub fn pack_le_words(buf: &[u8]) -> Vec<u32> {
    buf.chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect()
}

/// Unpacks little-endian 32-bit DMA words into a byte buffer truncated to `len`.
///
/// # Arguments
///
/// * `words` - The little-endian DMA words to unpack.
/// * `len` - The number of bytes to keep; any remainder from padding is discarded.
///
/// # Returns
///
/// * `Vec<u8>` - The unpacked byte buffer, truncated to `len`.
#[must_use]
pub fn unpack_le_words(words: &[u32], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
    out.truncate(len);
    out
}

/// Writes a big-endian `u16` into `buf` at `offset`.
///
/// # Arguments
///
/// * `buf` - The buffer to write into.
/// * `offset` - The byte offset to write at.
/// * `value` - The value to write, big-endian.
pub fn put_be16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Writes a big-endian `u32` into `buf` at `offset`.
///
/// # Arguments
///
/// * `buf` - The buffer to write into.
/// * `offset` - The byte offset to write at.
/// * `value` - The value to write, big-endian.
pub fn put_be32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}
