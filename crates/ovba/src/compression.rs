//! MS-OVBA CompressedContainer decompression.
//!
//! A container is a single `0x01` signature byte followed by chunks. Each
//! chunk carries a 2-byte header and decompresses to at most 4096 bytes.
//! Compressed chunks are a run of token sequences: a flag byte, then up to
//! eight tokens that are either literal bytes or 2-byte copy tokens pointing
//! back into the chunk's own output. Every chunk starts from an empty
//! buffer, so copy tokens never reach into a previous chunk.

use crate::error::{ContainerError, DecompressionError};

/// Signature byte that opens every compressed container.
pub const CONTAINER_SIGNATURE: u8 = 0x01;

/// Maximum number of bytes one chunk decompresses to.
pub const MAX_CHUNK_SIZE: usize = 4096;

/// Length of a chunk header in bytes.
const CHUNK_HEADER_LEN: usize = 2;

/// Header bit set when the chunk data is a token stream.
const CHUNK_COMPRESSED_FLAG: u16 = 0x8000;

/// Header bits holding the chunk size.
const CHUNK_SIZE_MASK: u16 = 0x0FFF;

/// Added to the size field to get the chunk size, header included.
const CHUNK_SIZE_BIAS: usize = 3;

/// Smallest and largest number of offset bits in a copy token.
const MIN_OFFSET_BITS: u32 = 4;
const MAX_OFFSET_BITS: u32 = 12;

/// One token of a token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A byte copied to the output as-is.
    Literal(u8),
    /// A packed back-reference, still in its raw little-endian form.
    Copy(u16),
}

/// A copy token split into its offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyToken {
    /// Distance back from the end of the buffer, at least 1.
    pub offset: usize,
    /// Number of bytes to produce, at least 3.
    pub length: usize,
}

impl CopyToken {
    /// Split a raw token using `bit_count` offset bits (see [`bits_for`]).
    ///
    /// `bit_count` must lie in `[4, 12]`.
    pub fn unpack(raw: u16, bit_count: u32) -> Self {
        debug_assert!(
            (MIN_OFFSET_BITS..=MAX_OFFSET_BITS).contains(&bit_count),
            "copy token offset bits out of range: {}",
            bit_count
        );
        let raw = u32::from(raw);
        let offset = 1 + (raw >> (16 - bit_count)) as usize;
        let length = 3 + (((raw << bit_count) & 0xFFFF) >> bit_count) as usize;
        Self { offset, length }
    }
}

/// Number of offset bits in a copy token, given how many bytes the current
/// chunk has decompressed so far.
///
/// This is `ceil(log2(current_len))` clamped to `[4, 12]`. Callers only ask
/// once at least one byte is in the buffer; zero clamps to 4.
pub fn bits_for(current_len: usize) -> u32 {
    let n = current_len.saturating_sub(1);
    let bits = usize::BITS - n.leading_zeros();
    bits.clamp(MIN_OFFSET_BITS, MAX_OFFSET_BITS)
}

/// Produce the `length` bytes a copy token stands for.
///
/// The source window starts `offset` bytes before the end of `buffer` and
/// may run past it when `length > offset`; those bytes are re-read from the
/// output produced so far, which repeats the tail of the buffer.
pub fn expand_copy_token(
    buffer: &[u8],
    offset: usize,
    length: usize,
) -> Result<Vec<u8>, DecompressionError> {
    if buffer.is_empty() {
        return Err(DecompressionError::EmptyBufferReference);
    }
    if offset == 0 || offset > buffer.len() {
        return Err(DecompressionError::OffsetOverrun {
            offset,
            available: buffer.len(),
        });
    }

    let start = buffer.len() - offset;
    let mut out = Vec::with_capacity(length);
    for i in 0..length {
        let pos = start + i;
        let byte = if pos < buffer.len() {
            buffer[pos]
        } else {
            out[pos - buffer.len()]
        };
        out.push(byte);
    }

    Ok(out)
}

/// Read the tokens announced by `flag` from the front of `data`.
///
/// Bit `i` of `flag` (LSB first) selects the kind of token `i`. Parsing stops
/// after eight tokens or as soon as `data` runs out, whichever comes first.
/// Returns the tokens and the unread rest of `data`.
pub fn parse_token_sequence(
    flag: u8,
    mut data: &[u8],
) -> Result<(Vec<Token>, &[u8]), DecompressionError> {
    let mut tokens = Vec::with_capacity(8);

    for bit in 0..8 {
        let Some((&first, rest)) = data.split_first() else {
            break;
        };

        if flag & (1 << bit) == 0 {
            tokens.push(Token::Literal(first));
            data = rest;
        } else {
            let Some((&second, rest)) = rest.split_first() else {
                return Err(DecompressionError::TruncatedCopyToken);
            };
            tokens.push(Token::Copy(u16::from_le_bytes([first, second])));
            data = rest;
        }
    }

    Ok((tokens, data))
}

/// Decode the chunk at the front of `input`.
///
/// Returns the decompressed bytes and the input that follows the chunk.
pub fn decode_chunk(input: &[u8]) -> Result<(Vec<u8>, &[u8]), DecompressionError> {
    if input.len() < CHUNK_HEADER_LEN {
        return Err(DecompressionError::MalformedHeader {
            declared: CHUNK_HEADER_LEN,
            available: input.len(),
        });
    }

    let header = u16::from_le_bytes([input[0], input[1]]);
    let size = usize::from(header & CHUNK_SIZE_MASK) + CHUNK_SIZE_BIAS;
    let compressed = header & CHUNK_COMPRESSED_FLAG != 0;

    if size > input.len() {
        return Err(DecompressionError::MalformedHeader {
            declared: size,
            available: input.len(),
        });
    }

    let mut data = &input[CHUNK_HEADER_LEN..size];
    let remainder = &input[size..];

    log::debug!(
        "chunk header={:#06x} size={} compressed={}",
        header,
        size,
        compressed
    );

    if !compressed {
        return Ok((data.to_vec(), remainder));
    }

    let mut buffer = Vec::with_capacity(MAX_CHUNK_SIZE);
    let mut dropped = 0usize;

    while let Some((&flag, rest)) = data.split_first() {
        let (tokens, rest) = parse_token_sequence(flag, rest)?;
        data = rest;

        for token in tokens {
            match token {
                Token::Literal(byte) => {
                    dropped += append_capped(&mut buffer, &[byte]);
                }
                Token::Copy(raw) => {
                    let copy = CopyToken::unpack(raw, bits_for(buffer.len()));
                    let bytes = expand_copy_token(&buffer, copy.offset, copy.length)?;
                    dropped += append_capped(&mut buffer, &bytes);
                }
            }
        }
    }

    if dropped > 0 {
        log::warn!(
            "compressed chunk expands past {} bytes, dropped {} trailing bytes",
            MAX_CHUNK_SIZE,
            dropped
        );
    }

    Ok((buffer, remainder))
}

/// Append as much of `bytes` as fits in one chunk, returning how many did not.
fn append_capped(buffer: &mut Vec<u8>, bytes: &[u8]) -> usize {
    let room = MAX_CHUNK_SIZE.saturating_sub(buffer.len());
    let take = bytes.len().min(room);
    buffer.extend_from_slice(&bytes[..take]);
    bytes.len() - take
}

/// Decompress a whole container and normalize the recovered source.
///
/// On success every `\r\n` becomes `\n` and every `00 00` byte pair is
/// removed. On failure the error carries the raw output of the chunks that
/// decoded before the failing one.
pub fn decompress(container: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let Some((&signature, mut remainder)) = container.split_first() else {
        return Err(ContainerError::new(
            0,
            Vec::new(),
            DecompressionError::SignatureMismatch { found: None },
        ));
    };

    if signature != CONTAINER_SIGNATURE {
        return Err(ContainerError::new(
            0,
            Vec::new(),
            DecompressionError::SignatureMismatch {
                found: Some(signature),
            },
        ));
    }

    let mut out = Vec::with_capacity(remainder.len().saturating_mul(2));

    while !remainder.is_empty() {
        let offset = container.len() - remainder.len();
        match decode_chunk(remainder) {
            Ok((chunk, rest)) => {
                out.extend_from_slice(&chunk);
                remainder = rest;
            }
            Err(source) => {
                log::debug!("chunk at offset {} failed: {}", offset, source);
                return Err(ContainerError::new(offset, out, source));
            }
        }
    }

    Ok(normalize(&out))
}

/// Turn `\r\n` into `\n`, then drop every `00 00` pair.
pub fn normalize(raw: &[u8]) -> Vec<u8> {
    strip_nul_pairs(&collapse_crlf(raw))
}

fn collapse_crlf(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'\r' && input.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(input[i]);
            i += 1;
        }
    }
    out
}

fn strip_nul_pairs(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == 0 && input.get(i + 1) == Some(&0) {
            i += 2;
        } else {
            out.push(input[i]);
            i += 1;
        }
    }
    out
}
