/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice (including the next
 * paragraph) shall be included in all copies or substantial portions of the
 * Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * CBOR streaming decoder
 *
 * The byte-driven half of the crate: given a buffer, produce one syntactic token and how many
 * bytes it consumed. This layer knows nothing about trees, stacks or nesting - that is the tree
 * builder's job (`crate::builder`). It is stateless between calls: all position state lives in the
 * caller's advancing cursor.
 **************************************************************************************************/
use crate::constants::*;
use crate::error::{CborError, Result};
use crate::item::Width;

use half::f16;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// One syntactic CBOR token, as produced by [`decode_token`]. Each token corresponds to exactly
/// one head byte (plus, for ints/floats/tags/lengths, its big-endian payload).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    UInt(u64, Width),
    /// Encoded magnitude; logical value is `-1 - m`.
    NInt(u64, Width),
    /// A definite byte string head; `len` raw bytes follow and must be consumed separately via
    /// [`read_payload`]. The width is the head's AI-encoded width, preserved for faithful
    /// re-encoding of the length.
    BytesHeader(usize, Width),
    IndefiniteBytesStart,
    /// A definite text string head; `len` raw bytes follow, consumed via [`read_payload`].
    TextHeader(usize, Width),
    IndefiniteTextStart,
    /// A definite array head of `len` items.
    ArrayHeader(usize, Width),
    IndefiniteArrayStart,
    /// A definite map head of `len` *pairs* (so `2 * len` items follow).
    MapHeader(usize, Width),
    IndefiniteMapStart,
    Tag(u64, Width),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Null,
    Undefined,
    Simple(u8),
    /// The 0xFF byte terminating an indefinite-length container.
    Break,
}

/// Return `true` if a slice of `len` bytes starting at `start` fits within `buf`.
#[inline]
pub(crate) fn within(buf: &[u8], start: usize, len: usize) -> bool {
    start.checked_add(len).map_or(false, |end| end <= buf.len())
}

fn read_extent(buf: &[u8], start: usize, len: usize) -> Result<(usize, &[u8])> {
    if within(buf, start, len) {
        Ok((start + len, &buf[start..start + len]))
    } else {
        Err(CborError::NotEnoughData((start + len) - buf.len()))
    }
}

/// Value obtained while reading an unsigned head payload, retaining the encoded width so that
/// re-encoding is bit-exact.
struct AnyUnsigned {
    value: u64,
    width: Width,
}

/// Parse the AI-encoded unsigned payload that follows a major-type byte at `start_index`, which
/// must index the head byte itself (AI is read from its low 5 bits).
#[cfg_attr(feature = "trace", trace)]
fn parse_unsigned(buf: &[u8], start_index: usize) -> Result<(usize, AnyUnsigned)> {
    if !within(buf, start_index, 1) {
        return Err(CborError::NotEnoughData(1));
    }
    let ai = buf[start_index] & AI_MASK;
    if ai <= PAYLOAD_AI_BITS {
        Ok((
            start_index + 1,
            AnyUnsigned {
                value: ai as u64,
                width: Width::W0,
            },
        ))
    } else if ai == PAYLOAD_ONE_BYTE {
        let (next, bytes) = read_extent(buf, start_index + 1, 1)?;
        Ok((
            next,
            AnyUnsigned {
                value: bytes[0] as u64,
                width: Width::W1,
            },
        ))
    } else if ai == PAYLOAD_TWO_BYTES {
        let (next, bytes) = read_extent(buf, start_index + 1, 2)?;
        Ok((
            next,
            AnyUnsigned {
                value: u16::from_be_bytes(bytes.try_into().unwrap()) as u64,
                width: Width::W2,
            },
        ))
    } else if ai == PAYLOAD_FOUR_BYTES {
        let (next, bytes) = read_extent(buf, start_index + 1, 4)?;
        Ok((
            next,
            AnyUnsigned {
                value: u32::from_be_bytes(bytes.try_into().unwrap()) as u64,
                width: Width::W4,
            },
        ))
    } else if ai == PAYLOAD_EIGHT_BYTES {
        let (next, bytes) = read_extent(buf, start_index + 1, 8)?;
        Ok((
            next,
            AnyUnsigned {
                value: u64::from_be_bytes(bytes.try_into().unwrap()),
                width: Width::W8,
            },
        ))
    } else {
        // AI 28..30: reserved. AI 31 is the indefinite-length marker, legal only for major types
        // 2-5 and as the major-type-7 break - callers for those types intercept it before reaching
        // here, so any major type that ends up calling this with AI 31 (ints, tags) is malformed.
        Err(CborError::Malformed)
    }
}

/// Decode exactly one token starting at the beginning of `buf`. Returns the token and the number
/// of bytes its head (and, for ints/floats/tags/lengths, its payload) consumed. For byte/text
/// string headers, the string's raw content is *not* included in the count - call
/// [`read_payload`] afterwards.
#[cfg_attr(feature = "trace", trace)]
pub fn decode_token(buf: &[u8]) -> Result<(Token, usize)> {
    if buf.is_empty() {
        return Err(CborError::NotEnoughData(1));
    }
    let head = buf[0];
    let mt = head & MT_MASK;
    let ai = head & AI_MASK;

    match mt {
        MT_UINT => {
            let (next, v) = parse_unsigned(buf, 0)?;
            Ok((Token::UInt(v.value, v.width), next))
        }
        MT_NINT => {
            let (next, v) = parse_unsigned(buf, 0)?;
            Ok((Token::NInt(v.value, v.width), next))
        }
        MT_BSTR => {
            if ai == PAYLOAD_INDEFINITE {
                Ok((Token::IndefiniteBytesStart, 1))
            } else {
                let (next, v) = parse_unsigned(buf, 0)?;
                Ok((Token::BytesHeader(v.value as usize, v.width), next))
            }
        }
        MT_TSTR => {
            if ai == PAYLOAD_INDEFINITE {
                Ok((Token::IndefiniteTextStart, 1))
            } else {
                let (next, v) = parse_unsigned(buf, 0)?;
                Ok((Token::TextHeader(v.value as usize, v.width), next))
            }
        }
        MT_ARRAY => {
            if ai == PAYLOAD_INDEFINITE {
                Ok((Token::IndefiniteArrayStart, 1))
            } else {
                let (next, v) = parse_unsigned(buf, 0)?;
                Ok((Token::ArrayHeader(v.value as usize, v.width), next))
            }
        }
        MT_MAP => {
            if ai == PAYLOAD_INDEFINITE {
                Ok((Token::IndefiniteMapStart, 1))
            } else {
                let (next, v) = parse_unsigned(buf, 0)?;
                Ok((Token::MapHeader(v.value as usize, v.width), next))
            }
        }
        MT_TAG => {
            if ai == PAYLOAD_INDEFINITE {
                // Indefinite length is not a legal AI for tags.
                Err(CborError::Malformed)
            } else {
                let (next, v) = parse_unsigned(buf, 0)?;
                Ok((Token::Tag(v.value, v.width), next))
            }
        }
        MT_SIMPLE => decode_simple_or_float(buf, ai),
        _ => unreachable!("major type is exactly 3 bits"),
    }
}

fn decode_simple_or_float(buf: &[u8], ai: u8) -> Result<(Token, usize)> {
    match ai {
        AI_FALSE => Ok((Token::Bool(false), 1)),
        AI_TRUE => Ok((Token::Bool(true), 1)),
        AI_NULL => Ok((Token::Null, 1)),
        AI_UNDEFINED => Ok((Token::Undefined, 1)),
        AI_SIMPLE_BYTE => {
            let (next, bytes) = read_extent(buf, 1, 1)?;
            let v = bytes[0];
            if v < 32 {
                // Values 0..=31 already have a one-byte AI encoding and must use it.
                Err(CborError::Malformed)
            } else {
                Ok((Token::Simple(v), next))
            }
        }
        AI_FLOAT16 => {
            let (next, bytes) = read_extent(buf, 1, 2)?;
            Ok((
                Token::Float16(f16::from_be_bytes(bytes.try_into().unwrap())),
                next,
            ))
        }
        AI_FLOAT32 => {
            let (next, bytes) = read_extent(buf, 1, 4)?;
            Ok((
                Token::Float32(f32::from_be_bytes(bytes.try_into().unwrap())),
                next,
            ))
        }
        AI_FLOAT64 => {
            let (next, bytes) = read_extent(buf, 1, 8)?;
            Ok((
                Token::Float64(f64::from_be_bytes(bytes.try_into().unwrap())),
                next,
            ))
        }
        AI_BREAK => Ok((Token::Break, 1)),
        28..=30 => Err(CborError::Malformed),
        v if v <= PAYLOAD_AI_BITS => Ok((Token::Simple(v), 1)),
        _ => Err(CborError::Malformed),
    }
}

/// Read `len` raw bytes from the start of `buf`: the companion call for [`Token::BytesHeader`]
/// and [`Token::TextHeader`].
#[cfg_attr(feature = "trace", trace)]
pub fn read_payload(buf: &[u8], len: usize) -> Result<&[u8]> {
    if within(buf, 0, len) {
        Ok(&buf[0..len])
    } else {
        Err(CborError::NotEnoughData(len - buf.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_unsigned() {
        let (tok, used) = decode_token(&[0x0A]).unwrap();
        assert_eq!(tok, Token::UInt(10, Width::W0));
        assert_eq!(used, 1);
    }

    #[test]
    fn sixteen_bit_negative() {
        let (tok, used) = decode_token(&[0x39, 0x01, 0xF4]).unwrap();
        assert_eq!(tok, Token::NInt(0x01F4, Width::W2));
        assert_eq!(used, 3);
    }

    #[test]
    fn definite_bytestring_header_then_payload() {
        let buf = [0x43, 0x61, 0x62, 0x63];
        let (tok, used) = decode_token(&buf).unwrap();
        assert_eq!(tok, Token::BytesHeader(3, Width::W0));
        assert_eq!(used, 1);
        assert_eq!(read_payload(&buf[used..], 3).unwrap(), b"abc");
    }

    #[test]
    fn truncated_bytestring_reports_not_enough_data() {
        let buf = [0x43, 0x61, 0x62];
        let (tok, used) = decode_token(&buf).unwrap();
        assert_eq!(tok, Token::BytesHeader(3, Width::W0));
        assert_eq!(read_payload(&buf[used..], 3), Err(CborError::NotEnoughData(1)));
    }

    #[test]
    fn reserved_additional_information_is_malformed() {
        assert_eq!(decode_token(&[0x1C]), Err(CborError::Malformed));
    }

    #[test]
    fn indefinite_length_marker_is_malformed_on_ints() {
        // AI 31 (the indefinite-length marker) is only legal on major types 2-5 and as the
        // major-type-7 break; on an unsigned or negative int it is malformed.
        assert_eq!(decode_token(&[0x1F]), Err(CborError::Malformed));
        assert_eq!(decode_token(&[0x3F]), Err(CborError::Malformed));
    }

    #[test]
    fn empty_buffer_is_not_enough_data() {
        assert_eq!(decode_token(&[]), Err(CborError::NotEnoughData(1)));
    }

    #[test]
    fn half_float_round_trips_through_f32() {
        let buf = [0xF9, 0x3C, 0x00]; // 1.0 in binary16
        let (tok, _) = decode_token(&buf).unwrap();
        match tok {
            Token::Float16(v) => assert_eq!(v.to_f32(), 1.0),
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn break_byte_is_its_own_token() {
        assert_eq!(decode_token(&[0xFF]).unwrap(), (Token::Break, 1));
    }

    #[test]
    fn indefinite_starts_carry_no_payload() {
        assert_eq!(
            decode_token(&[0x5F]).unwrap(),
            (Token::IndefiniteBytesStart, 1)
        );
        assert_eq!(
            decode_token(&[0x9F]).unwrap(),
            (Token::IndefiniteArrayStart, 1)
        );
    }

    #[test]
    fn decoder_purity_on_truncated_prefix() {
        let full = [0xCA, 0x18, 0x2A];
        for n in 0..full.len() {
            match decode_token(&full[..n]) {
                Err(CborError::NotEnoughData(_)) => {}
                other => panic!("expected NotEnoughData at n={}, got {:?}", n, other),
            }
        }
        assert_eq!(decode_token(&full).unwrap(), (Token::Tag(10, Width::W0), 1));
    }
}
