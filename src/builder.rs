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
 * Tree builder
 *
 * Sits on top of the streaming decoder (`crate::decode`) and assembles tokens into an `Item` tree.
 * Nesting is tracked with an explicit stack of frames rather than recursion, so the depth of input
 * nesting never determines the depth of the Rust call stack: only a configurable bound does.
 **************************************************************************************************/
use crate::decode::{decode_token, read_payload, Token};
use crate::error::{CborError, Result};
use crate::item::{Item, Width};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A frame on the builder's explicit stack: a partially filled container (or tag, or indefinite
/// string) together with however much bookkeeping it needs to know when it is complete.
enum Frame {
    Array {
        item: Item,
        /// `None` for an indefinite array (closed only by `Break`); `Some(n)` counts remaining
        /// definite-array slots down to zero.
        remaining: Option<usize>,
    },
    Map {
        item: Item,
        /// Same convention as `Array::remaining`, but counts remaining *pairs*.
        remaining_pairs: Option<usize>,
        /// The key half of a pair whose value has not yet arrived.
        pending_key: Option<Item>,
    },
    Tag {
        tag_number: u64,
        width: Width,
    },
    IndefBstr {
        item: Item,
    },
    IndefTstr {
        item: Item,
    },
}

/// Attach a just-completed `item` to the stack's top frame, and keep popping+attaching while doing
/// so completes further frames above it (step 4 of the builder algorithm). Returns `Ok(Some(top))`
/// once the stack is empty again (the whole top-level item is complete), `Ok(None)` if more tokens
/// are still expected.
fn attach(stack: &mut Vec<Frame>, mut item: Item) -> Result<Option<Item>> {
    loop {
        let frame = match stack.last_mut() {
            None => return Ok(Some(item)),
            Some(frame) => frame,
        };
        match frame {
            Frame::Array { item: arr, remaining } => {
                arr.array_push(item)?;
                match remaining {
                    None => return Ok(None),
                    Some(r) => {
                        *r -= 1;
                        if *r != 0 {
                            return Ok(None);
                        }
                    }
                }
                item = match stack.pop() {
                    Some(Frame::Array { item, .. }) => item,
                    _ => unreachable!("top frame was just matched as Array"),
                };
            }
            Frame::Map {
                item: map,
                remaining_pairs,
                pending_key,
            } => {
                if let Some(key) = pending_key.take() {
                    map.map_add(key, item)?;
                    match remaining_pairs {
                        None => return Ok(None),
                        Some(r) => {
                            *r -= 1;
                            if *r != 0 {
                                return Ok(None);
                            }
                        }
                    }
                } else {
                    *pending_key = Some(item);
                    return Ok(None);
                }
                item = match stack.pop() {
                    Some(Frame::Map { item, .. }) => item,
                    _ => unreachable!("top frame was just matched as Map"),
                };
            }
            Frame::Tag { .. } => {
                let (tag_number, width) = match stack.pop() {
                    Some(Frame::Tag { tag_number, width }) => (tag_number, width),
                    _ => unreachable!("top frame was just matched as Tag"),
                };
                item = Item::new_tag_raw(tag_number, width, item);
            }
            Frame::IndefBstr { item: s } => {
                s.bytestring_add_chunk(item)?;
                return Ok(None);
            }
            Frame::IndefTstr { item: s } => {
                s.string_add_chunk(item)?;
                return Ok(None);
            }
        }
    }
}

/// Reject pushing a new frame once the stack already holds `max_depth` of them.
fn check_depth(stack: &[Frame], max_depth: usize) -> Result<()> {
    if stack.len() >= max_depth {
        Err(CborError::DepthExceeded)
    } else {
        Ok(())
    }
}

/// Decode exactly one complete top-level CBOR item from the start of `buf`, using the default
/// maximum nesting depth ([`crate::constants::DEFAULT_MAX_DEPTH`]).
#[cfg_attr(feature = "trace", trace)]
pub fn decode_one(buf: &[u8]) -> Result<(Item, usize)> {
    decode_one_with_depth(buf, crate::constants::DEFAULT_MAX_DEPTH)
}

/// Decode exactly one complete top-level CBOR item from the start of `buf`, rejecting input that
/// nests deeper than `max_depth`.
///
/// On error, no item escapes to the caller: every item constructed so far is owned by a local
/// frame or a local variable and is released when this function returns.
#[cfg_attr(feature = "trace", trace)]
pub fn decode_one_with_depth(buf: &[u8], max_depth: usize) -> Result<(Item, usize)> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut pos = 0usize;

    loop {
        let (token, used) = decode_token(&buf[pos..])?;

        // A chunk of an indefinite-length string must itself be a definite string of the same
        // major type, or the break that closes the parent. Anything else is malformed in context,
        // even though the decoder would have accepted it as a token in isolation.
        match stack.last() {
            Some(Frame::IndefBstr { .. }) => match token {
                Token::BytesHeader(..) | Token::Break => {}
                _ => return Err(CborError::NestedIndefiniteStringChunk),
            },
            Some(Frame::IndefTstr { .. }) => match token {
                Token::TextHeader(..) | Token::Break => {}
                _ => return Err(CborError::NestedIndefiniteStringChunk),
            },
            _ => {}
        }

        pos += used;

        let completed: Option<Item> = match token {
            Token::UInt(v, w) => attach(&mut stack, Item::new_uint_raw(v, w))?,
            Token::NInt(m, w) => attach(&mut stack, Item::new_negint_raw(m, w))?,

            Token::BytesHeader(len, width) => {
                let bytes = read_payload(&buf[pos..], len)?.to_vec();
                pos += len;
                attach(&mut stack, Item::new_definite_bytestring_raw(bytes, width))?
            }
            Token::TextHeader(len, width) => {
                let bytes = read_payload(&buf[pos..], len)?.to_vec();
                pos += len;
                attach(&mut stack, Item::new_definite_string_raw(bytes, width))?
            }
            Token::IndefiniteBytesStart => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::IndefBstr {
                    item: Item::new_indefinite_bytestring(),
                });
                None
            }
            Token::IndefiniteTextStart => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::IndefTstr {
                    item: Item::new_indefinite_string(),
                });
                None
            }

            Token::ArrayHeader(0, width) => {
                attach(&mut stack, Item::new_definite_array_raw(0, width))?
            }
            Token::ArrayHeader(len, width) => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::Array {
                    item: Item::new_definite_array_raw(len, width),
                    remaining: Some(len),
                });
                None
            }
            Token::IndefiniteArrayStart => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::Array {
                    item: Item::new_indefinite_array(),
                    remaining: None,
                });
                None
            }

            Token::MapHeader(0, width) => attach(&mut stack, Item::new_definite_map_raw(0, width))?,
            Token::MapHeader(len, width) => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::Map {
                    item: Item::new_definite_map_raw(len, width),
                    remaining_pairs: Some(len),
                    pending_key: None,
                });
                None
            }
            Token::IndefiniteMapStart => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::Map {
                    item: Item::new_indefinite_map(),
                    remaining_pairs: None,
                    pending_key: None,
                });
                None
            }

            Token::Tag(tag_number, width) => {
                check_depth(&stack, max_depth)?;
                stack.push(Frame::Tag { tag_number, width });
                None
            }

            Token::Float16(v) => attach(&mut stack, Item::new_float16(v))?,
            Token::Float32(v) => attach(&mut stack, Item::new_float32(v))?,
            Token::Float64(v) => attach(&mut stack, Item::new_float64(v))?,
            Token::Bool(b) => attach(&mut stack, Item::new_bool(b))?,
            Token::Null => attach(&mut stack, Item::new_null())?,
            Token::Undefined => attach(&mut stack, Item::new_undefined())?,
            Token::Simple(v) => attach(&mut stack, Item::new_simple(v))?,

            Token::Break => match stack.last() {
                None => return Err(CborError::UnexpectedBreak),
                Some(Frame::Array { remaining: Some(_), .. }) => {
                    return Err(CborError::UnexpectedBreak)
                }
                Some(Frame::Map {
                    remaining_pairs: Some(_),
                    ..
                }) => return Err(CborError::UnexpectedBreak),
                Some(Frame::Map {
                    remaining_pairs: None,
                    pending_key: Some(_),
                    ..
                }) => return Err(CborError::MapOddCount),
                Some(Frame::Tag { .. }) => return Err(CborError::UnexpectedBreak),
                Some(Frame::Array { remaining: None, .. })
                | Some(Frame::Map {
                    remaining_pairs: None,
                    pending_key: None,
                    ..
                })
                | Some(Frame::IndefBstr { .. })
                | Some(Frame::IndefTstr { .. }) => {
                    let finished = match stack.pop() {
                        Some(Frame::Array { item, .. }) => item,
                        Some(Frame::Map { item, .. }) => item,
                        Some(Frame::IndefBstr { item }) => item,
                        Some(Frame::IndefTstr { item }) => item,
                        _ => unreachable!("matched above"),
                    };
                    attach(&mut stack, finished)?
                }
            },
        };

        if let Some(item) = completed {
            return Ok((item, pos));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::MajorType;

    #[test]
    fn small_unsigned_round_trip_shape() {
        let (item, used) = decode_one(&[0x0A]).unwrap();
        assert_eq!(used, 1);
        assert_eq!(item.as_uint(), Some(10));
    }

    #[test]
    fn definite_map_of_two_uints() {
        let (item, used) = decode_one(&[0xA1, 0x18, 0x2A, 0x18, 0x2B]).unwrap();
        assert_eq!(used, 5);
        assert_eq!(item.major_type(), MajorType::Map);
        let (k, v) = item.map_get(0).unwrap();
        assert_eq!(k.as_uint(), Some(42));
        assert_eq!(v.as_uint(), Some(43));
    }

    #[test]
    fn tag_wraps_its_single_child() {
        let (item, used) = decode_one(&[0xCA, 0x18, 0x2A]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(item.tag_number(), Some(10));
        assert_eq!(item.tag_child().unwrap().as_uint(), Some(42));
    }

    #[test]
    fn indefinite_text_string_single_chunk() {
        let (item, used) = decode_one(&[0x7F, 0x63, 0x61, 0x62, 0x63, 0xFF]).unwrap();
        assert_eq!(used, 6);
        assert_eq!(item.is_definite(), Some(false));
        let chunks = item.textstring_chunks().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].textstring_bytes().unwrap(), b"abc");
    }

    #[test]
    fn nested_definite_array_of_arrays() {
        // [[1, 2], [3]]
        let buf = [0x82, 0x82, 0x01, 0x02, 0x81, 0x03];
        let (item, used) = decode_one(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(item.fill(), Some(2));
        let inner0 = item.array_get(0).unwrap();
        assert_eq!(inner0.fill(), Some(2));
        assert_eq!(inner0.array_get(1).unwrap().as_uint(), Some(2));
    }

    #[test]
    fn break_outside_any_container_is_rejected() {
        assert_eq!(decode_one(&[0xFF]), Err(CborError::UnexpectedBreak));
    }

    #[test]
    fn break_inside_definite_array_is_rejected() {
        // Declares 1 element but supplies a break instead.
        assert_eq!(decode_one(&[0x81, 0xFF]), Err(CborError::UnexpectedBreak));
    }

    #[test]
    fn indefinite_map_with_odd_item_count_is_rejected() {
        // {_ 1: } closed after only a key.
        assert_eq!(
            decode_one(&[0xBF, 0x01, 0xFF]),
            Err(CborError::MapOddCount)
        );
    }

    #[test]
    fn indefinite_bytestring_chunk_must_be_definite_bytestring() {
        // (_ h'', indefinite-text-chunk-start) - a text string chunk inside a byte string.
        assert_eq!(
            decode_one(&[0x5F, 0x7F, 0xFF, 0xFF]),
            Err(CborError::NestedIndefiniteStringChunk)
        );
    }

    #[test]
    fn truncated_bytestring_reports_not_enough_data() {
        assert_eq!(
            decode_one(&[0x43, 0x61, 0x62]),
            Err(CborError::NotEnoughData(1))
        );
    }

    #[test]
    fn depth_exceeded_on_deeply_nested_arrays() {
        // 50 nested single-element indefinite arrays with a depth bound of 4.
        let mut buf = Vec::new();
        for _ in 0..50 {
            buf.push(0x9F);
        }
        assert_eq!(
            decode_one_with_depth(&buf, 4),
            Err(CborError::DepthExceeded)
        );
    }

    #[test]
    fn empty_definite_array_and_map_need_no_frame() {
        let (arr, used) = decode_one(&[0x80]).unwrap();
        assert_eq!(used, 1);
        assert_eq!(arr.fill(), Some(0));

        let (map, used) = decode_one(&[0xA0]).unwrap();
        assert_eq!(used, 1);
        assert_eq!(map.fill(), Some(0));
    }
}
