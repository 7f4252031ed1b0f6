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
 * Encoder
 *
 * The inverse of `crate::builder`: walks an `Item` tree and produces the byte sequence that
 * `crate::builder::decode_one` would parse back into a structurally equal tree. Faithful, not
 * canonical: every head is emitted at the width hint the item carries (from the wire, or from
 * `Width::smallest_for` for freshly constructed items), and indefinite containers are emitted with
 * a trailing break rather than reshrunk to definite form.
 *
 * Traversal is iterative, via an explicit work stack mirroring the builder's, so encoding a deep
 * tree cannot overflow the call stack either.
 **************************************************************************************************/
use crate::constants::*;
use crate::error::{CborError, Result};
use crate::item::{ArrayBody, Item, ItemKind, MapBody, StringBody, Width};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

fn write_head(out: &mut Vec<u8>, major_type: u8, width: Width, value: u64) {
    match width {
        Width::W0 => out.push(major_type | (value as u8)),
        Width::W1 => {
            out.push(major_type | PAYLOAD_ONE_BYTE);
            out.push(value as u8);
        }
        Width::W2 => {
            out.push(major_type | PAYLOAD_TWO_BYTES);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        Width::W4 => {
            out.push(major_type | PAYLOAD_FOUR_BYTES);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        Width::W8 => {
            out.push(major_type | PAYLOAD_EIGHT_BYTES);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

fn write_indefinite_head(out: &mut Vec<u8>, major_type: u8) {
    out.push(major_type | PAYLOAD_INDEFINITE);
}

/// One step of the iterative encode walk: either write a node's head/payload (and, for
/// containers, schedule its children), or emit the break byte that closes an indefinite
/// container whose children have all been scheduled already.
enum Work {
    Node(Item),
    Break,
}

/// Encode a single node, writing its head (and payload, for leaves) to `out`, and pushing whatever
/// further work is needed to finish it (its children, and/or a trailing break) onto `stack`.
fn encode_node(item: &Item, out: &mut Vec<u8>, stack: &mut Vec<Work>) {
    match &*item.kind_ref() {
        ItemKind::UInt(v, w) => write_head(out, MT_UINT, *w, *v),
        ItemKind::NInt(m, w) => write_head(out, MT_NINT, *w, *m),

        ItemKind::Bstr(StringBody::Definite(bytes, w)) => {
            write_head(out, MT_BSTR, *w, bytes.len() as u64);
            out.extend_from_slice(bytes);
        }
        ItemKind::Bstr(StringBody::Indefinite(chunks)) => {
            write_indefinite_head(out, MT_BSTR);
            stack.push(Work::Break);
            for chunk in chunks.iter().rev() {
                stack.push(Work::Node(chunk.retain()));
            }
        }
        ItemKind::Tstr(StringBody::Definite(bytes, w)) => {
            write_head(out, MT_TSTR, *w, bytes.len() as u64);
            out.extend_from_slice(bytes);
        }
        ItemKind::Tstr(StringBody::Indefinite(chunks)) => {
            write_indefinite_head(out, MT_TSTR);
            stack.push(Work::Break);
            for chunk in chunks.iter().rev() {
                stack.push(Work::Node(chunk.retain()));
            }
        }

        ItemKind::Array(ArrayBody {
            capacity: Some((cap, w)),
            items,
        }) => {
            write_head(out, MT_ARRAY, *w, *cap as u64);
            for child in items.iter().rev() {
                stack.push(Work::Node(child.retain()));
            }
        }
        ItemKind::Array(ArrayBody {
            capacity: None,
            items,
        }) => {
            write_indefinite_head(out, MT_ARRAY);
            stack.push(Work::Break);
            for child in items.iter().rev() {
                stack.push(Work::Node(child.retain()));
            }
        }

        ItemKind::Map(MapBody {
            capacity: Some((cap, w)),
            pairs,
        }) => {
            write_head(out, MT_MAP, *w, *cap as u64);
            for (k, v) in pairs.iter().rev() {
                stack.push(Work::Node(v.retain()));
                stack.push(Work::Node(k.retain()));
            }
        }
        ItemKind::Map(MapBody {
            capacity: None,
            pairs,
        }) => {
            write_indefinite_head(out, MT_MAP);
            stack.push(Work::Break);
            for (k, v) in pairs.iter().rev() {
                stack.push(Work::Node(v.retain()));
                stack.push(Work::Node(k.retain()));
            }
        }

        ItemKind::Tag(t, w, child) => {
            write_head(out, MT_TAG, *w, *t);
            stack.push(Work::Node(child.retain()));
        }

        ItemKind::Float16(v) => {
            out.push(MT_SIMPLE | AI_FLOAT16);
            out.extend_from_slice(&v.to_be_bytes());
        }
        ItemKind::Float32(v) => {
            out.push(MT_SIMPLE | AI_FLOAT32);
            out.extend_from_slice(&v.to_be_bytes());
        }
        ItemKind::Float64(v) => {
            out.push(MT_SIMPLE | AI_FLOAT64);
            out.extend_from_slice(&v.to_be_bytes());
        }
        ItemKind::Bool(false) => out.push(MT_SIMPLE | AI_FALSE),
        ItemKind::Bool(true) => out.push(MT_SIMPLE | AI_TRUE),
        ItemKind::Null => out.push(MT_SIMPLE | AI_NULL),
        ItemKind::Undefined => out.push(MT_SIMPLE | AI_UNDEFINED),
        ItemKind::Simple(v) if *v <= PAYLOAD_AI_BITS => out.push(MT_SIMPLE | *v),
        ItemKind::Simple(v) => {
            out.push(MT_SIMPLE | AI_SIMPLE_BYTE);
            out.push(*v);
        }
    }
}

fn encode_walk(item: &Item, out: &mut Vec<u8>) {
    let mut stack = vec![Work::Node(item.retain())];
    while let Some(work) = stack.pop() {
        match work {
            Work::Node(item) => encode_node(&item, out, &mut stack),
            Work::Break => out.push(BREAK_BYTE),
        }
    }
}

/// Encode `item` to a freshly allocated byte vector.
#[cfg_attr(feature = "trace", trace)]
pub fn encode(item: &Item) -> Vec<u8> {
    let mut out = Vec::new();
    encode_walk(item, &mut out);
    out
}

/// The exact number of bytes [`encode`] would produce for `item`, without allocating the
/// intermediate buffer at full size - used to size a caller-supplied fixed buffer up front.
#[cfg_attr(feature = "trace", trace)]
pub fn encoded_len(item: &Item) -> usize {
    // The cheapest correct implementation of a measurement pass is the real encode: container
    // heads are the same number of bytes whether or not we keep what follows them.
    encode(item).len()
}

/// Encode `item` into a caller-supplied buffer, failing with [`CborError::BufferTooSmall`] rather
/// than growing it. Returns the number of bytes written.
#[cfg_attr(feature = "trace", trace)]
pub fn encode_into(item: &Item, buf: &mut [u8]) -> Result<usize> {
    let bytes = encode(item);
    if bytes.len() > buf.len() {
        return Err(CborError::BufferTooSmall(bytes.len()));
    }
    buf[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::decode_one;
    use crate::item::FloatValue;

    fn round_trip(bytes: &[u8]) {
        let (item, used) = decode_one(bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(encode(&item), bytes);
    }

    #[test]
    fn small_unsigned() {
        round_trip(&[0x0A]);
    }

    #[test]
    fn negative_int_16bit() {
        round_trip(&[0x39, 0x01, 0xF4]);
    }

    #[test]
    fn definite_byte_string() {
        round_trip(&[0x43, 0x61, 0x62, 0x63]);
    }

    #[test]
    fn indefinite_text_string() {
        round_trip(&[0x7F, 0x63, 0x61, 0x62, 0x63, 0xFF]);
    }

    #[test]
    fn definite_map() {
        round_trip(&[0xA1, 0x18, 0x2A, 0x18, 0x2B]);
    }

    #[test]
    fn tag() {
        round_trip(&[0xCA, 0x18, 0x2A]);
    }

    #[test]
    fn nested_indefinite_array_of_definite_arrays() {
        round_trip(&[0x9F, 0x81, 0x01, 0x81, 0x02, 0xFF]);
    }

    #[test]
    fn half_float_round_trips_bit_exact() {
        round_trip(&[0xF9, 0x3C, 0x00]);
    }

    #[test]
    fn freshly_constructed_item_uses_smallest_width() {
        let item = Item::new_uint64(42); // built with an explicit W8 hint
        assert_eq!(encode(&item), vec![0x1B, 0, 0, 0, 0, 0, 0, 0, 42]);

        let item = Item::new_uint8(42); // built with smallest-fit width
        assert_eq!(encode(&item), vec![0x18, 42]);
    }

    #[test]
    fn buffer_too_small_reports_exact_need() {
        let (item, _) = decode_one(&[0x43, 0x61, 0x62, 0x63]).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(
            encode_into(&item, &mut buf),
            Err(CborError::BufferTooSmall(4))
        );
        let mut buf = [0u8; 4];
        assert_eq!(encode_into(&item, &mut buf), Ok(4));
        assert_eq!(&buf, &[0x43, 0x61, 0x62, 0x63]);
    }

    #[test]
    fn deeply_nested_indefinite_array_encodes_without_overflow() {
        let mut top = Item::new_indefinite_array();
        for _ in 0..50_000 {
            let next = Item::new_indefinite_array();
            next.array_push(top).unwrap();
            top = next;
        }
        let bytes = encode(&top);
        assert_eq!(bytes.iter().filter(|&&b| b == 0x9F).count(), 50_001);
    }

    #[test]
    fn float_distinguishes_precision_on_reencode() {
        let (item, _) = decode_one(&[0xFA, 0x3F, 0x80, 0x00, 0x00]).unwrap(); // f32 1.0
        assert!(matches!(item.as_float(), Some(FloatValue::F32(v)) if v == 1.0));
        assert_eq!(encode(&item), vec![0xFA, 0x3F, 0x80, 0x00, 0x00]);
    }
}
