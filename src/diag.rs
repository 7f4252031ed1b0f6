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
 * diag - CBOR diagnostic notation for debugging decoded trees
 *
 * Diagnostic notation is defined alongside CBOR itself (RFC 8949 §8) as a human-readable rendering
 * of a CBOR value, e.g. `{1: "a", 2: [1, 2]}` or `h'010203'`. This module is a debugging aid, not
 * a pretty-printer CLI (explicitly out of scope): it is a `Display` impl and nothing else.
 **************************************************************************************************/
use std::fmt;

use crate::item::{ArrayBody, Item, ItemKind, MapBody, StringBody};

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_diag(self, f)
    }
}

fn write_diag(item: &Item, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &*item.kind_ref() {
        ItemKind::UInt(v, _) => write!(f, "{}", v),
        ItemKind::NInt(m, _) => write!(f, "{}", -1i128 - *m as i128),
        ItemKind::Bstr(StringBody::Definite(bytes, _)) => write_hex_string(f, bytes),
        ItemKind::Bstr(StringBody::Indefinite(chunks)) => {
            write!(f, "(_ ")?;
            write_comma_separated(f, chunks)?;
            write!(f, ")")
        }
        ItemKind::Tstr(StringBody::Definite(bytes, _)) => {
            write!(f, "\"{}\"", String::from_utf8_lossy(bytes))
        }
        ItemKind::Tstr(StringBody::Indefinite(chunks)) => {
            write!(f, "(_ ")?;
            write_comma_separated(f, chunks)?;
            write!(f, ")")
        }
        ItemKind::Array(ArrayBody { capacity, items }) => {
            if capacity.is_none() {
                write!(f, "[_ ")?;
            } else {
                write!(f, "[")?;
            }
            write_comma_separated(f, items)?;
            write!(f, "]")
        }
        ItemKind::Map(MapBody { capacity, pairs }) => {
            if capacity.is_none() {
                write!(f, "{{_ ")?;
            } else {
                write!(f, "{{")?;
            }
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_diag(k, f)?;
                write!(f, ": ")?;
                write_diag(v, f)?;
            }
            write!(f, "}}")
        }
        ItemKind::Tag(t, _, child) => {
            write!(f, "{}(", t)?;
            write_diag(child, f)?;
            write!(f, ")")
        }
        ItemKind::Float16(v) => write_float(f, v.to_f64()),
        ItemKind::Float32(v) => write_float(f, *v as f64),
        ItemKind::Float64(v) => write_float(f, *v),
        ItemKind::Bool(b) => write!(f, "{}", b),
        ItemKind::Null => write!(f, "null"),
        ItemKind::Undefined => write!(f, "undefined"),
        ItemKind::Simple(v) => write!(f, "simple({})", v),
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, items: &[Item]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_diag(item, f)?;
    }
    Ok(())
}

fn write_hex_string(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "h'")?;
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    write!(f, "'")
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        write!(f, "NaN")
    } else if v.is_infinite() {
        write!(f, "{}Infinity", if v < 0.0 { "-" } else { "" })
    } else {
        write!(f, "{}", v)
    }
}

/// The diagnostic-notation rendering of `item`, as an owned `String`. A thin convenience over
/// `item`'s own [`fmt::Display`] impl.
pub fn to_diag_string(item: &Item) -> String {
    item.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::decode_one;

    #[test]
    fn unsigned_and_negative_ints() {
        assert_eq!(to_diag_string(&Item::new_uint8(10)), "10");
        assert_eq!(
            to_diag_string(&Item::new_negint16(0x01F4)),
            format!("{}", -1i128 - 0x01F4)
        );
    }

    #[test]
    fn byte_string_is_hex() {
        let (item, _) = decode_one(&[0x43, 0x61, 0x62, 0x63]).unwrap();
        assert_eq!(to_diag_string(&item), "h'616263'");
    }

    #[test]
    fn text_string_is_quoted() {
        let bstr = Item::new_definite_string(3);
        bstr.textstring_set_data(b"abc").unwrap();
        assert_eq!(to_diag_string(&bstr), "\"abc\"");
    }

    #[test]
    fn map_renders_as_key_colon_value_pairs() {
        let (item, _) = decode_one(&[0xA1, 0x18, 0x2A, 0x18, 0x2B]).unwrap();
        assert_eq!(to_diag_string(&item), "{42: 43}");
    }

    #[test]
    fn tag_renders_as_number_paren_child() {
        let (item, _) = decode_one(&[0xCA, 0x18, 0x2A]).unwrap();
        assert_eq!(to_diag_string(&item), "10(42)");
    }

    #[test]
    fn indefinite_array_gets_underscore_marker() {
        let arr = Item::new_indefinite_array();
        arr.array_push(Item::new_uint8(1)).unwrap();
        assert_eq!(to_diag_string(&arr), "[_ 1]");
    }

    #[test]
    fn simple_values_render_their_keywords() {
        assert_eq!(to_diag_string(&Item::new_bool(true)), "true");
        assert_eq!(to_diag_string(&Item::new_null()), "null");
        assert_eq!(to_diag_string(&Item::new_undefined()), "undefined");
    }
}
