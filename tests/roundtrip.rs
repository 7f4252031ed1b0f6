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
//! The round-trip invariant: `decode_one(encode(T))` reproduces `T` structurally and consumes
//! exactly `encode(T).len()` bytes, for every shape the wire format supports.

use rs_cbor_tree::builder::{decode_one, decode_one_with_depth};
use rs_cbor_tree::copy::structural_equal;
use rs_cbor_tree::encode::encode;
use rs_cbor_tree::item::Item;

fn assert_round_trips(bytes: &[u8]) {
    let (item, used) = decode_one(bytes).unwrap();
    assert_eq!(used, bytes.len());
    let re_encoded = encode(&item);
    assert_eq!(re_encoded, bytes);
    let (item2, used2) = decode_one(&re_encoded).unwrap();
    assert_eq!(used2, re_encoded.len());
    assert!(structural_equal(&item, &item2));
}

#[test]
fn small_unsigned_round_trips() {
    assert_round_trips(&[0x0A]);
}

#[test]
fn negative_int_16bit_round_trips() {
    assert_round_trips(&[0x39, 0x01, 0xF4]);
}

#[test]
fn definite_byte_string_round_trips() {
    assert_round_trips(&[0x43, 0x61, 0x62, 0x63]);
}

#[test]
fn indefinite_text_string_round_trips() {
    assert_round_trips(&[0x7F, 0x63, 0x61, 0x62, 0x63, 0xFF]);
}

#[test]
fn definite_map_round_trips() {
    assert_round_trips(&[0xA1, 0x18, 0x2A, 0x18, 0x2B]);
}

#[test]
fn tag_round_trips() {
    assert_round_trips(&[0xCA, 0x18, 0x2A]);
}

#[test]
fn nested_containers_round_trip() {
    // {_ 1: [1, 2], 2: (_ h'ab', h'cd')}
    assert_round_trips(&[
        0xBF, 0x01, 0x82, 0x01, 0x02, 0x02, 0x5F, 0x41, 0xab, 0x41, 0xcd, 0xff, 0xFF,
    ]);
}

#[test]
fn half_float_preserves_precision_through_round_trip() {
    assert_round_trips(&[0xF9, 0x3C, 0x00]);
}

#[test]
fn freshly_built_tree_round_trips_through_the_wire() {
    let map = Item::new_definite_map(1);
    map.map_add(Item::new_uint8(10), Item::new_bool(true)).unwrap();
    let bytes = encode(&map);
    let (decoded, used) = decode_one(&bytes).unwrap();
    assert_eq!(used, bytes.len());
    assert!(structural_equal(&map, &decoded));
}

#[test]
fn deeply_nested_array_round_trips_without_overflowing_the_stack() {
    let depth = 20_000;
    let mut top = Item::new_indefinite_array();
    for _ in 0..depth {
        let next = Item::new_indefinite_array();
        next.array_push(top).unwrap();
        top = next;
    }
    let bytes = encode(&top);
    let (decoded, used) = decode_one_with_depth(&bytes, depth + 1).unwrap();
    assert_eq!(used, bytes.len());
    assert!(structural_equal(&top, &decoded));
}
