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
//! `deep_copy` and `structural_equal` at the public API level: a copy shares no storage with its
//! source, is structurally equal to it, and the comparison is by value rather than identity.

use rs_cbor_tree::builder::decode_one;
use rs_cbor_tree::copy::{deep_copy, structural_equal};
use rs_cbor_tree::item::Item;

#[test]
fn deep_copy_of_a_decoded_tree_shares_no_storage() {
    let (original, _) = decode_one(&[0xA1, 0x18, 0x2A, 0x18, 0x2B]).unwrap();
    let copy = deep_copy(&original);

    assert!(structural_equal(&original, &copy));
    assert_ne!(original, copy); // PartialEq on Item is pointer identity
    assert_eq!(original.strong_count(), 1);
    assert_eq!(copy.strong_count(), 1);
}

#[test]
fn deep_copy_leaves_the_source_refcounts_untouched() {
    let shared = Item::new_uint8(9);
    let array = Item::new_indefinite_array();
    array.array_push(shared.retain()).unwrap();
    assert_eq!(shared.strong_count(), 2);

    let copy = deep_copy(&array);
    assert_eq!(shared.strong_count(), 2); // unaffected by the copy
    assert_eq!(copy.array_get(0).unwrap().strong_count(), 1); // fresh handle, fresh node
}

#[test]
fn structural_equal_is_value_based_not_identity_based() {
    let a = Item::new_uint8(10);
    let b = Item::new_uint8(10);
    assert_ne!(a, b); // different nodes
    assert!(structural_equal(&a, &b)); // same value
}

#[test]
fn structural_equal_distinguishes_float_precision() {
    let a = Item::new_float32(1.0);
    let b = Item::new_float64(1.0);
    assert!(!structural_equal(&a, &b));
}

#[test]
fn structural_equal_rejects_different_map_key_order() {
    let a = Item::new_definite_map(2);
    a.map_add(Item::new_uint8(1), Item::new_uint8(10)).unwrap();
    a.map_add(Item::new_uint8(2), Item::new_uint8(20)).unwrap();

    let b = Item::new_definite_map(2);
    b.map_add(Item::new_uint8(2), Item::new_uint8(20)).unwrap();
    b.map_add(Item::new_uint8(1), Item::new_uint8(10)).unwrap();

    assert!(!structural_equal(&a, &b));
}

#[test]
fn deep_copy_round_trips_through_encode_identically_to_the_source() {
    use rs_cbor_tree::encode::encode;

    let (original, _) = decode_one(&[0xCA, 0x18, 0x2A]).unwrap();
    let copy = deep_copy(&original);
    assert_eq!(encode(&original), encode(&copy));
}
