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
 * Deep copy and structural comparison
 *
 * `deep_copy` produces a subtree that shares no storage with its source, with every node at
 * refcount 1; `structural_equal` compares two trees by shape and content rather than by identity.
 * Both walk the tree iteratively (an explicit worklist for the copy, an explicit pair-of-worklists
 * for the comparison) for the same reason `crate::encode` does: the recursion depth of the source
 * tree must not become the recursion depth of the Rust call stack.
 **************************************************************************************************/
use crate::item::{ArrayBody, Item, ItemKind, MapBody, StringBody};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Build a copy of a single node's payload, given copies of its children (already produced,
/// since `deep_copy` processes a tree bottom-up via an explicit stack).
fn rebuild(kind: &ItemKind, children: Vec<Item>) -> Item {
    match kind {
        ItemKind::UInt(v, w) => Item::new_uint_raw(*v, *w),
        ItemKind::NInt(m, w) => Item::new_negint_raw(*m, *w),
        ItemKind::Bstr(StringBody::Definite(bytes, w)) => {
            Item::new_definite_bytestring_raw(bytes.clone(), *w)
        }
        ItemKind::Bstr(StringBody::Indefinite(_)) => {
            let copy = Item::new_indefinite_bytestring();
            for chunk in children {
                copy.bytestring_add_chunk(chunk)
                    .expect("a copied chunk keeps the shape of its source");
            }
            copy
        }
        ItemKind::Tstr(StringBody::Definite(bytes, w)) => {
            Item::new_definite_string_raw(bytes.clone(), *w)
        }
        ItemKind::Tstr(StringBody::Indefinite(_)) => {
            let copy = Item::new_indefinite_string();
            for chunk in children {
                copy.string_add_chunk(chunk)
                    .expect("a copied chunk keeps the shape of its source");
            }
            copy
        }
        ItemKind::Array(ArrayBody {
            capacity: Some((cap, w)),
            ..
        }) => {
            let copy = Item::new_definite_array_raw(*cap, *w);
            for child in children {
                copy.array_push(child)
                    .expect("a copied array keeps the capacity of its source");
            }
            copy
        }
        ItemKind::Array(ArrayBody { capacity: None, .. }) => {
            let copy = Item::new_indefinite_array();
            for child in children {
                copy.array_push(child).expect("indefinite arrays never fill up");
            }
            copy
        }
        ItemKind::Map(MapBody {
            capacity: Some((cap, w)),
            ..
        }) => {
            let copy = Item::new_definite_map_raw(*cap, *w);
            let mut children = children.into_iter();
            while let (Some(k), Some(v)) = (children.next(), children.next()) {
                copy.map_add(k, v)
                    .expect("a copied map keeps the capacity of its source");
            }
            copy
        }
        ItemKind::Map(MapBody { capacity: None, .. }) => {
            let copy = Item::new_indefinite_map();
            let mut children = children.into_iter();
            while let (Some(k), Some(v)) = (children.next(), children.next()) {
                copy.map_add(k, v).expect("indefinite maps never fill up");
            }
            copy
        }
        ItemKind::Tag(t, w, _) => {
            let child = children.into_iter().next().expect("a tag has exactly one child");
            Item::new_tag_raw(*t, *w, child)
        }
        ItemKind::Float16(v) => Item::new_float16(*v),
        ItemKind::Float32(v) => Item::new_float32(*v),
        ItemKind::Float64(v) => Item::new_float64(*v),
        ItemKind::Bool(b) => Item::new_bool(*b),
        ItemKind::Null => Item::new_null(),
        ItemKind::Undefined => Item::new_undefined(),
        ItemKind::Simple(v) => Item::new_simple(*v),
    }
}

/// The direct children of a node that `deep_copy`/`structural_equal` need to recurse into, in
/// order. Leaves (ints, floats, definite strings, simple values) have none.
fn children_of(kind: &ItemKind) -> Vec<Item> {
    match kind {
        ItemKind::Bstr(StringBody::Indefinite(c)) | ItemKind::Tstr(StringBody::Indefinite(c)) => {
            c.clone()
        }
        ItemKind::Array(a) => a.items.clone(),
        ItemKind::Map(m) => {
            let mut out = Vec::with_capacity(m.pairs.len() * 2);
            for (k, v) in &m.pairs {
                out.push(k.retain());
                out.push(v.retain());
            }
            out
        }
        ItemKind::Tag(_, _, child) => vec![child.retain()],
        _ => Vec::new(),
    }
}

/// A post-order work item: visit `item`'s children first, then rebuild `item` itself once they
/// have all produced their copies.
enum Work {
    Visit(Item),
    Rebuild(Item, usize),
}

/// Produce a structurally equal copy of `item` that shares no storage with it. Every node in the
/// copy starts at refcount 1; every node in the source is left at its original refcount (copying
/// only ever takes new references via [`Item::retain`]/clone, it never mutates the source).
#[cfg_attr(feature = "trace", trace)]
pub fn deep_copy(item: &Item) -> Item {
    let mut work = vec![Work::Visit(item.retain())];
    let mut results: Vec<Item> = Vec::new();

    while let Some(step) = work.pop() {
        match step {
            Work::Visit(node) => {
                let kids = children_of(&node.kind_ref());
                work.push(Work::Rebuild(node, kids.len()));
                for kid in kids.into_iter().rev() {
                    work.push(Work::Visit(kid));
                }
            }
            Work::Rebuild(node, n_children) => {
                let split_at = results.len() - n_children;
                let children = results.split_off(split_at);
                let copy = rebuild(&node.kind_ref(), children);
                results.push(copy);
            }
        }
    }

    results
        .pop()
        .expect("deep_copy always produces exactly one result for its one root")
}

fn floats_bitwise_equal(a: &ItemKind, b: &ItemKind) -> Option<bool> {
    match (a, b) {
        (ItemKind::Float16(x), ItemKind::Float16(y)) => Some(x.to_bits() == y.to_bits()),
        (ItemKind::Float32(x), ItemKind::Float32(y)) => Some(x.to_bits() == y.to_bits()),
        (ItemKind::Float64(x), ItemKind::Float64(y)) => Some(x.to_bits() == y.to_bits()),
        _ => None,
    }
}

/// `true` if `a` and `b` have the same shape (major type, width hints, definite/indefinite
/// shape) and the same content, recursively. Unlike `PartialEq` on [`Item`] (which is pointer
/// identity), this compares by value and does not care whether `a` and `b` are the same node.
#[cfg_attr(feature = "trace", trace)]
pub fn structural_equal(a: &Item, b: &Item) -> bool {
    let mut pairs = vec![(a.retain(), b.retain())];

    while let Some((x, y)) = pairs.pop() {
        let xk = x.kind_ref();
        let yk = y.kind_ref();
        let node_equal = match (&*xk, &*yk) {
            (ItemKind::UInt(v1, w1), ItemKind::UInt(v2, w2)) => v1 == v2 && w1 == w2,
            (ItemKind::NInt(m1, w1), ItemKind::NInt(m2, w2)) => m1 == m2 && w1 == w2,
            (ItemKind::Bstr(StringBody::Definite(b1, w1)), ItemKind::Bstr(StringBody::Definite(b2, w2))) => {
                b1 == b2 && w1 == w2
            }
            (ItemKind::Bstr(StringBody::Indefinite(c1)), ItemKind::Bstr(StringBody::Indefinite(c2))) => {
                c1.len() == c2.len()
            }
            (ItemKind::Tstr(StringBody::Definite(b1, w1)), ItemKind::Tstr(StringBody::Definite(b2, w2))) => {
                b1 == b2 && w1 == w2
            }
            (ItemKind::Tstr(StringBody::Indefinite(c1)), ItemKind::Tstr(StringBody::Indefinite(c2))) => {
                c1.len() == c2.len()
            }
            (ItemKind::Array(a1), ItemKind::Array(a2)) => {
                a1.capacity == a2.capacity && a1.items.len() == a2.items.len()
            }
            (ItemKind::Map(m1), ItemKind::Map(m2)) => {
                m1.capacity == m2.capacity && m1.pairs.len() == m2.pairs.len()
            }
            (ItemKind::Tag(t1, w1, _), ItemKind::Tag(t2, w2, _)) => t1 == t2 && w1 == w2,
            (ItemKind::Bool(v1), ItemKind::Bool(v2)) => v1 == v2,
            (ItemKind::Null, ItemKind::Null) => true,
            (ItemKind::Undefined, ItemKind::Undefined) => true,
            (ItemKind::Simple(v1), ItemKind::Simple(v2)) => v1 == v2,
            (xk, yk) => match floats_bitwise_equal(xk, yk) {
                Some(eq) => eq,
                None => false, // different major type / shape
            },
        };
        if !node_equal {
            return false;
        }

        let xc = children_of(&xk);
        let yc = children_of(&yk);
        drop(xk);
        drop(yk);
        if xc.len() != yc.len() {
            return false;
        }
        pairs.extend(xc.into_iter().zip(yc));
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::decode_one;

    #[test]
    fn deep_copy_shares_no_storage() {
        let original = Item::new_definite_array(2);
        original.array_push(Item::new_uint8(1)).unwrap();
        original.array_push(Item::new_uint8(2)).unwrap();

        let copy = deep_copy(&original);
        assert!(structural_equal(&original, &copy));
        assert_ne!(original, copy); // PartialEq on Item is pointer identity
        assert_eq!(original.strong_count(), 1);
        assert_eq!(copy.strong_count(), 1);
    }

    #[test]
    fn deep_copy_preserves_width_hints_and_shape() {
        let (original, _) = decode_one(&[0xCA, 0x18, 0x2A]).unwrap();
        let copy = deep_copy(&original);
        assert!(structural_equal(&original, &copy));
        assert_eq!(copy.tag_width(), original.tag_width());
    }

    #[test]
    fn structural_equal_rejects_differing_width_hint() {
        let a = Item::new_uint_raw(10, crate::item::Width::W0);
        let b = Item::new_uint_raw(10, crate::item::Width::W1);
        assert!(!structural_equal(&a, &b));
    }

    #[test]
    fn structural_equal_rejects_definite_vs_indefinite() {
        let a = Item::new_definite_array(0);
        let b = Item::new_indefinite_array();
        assert!(!structural_equal(&a, &b));
    }

    #[test]
    fn structural_equal_is_deep_for_nested_containers() {
        let a = Item::new_definite_array(1);
        let inner_a = Item::new_definite_array(1);
        inner_a.array_push(Item::new_uint8(1)).unwrap();
        a.array_push(inner_a).unwrap();

        let b = Item::new_definite_array(1);
        let inner_b = Item::new_definite_array(1);
        inner_b.array_push(Item::new_uint8(2)).unwrap();
        b.array_push(inner_b).unwrap();

        assert!(!structural_equal(&a, &b));
    }

    #[test]
    fn deep_copy_of_a_deep_tree_does_not_overflow_the_stack() {
        let mut top = Item::new_indefinite_array();
        for _ in 0..50_000 {
            let next = Item::new_indefinite_array();
            next.array_push(top).unwrap();
            top = next;
        }
        let copy = deep_copy(&top);
        assert!(structural_equal(&top, &copy));
    }
}
