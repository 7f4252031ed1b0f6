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
 * rs_cbor_tree module definition
 *
 * An owned, reference-counted CBOR (RFC 8949) item tree, with a streaming decoder, a tree builder
 * on top of it, a faithful (non-canonical) re-encoder, and deep-copy/structural-equal utilities.
 **************************************************************************************************/
#![warn(missing_docs)]

//! # rs_cbor_tree
//!
//! `rs_cbor_tree` decodes CBOR (RFC 8949) into an owned, reference-counted, mutable tree of
//! [`item::Item`] values, and re-encodes it bit-exactly. Where its no_std, buffer-borrowing sibling
//! is built for embedded targets that never want to own their data, this crate is for callers who
//! want to build, inspect and mutate a CBOR document as a first-class in-memory value: a COSE
//! signer assembling a `Sign1` structure field by field, a protocol relay that decodes a message,
//! edits one field, and re-encodes it, or a test harness constructing fixtures programmatically.
//!
//! ## Layers
//!
//! - [`item`] - the [`item::Item`] tree itself: constructors, accessors, mutators, and the
//!   `retain`/`release` reference-counting pair. Every other layer works in terms of `Item`.
//! - [`decode`] - the streaming decoder: one [`decode::Token`] at a time from a byte buffer,
//!   independent of how that buffer is produced or held.
//! - [`builder`] - [`builder::decode_one`], which assembles tokens into a complete `Item` tree
//!   using an explicit stack rather than recursion.
//! - [`encode`] - the inverse traversal: an `Item` tree back to bytes, faithful to the widths and
//!   definite/indefinite shapes the tree carries rather than canonicalizing them.
//! - [`copy`] - [`copy::deep_copy`] and [`copy::structural_equal`], a storage-independent clone and
//!   a by-value comparison.
//! - [`error`] - the closed [`error::CborError`] taxonomy shared by every layer above.
//! - [`diag`] - a `Display` impl rendering an `Item` in CBOR diagnostic notation, for debugging.
//!
//! With the `full` feature, [`item::Item`] additionally grows `chrono`-backed convenience
//! constructors and accessors for tag 0 (RFC 3339 date/time text strings) and tag 1 (numeric epoch
//! offsets), mirroring the combinator layer's `is_date_time`/`is_epoch` support.
//!
//! ## Example
//!
//! ```
//! use rs_cbor_tree::builder::decode_one;
//! use rs_cbor_tree::encode::encode;
//! use rs_cbor_tree::item::Item;
//!
//! // {10: 42}
//! let (map, used) = decode_one(&[0xA1, 0x0A, 0x18, 0x2A]).unwrap();
//! assert_eq!(used, 4);
//! let (_, value) = map.map_get(0).unwrap();
//! assert_eq!(value.as_uint(), Some(42));
//!
//! map.map_add(Item::new_uint8(11), Item::new_bool(true)).unwrap();
//! assert_eq!(map.fill(), Some(2));
//!
//! let bytes = encode(&map);
//! let (round_tripped, _) = decode_one(&bytes).unwrap();
//! assert_eq!(round_tripped.fill(), Some(2));
//! ```

/// CBOR wire-format constants (major-type bit patterns, additional-information values). Used by
/// [`decode`] and [`encode`]; not part of the public surface.
pub(crate) mod constants;

/// The [`item::Item`] tree: major-type tagged, reference-counted CBOR values, their constructors,
/// accessors, mutators, and `retain`/`release`.
pub mod item;

/// The byte-driven streaming decoder: [`decode::decode_token`] turns a buffer into one
/// [`decode::Token`] and a byte count, independent of any notion of tree or nesting.
pub mod decode;

/// The tree builder: [`builder::decode_one`] assembles a stream of tokens into a complete
/// [`item::Item`], using an explicit stack so input nesting depth never becomes call-stack depth.
pub mod builder;

/// The encoder: the inverse of [`builder`], turning an [`item::Item`] tree back into bytes.
pub mod encode;

/// Deep copy and structural (by-value) comparison of [`item::Item`] trees.
pub mod copy;

/// The closed [`error::CborError`] taxonomy used by every other module in this crate.
pub mod error;

/// CBOR diagnostic notation `Display` support, for debugging decoded trees.
pub mod diag;

pub use error::{CborError, Result};
pub use item::Item;
