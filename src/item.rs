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
 * rs_cbor_tree item model
 *
 * The `Item` is a polymorphic, reference-counted CBOR value. It is the unit every other layer of
 * this crate works with: the tree builder assembles them, the encoder walks them, the copy/compare
 * utilities clone and diff them.
 **************************************************************************************************/
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

use crate::error::{CborError, Result};

use half::f16;

#[cfg(feature = "full")]
use std::convert::TryFrom;

/// The major type of a CBOR item, matching RFC 8949's major types 0..=7. Float and simple values
/// share major type 7.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MajorType {
    UInt,
    NInt,
    ByteString,
    TextString,
    Array,
    Map,
    Tag,
    /// RFC 8949's major type 7: floats, booleans, null, undefined, and simple values all share
    /// this wire-level major type.
    FloatOrSimple,
}

/// The encoded width of a head's additional-information payload, preserved across decode/encode
/// so that re-encoding a decoded item is bit-exact. This applies not just to integer values but to
/// every length-bearing head: array/map declared lengths, definite string lengths, and tag
/// numbers all carry one of these, since CBOR's AI-width encoding is uniform across major types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    /// Value fits directly in the additional-information bits (AI < 24).
    W0,
    W1,
    W2,
    W4,
    W8,
}

impl Width {
    /// The width that the smallest faithful encoding of `v` would use, ignoring any existing
    /// hint. Used only by constructors that build a value from scratch; decoded items always
    /// carry their own width explicitly.
    pub(crate) fn smallest_for(v: u64) -> Width {
        match v {
            0..=23 => Width::W0,
            24..=0xff => Width::W1,
            0x100..=0xffff => Width::W2,
            0x1_0000..=0xffff_ffff => Width::W4,
            _ => Width::W8,
        }
    }
}

/// One decoded or constructed floating point value, retaining its original precision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FloatValue {
    F16(f16),
    F32(f32),
    F64(f64),
}

/// The shape taken by byte and text strings: either a single owned, definite-length run of
/// bytes (with the head width that encoded its length), or an ordered sequence of definite
/// chunk `Item`s of the same major type.
#[derive(Debug)]
pub(crate) enum StringBody {
    Definite(Vec<u8>, Width),
    Indefinite(Vec<Item>),
}

/// The shape taken by arrays: a fixed-capacity, partially filled sequence (capacity paired with
/// the head width that declared it), or a growable one.
#[derive(Debug)]
pub(crate) struct ArrayBody {
    pub(crate) capacity: Option<(usize, Width)>,
    pub(crate) items: Vec<Item>,
}

/// The shape taken by maps: ordered (key, value) pairs, with an optional declared capacity and
/// the head width that declared it.
#[derive(Debug)]
pub(crate) struct MapBody {
    pub(crate) capacity: Option<(usize, Width)>,
    pub(crate) pairs: Vec<(Item, Item)>,
}

#[derive(Debug)]
pub(crate) enum ItemKind {
    UInt(u64, Width),
    NInt(u64, Width),
    Bstr(StringBody),
    Tstr(StringBody),
    Array(ArrayBody),
    Map(MapBody),
    Tag(u64, Width, Item),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Null,
    Undefined,
    Simple(u8),
}

#[derive(Debug)]
struct Inner {
    kind: RefCell<ItemKind>,
}

/// A single CBOR value, shared by reference count.
///
/// `Item` is a cheap handle (an `Arc` clone) around a node in a CBOR tree. Every parent-to-child
/// edge is one stored `Item` handle; `Item`'s `Clone` impl is `retain`, and dropping the last
/// handle to a node is `release`. Mutation goes through `&self` methods (`array_push`, `map_add`,
/// ...) because multiple handles may alias the same node, exactly as multiple `cbor_item_t*`
/// pointers may alias the same node in the library this crate's design is grounded on.
#[derive(Debug, Clone)]
pub struct Item(Arc<Inner>);

impl PartialEq for Item {
    /// Pointer-identity equality - use [`crate::copy::structural_equal`] to compare by value.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Item {
    pub(crate) fn from_kind(kind: ItemKind) -> Item {
        Item(Arc::new(Inner {
            kind: RefCell::new(kind),
        }))
    }

    /// Take a reference on `self`, returning a new handle to the same node.
    #[cfg_attr(feature = "trace", trace)]
    pub fn retain(&self) -> Item {
        Item(Arc::clone(&self.0))
    }

    /// Drop this handle. When it is the last live handle to a node, the node's children are
    /// released too, iteratively rather than recursively, so that dropping a deep tree cannot
    /// overflow the stack.
    #[cfg_attr(feature = "trace", trace)]
    pub fn release(self) {
        drop(self)
    }

    /// The number of live handles to this node, including `self`.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub(crate) fn kind_ref(&self) -> std::cell::Ref<'_, ItemKind> {
        self.0.kind.borrow()
    }

    pub(crate) fn kind_mut(&self) -> std::cell::RefMut<'_, ItemKind> {
        self.0.kind.borrow_mut()
    }

    /***********************************************************************************************
     * Constructors
     **********************************************************************************************/

    pub fn new_uint8(v: u8) -> Item {
        Item::from_kind(ItemKind::UInt(v as u64, Width::smallest_for(v as u64)))
    }
    pub fn new_uint16(v: u16) -> Item {
        Item::from_kind(ItemKind::UInt(v as u64, Width::W2))
    }
    pub fn new_uint32(v: u32) -> Item {
        Item::from_kind(ItemKind::UInt(v as u64, Width::W4))
    }
    pub fn new_uint64(v: u64) -> Item {
        Item::from_kind(ItemKind::UInt(v, Width::W8))
    }

    /// `m` is the encoded magnitude; the logical value is `-1 - m`.
    pub fn new_negint8(m: u8) -> Item {
        Item::from_kind(ItemKind::NInt(m as u64, Width::smallest_for(m as u64)))
    }
    pub fn new_negint16(m: u16) -> Item {
        Item::from_kind(ItemKind::NInt(m as u64, Width::W2))
    }
    pub fn new_negint32(m: u32) -> Item {
        Item::from_kind(ItemKind::NInt(m as u64, Width::W4))
    }
    pub fn new_negint64(m: u64) -> Item {
        Item::from_kind(ItemKind::NInt(m, Width::W8))
    }

    /// A definite byte string of `len` bytes, initially zero-filled. Use
    /// [`Item::bytestring_set_data`] to populate it.
    pub fn new_definite_bytestring(len: usize) -> Item {
        Item::from_kind(ItemKind::Bstr(StringBody::Definite(
            vec![0u8; len],
            Width::smallest_for(len as u64),
        )))
    }
    pub fn new_indefinite_bytestring() -> Item {
        Item::from_kind(ItemKind::Bstr(StringBody::Indefinite(Vec::new())))
    }
    /// A definite text string of `len` bytes, initially zero-filled. Use
    /// [`Item::textstring_set_data`] to populate it.
    pub fn new_definite_string(len: usize) -> Item {
        Item::from_kind(ItemKind::Tstr(StringBody::Definite(
            vec![0u8; len],
            Width::smallest_for(len as u64),
        )))
    }
    pub fn new_indefinite_string() -> Item {
        Item::from_kind(ItemKind::Tstr(StringBody::Indefinite(Vec::new())))
    }

    pub fn new_definite_array(cap: usize) -> Item {
        Item::from_kind(ItemKind::Array(ArrayBody {
            capacity: Some((cap, Width::smallest_for(cap as u64))),
            items: Vec::with_capacity(cap),
        }))
    }
    pub fn new_indefinite_array() -> Item {
        Item::from_kind(ItemKind::Array(ArrayBody {
            capacity: None,
            items: Vec::new(),
        }))
    }

    pub fn new_definite_map(cap: usize) -> Item {
        Item::from_kind(ItemKind::Map(MapBody {
            capacity: Some((cap, Width::smallest_for(cap as u64))),
            pairs: Vec::with_capacity(cap),
        }))
    }
    pub fn new_indefinite_map() -> Item {
        Item::from_kind(ItemKind::Map(MapBody {
            capacity: None,
            pairs: Vec::new(),
        }))
    }

    /// Wraps `child` with `tag_number`. Takes ownership of the caller's reference to `child`.
    pub fn new_tag(tag_number: u64, child: Item) -> Item {
        Item::from_kind(ItemKind::Tag(
            tag_number,
            Width::smallest_for(tag_number),
            child,
        ))
    }

    pub fn new_float16(v: f16) -> Item {
        Item::from_kind(ItemKind::Float16(v))
    }
    pub fn new_float32(v: f32) -> Item {
        Item::from_kind(ItemKind::Float32(v))
    }
    pub fn new_float64(v: f64) -> Item {
        Item::from_kind(ItemKind::Float64(v))
    }
    pub fn new_bool(b: bool) -> Item {
        Item::from_kind(ItemKind::Bool(b))
    }
    pub fn new_null() -> Item {
        Item::from_kind(ItemKind::Null)
    }
    pub fn new_undefined() -> Item {
        Item::from_kind(ItemKind::Undefined)
    }
    /// A "simple" value in the range 0..=19 or 32..=255 (20..=23 and 24..=31 have dedicated
    /// meanings and cannot be built this way).
    pub fn new_simple(byte: u8) -> Item {
        Item::from_kind(ItemKind::Simple(byte))
    }

    /***********************************************************************************************
     * Crate-internal constructors used by the tree builder, which always knows the exact head
     * width the wire used and must preserve it for bit-exact re-encoding.
     **********************************************************************************************/

    pub(crate) fn new_uint_raw(v: u64, width: Width) -> Item {
        Item::from_kind(ItemKind::UInt(v, width))
    }
    pub(crate) fn new_negint_raw(m: u64, width: Width) -> Item {
        Item::from_kind(ItemKind::NInt(m, width))
    }
    pub(crate) fn new_definite_bytestring_raw(data: Vec<u8>, width: Width) -> Item {
        Item::from_kind(ItemKind::Bstr(StringBody::Definite(data, width)))
    }
    pub(crate) fn new_definite_string_raw(data: Vec<u8>, width: Width) -> Item {
        Item::from_kind(ItemKind::Tstr(StringBody::Definite(data, width)))
    }
    pub(crate) fn new_definite_array_raw(len: usize, width: Width) -> Item {
        Item::from_kind(ItemKind::Array(ArrayBody {
            capacity: Some((len, width)),
            items: Vec::with_capacity(len),
        }))
    }
    pub(crate) fn new_definite_map_raw(len: usize, width: Width) -> Item {
        Item::from_kind(ItemKind::Map(MapBody {
            capacity: Some((len, width)),
            pairs: Vec::with_capacity(len),
        }))
    }
    pub(crate) fn new_tag_raw(tag_number: u64, width: Width, child: Item) -> Item {
        Item::from_kind(ItemKind::Tag(tag_number, width, child))
    }

    /***********************************************************************************************
     * Accessors
     **********************************************************************************************/

    pub fn major_type(&self) -> MajorType {
        match &*self.kind_ref() {
            ItemKind::UInt(..) => MajorType::UInt,
            ItemKind::NInt(..) => MajorType::NInt,
            ItemKind::Bstr(_) => MajorType::ByteString,
            ItemKind::Tstr(_) => MajorType::TextString,
            ItemKind::Array(_) => MajorType::Array,
            ItemKind::Map(_) => MajorType::Map,
            ItemKind::Tag(..) => MajorType::Tag,
            ItemKind::Float16(_) | ItemKind::Float32(_) | ItemKind::Float64(_) => {
                MajorType::FloatOrSimple
            }
            ItemKind::Bool(_) | ItemKind::Null | ItemKind::Undefined | ItemKind::Simple(_) => {
                MajorType::FloatOrSimple
            }
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match &*self.kind_ref() {
            ItemKind::UInt(v, _) => Some(*v),
            _ => None,
        }
    }

    /// The encoded magnitude `m` (logical value is `-1 - m`).
    pub fn as_negint_magnitude(&self) -> Option<u64> {
        match &*self.kind_ref() {
            ItemKind::NInt(m, _) => Some(*m),
            _ => None,
        }
    }

    /// The logical value of a negative integer, as `i128` since `-1 - u64::MAX` underflows `i64`.
    pub fn as_negint_value(&self) -> Option<i128> {
        self.as_negint_magnitude().map(|m| -1i128 - m as i128)
    }

    pub fn int_width(&self) -> Option<Width> {
        match &*self.kind_ref() {
            ItemKind::UInt(_, w) | ItemKind::NInt(_, w) => Some(*w),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<FloatValue> {
        match &*self.kind_ref() {
            ItemKind::Float16(v) => Some(FloatValue::F16(*v)),
            ItemKind::Float32(v) => Some(FloatValue::F32(*v)),
            ItemKind::Float64(v) => Some(FloatValue::F64(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.kind_ref() {
            ItemKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(&*self.kind_ref(), ItemKind::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(&*self.kind_ref(), ItemKind::Undefined)
    }

    pub fn as_simple(&self) -> Option<u8> {
        match &*self.kind_ref() {
            ItemKind::Simple(v) => Some(*v),
            _ => None,
        }
    }

    /// `Some(true)` for a definite byte/text string, array or map; `Some(false)` if indefinite;
    /// `None` for any other major type.
    pub fn is_definite(&self) -> Option<bool> {
        match &*self.kind_ref() {
            ItemKind::Bstr(StringBody::Definite(..)) | ItemKind::Tstr(StringBody::Definite(..)) => {
                Some(true)
            }
            ItemKind::Bstr(StringBody::Indefinite(_))
            | ItemKind::Tstr(StringBody::Indefinite(_)) => Some(false),
            ItemKind::Array(a) => Some(a.capacity.is_some()),
            ItemKind::Map(m) => Some(m.capacity.is_some()),
            _ => None,
        }
    }

    /// Declared capacity of a definite array or map; `None` for indefinite containers or any
    /// other major type.
    pub fn capacity(&self) -> Option<usize> {
        match &*self.kind_ref() {
            ItemKind::Array(a) => a.capacity.map(|(c, _)| c),
            ItemKind::Map(m) => m.capacity.map(|(c, _)| c),
            _ => None,
        }
    }

    /// The head width that declared a definite array/map's length, or a definite string's byte
    /// length. `None` for indefinite containers/strings or any other major type.
    pub fn length_width(&self) -> Option<Width> {
        match &*self.kind_ref() {
            ItemKind::Bstr(StringBody::Definite(_, w)) | ItemKind::Tstr(StringBody::Definite(_, w)) => {
                Some(*w)
            }
            ItemKind::Array(a) => a.capacity.map(|(_, w)| w),
            ItemKind::Map(m) => m.capacity.map(|(_, w)| w),
            _ => None,
        }
    }

    /// Number of elements currently held: byte length for a definite string, chunk count for an
    /// indefinite string, element count for an array, pair count for a map.
    pub fn fill(&self) -> Option<usize> {
        match &*self.kind_ref() {
            ItemKind::Bstr(StringBody::Definite(b, _)) | ItemKind::Tstr(StringBody::Definite(b, _)) => {
                Some(b.len())
            }
            ItemKind::Bstr(StringBody::Indefinite(c)) | ItemKind::Tstr(StringBody::Indefinite(c)) => {
                Some(c.len())
            }
            ItemKind::Array(a) => Some(a.items.len()),
            ItemKind::Map(m) => Some(m.pairs.len()),
            _ => None,
        }
    }

    /// Owned copy of a definite byte string's content. `None` for any other shape.
    pub fn bytestring_bytes(&self) -> Option<Vec<u8>> {
        match &*self.kind_ref() {
            ItemKind::Bstr(StringBody::Definite(b, _)) => Some(b.clone()),
            _ => None,
        }
    }

    /// The chunk items of an indefinite byte string, each itself a definite byte string.
    pub fn bytestring_chunks(&self) -> Option<Vec<Item>> {
        match &*self.kind_ref() {
            ItemKind::Bstr(StringBody::Indefinite(c)) => Some(c.clone()),
            _ => None,
        }
    }

    /// Owned copy of a definite text string's raw bytes. UTF-8 validity is not checked here -
    /// validation is the caller's responsibility.
    pub fn textstring_bytes(&self) -> Option<Vec<u8>> {
        match &*self.kind_ref() {
            ItemKind::Tstr(StringBody::Definite(b, _)) => Some(b.clone()),
            _ => None,
        }
    }

    pub fn textstring_chunks(&self) -> Option<Vec<Item>> {
        match &*self.kind_ref() {
            ItemKind::Tstr(StringBody::Indefinite(c)) => Some(c.clone()),
            _ => None,
        }
    }

    /// The `index`th element of an array (`retain`ed: the caller gets its own handle).
    pub fn array_get(&self, index: usize) -> Option<Item> {
        match &*self.kind_ref() {
            ItemKind::Array(a) => a.items.get(index).map(Item::retain),
            _ => None,
        }
    }

    pub fn array_items(&self) -> Option<Vec<Item>> {
        match &*self.kind_ref() {
            ItemKind::Array(a) => Some(a.items.clone()),
            _ => None,
        }
    }

    /// The `index`th (key, value) pair of a map.
    pub fn map_get(&self, index: usize) -> Option<(Item, Item)> {
        match &*self.kind_ref() {
            ItemKind::Map(m) => m.pairs.get(index).map(|(k, v)| (k.retain(), v.retain())),
            _ => None,
        }
    }

    pub fn map_pairs(&self) -> Option<Vec<(Item, Item)>> {
        match &*self.kind_ref() {
            ItemKind::Map(m) => Some(m.pairs.clone()),
            _ => None,
        }
    }

    pub fn tag_number(&self) -> Option<u64> {
        match &*self.kind_ref() {
            ItemKind::Tag(t, ..) => Some(*t),
            _ => None,
        }
    }

    /// The head width that encoded this tag's number, for faithful re-encoding.
    pub fn tag_width(&self) -> Option<Width> {
        match &*self.kind_ref() {
            ItemKind::Tag(_, w, _) => Some(*w),
            _ => None,
        }
    }

    pub fn tag_child(&self) -> Option<Item> {
        match &*self.kind_ref() {
            ItemKind::Tag(_, _, c) => Some(c.retain()),
            _ => None,
        }
    }

    /***********************************************************************************************
     * Mutators
     **********************************************************************************************/

    /// Write `data` into a definite byte string previously sized by
    /// [`Item::new_definite_bytestring`]. `data.len()` must equal the declared length.
    pub fn bytestring_set_data(&self, data: &[u8]) -> Result<()> {
        match &mut *self.kind_mut() {
            ItemKind::Bstr(StringBody::Definite(b, _)) => {
                if b.len() != data.len() {
                    return Err(CborError::ContainerFull);
                }
                b.copy_from_slice(data);
                Ok(())
            }
            _ => Err(CborError::ContainerFull),
        }
    }

    pub fn textstring_set_data(&self, data: &[u8]) -> Result<()> {
        match &mut *self.kind_mut() {
            ItemKind::Tstr(StringBody::Definite(b, _)) => {
                if b.len() != data.len() {
                    return Err(CborError::ContainerFull);
                }
                b.copy_from_slice(data);
                Ok(())
            }
            _ => Err(CborError::ContainerFull),
        }
    }

    /// Append a definite byte-string chunk to an indefinite byte string. `chunk` must itself be a
    /// definite byte string, or `NestedIndefiniteStringChunk` is returned.
    #[cfg_attr(feature = "trace", trace)]
    pub fn bytestring_add_chunk(&self, chunk: Item) -> Result<()> {
        if !matches!(&*chunk.kind_ref(), ItemKind::Bstr(StringBody::Definite(..))) {
            return Err(CborError::NestedIndefiniteStringChunk);
        }
        match &mut *self.kind_mut() {
            ItemKind::Bstr(StringBody::Indefinite(chunks)) => {
                chunks.push(chunk);
                Ok(())
            }
            _ => Err(CborError::ContainerFull),
        }
    }

    /// Append a definite text-string chunk to an indefinite text string.
    #[cfg_attr(feature = "trace", trace)]
    pub fn string_add_chunk(&self, chunk: Item) -> Result<()> {
        if !matches!(&*chunk.kind_ref(), ItemKind::Tstr(StringBody::Definite(..))) {
            return Err(CborError::NestedIndefiniteStringChunk);
        }
        match &mut *self.kind_mut() {
            ItemKind::Tstr(StringBody::Indefinite(chunks)) => {
                chunks.push(chunk);
                Ok(())
            }
            _ => Err(CborError::ContainerFull),
        }
    }

    /// Append `child` to an array. Fails with `ContainerFull` if a definite array is already at
    /// its declared capacity.
    #[cfg_attr(feature = "trace", trace)]
    pub fn array_push(&self, child: Item) -> Result<()> {
        match &mut *self.kind_mut() {
            ItemKind::Array(a) => {
                if let Some((cap, _)) = a.capacity {
                    if a.items.len() >= cap {
                        return Err(CborError::ContainerFull);
                    }
                }
                a.items.push(child);
                Ok(())
            }
            _ => Err(CborError::ContainerFull),
        }
    }

    /// Append a (key, value) pair to a map. Fails with `ContainerFull` if a definite map is
    /// already at its declared capacity.
    #[cfg_attr(feature = "trace", trace)]
    pub fn map_add(&self, key: Item, value: Item) -> Result<()> {
        match &mut *self.kind_mut() {
            ItemKind::Map(m) => {
                if let Some((cap, _)) = m.capacity {
                    if m.pairs.len() >= cap {
                        return Err(CborError::ContainerFull);
                    }
                }
                m.pairs.push((key, value));
                Ok(())
            }
            _ => Err(CborError::ContainerFull),
        }
    }
}

/***********************************************************************************************
 * `full` feature: tag 0/1 (datetime/epoch) convenience layer
 *
 * RFC 8949 §3.4.1/§3.4.2 give tag 0 (a text string in RFC 3339 format) and tag 1 (an integer or
 * float count of seconds since the Unix epoch) standard, but non-mandatory, meaning. These are
 * plain `Item::new_tag(0, ...)`/`Item::new_tag(1, ...)` convenience wrappers, not new major
 * types - the eight major types stay closed.
 **********************************************************************************************/
#[cfg(feature = "full")]
impl Item {
    /// Build a tag-0 item: `dt` rendered as an RFC 3339 string.
    pub fn new_datetime(dt: chrono::DateTime<chrono::FixedOffset>) -> Item {
        let bytes = dt.to_rfc3339().into_bytes();
        let width = Width::smallest_for(bytes.len() as u64);
        Item::new_tag(0, Item::new_definite_string_raw(bytes, width))
    }

    /// If `self` is a tag-0 item wrapping a valid RFC 3339 string, parse and return it.
    pub fn as_datetime(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        if self.tag_number() != Some(0) {
            return None;
        }
        let bytes = self.tag_child()?.textstring_bytes()?;
        let s = std::str::from_utf8(&bytes).ok()?;
        chrono::DateTime::parse_from_rfc3339(s).ok()
    }

    /// Build a tag-1 item: `seconds` since the Unix epoch, encoded as the smallest-fitting int.
    pub fn new_epoch(seconds: i64) -> Item {
        let child = if seconds < 0 {
            let magnitude = (-1 - seconds) as u64;
            Item::new_negint_raw(magnitude, Width::smallest_for(magnitude))
        } else {
            Item::new_uint_raw(seconds as u64, Width::smallest_for(seconds as u64))
        };
        Item::new_tag(1, child)
    }

    /// If `self` is a tag-1 item wrapping an integer, return its value as seconds since the
    /// Unix epoch.
    pub fn as_epoch(&self) -> Option<i64> {
        if self.tag_number() != Some(1) {
            return None;
        }
        let child = self.tag_child()?;
        if let Some(v) = child.as_uint() {
            return i64::try_from(v).ok();
        }
        child.as_negint_value().and_then(|v| i64::try_from(v).ok())
    }
}

#[cfg(all(test, feature = "full"))]
mod full_feature_tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn datetime_round_trips_through_rfc3339() {
        let dt = chrono::FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2023, 6, 1, 12, 0, 0)
            .unwrap();
        let item = Item::new_datetime(dt);
        assert_eq!(item.tag_number(), Some(0));
        assert_eq!(item.as_datetime(), Some(dt));
    }

    #[test]
    fn epoch_round_trips_positive_and_negative() {
        assert_eq!(Item::new_epoch(1_000_000_000).as_epoch(), Some(1_000_000_000));
        assert_eq!(Item::new_epoch(-42).as_epoch(), Some(-42));
    }

    #[test]
    fn as_epoch_rejects_wrong_tag() {
        let item = Item::new_tag(2, Item::new_uint8(1));
        assert_eq!(item.as_epoch(), None);
    }
}

/***************************************************************************************************
 * Iterative teardown
 *
 * The default, compiler-generated Drop glue for a tree of `Item`s would recurse one stack frame
 * per level of nesting: dropping a node's `Vec<Item>` of children drops each child, which (if it
 * was the last handle) drops its own children, and so on. For a deep tree that can overflow the
 * stack. Instead, when an `Item`'s last handle is about to be dropped, we detach its direct
 * children into an explicit worklist and walk that list instead of the call stack.
 **************************************************************************************************/
impl ItemKind {
    fn take_children(&mut self) -> Vec<Item> {
        match std::mem::replace(self, ItemKind::Undefined) {
            ItemKind::Bstr(StringBody::Indefinite(chunks))
            | ItemKind::Tstr(StringBody::Indefinite(chunks)) => chunks,
            ItemKind::Array(a) => a.items,
            ItemKind::Map(m) => {
                let mut out = Vec::with_capacity(m.pairs.len() * 2);
                for (k, v) in m.pairs {
                    out.push(k);
                    out.push(v);
                }
                out
            }
            ItemKind::Tag(_, _, child) => vec![child],
            other @ (ItemKind::UInt(..)
            | ItemKind::NInt(..)
            | ItemKind::Bstr(StringBody::Definite(..))
            | ItemKind::Tstr(StringBody::Definite(..))
            | ItemKind::Float16(_)
            | ItemKind::Float32(_)
            | ItemKind::Float64(_)
            | ItemKind::Bool(_)
            | ItemKind::Null
            | ItemKind::Undefined
            | ItemKind::Simple(_)) => {
                // Put back what we took out; there were no child items to detach.
                *self = other;
                Vec::new()
            }
        }
    }
}

impl Drop for Item {
    fn drop(&mut self) {
        if Arc::strong_count(&self.0) != 1 {
            // Other handles remain live; the default `Arc` decrement below is all that happens.
            return;
        }
        let mut worklist = self.0.kind.borrow_mut().take_children();
        while let Some(item) = worklist.pop() {
            if Arc::strong_count(&item.0) == 1 {
                worklist.append(&mut item.0.kind.borrow_mut().take_children());
            }
            // `item`'s own `Drop::drop` runs here (recursing into this same function), but its
            // children have already been detached above, so there is nothing left to recurse
            // into: the recursion is one frame deep, not one frame per tree level.
        }
    }
}
