/***************************************************************************************************
 * Copyright (c) 2021-2023 Qualcomm Innovation Center, Inc. All rights reserved.
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
 * rs_cbor_tree error API
 *
 * A closed taxonomy of errors produced by the item model, decoder, tree builder, encoder and
 * copy/compare utilities. Every fallible entry point in this crate returns one of these; none is
 * ever silently swallowed.
 **************************************************************************************************/
use std::result;

use thiserror::Error;

/// An alias for `Result<T, CborError>` used throughout this crate.
pub type Result<T> = result::Result<T, CborError>;

/// `CborError` is the closed error taxonomy for `rs_cbor_tree`.
#[derive(Copy, Clone, Error, Debug, PartialEq, Eq)]
pub enum CborError {
    /// Backing allocation failed. Rust's global allocator aborts rather than returning failure,
    /// so constructors in this crate never raise this variant; it is kept for API parity with
    /// the closed taxonomy and for hosts running a fallible allocator.
    #[error("allocation failed")]
    OutOfMemory,
    /// The input buffer is shorter than the head and payload of the next token. The payload is
    /// a hint of how many additional bytes would suffice, when that is cheaply computable,
    /// otherwise 1.
    #[error("truncated input, need at least {0} more byte(s)")]
    NotEnoughData(usize),
    /// A reserved additional-information value (28..=30) was encountered, or some other
    /// structurally invalid head.
    #[error("malformed CBOR head")]
    Malformed,
    /// A break (0xFF) appeared where no indefinite-length container was open.
    #[error("unexpected break outside an indefinite-length container")]
    UnexpectedBreak,
    /// A chunk of an indefinite-length byte or text string was itself indefinite, or was not of
    /// the same major type as its parent.
    #[error("indefinite-length string chunk is malformed")]
    NestedIndefiniteStringChunk,
    /// Input nests more deeply than the configured bound.
    #[error("nesting exceeds configured depth bound")]
    DepthExceeded,
    /// A mutator tried to add a child beyond a definite container's declared capacity.
    #[error("definite container has no remaining capacity")]
    ContainerFull,
    /// An indefinite-length map's break arrived after an odd number of items, leaving the last
    /// key without a value.
    #[error("indefinite map closed with an odd number of items")]
    MapOddCount,
    /// The output buffer could not hold the encoded result; the payload is the number of bytes
    /// that would have been required.
    #[error("output buffer too small, need {0} byte(s)")]
    BufferTooSmall(usize),
}
