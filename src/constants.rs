/***************************************************************************************************
 * Copyright (c) 2020-2022 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all copies or
 * substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * rs_cbor_tree CBOR wire constants
 **************************************************************************************************/

/// Additional Information bitmask
pub const AI_MASK: u8 = 0b000_11111;
/// Major Type bitmask
pub const MT_MASK: u8 = 0b111_00000;

/// Major Type 0 (Positive integers)
pub const MT_UINT: u8 = 0b000_00000;
/// Major Type 1 (Negative integers)
pub const MT_NINT: u8 = 0b001_00000;
/// Major Type 2 (Byte Strings)
pub const MT_BSTR: u8 = 0b010_00000;
/// Major Type 3 (Text Strings)
pub const MT_TSTR: u8 = 0b011_00000;
/// Major Type 4 (Array)
pub const MT_ARRAY: u8 = 0b100_00000;
/// Major Type 5 (Map)
pub const MT_MAP: u8 = 0b101_00000;
/// Major Type 6 (Tag)
pub const MT_TAG: u8 = 0b110_00000;
/// Major Type 7 (Floats, simple types, break)
pub const MT_SIMPLE: u8 = 0b111_00000;

/// Maximum value of a "simple" payload mapped directly onto the AI bits
pub const PAYLOAD_AI_BITS: u8 = 23;
/// One follow-on byte of big-endian payload
pub const PAYLOAD_ONE_BYTE: u8 = 24;
/// Two follow-on bytes of big-endian payload
pub const PAYLOAD_TWO_BYTES: u8 = 25;
/// Four follow-on bytes of big-endian payload
pub const PAYLOAD_FOUR_BYTES: u8 = 26;
/// Eight follow-on bytes of big-endian payload
pub const PAYLOAD_EIGHT_BYTES: u8 = 27;
/// Indefinite-length marker; also doubles as "break" under major type 7
pub const PAYLOAD_INDEFINITE: u8 = 31;

/// Major type 7 AI values with fixed meaning
pub const AI_FALSE: u8 = 20;
pub const AI_TRUE: u8 = 21;
pub const AI_NULL: u8 = 22;
pub const AI_UNDEFINED: u8 = 23;
pub const AI_SIMPLE_BYTE: u8 = 24;
pub const AI_FLOAT16: u8 = 25;
pub const AI_FLOAT32: u8 = 26;
pub const AI_FLOAT64: u8 = 27;
pub const AI_BREAK: u8 = 31;

/// The break byte in full (major type 7, AI 31).
pub const BREAK_BYTE: u8 = MT_SIMPLE | AI_BREAK;

/// Default maximum nesting depth accepted by the tree builder.
pub const DEFAULT_MAX_DEPTH: usize = 2048;
