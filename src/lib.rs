// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! A baseline and progressive JPEG decoder.
//!
//! The entry point is [`decoder::JpegDecoder`]; callers typically construct one from a
//! byte slice and call [`decoder::JpegDecoder::decode`] or
//! [`decoder::JpegDecoder::parse_metadata`].

#![deny(unsafe_code)]

pub mod bit_reader;
pub mod block;
pub mod color;
pub mod component;
pub mod decoder;
pub mod error;
pub mod huffman;
pub mod idct;
pub mod image;
pub mod marker;
pub mod postprocess;
pub mod quant;
pub mod scan;
pub mod segments;
pub mod util;

pub use decoder::{DecoderOptions, FrameInfo, JpegDecoder};
pub use error::{Error, Result};
pub use image::{ImageMetadata, PixelSink, RgbaImage};

const BLOCK_DIM: usize = 8;
const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;
