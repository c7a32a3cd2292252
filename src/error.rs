// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("missing SOI marker at start of stream")]
    MissingSoi,
    #[error("more than one SOF marker in stream")]
    MultipleSof,
    #[error("unsupported sample precision: {0} bits, only 8-bit is supported")]
    UnsupportedPrecision(u8),
    #[error("unsupported color mode: {0} components with Adobe transform {1:?}")]
    UnsupportedColorMode(u8, Option<u8>),
    #[error("segment length mismatch: marker {marker:#06x} declared {declared} bytes but handler consumed {consumed}")]
    SegmentLengthMismatch {
        marker: u16,
        declared: usize,
        consumed: usize,
    },
    #[error("bad DQT precision nibble: {0}")]
    BadPq(u8),
    #[error("bad DQT table index: {0}")]
    BadTq(u8),
    #[error("bad DHT table class: {0}")]
    BadTc(u8),
    #[error("bad DHT table index: {0}")]
    BadTh(u8),
    #[error("no Huffman code matched within 16 bits")]
    BadHuffmanCode,
    #[error("restart marker mismatch: expected RST{expected} but found {found:#06x}")]
    BadRestartMarker { expected: u8, found: u16 },
    #[error("unexpected marker {0:#06x} inside entropy-coded data")]
    UnexpectedMarker(u16),
    #[error("invalid MCU coordinate ({0}, {1}) for grid of {2}x{3}")]
    InvalidMcuCoordinate(usize, usize, usize, usize),
    #[error("component id {0} referenced in SOS was not declared in SOF")]
    UnknownScanComponent(u8),
    #[error("component id {0} has no Huffman table bound for this scan")]
    MissingHuffmanTable(u8),
    #[error("SOF segment is required before {0}")]
    SofRequiredBefore(&'static str),
    #[error("image dimensions {0}x{1} exceed the configured pixel budget of {2}")]
    ImageTooLarge(u32, u32, u64),
    #[error("invalid successive-approximation parameters Ss={ss} Se={se} Ah={ah} Al={al}")]
    BadScanParameters { ss: u8, se: u8, ah: u8, al: u8 },
    #[error("bad component sampling factor: {0}, must be in 1..=4")]
    BadSamplingFactor(u8),
    #[error("component quant table index {0} was never defined by a DQT segment")]
    MissingQuantTable(u8),
    #[error("unsupported SOF marker {0:#06x} (arithmetic coding, lossless, and hierarchical JPEG are not supported)")]
    UnsupportedSofMarker(u16),
}

pub type Result<T> = std::result::Result<T, Error>;
