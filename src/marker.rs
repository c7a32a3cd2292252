// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Marker recognition (C3): marker constants, tolerant marker-id scanning, and segment
//! length reading. Segment *dispatch* (deciding which handler consumes the payload)
//! lives in [`crate::decoder`]; this module only recognizes bytes.

use std::io::Read;

use crate::bit_reader::ByteReader;
use crate::error::{Error, Result};

pub const SOI: u16 = 0xFFD8;
pub const EOI: u16 = 0xFFD9;
pub const SOS: u16 = 0xFFDA;
pub const DQT: u16 = 0xFFDB;
pub const DHT: u16 = 0xFFC4;
pub const DRI: u16 = 0xFFDD;
pub const SOF0: u16 = 0xFFC0;
pub const SOF1: u16 = 0xFFC1;
pub const SOF2: u16 = 0xFFC2;
pub const APP0: u16 = 0xFFE0;
pub const APP1: u16 = 0xFFE1;
pub const APP2: u16 = 0xFFE2;
pub const APP14: u16 = 0xFFEE;
pub const COM: u16 = 0xFFFE;
pub const RST0: u16 = 0xFFD0;
pub const RST7: u16 = 0xFFD7;

/// True for any SOFn marker this decoder recognizes but does not implement: arithmetic
/// coding (C9-CB), lossless (C3), differential/hierarchical (C5-C7, CD-CF) variants. See
/// the crate's Non-goals.
pub fn is_unsupported_sof(marker: u16) -> bool {
    matches!(marker, 0xFFC3 | 0xFFC5..=0xFFC7 | 0xFFC9..=0xFFCB | 0xFFCD..=0xFFCF)
}

/// Reads the next marker code, tolerating any number of `0xFF` fill bytes before the
/// marker id (T.81 B.1.1.3, "any number of fill bytes"). The byte immediately before the
/// marker run must itself be `0xFF`; anything else at this position is a stream
/// desynchronization.
pub fn read_marker<R: Read>(reader: &mut ByteReader<R>) -> Result<u16> {
    let first = reader.read_byte()?;
    if first != 0xFF {
        return Err(Error::UnexpectedMarker(first as u16));
    }
    let mut b = reader.read_byte()?;
    while b == 0xFF {
        b = reader.read_byte()?;
    }
    Ok(0xFF00 | b as u16)
}

/// Reads the 2-byte big-endian length that follows every marker except `SOI`/`EOI`/
/// `RSTn`, and returns the remaining payload length (the length field itself is
/// inclusive of its own 2 bytes, per §4.3).
pub fn segment_remaining<R: Read>(reader: &mut ByteReader<R>, marker: u16) -> Result<usize> {
    let len = reader.read_u16()?;
    (len as usize).checked_sub(2).ok_or(Error::SegmentLengthMismatch {
        marker,
        declared: len as usize,
        consumed: 0,
    })
}
