// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Segment handlers (C4) for the metadata/table markers: APP0 (JFIF), APP1 (EXIF), APP2
//! (ICC), APP14 (Adobe), DHT, DRI, and SOS. DQT is handled by
//! [`crate::quant::QuantTables::parse_dqt`] and SOF by [`crate::component::Frame::from_sof`]
//! since both own the state they populate.

use std::io::Read;

use crate::bit_reader::ByteReader;
use crate::component::Frame;
use crate::error::{Error, Result};
use crate::huffman::{HuffClass, HuffmanTable, HuffmanTables};
use crate::marker;

/// JFIF density, recognized from an APP0 segment (§4.4).
#[derive(Clone, Copy, Debug)]
pub struct JfifDensity {
    pub units: u8,
    pub x_density: u16,
    pub y_density: u16,
}

/// Recognizes a JFIF APP0 payload and extracts its density fields.
///
/// Defensive reading: the identifier + version + units + density fields occupy 13
/// bytes, but only as much of that as `remaining` actually provides is read; a segment
/// shorter than 5 bytes cannot even hold the identifier and is treated as non-JFIF.
pub fn parse_app0<R: Read>(
    reader: &mut ByteReader<R>,
    remaining: usize,
) -> Result<Option<JfifDensity>> {
    if remaining < 5 {
        reader.skip(remaining)?;
        return Ok(None);
    }
    let to_read = remaining.min(13);
    let mut buf = vec![0u8; to_read];
    reader.read_full(&mut buf)?;
    if remaining > to_read {
        reader.skip(remaining - to_read)?;
    }
    if &buf[0..5] != b"JFIF\0" {
        return Ok(None);
    }
    if buf.len() < 12 {
        // Identifier matched but the density fields were truncated.
        return Ok(None);
    }
    Ok(Some(JfifDensity {
        units: buf[7],
        x_density: u16::from_be_bytes([buf[8], buf[9]]),
        y_density: u16::from_be_bytes([buf[10], buf[11]]),
    }))
}

/// Recognizes an EXIF APP1 payload and returns the verbatim TIFF-structured blob (§4.4).
/// EXIF tag *parsing* beyond resolution extraction is out of scope for this crate; see
/// [`crate::decoder`] for the minimal XResolution/YResolution reader it needs.
pub fn parse_app1<R: Read>(
    reader: &mut ByteReader<R>,
    remaining: usize,
    ignore_metadata: bool,
) -> Result<Option<Vec<u8>>> {
    if ignore_metadata || remaining < 6 {
        reader.skip(remaining)?;
        return Ok(None);
    }
    let mut id = [0u8; 6];
    reader.read_full(&mut id)?;
    let rest = remaining - 6;
    if &id != b"Exif\0\0" {
        reader.skip(rest)?;
        return Ok(None);
    }
    let mut payload = vec![0u8; rest];
    reader.read_full(&mut payload)?;
    Ok(Some(payload))
}

/// Accumulates one or more ICC_PROFILE APP2 chunks, reassembling them in declared
/// sequence order (which need not match arrival order) regardless of how many chunks a
/// stream splits the profile into (§4.4).
#[derive(Default)]
pub struct IccAccumulator {
    chunks: Vec<Option<Vec<u8>>>,
}

impl IccAccumulator {
    pub fn add_chunk(&mut self, seq: u8, total: u8, data: Vec<u8>) {
        if seq == 0 || total == 0 || seq as usize > total as usize {
            return;
        }
        if self.chunks.len() < total as usize {
            self.chunks.resize(total as usize, None);
        }
        self.chunks[seq as usize - 1] = Some(data);
    }

    /// Concatenates all chunks in sequence order, or `None` if no chunk was ever seen or
    /// any chunk in the declared range is missing.
    pub fn finish(self) -> Option<Vec<u8>> {
        if self.chunks.is_empty() {
            return None;
        }
        let mut out = Vec::new();
        for chunk in self.chunks.into_iter() {
            out.extend(chunk?);
        }
        Some(out)
    }
}

/// Recognizes an ICC_PROFILE APP2 chunk and feeds it to `icc`. Always consumes exactly
/// `remaining` bytes, whether or not the identifier matched (§9, Open Questions).
pub fn parse_app2<R: Read>(
    reader: &mut ByteReader<R>,
    remaining: usize,
    icc: &mut IccAccumulator,
) -> Result<()> {
    const HEADER_LEN: usize = 14; // "ICC_PROFILE\0" (12) + sequence (1) + total (1)
    if remaining < HEADER_LEN {
        reader.skip(remaining)?;
        return Ok(());
    }
    let mut id = [0u8; 12];
    reader.read_full(&mut id)?;
    let seq = reader.read_byte()?;
    let total = reader.read_byte()?;
    let chunk_len = remaining - HEADER_LEN;
    if &id != b"ICC_PROFILE\0" {
        reader.skip(chunk_len)?;
        return Ok(());
    }
    let mut chunk = vec![0u8; chunk_len];
    reader.read_full(&mut chunk)?;
    icc.add_chunk(seq, total, chunk);
    Ok(())
}

/// Recognizes an Adobe APP14 payload and extracts its `ColorTransform` byte (§4.4).
pub fn parse_app14<R: Read>(reader: &mut ByteReader<R>, remaining: usize) -> Result<Option<u8>> {
    const HEADER_LEN: usize = 12; // "Adobe" (5) + version (2) + flags0 (2) + flags1 (2) + transform (1)
    if remaining < HEADER_LEN {
        reader.skip(remaining)?;
        return Ok(None);
    }
    let mut buf = [0u8; HEADER_LEN];
    reader.read_full(&mut buf)?;
    if remaining > HEADER_LEN {
        reader.skip(remaining - HEADER_LEN)?;
    }
    if &buf[0..5] != b"Adobe" {
        return Ok(None);
    }
    Ok(Some(buf[11]))
}

/// Parses a DRI segment: exactly 2 bytes, the big-endian restart interval (§4.4).
pub fn parse_dri<R: Read>(reader: &mut ByteReader<R>, remaining: usize) -> Result<u16> {
    if remaining != 2 {
        return Err(Error::SegmentLengthMismatch {
            marker: marker::DRI,
            declared: remaining,
            consumed: 2,
        });
    }
    reader.read_u16()
}

/// Parses a DHT segment, which may define several tables back to back, and installs
/// each into its `(Tc, Th)` slot (§4.4).
pub fn parse_dht<R: Read>(
    tables: &mut HuffmanTables,
    reader: &mut ByteReader<R>,
    mut remaining: usize,
    is_progressive: bool,
) -> Result<()> {
    while remaining > 0 {
        if remaining < 17 {
            return Err(Error::SegmentLengthMismatch {
                marker: marker::DHT,
                declared: remaining,
                consumed: 17,
            });
        }
        let mut header = [0u8; 17];
        reader.read_full(&mut header)?;
        remaining -= 17;

        let tc = header[0] >> 4;
        let th = header[0] & 0x0F;
        if tc > 1 {
            return Err(Error::BadTc(tc));
        }
        if th > 3 || (!is_progressive && th > 1) {
            return Err(Error::BadTh(th));
        }

        let mut counts = [0u8; 16];
        counts.copy_from_slice(&header[1..17]);
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if remaining < total {
            return Err(Error::SegmentLengthMismatch {
                marker: marker::DHT,
                declared: remaining,
                consumed: total,
            });
        }
        let mut symbols = vec![0u8; total];
        reader.read_full(&mut symbols)?;
        remaining -= total;

        let table = HuffmanTable::build(&counts, &symbols)?;
        let class = if tc == 0 { HuffClass::Dc } else { HuffClass::Ac };
        tables.set(class, th, table)?;
    }
    Ok(())
}

/// One (component, DC table, AC table) selector from an SOS header.
pub struct ScanComponentSelector {
    pub component_index: usize,
    pub dc_table: u8,
    pub ac_table: u8,
}

/// A fully parsed SOS header, ready to hand off to [`crate::scan::decode_scan`].
pub struct ScanHeader {
    pub selectors: Vec<ScanComponentSelector>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approx_high: u8,
    pub approx_low: u8,
}

/// Parses an SOS header and binds each selected component's DC/AC table indices onto
/// `frame` (§4.4).
pub fn parse_sos<R: Read>(
    reader: &mut ByteReader<R>,
    remaining: usize,
    frame: &mut Frame,
) -> Result<ScanHeader> {
    if remaining < 4 {
        return Err(Error::SegmentLengthMismatch {
            marker: marker::SOS,
            declared: remaining,
            consumed: 4,
        });
    }
    let ns = reader.read_byte()?;
    let expected = 1 + 2 * ns as usize + 3;
    if remaining != expected {
        return Err(Error::SegmentLengthMismatch {
            marker: marker::SOS,
            declared: remaining,
            consumed: expected,
        });
    }

    let mut selectors = Vec::with_capacity(ns as usize);
    for _ in 0..ns {
        let component_id = reader.read_byte()?;
        let td_ta = reader.read_byte()?;
        let dc_table = td_ta >> 4;
        let ac_table = td_ta & 0x0F;
        let component_index = frame.component_index(component_id)?;
        frame.components[component_index].dc_huff_index = dc_table;
        frame.components[component_index].ac_huff_index = ac_table;
        selectors.push(ScanComponentSelector {
            component_index,
            dc_table,
            ac_table,
        });
    }

    let ss = reader.read_byte()?;
    let se = reader.read_byte()?;
    let ah_al = reader.read_byte()?;
    let ah = ah_al >> 4;
    let al = ah_al & 0x0F;
    if se > 63 || ss > se || ah > 13 || al > 13 {
        return Err(Error::BadScanParameters { ss, se, ah, al });
    }

    Ok(ScanHeader {
        selectors,
        spectral_start: ss,
        spectral_end: se,
        approx_high: ah,
        approx_low: al,
    })
}
