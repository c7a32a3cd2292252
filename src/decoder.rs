// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The orchestrator (C8): drives marker-stream parsing and hands the resulting frame
//! state to the post-processor, exposing `decode` and the SOF-only `parse_metadata`
//! fast path (§4.8).

use std::io::Read;

use crate::bit_reader::ByteReader;
use crate::component::Frame;
use crate::error::{Error, Result};
use crate::huffman::HuffmanTables;
use crate::image::{ImageMetadata, PixelSink, RgbaImage};
use crate::marker;
use crate::postprocess;
use crate::quant::QuantTables;
use crate::scan;
use crate::segments::{self, IccAccumulator, JfifDensity};
use crate::util::trace_event;

/// Tunable decoder behavior (§6, extended with an ambient allocation guard).
#[derive(Clone, Copy, Debug)]
pub struct DecoderOptions {
    /// If true, APP1 (EXIF) and APP2 (ICC) payloads are skipped rather than retained.
    pub ignore_metadata: bool,
    /// If set, `SOF` width*height above this bound is rejected as `ImageTooLarge`
    /// before any per-component block grid is allocated.
    pub max_image_pixels: Option<u64>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            ignore_metadata: false,
            max_image_pixels: None,
        }
    }
}

/// The result of [`JpegDecoder::parse_metadata`]: just enough to report dimensions and
/// resolution without entropy-decoding any scan.
#[derive(Clone, Debug)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub metadata: ImageMetadata,
}

/// Accumulates everything the marker/segment dispatch loop learns about the stream,
/// independent of whether the caller wants a full decode or just metadata.
#[derive(Default)]
struct ParseState {
    frame: Option<Frame>,
    quant_tables: QuantTables,
    huffman_tables: HuffmanTables,
    restart_interval: u16,
    jfif_density: Option<JfifDensity>,
    exif: Option<Vec<u8>>,
    icc: IccAccumulator,
    adobe_transform: Option<u8>,
}

/// A pull-based, single-use JPEG decoder over one byte source (§5: single-threaded,
/// sequential, no shared state between instances).
pub struct JpegDecoder<R> {
    reader: ByteReader<R>,
    options: DecoderOptions,
}

impl<R: Read> JpegDecoder<R> {
    pub fn new(source: R) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    pub fn with_options(source: R, options: DecoderOptions) -> Self {
        Self {
            reader: ByteReader::new(source),
            options,
        }
    }

    /// Parses the whole stream and renders it into a fresh, owned [`RgbaImage`].
    pub fn decode(mut self) -> Result<(RgbaImage, ImageMetadata)> {
        let state = self.parse(false)?;
        let mut image;
        {
            let frame = state
                .frame
                .as_ref()
                .ok_or(Error::SofRequiredBefore("EOI"))?;
            image = RgbaImage::new(frame.width, frame.height);
            postprocess::run(frame, &state.quant_tables, &mut image)?;
        }
        Ok((image, build_metadata(state)))
    }

    /// Parses the whole stream and renders it into a caller-supplied sink, for callers
    /// with their own pixel buffer type (§6).
    pub fn decode_into<S: PixelSink>(mut self, sink: &mut S) -> Result<ImageMetadata> {
        let state = self.parse(false)?;
        {
            let frame = state
                .frame
                .as_ref()
                .ok_or(Error::SofRequiredBefore("EOI"))?;
            postprocess::run(frame, &state.quant_tables, sink)?;
        }
        Ok(build_metadata(state))
    }

    /// Parses only as far as the first SOF, skipping all entropy-coded scan data, and
    /// reports dimensions plus whatever resolution metadata preceded it (§4.8).
    pub fn parse_metadata(mut self) -> Result<FrameInfo> {
        let state = self.parse(true)?;
        let (width, height) = {
            let frame = state
                .frame
                .as_ref()
                .ok_or(Error::SofRequiredBefore("SOF"))?;
            (frame.width, frame.height)
        };
        Ok(FrameInfo {
            width,
            height,
            metadata: build_metadata(state),
        })
    }

    /// The shared marker/segment dispatch loop (C3+C4+C6). Stops either at `EOI` or,
    /// when `stop_after_sof` is set, immediately once the frame's dimensions are known.
    fn parse(&mut self, stop_after_sof: bool) -> Result<ParseState> {
        let mut state = ParseState::default();

        let first = marker::read_marker(&mut self.reader)?;
        if first != marker::SOI {
            return Err(Error::MissingSoi);
        }

        loop {
            let found = marker::read_marker(&mut self.reader)?;
            trace_event!("dispatching segment marker={found:#06x}");

            match found {
                marker::EOI => break,

                marker::APP0 => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    state.jfif_density = segments::parse_app0(&mut self.reader, remaining)?;
                }
                marker::APP1 => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    state.exif = segments::parse_app1(
                        &mut self.reader,
                        remaining,
                        self.options.ignore_metadata,
                    )?;
                }
                marker::APP2 => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    if self.options.ignore_metadata {
                        self.reader.skip(remaining)?;
                    } else {
                        segments::parse_app2(&mut self.reader, remaining, &mut state.icc)?;
                    }
                }
                marker::APP14 => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    state.adobe_transform = segments::parse_app14(&mut self.reader, remaining)?;
                }
                marker::COM => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    self.reader.skip(remaining)?;
                }

                marker::DQT => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    state.quant_tables.parse_dqt(&mut self.reader, remaining)?;
                }
                marker::DHT => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    let is_progressive =
                        state.frame.as_ref().map(|f| f.is_progressive).unwrap_or(false);
                    segments::parse_dht(
                        &mut state.huffman_tables,
                        &mut self.reader,
                        remaining,
                        is_progressive,
                    )?;
                }
                marker::DRI => {
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    state.restart_interval = segments::parse_dri(&mut self.reader, remaining)?;
                }

                marker::SOF0 | marker::SOF1 | marker::SOF2 => {
                    if state.frame.is_some() {
                        return Err(Error::MultipleSof);
                    }
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    let is_progressive = found == marker::SOF2;
                    let frame = Frame::from_sof(
                        &mut self.reader,
                        found,
                        remaining,
                        is_progressive,
                        state.adobe_transform,
                    )?;
                    if let Some(budget) = self.options.max_image_pixels {
                        let pixels = frame.width as u64 * frame.height as u64;
                        if pixels > budget {
                            return Err(Error::ImageTooLarge(frame.width, frame.height, budget));
                        }
                    }
                    state.frame = Some(frame);
                    if stop_after_sof {
                        return Ok(state);
                    }
                }

                marker::SOS => {
                    let frame = state
                        .frame
                        .as_mut()
                        .ok_or(Error::SofRequiredBefore("SOS"))?;
                    let remaining = marker::segment_remaining(&mut self.reader, found)?;
                    let scan_header = segments::parse_sos(&mut self.reader, remaining, frame)?;
                    trace_event!(
                        "entering scan ss={} se={}",
                        scan_header.spectral_start,
                        scan_header.spectral_end
                    );
                    scan::decode_scan(
                        &mut self.reader,
                        frame,
                        &state.huffman_tables,
                        &scan_header,
                        state.restart_interval,
                    )?;
                }

                other if marker::is_unsupported_sof(other) => {
                    return Err(Error::UnsupportedSofMarker(other));
                }
                other if (0xFFE0..=0xFFEF).contains(&other) => {
                    // Unrecognized APPn: tolerated, skipped whole (§4.3).
                    let remaining = marker::segment_remaining(&mut self.reader, other)?;
                    self.reader.skip(remaining)?;
                }
                other => return Err(Error::UnexpectedMarker(other)),
            }
        }

        Ok(state)
    }
}

/// Assembles the non-pixel metadata record, resolving resolution per §4.8: EXIF
/// XResolution/YResolution take precedence over JFIF density when both are present and
/// the EXIF values are positive.
fn build_metadata(state: ParseState) -> ImageMetadata {
    let exif_resolution = state.exif.as_deref().and_then(exif_resolution);
    let (horizontal_resolution, vertical_resolution) = match exif_resolution {
        Some((x, y)) => (x, y),
        None => match state.jfif_density {
            Some(density) => jfif_dpi(density),
            None => (0.0, 0.0),
        },
    };
    ImageMetadata {
        horizontal_resolution,
        vertical_resolution,
        exif_profile: state.exif,
        icc_profile: state.icc.finish(),
    }
}

/// Converts a JFIF density to DPI: unit 1 is already dots-per-inch, unit 2 is
/// dots-per-centimeter, and unit 0 means only an aspect ratio was given (no absolute
/// resolution).
fn jfif_dpi(density: JfifDensity) -> (f64, f64) {
    match density.units {
        1 => (density.x_density as f64, density.y_density as f64),
        2 => (
            density.x_density as f64 * 2.54,
            density.y_density as f64 * 2.54,
        ),
        _ => (0.0, 0.0),
    }
}

/// Reads just enough of a TIFF/EXIF structure to find the XResolution/YResolution
/// rational tags in IFD0 (EXIF tag parsing beyond this is out of scope, §1).
fn exif_resolution(exif: &[u8]) -> Option<(f64, f64)> {
    const TAG_X_RESOLUTION: u16 = 0x011A;
    const TAG_Y_RESOLUTION: u16 = 0x011B;
    const TYPE_RATIONAL: u16 = 5;

    let big_endian = match exif.get(0..2)? {
        b"II" => false,
        b"MM" => true,
        _ => return None,
    };
    if read_u16(exif, 2, big_endian)? != 0x002A {
        return None;
    }
    let ifd_offset = read_u32(exif, 4, big_endian)? as usize;
    let entry_count = read_u16(exif, ifd_offset, big_endian)? as usize;

    let mut x_resolution = None;
    let mut y_resolution = None;
    for i in 0..entry_count {
        let entry = ifd_offset + 2 + i * 12;
        let tag = read_u16(exif, entry, big_endian)?;
        let field_type = read_u16(exif, entry + 2, big_endian)?;
        if field_type != TYPE_RATIONAL || !matches!(tag, TAG_X_RESOLUTION | TAG_Y_RESOLUTION) {
            continue;
        }
        let value_offset = read_u32(exif, entry + 8, big_endian)? as usize;
        let numerator = read_u32(exif, value_offset, big_endian)?;
        let denominator = read_u32(exif, value_offset + 4, big_endian)?;
        if denominator == 0 {
            continue;
        }
        let value = numerator as f64 / denominator as f64;
        match tag {
            TAG_X_RESOLUTION => x_resolution = Some(value),
            TAG_Y_RESOLUTION => y_resolution = Some(value),
            _ => unreachable!(),
        }
    }

    match (x_resolution, y_resolution) {
        (Some(x), Some(y)) if x > 0.0 && y > 0.0 => Some((x, y)),
        _ => None,
    }
}

fn read_u16(buf: &[u8], offset: usize, big_endian: bool) -> Option<u16> {
    let b = buf.get(offset..offset + 2)?;
    Some(if big_endian {
        u16::from_be_bytes([b[0], b[1]])
    } else {
        u16::from_le_bytes([b[0], b[1]])
    })
}

fn read_u32(buf: &[u8], offset: usize, big_endian: bool) -> Option<u32> {
    let b = buf.get(offset..offset + 4)?;
    Some(if big_endian {
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    } else {
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    })
}
