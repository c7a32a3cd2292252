// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Component and frame state (C5): per-component sampling factors, quant-table binding,
//! and spectral-block storage, plus the SOF handler (C4) that builds a [`Frame`].

use std::io::Read;

use crate::bit_reader::ByteReader;
use crate::block::CoefBlock;
use crate::error::{Error, Result};
use crate::util::ceil_div;

/// Deduced color space (§4.5), driving the post-processor's final conversion step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorSpace {
    Grayscale,
    YCbCr,
    Rgb,
    Cmyk,
    Ycck,
}

impl ColorSpace {
    /// Deduces the color space from the component count and an optional Adobe APP14
    /// `ColorTransform` byte (0=unknown/RGB-or-CMYK, 1=YCbCr, 2=YCCK), per §4.5.
    pub fn deduce(component_count: u8, adobe_transform: Option<u8>) -> Result<ColorSpace> {
        match (component_count, adobe_transform) {
            (1, _) => Ok(ColorSpace::Grayscale),
            (3, None) | (3, Some(1)) => Ok(ColorSpace::YCbCr),
            (3, Some(0)) => Ok(ColorSpace::Rgb),
            (4, Some(2)) => Ok(ColorSpace::Ycck),
            (4, None) | (4, Some(0)) => Ok(ColorSpace::Cmyk),
            _ => Err(Error::UnsupportedColorMode(component_count, adobe_transform)),
        }
    }
}

/// A single color-channel descriptor (§3, "Component").
pub struct Component {
    pub identifier: u8,
    pub horizontal_sampling: u8,
    pub vertical_sampling: u8,
    pub quant_table_index: u8,
    /// Set per scan by the SOS handler; meaningless until the component's first scan.
    pub dc_huff_index: u8,
    pub ac_huff_index: u8,
    pub blocks_x: usize,
    pub blocks_y: usize,
    /// Dense `blocks_x * blocks_y` row-major grid, padded to whole MCUs. Sequential
    /// scans fill each block exactly once; progressive scans mutate blocks in place
    /// across successive scans.
    pub blocks: Vec<CoefBlock>,
    /// Reset to 0 at the start of every scan and at every restart-interval boundary.
    pub dc_predictor: i32,
}

impl Component {
    /// The block grid used when this component is the sole component of a
    /// non-interleaved scan (§4.6): derived from the component's own sample dimensions,
    /// which can be smaller than the MCU-padded `blocks_x`/`blocks_y` used for
    /// interleaved scans.
    pub fn non_interleaved_blocks(&self, frame: &Frame) -> (usize, usize) {
        let samples_x = ceil_div(
            frame.width * self.horizontal_sampling as u32,
            frame.max_h_sampling as u32,
        );
        let samples_y = ceil_div(
            frame.height * self.vertical_sampling as u32,
            frame.max_v_sampling as u32,
        );
        (ceil_div(samples_x, 8) as usize, ceil_div(samples_y, 8) as usize)
    }
}

/// Frame-wide state populated by SOF and mutated by DHT/SOS/DQT handlers over the
/// lifetime of a single image decode (§3, "Frame state").
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub mcus_x: u32,
    pub mcus_y: u32,
    pub max_h_sampling: u8,
    pub max_v_sampling: u8,
    pub components: Vec<Component>,
    pub color_space: ColorSpace,
    pub is_progressive: bool,
}

impl Frame {
    pub fn component_index(&self, identifier: u8) -> Result<usize> {
        self.components
            .iter()
            .position(|c| c.identifier == identifier)
            .ok_or(Error::UnknownScanComponent(identifier))
    }

    /// Parses an SOF0/SOF1/SOF2 payload and allocates every component's (padded)
    /// spectral block grid (§4.4). `adobe_transform` must reflect any APP14 segment
    /// already seen earlier in the stream.
    pub fn from_sof<R: Read>(
        reader: &mut ByteReader<R>,
        marker: u16,
        remaining: usize,
        is_progressive: bool,
        adobe_transform: Option<u8>,
    ) -> Result<Frame> {
        if remaining < 6 {
            return Err(Error::SegmentLengthMismatch {
                marker,
                declared: remaining,
                consumed: 6,
            });
        }
        let precision = reader.read_byte()?;
        if precision != 8 {
            return Err(Error::UnsupportedPrecision(precision));
        }
        let height = reader.read_u16()? as u32;
        let width = reader.read_u16()? as u32;
        let component_count = reader.read_byte()?;

        let expected = 6 + 3 * component_count as usize;
        if remaining != expected {
            return Err(Error::SegmentLengthMismatch {
                marker,
                declared: remaining,
                consumed: expected,
            });
        }

        let mut components = Vec::with_capacity(component_count as usize);
        let mut max_h = 1u8;
        let mut max_v = 1u8;
        for _ in 0..component_count {
            let identifier = reader.read_byte()?;
            let sampling = reader.read_byte()?;
            let h = sampling >> 4;
            let v = sampling & 0x0F;
            if !(1..=4).contains(&h) {
                return Err(Error::BadSamplingFactor(h));
            }
            if !(1..=4).contains(&v) {
                return Err(Error::BadSamplingFactor(v));
            }
            let quant_table_index = reader.read_byte()?;
            if quant_table_index > 3 {
                return Err(Error::BadTq(quant_table_index));
            }
            max_h = max_h.max(h);
            max_v = max_v.max(v);
            components.push(Component {
                identifier,
                horizontal_sampling: h,
                vertical_sampling: v,
                quant_table_index,
                dc_huff_index: 0,
                ac_huff_index: 0,
                blocks_x: 0,
                blocks_y: 0,
                blocks: Vec::new(),
                dc_predictor: 0,
            });
        }

        let mcus_x = ceil_div(width, 8 * max_h as u32);
        let mcus_y = ceil_div(height, 8 * max_v as u32);
        for component in components.iter_mut() {
            component.blocks_x = (mcus_x * component.horizontal_sampling as u32) as usize;
            component.blocks_y = (mcus_y * component.vertical_sampling as u32) as usize;
            component.blocks = vec![CoefBlock::default(); component.blocks_x * component.blocks_y];
        }

        let color_space = ColorSpace::deduce(component_count, adobe_transform)?;

        Ok(Frame {
            width,
            height,
            mcus_x,
            mcus_y,
            max_h_sampling: max_h,
            max_v_sampling: max_v,
            components,
            color_space,
            is_progressive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sof_payload(width: u16, height: u16, components: &[(u8, u8, u8, u8)]) -> Vec<u8> {
        let mut payload = vec![8u8];
        payload.extend(height.to_be_bytes());
        payload.extend(width.to_be_bytes());
        payload.push(components.len() as u8);
        for &(id, h, v, tq) in components {
            payload.push(id);
            payload.push((h << 4) | v);
            payload.push(tq);
        }
        payload
    }

    #[test]
    fn mcu_grid_rounds_up_for_non_multiple_dimensions() {
        let payload = sof_payload(17, 9, &[(1, 2, 2, 0), (2, 1, 1, 1), (3, 1, 1, 1)]);
        let mut reader = ByteReader::new(&payload[..]);
        let frame = Frame::from_sof(&mut reader, crate::marker::SOF0, payload.len(), false, None)
            .unwrap();
        assert_eq!(frame.mcus_x, 2); // ceil(17 / 16)
        assert_eq!(frame.mcus_y, 1); // ceil(9 / 16)
        assert_eq!(frame.components[0].blocks_x, 4);
        assert_eq!(frame.components[0].blocks_y, 2);
        assert_eq!(frame.components[1].blocks_x, 2);
        assert_eq!(frame.components[1].blocks_y, 1);
        assert_eq!(frame.color_space, ColorSpace::YCbCr);
    }

    #[test]
    fn rejects_unsupported_precision() {
        let mut payload = sof_payload(8, 8, &[(1, 1, 1, 0)]);
        payload[0] = 12;
        let mut reader = ByteReader::new(&payload[..]);
        assert!(
            Frame::from_sof(&mut reader, crate::marker::SOF0, payload.len(), false, None).is_err()
        );
    }

    #[test]
    fn color_space_deduction_matches_adobe_transform() {
        assert_eq!(ColorSpace::deduce(1, None).unwrap(), ColorSpace::Grayscale);
        assert_eq!(ColorSpace::deduce(3, None).unwrap(), ColorSpace::YCbCr);
        assert_eq!(ColorSpace::deduce(3, Some(0)).unwrap(), ColorSpace::Rgb);
        assert_eq!(ColorSpace::deduce(4, Some(0)).unwrap(), ColorSpace::Cmyk);
        assert_eq!(ColorSpace::deduce(4, Some(2)).unwrap(), ColorSpace::Ycck);
        assert!(ColorSpace::deduce(2, None).is_err());
        assert!(ColorSpace::deduce(3, Some(2)).is_err());
    }

    #[test]
    fn non_interleaved_grid_can_be_smaller_than_padded_grid() {
        // 2x2/1x1/1x1 sampling, 17x9 image: Y's padded grid is 2x2 blocks (16x16 MCU),
        // but Y's own non-interleaved grid only needs ceil(17/8) x ceil(9/8) = 3x2.
        let payload = sof_payload(17, 9, &[(1, 2, 2, 0), (2, 1, 1, 1), (3, 1, 1, 1)]);
        let mut reader = ByteReader::new(&payload[..]);
        let frame = Frame::from_sof(&mut reader, crate::marker::SOF0, payload.len(), false, None)
            .unwrap();
        assert_eq!(frame.components[0].non_interleaved_blocks(&frame), (3, 2));
    }
}
