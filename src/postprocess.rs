// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The post-processor (C7): dequantize -> IDCT -> level-shift/clamp -> upsample -> color
//! convert -> row-wise sink write. Spectral blocks are immutable by the time this module
//! runs (§5), so row-bands of MCUs are independent and, with the `parallel` feature, are
//! rendered concurrently with `rayon` before being written to the sink in order.

use crate::color::{ycbcr_to_rgb, ycck_to_cmyk};
use crate::component::{ColorSpace, Component, Frame};
use crate::error::Result;
use crate::idct::dequantize_and_idct_checked;
use crate::image::PixelSink;
use crate::quant::QuantTables;
use crate::util::clamp_to_u8;

/// Renders every component's spectral blocks for one MCU row into a full-resolution
/// sample plane (still in the component's own, possibly subsampled, grid), one row of
/// bytes per sample row.
fn render_component_band(
    component: &Component,
    quant_tables: &QuantTables,
    mcu_row: usize,
) -> Result<Vec<u8>> {
    let band_rows = component.vertical_sampling as usize * 8;
    let band_cols = component.blocks_x * 8;
    let mut plane = vec![0u8; band_rows * band_cols];

    for block_row_in_band in 0..component.vertical_sampling as usize {
        let block_row = mcu_row * component.vertical_sampling as usize + block_row_in_band;
        if block_row >= component.blocks_y {
            continue;
        }
        for block_col in 0..component.blocks_x {
            let block_index = block_row * component.blocks_x + block_col;
            let samples = dequantize_and_idct_checked(
                &component.blocks[block_index],
                quant_tables,
                component.quant_table_index,
            )?;
            for by in 0..8 {
                for bx in 0..8 {
                    let value = clamp_to_u8(samples[by * 8 + bx] + 128.0);
                    let row = block_row_in_band * 8 + by;
                    let col = block_col * 8 + bx;
                    plane[row * band_cols + col] = value;
                }
            }
        }
    }
    Ok(plane)
}

/// Converts one pixel's worth of samples (one byte per component, in SOF component
/// order) to either RGBA8 or CMYK8, matching the frame's deduced color space (§4.7).
fn convert_pixel(color_space: ColorSpace, samples: &[u8]) -> [u8; 4] {
    match color_space {
        ColorSpace::Grayscale => {
            let g = samples[0];
            [g, g, g, 255]
        }
        ColorSpace::YCbCr => {
            let [r, g, b] = ycbcr_to_rgb(samples[0], samples[1], samples[2]);
            [r, g, b, 255]
        }
        ColorSpace::Rgb => [samples[0], samples[1], samples[2], 255],
        ColorSpace::Cmyk => [samples[0], samples[1], samples[2], samples[3]],
        ColorSpace::Ycck => ycck_to_cmyk(samples[0], samples[1], samples[2], samples[3]),
    }
}

/// Renders one MCU row (a band of `8 * max_v_sampling` image rows, the last one possibly
/// truncated at the bottom edge) into interleaved output rows: RGBA8 for every color
/// space except CMYK/YCCK, which emit raw CMYK8 for the sink to convert or consume
/// directly.
fn render_mcu_row(frame: &Frame, quant_tables: &QuantTables, mcu_row: usize) -> Result<Vec<Vec<u8>>> {
    let planes = frame
        .components
        .iter()
        .map(|component| render_component_band(component, quant_tables, mcu_row))
        .collect::<Result<Vec<_>>>()?;

    let max_h = frame.max_h_sampling as usize;
    let max_v = frame.max_v_sampling as usize;
    let band_height = 8 * max_v;
    let band_row_start = mcu_row * band_height;
    let out_width = frame.width as usize;
    let channels = frame.components.len();

    let mut rows = Vec::with_capacity(band_height);
    for local_row in 0..band_height {
        let image_row = band_row_start + local_row;
        if image_row >= frame.height as usize {
            break;
        }
        let mut samples = [0u8; 4];
        let mut out_row = vec![0u8; out_width * 4];
        for col in 0..out_width {
            for (component_index, component) in frame.components.iter().enumerate() {
                let band_cols = component.blocks_x * 8;
                let comp_row = local_row * component.vertical_sampling as usize / max_v;
                let comp_col = col * component.horizontal_sampling as usize / max_h;
                samples[component_index] = planes[component_index][comp_row * band_cols + comp_col];
            }
            let pixel = convert_pixel(frame.color_space, &samples[..channels]);
            out_row[col * 4..col * 4 + 4].copy_from_slice(&pixel);
        }
        rows.push(out_row);
    }
    Ok(rows)
}

#[cfg(feature = "parallel")]
fn render_all_bands(frame: &Frame, quant_tables: &QuantTables) -> Result<Vec<Vec<Vec<u8>>>> {
    use rayon::prelude::*;
    (0..frame.mcus_y as usize)
        .into_par_iter()
        .map(|mcu_row| render_mcu_row(frame, quant_tables, mcu_row))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn render_all_bands(frame: &Frame, quant_tables: &QuantTables) -> Result<Vec<Vec<Vec<u8>>>> {
    (0..frame.mcus_y as usize)
        .map(|mcu_row| render_mcu_row(frame, quant_tables, mcu_row))
        .collect()
}

/// Drives the full post-processing pipeline for `frame` and streams the result into
/// `sink`, row by row, top to bottom (§4.7/§4.8).
pub fn run<S: PixelSink>(frame: &Frame, quant_tables: &QuantTables, sink: &mut S) -> Result<()> {
    let bands = render_all_bands(frame, quant_tables)?;
    let is_cmyk_like = matches!(frame.color_space, ColorSpace::Cmyk | ColorSpace::Ycck);

    let mut y = 0u32;
    for band in bands {
        for row in band {
            if is_cmyk_like {
                sink.write_cmyk_row(y, &row)?;
            } else {
                sink.write_rgba_row(y, &row)?;
            }
            y += 1;
        }
    }
    Ok(())
}
