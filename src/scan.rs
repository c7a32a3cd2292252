// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The scan decoder (C6): entropy-coded MCU decoding for both sequential and
//! progressive scans, including restart-marker resynchronization, successive
//! approximation, and end-of-band run tracking (T.81 §F, Annex G).

use std::io::Read;

use crate::bit_reader::{BitReader, ByteReader};
use crate::component::Frame;
use crate::error::{Error, Result};
use crate::huffman::{HuffClass, HuffmanTable, HuffmanTables};
use crate::marker;
use crate::segments::ScanHeader;
use crate::util::{extend_receive, ZIGZAG};

/// Decodes every MCU (or, for a non-interleaved scan, every block) named by `scan`,
/// writing coefficients directly into `frame`'s component block grids. Consumes
/// entropy-coded data from `reader` up to (but not including) the marker that ends the
/// scan; the caller resumes marker dispatch from there.
pub fn decode_scan<R: Read>(
    reader: &mut ByteReader<R>,
    frame: &mut Frame,
    huffman: &HuffmanTables,
    scan: &ScanHeader,
    restart_interval: u16,
) -> Result<()> {
    for component_index in scan.selectors.iter().map(|s| s.component_index) {
        frame.components[component_index].dc_predictor = 0;
    }

    let mut br = BitReader::new(reader);
    let mut eob_run: u32 = 0;
    let mut rst_counter: u8 = 0;
    let mut units_since_restart: u32 = 0;

    let non_interleaved = scan.selectors.len() == 1;
    if non_interleaved {
        let selector_index = 0;
        let component_index = scan.selectors[selector_index].component_index;
        let (bx, by) = frame.components[component_index].non_interleaved_blocks(frame);
        let stride = frame.components[component_index].blocks_x;
        let total_units = (bx * by) as u32;

        for y in 0..by {
            for x in 0..bx {
                let idx = y * stride + x;
                decode_one_block(
                    &mut br,
                    frame,
                    huffman,
                    scan,
                    selector_index,
                    component_index,
                    idx,
                    &mut eob_run,
                )?;

                units_since_restart += 1;
                let units_done = (y * bx + x + 1) as u32;
                if units_since_restart == restart_interval as u32 && units_done < total_units {
                    resync_restart(&mut br, frame, scan, &mut rst_counter, &mut eob_run)?;
                    units_since_restart = 0;
                }
            }
        }
    } else {
        let total_mcus = frame.mcus_x * frame.mcus_y;
        for mcu in 0..total_mcus {
            let mcu_x = mcu % frame.mcus_x;
            let mcu_y = mcu / frame.mcus_x;

            for selector_index in 0..scan.selectors.len() {
                let component_index = scan.selectors[selector_index].component_index;
                let (h, v, stride) = {
                    let component = &frame.components[component_index];
                    (
                        component.horizontal_sampling as u32,
                        component.vertical_sampling as u32,
                        component.blocks_x,
                    )
                };
                for dy in 0..v {
                    for dx in 0..h {
                        let block_x = (mcu_x * h + dx) as usize;
                        let block_y = (mcu_y * v + dy) as usize;
                        let idx = block_y * stride + block_x;
                        decode_one_block(
                            &mut br,
                            frame,
                            huffman,
                            scan,
                            selector_index,
                            component_index,
                            idx,
                            &mut eob_run,
                        )?;
                    }
                }
            }

            units_since_restart += 1;
            if units_since_restart == restart_interval as u32 && mcu + 1 < total_mcus {
                resync_restart(&mut br, frame, scan, &mut rst_counter, &mut eob_run)?;
                units_since_restart = 0;
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_one_block<R: Read>(
    br: &mut BitReader<'_, R>,
    frame: &mut Frame,
    huffman: &HuffmanTables,
    scan: &ScanHeader,
    selector_index: usize,
    component_index: usize,
    block_index: usize,
    eob_run: &mut u32,
) -> Result<()> {
    let selector = &scan.selectors[selector_index];
    let dc_table = lookup_table(huffman, HuffClass::Dc, selector.dc_table)?;
    let ac_table = lookup_table(huffman, HuffClass::Ac, selector.ac_table)?;

    let is_progressive = frame.is_progressive;
    let component = &mut frame.components[component_index];
    let block = &mut component.blocks[block_index];

    if !is_progressive {
        decode_sequential_block(block, &mut component.dc_predictor, dc_table, ac_table, br)
    } else if scan.spectral_start == 0 {
        if scan.approx_high == 0 {
            decode_dc_first(block, &mut component.dc_predictor, dc_table, br, scan.approx_low)
        } else {
            decode_dc_refine(block, br, scan.approx_low)
        }
    } else if scan.approx_high == 0 {
        decode_ac_first(
            block,
            ac_table,
            br,
            scan.spectral_start,
            scan.spectral_end,
            scan.approx_low,
            eob_run,
        )
    } else {
        decode_ac_refine(
            block,
            ac_table,
            br,
            scan.spectral_start,
            scan.spectral_end,
            scan.approx_low,
            eob_run,
        )
    }
}

fn lookup_table<'a>(
    huffman: &'a HuffmanTables,
    class: HuffClass,
    id: u8,
) -> Result<&'a HuffmanTable> {
    huffman.get(class, id).ok_or(Error::MissingHuffmanTable(id))
}

fn resync_restart<R: Read>(
    br: &mut BitReader<'_, R>,
    frame: &mut Frame,
    scan: &ScanHeader,
    rst_counter: &mut u8,
    eob_run: &mut u32,
) -> Result<()> {
    br.align_to_byte();
    let found = br.read_marker()?;
    let expected = marker::RST0 + *rst_counter as u16;
    if found != expected {
        return Err(Error::BadRestartMarker {
            expected: *rst_counter,
            found,
        });
    }
    *rst_counter = (*rst_counter + 1) % 8;
    br.reset();
    *eob_run = 0;
    for component_index in scan.selectors.iter().map(|s| s.component_index) {
        frame.components[component_index].dc_predictor = 0;
    }
    Ok(())
}

/// Full sequential (baseline) block decode: DC diff then a run of AC coefficients
/// terminated by EOB, ZRL, or reaching coefficient 63 (T.81 F.2).
fn decode_sequential_block<R: Read>(
    block: &mut crate::block::CoefBlock,
    dc_predictor: &mut i32,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    br: &mut BitReader<'_, R>,
) -> Result<()> {
    let size = dc_table.decode(br)?;
    let diff = if size == 0 {
        0
    } else {
        extend_receive(br.receive(size as u32)?, size)
    };
    *dc_predictor += diff;
    block[0] = *dc_predictor;

    let mut k = 1usize;
    while k < 64 {
        let rs = ac_table.decode(br)?;
        let run = (rs >> 4) as usize;
        let size = rs & 0x0F;
        if size == 0 {
            if run == 15 {
                k += 16; // ZRL: 16 zero coefficients with no value bits.
                continue;
            }
            break; // EOB
        }
        k += run;
        if k >= 64 {
            return Err(Error::BadHuffmanCode);
        }
        block[ZIGZAG[k]] = extend_receive(br.receive(size as u32)?, size);
        k += 1;
    }
    Ok(())
}

/// Progressive DC first scan (Ah=0): like the sequential DC diff, but the result is
/// left-shifted by `al` since only the top bits are being transmitted this scan.
fn decode_dc_first<R: Read>(
    block: &mut crate::block::CoefBlock,
    dc_predictor: &mut i32,
    dc_table: &HuffmanTable,
    br: &mut BitReader<'_, R>,
    al: u8,
) -> Result<()> {
    let size = dc_table.decode(br)?;
    let diff = if size == 0 {
        0
    } else {
        extend_receive(br.receive(size as u32)?, size)
    };
    *dc_predictor += diff;
    block[0] = *dc_predictor << al;
    Ok(())
}

/// Progressive DC refinement scan (Ah>0): appends one more bit of precision.
fn decode_dc_refine<R: Read>(
    block: &mut crate::block::CoefBlock,
    br: &mut BitReader<'_, R>,
    al: u8,
) -> Result<()> {
    if br.receive(1)? != 0 {
        block[0] |= 1 << al;
    }
    Ok(())
}

/// Progressive AC first scan (Ah=0) over `[ss, se]`, with end-of-band run tracking
/// (T.81 G.1.2.2): an EOB run covers this block and some number of following blocks,
/// during which nothing further is decoded for any of them.
#[allow(clippy::too_many_arguments)]
fn decode_ac_first<R: Read>(
    block: &mut crate::block::CoefBlock,
    ac_table: &HuffmanTable,
    br: &mut BitReader<'_, R>,
    ss: u8,
    se: u8,
    al: u8,
    eob_run: &mut u32,
) -> Result<()> {
    if *eob_run > 0 {
        *eob_run -= 1;
        return Ok(());
    }

    let se = se as usize;
    let mut k = ss as usize;
    while k <= se {
        let rs = ac_table.decode(br)?;
        let run = (rs >> 4) as usize;
        let size = rs & 0x0F;
        if size == 0 {
            if run == 15 {
                k += 16; // ZRL
                continue;
            }
            *eob_run = (1u32 << run) - 1;
            if run > 0 {
                *eob_run += br.receive(run as u32)? as u32;
            }
            break;
        }
        k += run;
        if k > se {
            return Err(Error::BadHuffmanCode);
        }
        block[ZIGZAG[k]] = extend_receive(br.receive(size as u32)?, size) << al;
        k += 1;
    }
    Ok(())
}

/// Progressive AC refinement scan (Ah>0) over `[ss, se]` (T.81 G.1.2.3): every
/// already-nonzero coefficient may receive one correction bit, and the run/EOB-run
/// mechanism additionally locates where newly-nonzero coefficients appear.
#[allow(clippy::too_many_arguments)]
fn decode_ac_refine<R: Read>(
    block: &mut crate::block::CoefBlock,
    ac_table: &HuffmanTable,
    br: &mut BitReader<'_, R>,
    ss: u8,
    se: u8,
    al: u8,
    eob_run: &mut u32,
) -> Result<()> {
    let p1: i32 = 1 << al;
    let m1: i32 = -1 << al;
    let se = se as usize;
    let mut k = ss as usize;

    if *eob_run == 0 {
        while k <= se {
            let rs = ac_table.decode(br)?;
            let run_raw = (rs >> 4) as i32;
            let size = rs & 0x0F;

            let mut run;
            let mut new_value = 0i32;
            let mut have_new_value = false;
            if size == 0 {
                if run_raw != 15 {
                    *eob_run = 1u32 << run_raw;
                    if run_raw > 0 {
                        *eob_run += br.receive(run_raw as u32)? as u32;
                    }
                    break;
                }
                run = 15;
            } else {
                let bit = br.receive(1)?;
                new_value = if bit != 0 { p1 } else { m1 };
                have_new_value = true;
                run = run_raw;
            }

            while k <= se {
                let idx = ZIGZAG[k];
                if block[idx] != 0 {
                    if br.receive(1)? != 0 && (block[idx] & p1) == 0 {
                        block[idx] += if block[idx] >= 0 { p1 } else { m1 };
                    }
                } else {
                    if run == 0 {
                        if have_new_value {
                            block[idx] = new_value;
                        }
                        k += 1;
                        break;
                    }
                    run -= 1;
                }
                k += 1;
            }
        }
    }

    if *eob_run > 0 {
        while k <= se {
            let idx = ZIGZAG[k];
            if block[idx] != 0 && br.receive(1)? != 0 && (block[idx] & p1) == 0 {
                block[idx] += if block[idx] >= 0 { p1 } else { m1 };
            }
            k += 1;
        }
        *eob_run -= 1;
    }
    Ok(())
}
