// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Quantization tables (C5 data model), populated exclusively by DQT segments (C4, §4.4)
//! and read-only thereafter.

use std::io::Read;

use crate::bit_reader::ByteReader;
use crate::block::Block8x8;
use crate::error::{Error, Result};
use crate::marker;
use crate::util::ZIGZAG;

pub const MAX_QUANT_TABLES: usize = 4;

/// The 4 optional quantization tables, identified by `Tq in 0..=3`.
#[derive(Clone, Default)]
pub struct QuantTables {
    tables: [Option<Block8x8<u16>>; MAX_QUANT_TABLES],
}

impl QuantTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tq: u8) -> Option<&Block8x8<u16>> {
        self.tables.get(tq as usize).and_then(|t| t.as_ref())
    }

    /// Parses a DQT segment payload, which may define several tables back to back, and
    /// installs each into its `Tq` slot. Consumes exactly `remaining` bytes.
    pub fn parse_dqt<R: Read>(
        &mut self,
        reader: &mut ByteReader<R>,
        mut remaining: usize,
    ) -> Result<()> {
        while remaining > 0 {
            let pq_tq = reader.read_byte()?;
            remaining -= 1;
            let pq = pq_tq >> 4;
            let tq = pq_tq & 0x0F;
            if tq as usize >= MAX_QUANT_TABLES {
                return Err(Error::BadTq(tq));
            }

            let mut block = Block8x8::default();
            match pq {
                0 => {
                    if remaining < 64 {
                        return Err(Error::SegmentLengthMismatch {
                            marker: marker::DQT,
                            declared: remaining,
                            consumed: 64,
                        });
                    }
                    let mut buf = [0u8; 64];
                    reader.read_full(&mut buf)?;
                    remaining -= 64;
                    for (z, &byte) in buf.iter().enumerate() {
                        block[ZIGZAG[z]] = byte as u16;
                    }
                }
                1 => {
                    if remaining < 128 {
                        return Err(Error::SegmentLengthMismatch {
                            marker: marker::DQT,
                            declared: remaining,
                            consumed: 128,
                        });
                    }
                    let mut buf = [0u8; 128];
                    reader.read_full(&mut buf)?;
                    remaining -= 128;
                    for z in 0..64 {
                        block[ZIGZAG[z]] = u16::from_be_bytes([buf[2 * z], buf[2 * z + 1]]);
                    }
                }
                _ => return Err(Error::BadPq(pq)),
            }
            self.tables[tq as usize] = Some(block);
        }
        Ok(())
    }
}
