// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical Huffman tables (C2) as specified by ITU-T T.81 Annex C: codes are assigned
//! in order of increasing length, and within a length in the order the symbols appear in
//! the DHT segment. No meta-Huffman coding of the code lengths themselves is involved, so
//! construction is a single linear pass rather than a two-stage decode.

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use std::io::Read;

const MAX_CODE_LENGTH: u32 = 16;
/// Width of the fast first-stage lookup table, in bits.
const FAST_BITS: u32 = 9;

#[derive(Copy, Clone, Debug, Default)]
struct TableEntry {
    /// Code length in bits; 0 means "no code of this length resolves within `FAST_BITS`".
    bits: u8,
    /// Decoded symbol (a Huffman-coded value in `0..=255`, e.g. a DC/AC run-size byte).
    value: u8,
}

/// A built canonical Huffman table, ready for per-bit decoding against a [`BitReader`].
///
/// Codes up to `FAST_BITS` bits long resolve with a single table lookup; longer codes
/// fall back to a bit-by-bit tree walk using `max_code`/`val_ptr`, the classic
/// `mincode`/`maxcode`/`valptr` arrays from T.81 Annex F/C.
#[derive(Clone, Debug)]
pub struct HuffmanTable {
    fast: Vec<TableEntry>,
    /// Per length `l` (1-indexed via `l - 1`), the smallest code of that length, or `-1`
    /// if no code of that length exists.
    min_code: [i32; 17],
    max_code: [i32; 17],
    /// Per length `l`, index into `symbols` of the first symbol with a code of that length.
    val_ptr: [usize; 17],
    symbols: Vec<u8>,
}

impl HuffmanTable {
    /// Builds a table from the 16 per-length code counts and the symbols, exactly as they
    /// appear in a DHT segment payload (§4.4.2).
    pub fn build(counts: &[u8; 16], symbols: &[u8]) -> Result<Self> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != symbols.len() {
            return Err(Error::BadTc(0));
        }

        let mut fast = vec![TableEntry::default(); 1 << FAST_BITS];
        let mut min_code = [-1i32; 17];
        let mut max_code = [-1i32; 17];
        let mut val_ptr = [0usize; 17];

        let mut code: i32 = 0;
        let mut symbol_index = 0usize;
        for len in 1..=16u32 {
            let count = counts[(len - 1) as usize] as usize;
            if count == 0 {
                code <<= 1;
                continue;
            }
            val_ptr[len as usize] = symbol_index;
            min_code[len as usize] = code;
            for _ in 0..count {
                let value = symbols[symbol_index];
                if len <= FAST_BITS {
                    let shift = FAST_BITS - len;
                    let base = (code as u32) << shift;
                    for fill in 0..(1u32 << shift) {
                        fast[(base | fill) as usize] = TableEntry {
                            bits: len as u8,
                            value,
                        };
                    }
                }
                symbol_index += 1;
                code += 1;
            }
            max_code[len as usize] = code - 1;
            code <<= 1;
        }

        Ok(Self {
            fast,
            min_code,
            max_code,
            val_ptr,
            symbols: symbols.to_vec(),
        })
    }

    /// Decodes a single Huffman-coded symbol from `reader`.
    pub fn decode<R: Read>(&self, reader: &mut BitReader<'_, R>) -> Result<u8> {
        let peeked = reader.peek(FAST_BITS)?;
        let entry = self.fast[peeked as usize];
        if entry.bits != 0 {
            reader.consume(entry.bits as u32);
            return Ok(entry.value);
        }

        // The fast table missed: none of the peeked bits are still consumed, so fall back
        // to a plain bit-by-bit tree walk from the very first bit (T.81 Annex F.2.2.3).
        let mut code: i32 = 0;
        for len in 1..=MAX_CODE_LENGTH {
            let bit = reader.receive(1)?;
            code = (code << 1) | bit;
            if self.max_code[len as usize] >= 0 && code <= self.max_code[len as usize] {
                let offset = (code - self.min_code[len as usize]) as usize;
                let idx = self.val_ptr[len as usize] + offset;
                return self
                    .symbols
                    .get(idx)
                    .copied()
                    .ok_or(Error::BadHuffmanCode);
            }
        }
        Err(Error::BadHuffmanCode)
    }
}

/// Which of the two Huffman table classes a DHT/SOS table selector refers to (C2).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HuffClass {
    Dc,
    Ac,
}

/// The full set of up to 8 Huffman tables a frame can have bound at once: 4 DC, 4 AC,
/// indexed by `(class, id)` (§3, "Huffman Tree").
#[derive(Clone, Default)]
pub struct HuffmanTables {
    dc: [Option<HuffmanTable>; 4],
    ac: [Option<HuffmanTable>; 4],
}

impl HuffmanTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, class: HuffClass, id: u8, table: HuffmanTable) -> Result<()> {
        let slot = match class {
            HuffClass::Dc => &mut self.dc,
            HuffClass::Ac => &mut self.ac,
        };
        let idx = id as usize;
        if idx >= slot.len() {
            return Err(Error::BadTh(id));
        }
        slot[idx] = Some(table);
        Ok(())
    }

    pub fn get(&self, class: HuffClass, id: u8) -> Option<&HuffmanTable> {
        let slot = match class {
            HuffClass::Dc => &self.dc,
            HuffClass::Ac => &self.ac,
        };
        slot.get(id as usize).and_then(|t| t.as_ref())
    }
}
