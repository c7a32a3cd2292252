// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The inverse DCT (C7): a direct, separable implementation of the type-III DCT
//! defined by T.81 A.3.3, applied first to rows then to columns. Table entries are
//! computed once and cached, rather than hand-tuned into the AAN fast factorization, so
//! the arithmetic stays exact and easy to check by inspection.

use std::sync::OnceLock;

use crate::block::{CoefBlock, SampleBlock};
use crate::quant::QuantTables;

const DIM: usize = 8;

/// `cos_table[x][u] = cos((2x + 1) * u * PI / 16)`, shared by every IDCT call.
fn cos_table() -> &'static [[f32; DIM]; DIM] {
    static TABLE: OnceLock<[[f32; DIM]; DIM]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0.0f32; DIM]; DIM];
        for (x, row) in table.iter_mut().enumerate() {
            for (u, entry) in row.iter_mut().enumerate() {
                *entry = (((2 * x + 1) * u) as f32 * std::f32::consts::PI / 16.0).cos();
            }
        }
        table
    })
}

fn alpha(u: usize) -> f32 {
    if u == 0 {
        std::f32::consts::FRAC_1_SQRT_2
    } else {
        1.0
    }
}

/// Dequantizes `coefficients` against `quant`, then applies the 2D inverse DCT,
/// producing sample values nominally in `-128..=127` (level-shifted back to `0..=255`
/// by the caller, per §4.7).
pub fn dequantize_and_idct(coefficients: &CoefBlock, quant: &crate::block::Block8x8<u16>) -> SampleBlock {
    let mut dequantized = [0f32; 64];
    for i in 0..64 {
        dequantized[i] = coefficients[i] as f32 * quant[i] as f32;
    }
    idct_2d(&dequantized)
}

fn idct_2d(coefficients: &[f32; 64]) -> SampleBlock {
    let cos = cos_table();
    let mut tmp = [0f32; 64];
    // 1D IDCT along each row (over u, the horizontal frequency index).
    for y in 0..DIM {
        for x in 0..DIM {
            let mut sum = 0f32;
            for u in 0..DIM {
                sum += alpha(u) * coefficients[y * DIM + u] * cos[x][u];
            }
            tmp[y * DIM + x] = sum * 0.5;
        }
    }
    let mut out = SampleBlock::default();
    // 1D IDCT along each column (over v, the vertical frequency index).
    for x in 0..DIM {
        for y in 0..DIM {
            let mut sum = 0f32;
            for v in 0..DIM {
                sum += alpha(v) * tmp[v * DIM + x] * cos[y][v];
            }
            out[y * DIM + x] = sum * 0.5;
        }
    }
    out
}

/// Convenience used by the post-processor to look up a component's quant table and run
/// the IDCT in one call, surfacing a clear error if the table was never defined.
pub fn dequantize_and_idct_checked(
    coefficients: &CoefBlock,
    quant_tables: &QuantTables,
    tq: u8,
) -> crate::error::Result<SampleBlock> {
    let table = quant_tables
        .get(tq)
        .ok_or(crate::error::Error::MissingQuantTable(tq))?;
    Ok(dequantize_and_idct(coefficients, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block8x8;

    #[test]
    fn dc_only_block_produces_flat_output() {
        let mut coefficients = CoefBlock::default();
        coefficients[0] = 10;
        let mut quant = Block8x8::default();
        for i in 0..64 {
            quant[i] = 1;
        }
        let out = dequantize_and_idct(&coefficients, &quant);
        // A pure DC coefficient of value `c` produces a flat block of value c/8
        // (alpha(0)^2 * 0.25 == 1/8 after both 1D passes).
        let expected = 10.0 / 8.0;
        for i in 0..64 {
            assert!((out[i] - expected).abs() < 1e-3, "{} != {}", out[i], expected);
        }
    }

    #[test]
    fn zero_block_is_zero() {
        let coefficients = CoefBlock::default();
        let quant = Block8x8::default();
        let out = dequantize_and_idct(&coefficients, &quant);
        for i in 0..64 {
            assert_eq!(out[i], 0.0);
        }
    }

    #[test]
    fn missing_quant_table_is_reported() {
        let coefficients = CoefBlock::default();
        let tables = QuantTables::new();
        assert!(dequantize_and_idct_checked(&coefficients, &tables, 0).is_err());
    }
}
