// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! End-to-end integration tests for the six concrete scenarios in §8 of the
//! specification, each built as a hand-assembled byte stream and run through the full
//! `JpegDecoder::decode` pipeline.

mod common;
use common::*;

use jpeg::{DecoderOptions, JpegDecoder};

/// Scenario 1: grayscale 8x8 single block. DC diff of 0 with an identity quant table
/// decodes to flat level-128 gray.
#[test]
fn grayscale_single_block() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());
    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF0,
        &sof_payload(
            8,
            8,
            &[SofComponent {
                id: 1,
                h: 1,
                v: 1,
                tq: 0,
            }],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    segment(&mut data, DHT, &dht_single_symbol(1, 0, 0x00));
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            0,
            63,
            0,
            0,
        ),
    );

    let mut writer = BitWriter::new();
    let mut predictor = 0;
    write_dc_only_block(&mut writer, 0, &mut predictor);
    data.extend(writer.into_bytes());
    data.extend(EOI.to_be_bytes());

    let (image, _) = JpegDecoder::new(&data[..]).decode().unwrap();
    assert_eq!(image.width(), 8);
    assert_eq!(image.height(), 8);
    for y in 0..8 {
        for chunk in image.row(y).chunks_exact(4) {
            assert_eq!(chunk, &[128, 128, 128, 255]);
        }
    }
}

/// Scenario 2: YCbCr 16x16 with 2x2 Y and 1x1 Cb/Cr sampling in a single MCU. Chroma
/// must be replicated (nearest-neighbor upsampled) across the full 16x16 grid.
#[test]
fn ycbcr_2x2_sampling_upsamples_chroma() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());
    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF0,
        &sof_payload(
            16,
            16,
            &[
                SofComponent {
                    id: 1,
                    h: 2,
                    v: 2,
                    tq: 0,
                },
                SofComponent {
                    id: 2,
                    h: 1,
                    v: 1,
                    tq: 0,
                },
                SofComponent {
                    id: 3,
                    h: 1,
                    v: 1,
                    tq: 0,
                },
            ],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    segment(&mut data, DHT, &dht_single_symbol(1, 0, 0x00));
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[
                ScanComponent {
                    id: 1,
                    td: 0,
                    ta: 0,
                },
                ScanComponent {
                    id: 2,
                    td: 0,
                    ta: 0,
                },
                ScanComponent {
                    id: 3,
                    td: 0,
                    ta: 0,
                },
            ],
            0,
            63,
            0,
            0,
        ),
    );

    // Y's flat target sample is 200 (dc = (200-128)*8 = 576); Cb/Cr stay at the
    // neutral dc=0 (post-level-shift sample 128), which `ycbcr_to_rgb` maps to gray.
    let mut writer = BitWriter::new();
    let mut y_predictor = 0;
    write_dc_only_block(&mut writer, 576, &mut y_predictor);
    write_dc_only_block(&mut writer, 576, &mut y_predictor);
    write_dc_only_block(&mut writer, 576, &mut y_predictor);
    write_dc_only_block(&mut writer, 576, &mut y_predictor);
    let mut cb_predictor = 0;
    write_dc_only_block(&mut writer, 0, &mut cb_predictor);
    let mut cr_predictor = 0;
    write_dc_only_block(&mut writer, 0, &mut cr_predictor);
    data.extend(writer.into_bytes());
    data.extend(EOI.to_be_bytes());

    let (image, _) = JpegDecoder::new(&data[..]).decode().unwrap();
    assert_eq!(image.width(), 16);
    assert_eq!(image.height(), 16);
    for y in 0..16 {
        for chunk in image.row(y).chunks_exact(4) {
            assert_eq!(chunk, &[200, 200, 200, 255]);
        }
    }
}

/// Scenario 3: restart every 1 MCU. A two-MCU single-component scan with `DRI=1` must
/// consume an `RST0` between MCU 0 and MCU 1 and reset the DC predictor, so the second
/// MCU's DC is independent of the first's.
#[test]
fn restart_every_mcu_resets_dc_predictor() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());
    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF0,
        &sof_payload(
            16,
            8,
            &[SofComponent {
                id: 1,
                h: 1,
                v: 1,
                tq: 0,
            }],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    segment(&mut data, DHT, &dht_single_symbol(1, 0, 0x00));
    segment(&mut data, DRI, &dri_payload(1));
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            0,
            63,
            0,
            0,
        ),
    );

    let mut writer = BitWriter::new();
    let mut predictor = 0;
    write_dc_only_block(&mut writer, 80, &mut predictor); // MCU 0: sample 128+10=138
    writer.restart_marker(0);
    let mut predictor_after_restart = 0; // the decoder resets to 0 here too
    write_dc_only_block(&mut writer, -40, &mut predictor_after_restart); // MCU 1: 128-5=123
    data.extend(writer.into_bytes());
    data.extend(EOI.to_be_bytes());

    let (image, _) = JpegDecoder::new(&data[..]).decode().unwrap();
    assert_eq!(image.width(), 16);
    assert_eq!(image.height(), 8);
    for y in 0..8 {
        let row = image.row(y);
        for chunk in row[0..32].chunks_exact(4) {
            assert_eq!(chunk, &[138, 138, 138, 255]);
        }
        for chunk in row[32..64].chunks_exact(4) {
            assert_eq!(chunk, &[123, 123, 123, 255]);
        }
    }
}

/// Scenario 4: progressive 3-scan decode (DC first with `Al=1`, AC first with an EOB
/// run covering all three blocks, then DC refinement) must match a direct single-shot
/// decode of the same final DC value (full precision 9 => sample shift of +1 after
/// refinement).
#[test]
fn progressive_three_scan_matches_final_dc_value() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());
    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF2,
        &sof_payload(
            24,
            8,
            &[SofComponent {
                id: 1,
                h: 1,
                v: 1,
                tq: 0,
            }],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    // AC table with two codes: index 0 -> RS=0x00 (EOB, unused here), index 1 -> RS=0x10
    // (EOBn with n's low bit transmitted, used to start the 3-block EOB run).
    segment(&mut data, DHT, &dht_fixed_length(1, 0, 2, &[0x00, 0x10]));

    // Scan 1: DC first, Ah=0 Al=1. Full-precision target DC is 9 for every block; the
    // transmitted (shifted) value is 9 >> 1 = 4.
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            0,
            0,
            0,
            1,
        ),
    );
    let mut dc_first = BitWriter::new();
    let mut predictor = 0;
    write_dc_only_block_no_ac(&mut dc_first, 4, &mut predictor);
    write_dc_only_block_no_ac(&mut dc_first, 4, &mut predictor);
    write_dc_only_block_no_ac(&mut dc_first, 4, &mut predictor);
    data.extend(dc_first.into_bytes());

    // Scan 2: AC first over [1, 63], Ah=0 Al=0. A single EOBn covers all three blocks:
    // RS=0x10 (run=1) plus one extra bit (1) gives eob_run = (1<<1)-1 + 1 = 2, meaning
    // "this block plus 2 more", i.e. all 3 blocks in this tiny scan.
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            1,
            63,
            0,
            0,
        ),
    );
    let mut ac_first = BitWriter::new();
    ac_first.push_bits(0b01, 2); // RS = 0x10
    ac_first.push_bits(1, 1); // extra EOB-run precision bit
    data.extend(ac_first.into_bytes());

    // Scan 3: DC refinement, Ah=1 Al=0. One raw bit per block, no Huffman table; all
    // three blocks get their dropped low bit (1) restored, so 4<<1 | 1 = 9.
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            0,
            0,
            1,
            0,
        ),
    );
    let mut dc_refine = BitWriter::new();
    dc_refine.push_bits(0b111, 3);
    data.extend(dc_refine.into_bytes());

    data.extend(EOI.to_be_bytes());

    let (image, _) = JpegDecoder::new(&data[..]).decode().unwrap();
    // Final DC = 9 for every block => flat sample 9/8 + 128 rounds to 129.
    for y in 0..8 {
        for chunk in image.row(y).chunks_exact(4) {
            assert_eq!(chunk, &[129, 129, 129, 255]);
        }
    }
}

/// Scenario 5: EXIF + JFIF present. EXIF XResolution/YResolution (96/1 both axes) must
/// take precedence over the JFIF density (72x72).
#[test]
fn exif_resolution_takes_precedence_over_jfif_density() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());

    let mut exif = b"Exif\0\0".to_vec();
    exif.extend(b"II");
    exif.extend(0x002Au16.to_le_bytes());
    exif.extend(8u32.to_le_bytes());
    exif.extend(2u16.to_le_bytes());
    exif.extend(0x011Au16.to_le_bytes());
    exif.extend(5u16.to_le_bytes());
    exif.extend(1u32.to_le_bytes());
    exif.extend(38u32.to_le_bytes());
    exif.extend(0x011Bu16.to_le_bytes());
    exif.extend(5u16.to_le_bytes());
    exif.extend(1u32.to_le_bytes());
    exif.extend(46u32.to_le_bytes());
    exif.extend(0u32.to_le_bytes());
    exif.extend(96u32.to_le_bytes());
    exif.extend(1u32.to_le_bytes());
    exif.extend(96u32.to_le_bytes());
    exif.extend(1u32.to_le_bytes());
    segment(&mut data, APP1, &exif);

    let mut jfif = b"JFIF\0".to_vec();
    jfif.extend([1, 2, 1]); // version, units=1 (dpi)
    jfif.extend(72u16.to_be_bytes());
    jfif.extend(72u16.to_be_bytes());
    jfif.extend([0, 0]);
    segment(&mut data, APP0, &jfif);

    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF0,
        &sof_payload(
            8,
            8,
            &[SofComponent {
                id: 1,
                h: 1,
                v: 1,
                tq: 0,
            }],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    segment(&mut data, DHT, &dht_single_symbol(1, 0, 0x00));
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            0,
            63,
            0,
            0,
        ),
    );
    let mut writer = BitWriter::new();
    let mut predictor = 0;
    write_dc_only_block(&mut writer, 0, &mut predictor);
    data.extend(writer.into_bytes());
    data.extend(EOI.to_be_bytes());

    let (_, metadata) = JpegDecoder::new(&data[..]).decode().unwrap();
    assert_eq!(metadata.horizontal_resolution, 96.0);
    assert_eq!(metadata.vertical_resolution, 96.0);
    assert!(metadata.exif_profile.is_some());
}

/// Scenario 6: CMYK via Adobe marker. An Adobe APP14 segment with `ColorTransform=0`
/// and a 4-component SOF must classify as CMYK (not YCCK), and full black ink (K
/// sample 255, C/M/Y sample 0) must decode to RGB black.
#[test]
fn cmyk_via_adobe_marker_decodes_to_rgb() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());

    let mut adobe = b"Adobe".to_vec();
    adobe.extend([0, 100, 0, 0, 0, 0, 0]); // ColorTransform = 0
    segment(&mut data, APP14, &adobe);

    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF0,
        &sof_payload(
            8,
            8,
            &[
                SofComponent {
                    id: 1,
                    h: 1,
                    v: 1,
                    tq: 0,
                },
                SofComponent {
                    id: 2,
                    h: 1,
                    v: 1,
                    tq: 0,
                },
                SofComponent {
                    id: 3,
                    h: 1,
                    v: 1,
                    tq: 0,
                },
                SofComponent {
                    id: 4,
                    h: 1,
                    v: 1,
                    tq: 0,
                },
            ],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    segment(&mut data, DHT, &dht_single_symbol(1, 0, 0x00));
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[
                ScanComponent {
                    id: 1,
                    td: 0,
                    ta: 0,
                },
                ScanComponent {
                    id: 2,
                    td: 0,
                    ta: 0,
                },
                ScanComponent {
                    id: 3,
                    td: 0,
                    ta: 0,
                },
                ScanComponent {
                    id: 4,
                    td: 0,
                    ta: 0,
                },
            ],
            0,
            63,
            0,
            0,
        ),
    );

    // C, M, Y samples target 0 (dc = (0-128)*8 = -1024); K targets 255 (dc = 1016).
    let mut writer = BitWriter::new();
    let mut c_predictor = 0;
    write_dc_only_block(&mut writer, -1024, &mut c_predictor);
    let mut m_predictor = 0;
    write_dc_only_block(&mut writer, -1024, &mut m_predictor);
    let mut y_predictor = 0;
    write_dc_only_block(&mut writer, -1024, &mut y_predictor);
    let mut k_predictor = 0;
    write_dc_only_block(&mut writer, 1016, &mut k_predictor);
    data.extend(writer.into_bytes());
    data.extend(EOI.to_be_bytes());

    let (image, _) = JpegDecoder::new(&data[..]).decode().unwrap();
    for y in 0..8 {
        for chunk in image.row(y).chunks_exact(4) {
            assert_eq!(chunk, &[0, 0, 0, 255]);
        }
    }
}

/// Honors `ignore_metadata` by dropping the EXIF payload entirely, with no effect on
/// the decoded pixels (§8, "skipping unknown APPn segments does not alter pixel
/// output").
#[test]
fn ignore_metadata_drops_exif_but_not_pixels() {
    let mut data = Vec::new();
    data.extend(SOI.to_be_bytes());
    let mut exif = b"Exif\0\0".to_vec();
    exif.extend([0xAA; 16]);
    segment(&mut data, APP1, &exif);
    segment(&mut data, DQT, &dqt_identity(0));
    segment(
        &mut data,
        SOF0,
        &sof_payload(
            8,
            8,
            &[SofComponent {
                id: 1,
                h: 1,
                v: 1,
                tq: 0,
            }],
        ),
    );
    segment(&mut data, DHT, &dht_fixed_length(0, 0, DC_BITS, &DC_SYMBOLS));
    segment(&mut data, DHT, &dht_single_symbol(1, 0, 0x00));
    segment(
        &mut data,
        SOS,
        &sos_payload(
            &[ScanComponent {
                id: 1,
                td: 0,
                ta: 0,
            }],
            0,
            63,
            0,
            0,
        ),
    );
    let mut writer = BitWriter::new();
    let mut predictor = 0;
    write_dc_only_block(&mut writer, 0, &mut predictor);
    data.extend(writer.into_bytes());
    data.extend(EOI.to_be_bytes());

    let options = DecoderOptions {
        ignore_metadata: true,
        max_image_pixels: None,
    };
    let (image, metadata) = JpegDecoder::with_options(&data[..], options).decode().unwrap();
    assert!(metadata.exif_profile.is_none());
    assert_eq!(image.row(0)[0..4], [128, 128, 128, 255]);
}

/// Writes a DC-only coefficient with no trailing AC Huffman code at all, for scans
/// that only carry a DC band (`Se=0`), where there is no AC table to read from.
fn write_dc_only_block_no_ac(writer: &mut BitWriter, target_dc: i32, dc_predictor: &mut i32) {
    let diff = target_dc - *dc_predictor;
    let (size, bits) = size_and_bits(diff);
    writer.push_bits(size as u32, DC_BITS as u32);
    if size > 0 {
        writer.push_bits(bits, size as u32);
    }
    *dc_predictor = target_dc;
}
