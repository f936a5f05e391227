//! Tests for PNG encoding.
//!
//! Covers indexed vs RGBA selection, chunk structure and that the
//! compressed scanlines decode back to the input pixels.

use std::io::Read;

use renderer::png::{create_png, create_png_auto, PNG_SIGNATURE};

// ============================================================================
// Helper functions
// ============================================================================

/// Walk the chunk list: (type, data) pairs after the signature.
fn chunks(png: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    let mut pos = 8;
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let kind = String::from_utf8_lossy(&png[pos + 4..pos + 8]).to_string();
        let data = png[pos + 8..pos + 8 + len].to_vec();
        out.push((kind, data));
        pos += 12 + len;
    }
    out
}

fn color_type(png: &[u8]) -> u8 {
    png[25]
}

fn inflate_idat(png: &[u8]) -> Vec<u8> {
    let idat: Vec<u8> = chunks(png)
        .into_iter()
        .filter(|(k, _)| k == "IDAT")
        .flat_map(|(_, d)| d)
        .collect();
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(idat.as_slice())
        .read_to_end(&mut out)
        .unwrap();
    out
}

/// Diverging-ramp-like image: few distinct colors.
fn banded_pixels(width: usize, height: usize, bands: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for _ in 0..height {
        for x in 0..width {
            let band = (x * bands / width) as u8;
            pixels.extend_from_slice(&[band * 20, 40, 255 - band * 20, 255]);
        }
    }
    pixels
}

// ============================================================================
// Format selection
// ============================================================================

#[test]
fn test_few_colors_use_indexed_png() {
    let png = create_png_auto(&banded_pixels(32, 8, 11), 32, 8).unwrap();
    assert_eq!(&png[..8], &PNG_SIGNATURE);
    assert_eq!(color_type(&png), 3);

    let kinds: Vec<String> = chunks(&png).into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec!["IHDR", "PLTE", "IDAT", "IEND"]);
}

#[test]
fn test_many_colors_fall_back_to_rgba() {
    let pixels: Vec<u8> = (0..400u32)
        .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 7, 255])
        .collect();
    let png = create_png_auto(&pixels, 20, 20).unwrap();
    assert_eq!(color_type(&png), 6);
}

#[test]
fn test_transparency_adds_trns_chunk() {
    let pixels = [0, 0, 0, 0, 255, 255, 255, 255];
    let png = create_png_auto(&pixels, 2, 1).unwrap();
    let trns = chunks(&png).into_iter().find(|(k, _)| k == "tRNS").unwrap();
    assert_eq!(trns.1, vec![0, 255]);
}

// ============================================================================
// Content
// ============================================================================

#[test]
fn test_header_dimensions() {
    let png = create_png(&vec![9; 5 * 3 * 4], 5, 3).unwrap();
    let (kind, ihdr) = &chunks(&png)[0];
    assert_eq!(kind, "IHDR");
    assert_eq!(u32::from_be_bytes([ihdr[0], ihdr[1], ihdr[2], ihdr[3]]), 5);
    assert_eq!(u32::from_be_bytes([ihdr[4], ihdr[5], ihdr[6], ihdr[7]]), 3);
    assert_eq!(ihdr[8], 8);
}

#[test]
fn test_rgba_scanlines_decode_to_input() {
    let pixels: Vec<u8> = (0..2 * 2 * 4).map(|i| i as u8 * 10).collect();
    let png = create_png(&pixels, 2, 2).unwrap();
    let raw = inflate_idat(&png);
    assert_eq!(raw.len(), 2 * (1 + 8));
    assert_eq!(raw[0], 0);
    assert_eq!(&raw[1..9], &pixels[0..8]);
    assert_eq!(raw[9], 0);
    assert_eq!(&raw[10..18], &pixels[8..16]);
}

#[test]
fn test_indexed_scanlines_hold_palette_indices() {
    let pixels = [
        255, 0, 0, 255, 0, 0, 255, 255, //
        0, 0, 255, 255, 255, 0, 0, 255,
    ];
    let png = create_png_auto(&pixels, 2, 2).unwrap();
    assert_eq!(inflate_idat(&png), vec![0, 0, 1, 0, 1, 0]);
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn test_single_pixel() {
    let png = create_png_auto(&[1, 2, 3, 255], 1, 1).unwrap();
    assert_eq!(&png[..8], &PNG_SIGNATURE);
    assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");
}

#[test]
fn test_exactly_256_colors_still_indexed() {
    let pixels: Vec<u8> = (0..256u32).flat_map(|i| [i as u8, i as u8, i as u8, 255]).collect();
    assert_eq!(color_type(&create_png_auto(&pixels, 16, 16).unwrap()), 3);

    let mut more = pixels.clone();
    more.extend_from_slice(&[1, 2, 3, 255]);
    more.extend_from_slice(&[0; 4 * 15]);
    assert_eq!(color_type(&create_png_auto(&more, 17, 16).unwrap()), 6);
}

#[test]
fn test_mismatched_buffer_is_error() {
    assert!(create_png_auto(&[0; 7], 1, 2).is_err());
}
