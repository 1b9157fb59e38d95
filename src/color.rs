// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Pixel value conversions between the supported formats.
//!
//! RGB565 channel expansion goes through small lookup tables; grayscale is
//! derived with the integer luma approximation `(38R + 75G + 15B) >> 7`.

use crate::image::PixelFormat;

const fn expand_table<const N: usize>() -> [u8; N] {
    let max = N - 1;
    let mut table = [0u8; N];
    let mut i = 0;
    while i < N {
        table[i] = ((i * 255 + max / 2) / max) as u8;
        i += 1;
    }
    table
}

/// 5-bit channel to 8-bit, rounded.
pub const RB5_TO_8: [u8; 32] = expand_table::<32>();

/// 6-bit channel to 8-bit, rounded.
pub const G6_TO_8: [u8; 64] = expand_table::<64>();

pub const R5_MAX: u32 = 31;
pub const G6_MAX: u32 = 63;
pub const B5_MAX: u32 = 31;

#[inline]
pub const fn rgb565_to_r5(p: u32) -> u32 {
    (p >> 11) & 0x1f
}

#[inline]
pub const fn rgb565_to_g6(p: u32) -> u32 {
    (p >> 5) & 0x3f
}

#[inline]
pub const fn rgb565_to_b5(p: u32) -> u32 {
    p & 0x1f
}

#[inline]
pub const fn rgb565_to_r8(p: u32) -> u32 {
    RB5_TO_8[rgb565_to_r5(p) as usize] as u32
}

#[inline]
pub const fn rgb565_to_g8(p: u32) -> u32 {
    G6_TO_8[rgb565_to_g6(p) as usize] as u32
}

#[inline]
pub const fn rgb565_to_b8(p: u32) -> u32 {
    RB5_TO_8[rgb565_to_b5(p) as usize] as u32
}

#[inline]
pub const fn r5g6b5_to_rgb565(r: u32, g: u32, b: u32) -> u32 {
    ((r & 0x1f) << 11) | ((g & 0x3f) << 5) | (b & 0x1f)
}

#[inline]
pub const fn r8g8b8_to_rgb565(r: u32, g: u32, b: u32) -> u32 {
    r5g6b5_to_rgb565(r >> 3, g >> 2, b >> 3)
}

/// Packed `0x00RRGGBB` to RGB565.
#[inline]
pub const fn rgb888_to_rgb565(p: u32) -> u32 {
    r8g8b8_to_rgb565((p >> 16) & 0xff, (p >> 8) & 0xff, p & 0xff)
}

/// RGB565 to packed `0x00RRGGBB`.
#[inline]
pub const fn rgb565_to_rgb888(p: u32) -> u32 {
    (rgb565_to_r8(p) << 16) | (rgb565_to_g8(p) << 8) | rgb565_to_b8(p)
}

#[inline]
pub const fn rgb888_to_grayscale(r: u32, g: u32, b: u32) -> u32 {
    ((r * 38) + (g * 75) + (b * 15)) >> 7
}

#[inline]
pub const fn rgb565_to_grayscale(p: u32) -> u32 {
    rgb888_to_grayscale(rgb565_to_r8(p), rgb565_to_g8(p), rgb565_to_b8(p))
}

#[inline]
pub const fn grayscale_to_rgb565(p: u32) -> u32 {
    r8g8b8_to_rgb565(p, p, p)
}

/// Thresholds at mid-gray.
#[inline]
pub const fn grayscale_to_binary(p: u32) -> u32 {
    (p > 127) as u32
}

#[inline]
pub const fn binary_to_grayscale(p: u32) -> u32 {
    if p != 0 {
        255
    } else {
        0
    }
}

#[inline]
pub const fn rgb565_to_binary(p: u32) -> u32 {
    grayscale_to_binary(rgb565_to_grayscale(p))
}

#[inline]
pub const fn binary_to_rgb565(p: u32) -> u32 {
    if p != 0 {
        0xffff
    } else {
        0
    }
}

/// Converts `pixel` from `src` format to `dst` format.
#[inline]
pub const fn map_pixel(dst: PixelFormat, src: PixelFormat, pixel: u32) -> u32 {
    use PixelFormat::*;
    match (dst, src) {
        (Binary, Binary) | (Grayscale, Grayscale) | (Rgb565, Rgb565) => pixel,
        (Binary, Grayscale) => grayscale_to_binary(pixel),
        (Binary, Rgb565) => rgb565_to_binary(pixel),
        (Grayscale, Binary) => binary_to_grayscale(pixel),
        (Grayscale, Rgb565) => rgb565_to_grayscale(pixel),
        (Rgb565, Binary) => binary_to_rgb565(pixel),
        (Rgb565, Grayscale) => grayscale_to_rgb565(pixel),
    }
}

/// Interprets a pixel as a mask bit.
#[inline]
pub const fn pixel_to_binary(format: PixelFormat, pixel: u32) -> bool {
    match format {
        PixelFormat::Binary => pixel != 0,
        PixelFormat::Grayscale => grayscale_to_binary(pixel) != 0,
        PixelFormat::Rgb565 => rgb565_to_binary(pixel) != 0,
    }
}

/// 8-bit palette index for a pixel: binary maps to 0/255, RGB565 to its luma.
#[inline]
pub const fn palette_index(format: PixelFormat, pixel: u32) -> usize {
    map_pixel(PixelFormat::Grayscale, format, pixel) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_tables_hit_endpoints() {
        assert_eq!(RB5_TO_8[0], 0);
        assert_eq!(RB5_TO_8[31], 255);
        assert_eq!(RB5_TO_8[3], 25);
        assert_eq!(G6_TO_8[63], 255);
        assert_eq!(G6_TO_8[32], 130);
    }

    #[test]
    fn luma_of_white_and_black() {
        assert_eq!(rgb565_to_grayscale(0xffff), 255);
        assert_eq!(rgb565_to_grayscale(0), 0);
        assert_eq!(rgb565_to_binary(0xffff), 1);
        assert_eq!(rgb565_to_binary(0x001f), 0);
    }

    #[test]
    fn map_pixel_identity_and_thresholds() {
        use PixelFormat::*;
        for fmt in [Binary, Grayscale, Rgb565] {
            assert_eq!(map_pixel(fmt, fmt, 1), 1);
        }
        assert_eq!(map_pixel(Binary, Grayscale, 127), 0);
        assert_eq!(map_pixel(Binary, Grayscale, 128), 1);
        assert_eq!(map_pixel(Grayscale, Binary, 1), 255);
        assert_eq!(map_pixel(Rgb565, Binary, 1), 0xffff);
        assert_eq!(map_pixel(Rgb565, Grayscale, 255), 0xffff);
        assert_eq!(map_pixel(Grayscale, Rgb565, 0xf800), 75);
    }

    #[test]
    fn gray_survives_rgb565_within_quantisation() {
        for g in 0..=255u32 {
            let back = rgb565_to_grayscale(grayscale_to_rgb565(g));
            assert!(back.abs_diff(g) <= 8, "{} -> {}", g, back);
        }
    }

    #[test]
    fn rgb888_round_trip_is_exact_on_565_values() {
        for p in [0u32, 0xffff, 0xf800, 0x07e0, 0x001f, 0x8410, 0x1234] {
            assert_eq!(rgb888_to_rgb565(rgb565_to_rgb888(p)), p);
        }
    }
}
