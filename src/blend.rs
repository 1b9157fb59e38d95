// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Fixed-point alpha compositing primitives.
//!
//! Three alpha scales are in use:
//!
//! - the public API takes `alpha` in `0..=256`, 256 being fully opaque;
//! - RGB888 intermediates (cache lines) use a 7-bit weight in `0..=128`;
//! - RGB565 blends use a 5-bit weight (`alpha >> 3`) so the red and blue
//!   fields can be multiplied together in one 32-bit word.

use crate::{
    color::{self, map_pixel},
    image::{PixelFormat, Row, RowMut},
    palette::AlphaPalette,
};

/// Full opacity on the public alpha scale.
pub const ALPHA_MAX: u32 = 256;

/// Full opacity on the 7-bit RGB888 scale.
pub const ALPHA_MAX_RGB888: u32 = 128;

/// Linear interpolation of two packed `0x00RRGGBB` pixels.
///
/// `alpha` weighs `fg`, `alpha_comp` weighs `bg`; the two must sum to 128.
/// Red and blue share one multiply, green is done separately. Interpolating
/// in RGB rather than a perceptual space is a known approximation.
#[inline]
pub const fn blend_rgb888(bg: u32, fg: u32, alpha: u32, alpha_comp: u32) -> u32 {
    let rb = (((fg & 0xff00ff) * alpha + (bg & 0xff00ff) * alpha_comp) >> 7) & 0xff00ff;
    let g = (((fg & 0x00ff00) * alpha + (bg & 0x00ff00) * alpha_comp) >> 7) & 0x00ff00;
    rb | g
}

/// Expands an RGB565 pixel to RGB888 with every channel scaled by
/// `scale / 128`.
#[inline]
pub const fn scale_rgb565_to_rgb888(pixel: u32, scale: u32) -> u32 {
    let r = (color::rgb565_to_r8(pixel) * scale) >> 7;
    let g = (color::rgb565_to_g8(pixel) * scale) >> 7;
    let b = (color::rgb565_to_b8(pixel) * scale) >> 7;
    (r << 16) | (g << 8) | b
}

/// Dual signed 16-bit multiply with add: `x.hi * y.hi + x.lo * y.lo`.
///
/// Portable form of the Cortex-M `SMUAD` instruction.
#[inline]
pub(crate) const fn smuad(x: u32, y: u32) -> i32 {
    let (xh, xl) = ((x >> 16) as i16 as i32, x as i16 as i32);
    let (yh, yl) = ((y >> 16) as i16 as i32, y as i16 as i32);
    xh * yh + xl * yl
}

/// Blends `fg` over `bg`, both already in `format`, with `alpha` in
/// `0..=256`.
#[inline]
pub fn blend_pixel(format: PixelFormat, fg: u32, bg: u32, alpha: u32) -> u32 {
    let alpha = alpha.min(ALPHA_MAX);
    match format {
        PixelFormat::Binary => {
            if alpha >= ALPHA_MAX / 2 {
                fg
            } else {
                bg
            }
        }
        PixelFormat::Grayscale => {
            let vgs = (fg << 16) | bg;
            let vsc = (alpha << 16) | (ALPHA_MAX - alpha);
            (smuad(vgs, vsc) >> 8) as u32
        }
        PixelFormat::Rgb565 => {
            let a = alpha >> 3;
            let ac = 32 - a;
            let rb = (((fg & 0xf81f) * a + (bg & 0xf81f) * ac) >> 5) & 0xf81f;
            let g = (((fg & 0x07e0) * a + (bg & 0x07e0) * ac) >> 5) & 0x07e0;
            rb | g
        }
    }
}

/// Merges columns `x_start..x_end` of `src` into `dst` with opacity `alpha`
/// (`0..=256`).
///
/// `src` is usually a cache line; it may be in a different format than `dst`
/// and is converted with [`map_pixel`]. An `alpha_palette` further scales the
/// opacity of each pixel by its palette weight.
///
/// Binary destinations have no partial opacity: pixels are replaced when
/// their effective alpha is at least 128 and left alone otherwise.
pub fn combine_alpha(
    alpha: u32,
    alpha_palette: Option<&AlphaPalette>,
    src: Row,
    dst: &mut RowMut,
    x_start: usize,
    x_end: usize,
) {
    combine_alpha_with(alpha, alpha_palette, src, dst, x_start, x_end, false)
}

/// [`combine_alpha`] with an optional black background: when
/// `black_background` is set the destination is assumed to be zero and is
/// never read.
pub fn combine_alpha_with(
    alpha: u32,
    alpha_palette: Option<&AlphaPalette>,
    src: Row,
    dst: &mut RowMut,
    x_start: usize,
    x_end: usize,
    black_background: bool,
) {
    let alpha = alpha.min(ALPHA_MAX);
    let dst_format = dst.format();
    let src_format = src.format();

    if alpha == 0 || x_start >= x_end {
        return;
    }
    if dst_format == PixelFormat::Binary && alpha < ALPHA_MAX / 2 {
        return;
    }

    if alpha == ALPHA_MAX && alpha_palette.is_none() {
        let bpp = match dst_format {
            PixelFormat::Grayscale => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Binary => 0,
        };
        if src_format == dst_format && bpp != 0 {
            let range = x_start * bpp..x_end * bpp;
            dst.bytes_mut()[range.clone()].copy_from_slice(&src.bytes()[range]);
        } else {
            for x in x_start..x_end {
                dst.put_fast(x, map_pixel(dst_format, src_format, src.get_fast(x)));
            }
        }
        return;
    }

    for x in x_start..x_end {
        let pixel = src.get_fast(x);
        let a = match alpha_palette {
            Some(palette) => palette.apply(alpha, src_format, pixel),
            None => alpha,
        };
        if a == 0 {
            continue;
        }
        let fg = map_pixel(dst_format, src_format, pixel);
        if dst_format == PixelFormat::Binary {
            if a >= ALPHA_MAX / 2 {
                dst.put_fast(x, fg);
            }
            continue;
        }
        let bg = if black_background { 0 } else { dst.get_fast(x) };
        dst.put_fast(x, blend_pixel(dst_format, fg, bg, a));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, PixelFormat};

    #[test]
    fn rgb888_blend_endpoints() {
        let fg = 0x00ff8040;
        let bg = 0x00102030;
        assert_eq!(blend_rgb888(bg, fg, 128, 0), fg);
        assert_eq!(blend_rgb888(bg, fg, 0, 128), bg);
        assert_eq!(blend_rgb888(0, 0x00ffffff, 64, 64), 0x007f7f7f);
    }

    #[test]
    fn scaled_rgb565_expansion() {
        assert_eq!(scale_rgb565_to_rgb888(0xffff, 128), 0x00ffffff);
        assert_eq!(scale_rgb565_to_rgb888(0xffff, 64), 0x007f7f7f);
        assert_eq!(scale_rgb565_to_rgb888(0xf800, 128), 0x00ff0000);
        assert_eq!(scale_rgb565_to_rgb888(0xffff, 0), 0);
    }

    #[test]
    fn smuad_matches_plain_lerp() {
        for fg in (0..=255u32).step_by(5) {
            for bg in (0..=255u32).step_by(7) {
                for a in [0u32, 1, 64, 127, 128, 200, 255, 256] {
                    let plain = (fg * a + bg * (256 - a)) >> 8;
                    assert_eq!(blend_pixel(PixelFormat::Grayscale, fg, bg, a), plain);
                }
            }
        }
    }

    #[test]
    fn half_gray_blend_is_midpoint() {
        assert_eq!(blend_pixel(PixelFormat::Grayscale, 128, 64, 128), 96);
    }

    #[test]
    fn rgb565_blend_uses_five_bit_alpha() {
        assert_eq!(blend_pixel(PixelFormat::Rgb565, 0xffff, 0, 256), 0xffff);
        assert_eq!(blend_pixel(PixelFormat::Rgb565, 0xffff, 0x1234, 0), 0x1234);
        assert_eq!(blend_pixel(PixelFormat::Rgb565, 0xf800, 0x001f, 128), 0x780f);
    }

    #[test]
    fn binary_blend_thresholds() {
        assert_eq!(blend_pixel(PixelFormat::Binary, 1, 0, 127), 0);
        assert_eq!(blend_pixel(PixelFormat::Binary, 1, 0, 128), 1);
    }

    fn line(format: PixelFormat, width: u32, value: u32) -> Image {
        let mut img = Image::new(width, 1, format);
        img.fill(value);
        img
    }

    #[test]
    fn combine_with_zero_alpha_is_noop() {
        let src = line(PixelFormat::Rgb565, 8, 0xffff);
        let mut dst = line(PixelFormat::Rgb565, 8, 0x1234);
        let before = dst.clone();
        combine_alpha(0, None, src.row(0), &mut dst.row_mut(0), 0, 8);
        assert_eq!(dst, before);
    }

    #[test]
    fn combine_binary_full_alpha_copies() {
        let mut src = Image::new(40, 1, PixelFormat::Binary);
        for x in (0..40).step_by(3) {
            src.set_pixel(x, 0, 1);
        }
        let mut dst = line(PixelFormat::Binary, 40, 1);
        combine_alpha(256, None, src.row(0), &mut dst.row_mut(0), 0, 40);
        assert_eq!(dst, src);

        let mut dst = line(PixelFormat::Binary, 40, 1);
        let before = dst.clone();
        combine_alpha(127, None, src.row(0), &mut dst.row_mut(0), 0, 40);
        assert_eq!(dst, before);
    }

    #[test]
    fn combine_respects_column_range() {
        let src = line(PixelFormat::Grayscale, 6, 200);
        let mut dst = line(PixelFormat::Grayscale, 6, 10);
        combine_alpha(256, None, src.row(0), &mut dst.row_mut(0), 2, 4);
        assert_eq!(dst.as_bytes(), &[10, 10, 200, 200, 10, 10]);
    }

    #[test]
    fn combine_converts_between_formats() {
        let src = line(PixelFormat::Grayscale, 4, 255);
        let mut dst = line(PixelFormat::Rgb565, 4, 0);
        combine_alpha(256, None, src.row(0), &mut dst.row_mut(0), 0, 4);
        assert_eq!(dst.get_pixel(3, 0), Some(0xffff));

        let black = line(PixelFormat::Grayscale, 4, 0);
        combine_alpha(128, None, black.row(0), &mut dst.row_mut(0), 0, 4);
        assert_eq!(dst.get_pixel(0, 0), Some(0x7bef));
    }

    #[test]
    fn combine_applies_alpha_palette() {
        let mut src = Image::new(2, 1, PixelFormat::Grayscale);
        src.set_pixel(0, 0, 0);
        src.set_pixel(1, 0, 255);
        let mut dst = line(PixelFormat::Grayscale, 2, 100);
        let palette = AlphaPalette::linear();
        combine_alpha(256, Some(&palette), src.row(0), &mut dst.row_mut(0), 0, 2);
        // Black is fully transparent under a linear palette, white opaque.
        assert_eq!(dst.as_bytes(), &[100, 255]);
    }

    #[test]
    fn black_background_ignores_destination() {
        let src = line(PixelFormat::Grayscale, 2, 200);
        let mut dst = line(PixelFormat::Grayscale, 2, 90);
        combine_alpha_with(128, None, src.row(0), &mut dst.row_mut(0), 0, 2, true);
        assert_eq!(dst.as_bytes(), &[100, 100]);
    }
}
