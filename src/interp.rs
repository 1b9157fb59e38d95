// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Interpolation kernels and the cache lines of the masked/mixed-format path.
//!
//! Interpolating resamplers are separable. A generator filters one source
//! row horizontally into a destination-width cache line, then a vertical
//! pass filters two (bilinear) or four (bicubic) lines into the final pixel.
//! The kernels here are shared with the fast path, so both paths produce the
//! same pixel for the same taps.
//!
//! A [`Cell`] carries up to three channels at filter precision in slots
//! `0..3` (the gray level or binary bit alone, or the 5/6/5 RGB fields) and,
//! in slot 3, the share of the cell covered by the mask on a `0..=256`
//! scale. Uncovered taps borrow the value of the nearest covered tap so that
//! masked-out colors never bleed into drawn pixels.

use crate::{
    color::{self, B5_MAX, G6_MAX, R5_MAX},
    image::{ImageView, PixelFormat, Row},
    palette::ColorPalette,
    placement::Axis,
};

pub(crate) type Cell = [i32; 4];

/// Full coverage.
pub(crate) const COVERED: u32 = 256;

/// Rounded blend of `a` and `b` with an 8-bit weight `f` on `b`.
#[inline]
pub(crate) const fn lerp8(a: u32, b: u32, f: u32) -> u32 {
    (a * (256 - f) + b * f + 128) >> 8
}

/// Rounded blend of `a` and `b` with a 16-bit weight `f` on `b`.
#[inline]
pub(crate) const fn lerp16(a: u32, b: u32, f: u32) -> u32 {
    (a * (65536 - f) + b * f + 32768) >> 16
}

/// Catmull-Rom weights for a 16-bit fraction, as 15-bit `(t, t^2, t^3)`.
#[inline]
pub(crate) fn cubic_powers(frac: u32) -> (i64, i64, i64) {
    let t = i64::from(frac >> 1);
    let t2 = (t * t) >> 15;
    let t3 = (t2 * t) >> 15;
    (t, t2, t3)
}

/// Cubic convolution through `d[1]` and `d[2]` at fraction `t`.
#[inline]
pub(crate) fn cubic(d: [i64; 4], (t, t2, t3): (i64, i64, i64)) -> i64 {
    let [d0, d1, d2, d3] = d;
    let a0 = (d1 * 3 - d2 * 3 - d0 + d3) >> 1;
    let a1 = d0 + 2 * d2 - ((5 * d1 + d3) >> 1);
    let a2 = (d2 - d0) >> 1;
    d1 + ((a2 * t + a1 * t2 + a0 * t3) >> 15)
}

/// Extra fractional bits carried through the bicubic kernel.
#[inline]
pub(crate) const fn cubic_shift(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Binary => 8,
        PixelFormat::Grayscale => 4,
        PixelFormat::Rgb565 => 7,
    }
}

/// Number of channels [`channels`] fills for `format`.
#[inline]
pub(crate) const fn channel_count(format: PixelFormat) -> usize {
    match format {
        PixelFormat::Rgb565 => 3,
        _ => 1,
    }
}

/// Splits a pixel into the channels the kernels filter independently.
#[inline]
pub(crate) const fn channels(format: PixelFormat, pixel: u32) -> [u32; 3] {
    match format {
        PixelFormat::Rgb565 => [
            color::rgb565_to_r5(pixel),
            color::rgb565_to_g6(pixel),
            color::rgb565_to_b5(pixel),
        ],
        _ => [pixel, 0, 0],
    }
}

/// Packs bicubic channel sums back into a pixel, clamping overshoot.
#[inline]
pub(crate) fn finish_cubic(format: PixelFormat, c: [i64; 3]) -> u32 {
    match format {
        PixelFormat::Binary => u32::from(c[0] >= 128),
        PixelFormat::Grayscale => (c[0].clamp(0, 255 << 4) >> 4) as u32,
        PixelFormat::Rgb565 => {
            let channel = |v: i64, max: u32| ((v + 64) >> 7).clamp(0, i64::from(max)) as u32;
            color::r5g6b5_to_rgb565(
                channel(c[0], R5_MAX),
                channel(c[1], G6_MAX),
                channel(c[2], B5_MAX),
            )
        }
    }
}

/// Rounded average of `n` pixels whose channels sum to `acc`. Binary blocks
/// take a majority vote.
#[inline]
pub(crate) const fn area_value(format: PixelFormat, acc: [u32; 3], n: u32) -> u32 {
    let half = n / 2;
    match format {
        PixelFormat::Binary => (acc[0] >= half && acc[0] > 0) as u32,
        PixelFormat::Grayscale => (acc[0] + half) / n,
        PixelFormat::Rgb565 => color::r5g6b5_to_rgb565(
            (acc[0] + half) / n,
            (acc[1] + half) / n,
            (acc[2] + half) / n,
        ),
    }
}

/// Gives every uncovered tap the value of the covered tap nearest the
/// sample position. `frac` is the 16-bit position between taps 1 and 2.
#[inline]
fn fill_uncovered<T: Copy>(values: &mut [T; 4], covered: [bool; 4], frac: u32) {
    let order = if frac < 0x8000 {
        [1, 2, 0, 3]
    } else {
        [2, 1, 3, 0]
    };
    if let Some(&nearest) = order.iter().find(|&&i| covered[i]) {
        for i in 0..4 {
            if !covered[i] {
                values[i] = values[nearest];
            }
        }
    }
}

/// Everything a generator reads besides the source row index.
#[derive(Clone, Debug)]
pub(crate) struct LineSource<'a> {
    pub image: ImageView<'a>,
    /// Same size as `image`; unset or out-of-range pixels are not drawn.
    pub mask: Option<ImageView<'a>>,
    /// Maps source pixels into RGB565 lines. Without it lines keep the
    /// source format.
    pub palette: Option<&'a ColorPalette>,
}

impl LineSource<'_> {
    /// Format of generated line values.
    pub fn format(&self) -> PixelFormat {
        match self.palette {
            Some(_) => PixelFormat::Rgb565,
            None => self.image.format(),
        }
    }

    #[inline]
    pub fn pixel(&self, row: Row, x: u32) -> u32 {
        let p = row.get_fast(x as usize);
        match self.palette {
            Some(palette) => palette.lookup(self.image.format(), p),
            None => p,
        }
    }

    #[inline]
    pub fn covered(&self, x: u32, y: u32) -> bool {
        self.mask
            .as_ref()
            .map_or(true, |mask| mask.get_mask_pixel(x as i32, y as i32))
    }
}

/// Two-tap horizontal pass of source row `y` into columns
/// `x.start..x.end` of `line`.
///
/// Binary lines take the nearer tap rather than blending.
pub(crate) fn cache_line_bilinear(line: &mut [Cell], src: &LineSource, x: &Axis, y: u32) {
    let format = src.format();
    let row = src.image.row(y);
    for d in x.start..x.end {
        let (base, frac) = x.taps(d);
        let (x0, x1) = (x.clamp(base), x.clamp(base + 1));

        if format == PixelFormat::Binary {
            let sx = if frac >= 0x8000 { x1 } else { x0 };
            let coverage = if src.covered(sx, y) { COVERED } else { 0 };
            line[d as usize] = [src.pixel(row, sx) as i32, 0, 0, coverage as i32];
            continue;
        }

        let (m0, m1) = (src.covered(x0, y), src.covered(x1, y));
        let (mut p0, mut p1) = (src.pixel(row, x0), src.pixel(row, x1));
        if !m0 && m1 {
            p0 = p1;
        } else if m0 && !m1 {
            p1 = p0;
        }
        let fx = frac >> 8;
        let coverage = u32::from(m0) * (COVERED - fx) + u32::from(m1) * fx;

        let (c0, c1) = (channels(format, p0), channels(format, p1));
        let mut cell = [0, 0, 0, coverage as i32];
        if format == PixelFormat::Grayscale {
            cell[0] = lerp8(c0[0], c1[0], fx) as i32;
        } else {
            for k in 0..3 {
                cell[k] = lerp16(c0[k] << 8, c1[k] << 8, frac) as i32;
            }
        }
        line[d as usize] = cell;
    }
}

/// Vertical pass over two bilinear lines: the pixel in line format and its
/// coverage. `frac` is the 16-bit weight of `bottom`.
#[inline]
pub(crate) fn bilinear_column(
    format: PixelFormat,
    top: Cell,
    bottom: Cell,
    frac: u32,
) -> (u32, u32) {
    if format == PixelFormat::Binary {
        let cell = if frac >= 0x8000 { bottom } else { top };
        return (cell[0] as u32, cell[3] as u32);
    }

    let fy = frac >> 8;
    let (ct, cb) = (top[3] as u32, bottom[3] as u32);
    let coverage = (ct * (COVERED - fy) + cb * fy + 128) >> 8;
    let (top, bottom) = match (ct, cb) {
        (0, _) => (bottom, bottom),
        (_, 0) => (top, top),
        _ => (top, bottom),
    };

    let pixel = if format == PixelFormat::Grayscale {
        lerp8(top[0] as u32, bottom[0] as u32, fy)
    } else {
        let channel = |k: usize| (lerp16(top[k] as u32, bottom[k] as u32, frac) + 128) >> 8;
        color::r5g6b5_to_rgb565(channel(0), channel(1), channel(2))
    };
    (pixel, coverage)
}

/// Four-tap horizontal pass of source row `y`. Coverage follows the two
/// inner taps.
pub(crate) fn cache_line_bicubic(line: &mut [Cell], src: &LineSource, x: &Axis, y: u32) {
    let format = src.format();
    let shift = cubic_shift(format);
    let n = channel_count(format);
    let row = src.image.row(y);
    for d in x.start..x.end {
        let (base, frac) = x.taps(d);
        let xs = [-1, 0, 1, 2].map(|o| x.clamp(base + o));
        let covered = xs.map(|sx| src.covered(sx, y));
        let mut pixels = xs.map(|sx| src.pixel(row, sx));
        fill_uncovered(&mut pixels, covered, frac);

        let fx = frac >> 8;
        let coverage = u32::from(covered[1]) * (COVERED - fx) + u32::from(covered[2]) * fx;
        let t = cubic_powers(frac);
        let taps = pixels.map(|p| channels(format, p));

        let mut cell = [0, 0, 0, coverage as i32];
        for k in 0..n {
            cell[k] = cubic(taps.map(|c| i64::from(c[k] << shift)), t) as i32;
        }
        line[d as usize] = cell;
    }
}

/// Vertical pass over four bicubic lines, top to bottom; `frac` is the
/// 16-bit position between the inner two.
#[inline]
pub(crate) fn bicubic_column(format: PixelFormat, cells: [Cell; 4], frac: u32) -> (u32, u32) {
    let fy = frac >> 8;
    let coverage = (cells[1][3] as u32 * (COVERED - fy) + cells[2][3] as u32 * fy + 128) >> 8;
    let covered = cells.map(|c| c[3] > 0);
    let mut cells = cells;
    fill_uncovered(&mut cells, covered, frac);

    let t = cubic_powers(frac);
    let mut sums = [0i64; 3];
    for (k, sum) in sums.iter_mut().enumerate().take(channel_count(format)) {
        *sum = cubic(cells.map(|c| i64::from(c[k])), t);
    }
    (finish_cubic(format, sums), coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        image::{Image, Rect},
        placement::Placement,
    };

    fn unit_axis(width: u32) -> Axis {
        Placement::new(
            (width, 1),
            Rect::new(0, 0, width as i32, 1),
            (0, 0),
            (1.0, 1.0),
            false,
        )
        .unwrap()
        .x
    }

    fn source(image: &Image) -> LineSource<'_> {
        LineSource {
            image: image.as_view(),
            mask: None,
            palette: None,
        }
    }

    #[test]
    fn lerps_round_to_nearest() {
        assert_eq!(lerp8(0, 200, 64), 50);
        assert_eq!(lerp8(77, 77, 200), 77);
        assert_eq!(lerp16(0, 255 << 8, 0x8000), 0x7f80);
        assert_eq!(lerp16(1234, 1234, 0xffff), 1234);
    }

    #[test]
    fn cubic_interpolates_through_inner_taps() {
        assert_eq!(cubic([9, 40, 80, 3], cubic_powers(0)), 40);
        assert_eq!(cubic([50; 4], cubic_powers(0x8000)), 50);
        assert_eq!(cubic([0, 0, 256, 256], cubic_powers(0x8000)), 128);
    }

    #[test]
    fn unmasked_line_is_fully_covered() {
        let mut img = Image::new(4, 1, PixelFormat::Grayscale);
        img.set_pixel(2, 0, 200);
        let mut line = [[0; 4]; 4];
        cache_line_bilinear(&mut line, &source(&img), &unit_axis(4), 0);
        assert_eq!(
            line.map(|c| (c[0], c[3])),
            [(0, 256), (0, 256), (200, 256), (0, 256)]
        );
    }

    #[test]
    fn masked_taps_are_uncovered() {
        let mut img = Image::new(3, 1, PixelFormat::Grayscale);
        img.fill(90);
        let mut mask = Image::new(3, 1, PixelFormat::Binary);
        mask.set_pixel(1, 0, 1);
        let mut src = source(&img);
        src.mask = Some(mask.as_view());
        let mut line = [[0; 4]; 3];
        cache_line_bilinear(&mut line, &src, &unit_axis(3), 0);
        assert_eq!(line.map(|c| c[3]), [0, 256, 0]);
    }

    #[test]
    fn uncovered_taps_do_not_bleed() {
        let top = [200, 0, 0, 256];
        let bottom = [0, 0, 0, 0];
        let (pixel, coverage) = bilinear_column(PixelFormat::Grayscale, top, bottom, 0x8000);
        assert_eq!((pixel, coverage), (200, 128));

        let cells = [[0; 4], [64 << 4, 0, 0, 256], [0; 4], [0; 4]];
        let (pixel, coverage) = bicubic_column(PixelFormat::Grayscale, cells, 0x4000);
        assert_eq!((pixel, coverage), (64, 192));
    }

    #[test]
    fn rgb_columns_round_like_channels() {
        let cell = |p: u32| {
            let c = channels(PixelFormat::Rgb565, p);
            [(c[0] << 8) as i32, (c[1] << 8) as i32, (c[2] << 8) as i32, 256]
        };
        let (pixel, coverage) =
            bilinear_column(PixelFormat::Rgb565, cell(0x1234), cell(0x1234), 0x1357);
        assert_eq!((pixel, coverage), (0x1234, 256));
    }

    #[test]
    fn area_values() {
        assert_eq!(area_value(PixelFormat::Grayscale, [10 + 20 + 50 + 60, 0, 0], 4), 35);
        assert_eq!(area_value(PixelFormat::Binary, [1, 0, 0], 1), 1);
        assert_eq!(area_value(PixelFormat::Binary, [1, 0, 0], 4), 0);
        assert_eq!(area_value(PixelFormat::Binary, [2, 0, 0], 4), 1);
        assert_eq!(area_value(PixelFormat::Rgb565, [62, 126, 62], 2), 0xffff);
    }
}
