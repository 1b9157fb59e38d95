// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! 256-entry lookup tables indexed by a source pixel's 8-bit intensity.
//!
//! A [`ColorPalette`] turns intensities into RGB565 display colors (false
//! color for thermal or depth sensors); an [`AlphaPalette`] turns them into a
//! per-pixel opacity weight.

use crate::{
    color::{self, palette_index},
    image::{Image, PixelFormat, Row},
};

/// RGB565 color for each 8-bit intensity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorPalette(pub [u16; 256]);

/// Opacity for each 8-bit intensity, 0 (transparent) to 255 (opaque).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlphaPalette(pub [u8; 256]);

impl ColorPalette {
    pub fn from_fn(mut f: impl FnMut(u8) -> u16) -> Self {
        Self(std::array::from_fn(|i| f(i as u8)))
    }

    /// Identity mapping: entry `i` is gray level `i` in RGB565.
    pub fn grayscale() -> Self {
        Self::from_fn(|i| color::grayscale_to_rgb565(u32::from(i)) as u16)
    }

    /// Blue through red hue sweep at full saturation.
    pub fn rainbow() -> Self {
        Self::from_fn(|i| {
            // hue 240 degrees (blue) down to 0 (red), in 1/256ths of a sextant
            let h = (255 - u32::from(i)) * 4 * 256 / 255;
            let sextant = h >> 8;
            let f = h & 0xff;
            let (r, g, b) = match sextant {
                0 => (255, f, 0),
                1 => (255 - f, 255, 0),
                2 => (0, 255, f),
                3 => (0, 255 - f, 255),
                _ => (0, 0, 255),
            };
            color::r8g8b8_to_rgb565(r, g, b) as u16
        })
    }

    /// Black, violet, red, orange, yellow, white; the usual thermal map.
    pub fn ironbow() -> Self {
        const STOPS: [(u32, [u32; 3]); 6] = [
            (0, [0, 0, 0]),
            (48, [60, 0, 120]),
            (112, [190, 20, 110]),
            (176, [240, 110, 0]),
            (224, [255, 210, 20]),
            (255, [255, 255, 255]),
        ];
        Self::from_fn(|i| {
            let i = u32::from(i);
            let k = STOPS.iter().rposition(|&(pos, _)| pos <= i).unwrap_or(0);
            let (p0, c0) = STOPS[k];
            let (p1, c1) = STOPS[(k + 1).min(STOPS.len() - 1)];
            let span = (p1 - p0).max(1);
            let t = i - p0;
            let lerp = |a: u32, b: u32| (a * (span - t) + b * t) / span;
            color::r8g8b8_to_rgb565(lerp(c0[0], c1[0]), lerp(c0[1], c1[1]), lerp(c0[2], c1[2]))
                as u16
        })
    }

    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        u32::from(self.0[index])
    }

    /// Palette color for a pixel of the given format.
    #[inline]
    pub fn lookup(&self, format: PixelFormat, pixel: u32) -> u32 {
        self.get(palette_index(format, pixel))
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::grayscale()
    }
}

impl AlphaPalette {
    pub fn from_fn(mut f: impl FnMut(u8) -> u8) -> Self {
        Self(std::array::from_fn(|i| f(i as u8)))
    }

    pub fn opaque() -> Self {
        Self([255; 256])
    }

    /// Opacity proportional to intensity; black is fully transparent.
    pub fn linear() -> Self {
        Self::from_fn(|i| i)
    }

    /// Entry `index` widened to a 0..=256 weight.
    #[inline]
    pub fn weight(&self, index: usize) -> u32 {
        let e = u32::from(self.0[index]);
        e + (e >> 7)
    }

    /// Scales `alpha` (0..=256) by the weight of a pixel of the given format.
    #[inline]
    pub fn apply(&self, alpha: u32, format: PixelFormat, pixel: u32) -> u32 {
        (alpha * self.weight(palette_index(format, pixel))) >> 8
    }
}

impl Default for AlphaPalette {
    fn default() -> Self {
        Self::opaque()
    }
}

/// Translates source row `y` through `palette` into `dst` as RGB565.
///
/// `y` is clamped into the image. Binary rows use palette entries 0 and 255,
/// RGB565 rows are reduced to luma before the lookup. `dst` must hold at
/// least `src.width()` RGB565 pixels.
pub fn palette_row_rgb565<B: AsRef<[u8]>>(
    dst: &mut [u8],
    src: &Image<B>,
    y: i32,
    palette: &ColorPalette,
) {
    if src.is_empty() {
        return;
    }
    let y = y.clamp(0, src.height() as i32 - 1) as u32;
    let row = src.row(y);
    let width = src.width() as usize;
    let out = dst[..width * 2].chunks_exact_mut(2);

    match row {
        Row::Binary(_) => {
            let (pal0, pal255) = (palette.0[0].to_le_bytes(), palette.0[255].to_le_bytes());
            for (x, px) in out.enumerate() {
                px.copy_from_slice(if row.get_fast(x) != 0 { &pal255 } else { &pal0 });
            }
        }
        Row::Grayscale(bytes) => {
            for (px, &g) in out.zip(bytes) {
                px.copy_from_slice(&palette.0[g as usize].to_le_bytes());
            }
        }
        Row::Rgb565(_) => {
            for (x, px) in out.enumerate() {
                let y8 = color::rgb565_to_grayscale(row.get_fast(x)) as usize;
                px.copy_from_slice(&palette.0[y8].to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_palette_matches_map_pixel() {
        let pal = ColorPalette::grayscale();
        for i in 0..256u32 {
            assert_eq!(
                pal.get(i as usize),
                color::map_pixel(PixelFormat::Rgb565, PixelFormat::Grayscale, i)
            );
        }
    }

    #[test]
    fn rainbow_runs_blue_to_red() {
        let pal = ColorPalette::rainbow();
        assert_eq!(pal.get(0), 0x001f);
        assert_eq!(pal.get(255), 0xf800);
    }

    #[test]
    fn ironbow_endpoints() {
        let pal = ColorPalette::ironbow();
        assert_eq!(pal.get(0), 0);
        assert_eq!(pal.get(255), 0xffff);
    }

    #[test]
    fn alpha_weight_spans_0_to_256() {
        let pal = AlphaPalette::linear();
        assert_eq!(pal.weight(0), 0);
        assert_eq!(pal.weight(127), 127);
        assert_eq!(pal.weight(128), 129);
        assert_eq!(pal.weight(255), 256);
        assert_eq!(pal.apply(256, PixelFormat::Grayscale, 255), 256);
        assert_eq!(AlphaPalette::opaque().apply(100, PixelFormat::Binary, 0), 100);
    }

    #[test]
    fn palette_row_clamps_and_translates() {
        let mut src = Image::new(3, 2, PixelFormat::Grayscale);
        src.set_pixel(0, 1, 10);
        src.set_pixel(2, 1, 255);
        let pal = ColorPalette::rainbow();
        let mut out = [0u8; 6];
        palette_row_rgb565(&mut out, &src, 7, &pal);
        let px = |i: usize| u32::from(u16::from_le_bytes([out[2 * i], out[2 * i + 1]]));
        assert_eq!(px(0), pal.get(10));
        assert_eq!(px(1), pal.get(0));
        assert_eq!(px(2), pal.get(255));
    }

    #[test]
    fn palette_row_binary_uses_end_entries() {
        let mut src = Image::new(2, 1, PixelFormat::Binary);
        src.set_pixel(1, 0, 1);
        let pal = ColorPalette::ironbow();
        let mut out = [0u8; 4];
        palette_row_rgb565(&mut out, &src, 0, &pal);
        assert_eq!(u16::from_le_bytes([out[0], out[1]]), pal.0[0]);
        assert_eq!(u16::from_le_bytes([out[2], out[3]]), pal.0[255]);
    }
}
