// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use fb_alloc::{FbAlloc, FbAllocError};
use tracing::{trace, warn};

use crate::{
    blend::{blend_pixel, ALPHA_MAX},
    color::map_pixel,
    fast::{fast_draw_image, FastDraw},
    image::{Image, ImageView, ImageViewMut, PixelFormat, Rect, RowMut},
    interp::{self, area_value, channels, Cell, LineSource, COVERED},
    palette::{AlphaPalette, ColorPalette},
    placement::Placement,
};

bitflags::bitflags! {
    /// Resampling and placement hints for [`draw_image`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Hints: u32 {
        /// Box-filter when shrinking.
        const AREA = 1 << 0;
        const BILINEAR = 1 << 1;
        const BICUBIC = 1 << 2;
        /// Center the scaled source on the offset instead of anchoring its
        /// top-left corner there.
        const CENTER = 1 << 7;
        /// The destination is known to be zero, skip reading it when
        /// blending.
        const BLACK_BACKGROUND = 1 << 11;
    }
}

/// Resampling filter selected from [`Hints`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resample {
    Nearest,
    Bilinear,
    Bicubic,
    Area,
}

impl Resample {
    /// Area applies only when neither axis is enlarged; bilinear is
    /// preferred over bicubic when both are requested.
    pub fn select(hints: Hints, x_scale: f32, y_scale: f32) -> Self {
        if hints.contains(Hints::AREA) && x_scale.abs() <= 1.0 && y_scale.abs() <= 1.0 {
            Resample::Area
        } else if hints.contains(Hints::BILINEAR) {
            Resample::Bilinear
        } else if hints.contains(Hints::BICUBIC) {
            Resample::Bicubic
        } else {
            Resample::Nearest
        }
    }
}

/// Placement, opacity and optional inputs of one [`draw_image`] call.
///
/// # Example
///
/// ```
/// use edgefirst_compositor::{
///     draw::{draw_image, DrawParams, Hints},
///     image::{Image, PixelFormat},
///     palette::ColorPalette,
/// };
///
/// let thermal = Image::new(32, 24, PixelFormat::Grayscale);
/// let mut frame = Image::new(320, 240, PixelFormat::Rgb565);
/// let palette = ColorPalette::ironbow();
///
/// let params = DrawParams::new()
///     .with_offset(160, 120)
///     .with_scale(4.0, 4.0)
///     .with_alpha(128)
///     .with_color_palette(&palette)
///     .with_hints(Hints::BILINEAR | Hints::CENTER);
/// draw_image(&mut frame, &thermal, &params);
/// ```
#[derive(Clone, Debug)]
pub struct DrawParams<'a> {
    /// Destination offset of the source's top-left corner (or of its center
    /// with [`Hints::CENTER`]).
    pub x: i32,
    pub y: i32,
    /// Scale factors; negative values mirror the axis.
    pub x_scale: f32,
    pub y_scale: f32,
    /// Opacity, 0 (transparent) to 256 (opaque).
    pub alpha: u32,
    /// Drawing is suppressed wherever this image, sampled at source
    /// coordinates, is unset. Pixels outside it count as unset.
    pub mask: Option<ImageView<'a>>,
    pub color_palette: Option<&'a ColorPalette>,
    pub alpha_palette: Option<&'a AlphaPalette>,
    pub hints: Hints,
    /// Source region to draw, clipped to the source bounds.
    pub roi: Option<Rect>,
}

impl Default for DrawParams<'_> {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            x_scale: 1.0,
            y_scale: 1.0,
            alpha: ALPHA_MAX,
            mask: None,
            color_palette: None,
            alpha_palette: None,
            hints: Hints::empty(),
            roi: None,
        }
    }
}

impl<'a> DrawParams<'a> {
    /// Opaque, unscaled draw at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_scale(mut self, x_scale: f32, y_scale: f32) -> Self {
        self.x_scale = x_scale;
        self.y_scale = y_scale;
        self
    }

    pub fn with_alpha(mut self, alpha: u32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_mask<B: AsRef<[u8]>>(mut self, mask: &'a Image<B>) -> Self {
        self.mask = Some(mask.as_view());
        self
    }

    pub fn with_color_palette(mut self, palette: &'a ColorPalette) -> Self {
        self.color_palette = Some(palette);
        self
    }

    pub fn with_alpha_palette(mut self, palette: &'a AlphaPalette) -> Self {
        self.alpha_palette = Some(palette);
        self
    }

    pub fn with_hints(mut self, hints: Hints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_roi(mut self, roi: Rect) -> Self {
        self.roi = Some(roi);
        self
    }
}

/// Draws `src` onto `dst`, converting formats, scaling and blending as
/// described by `params`.
///
/// Scratch lines come from the calling thread's default arena. Degenerate
/// requests (zero alpha, empty or fully off-screen placement, zero or
/// non-finite scale) leave `dst` untouched. So does running out of scratch
/// memory, which is logged.
pub fn draw_image<D, S>(dst: &mut Image<D>, src: &Image<S>, params: &DrawParams)
where
    D: AsRef<[u8]> + AsMut<[u8]>,
    S: AsRef<[u8]>,
{
    fb_alloc::with_default(|arena| draw_image_in(arena, dst, src, params))
}

/// [`draw_image`] with scratch lines taken from `arena`.
///
/// The arena is returned to its prior mark before this function returns.
pub fn draw_image_in<D, S>(
    arena: &mut FbAlloc,
    dst: &mut Image<D>,
    src: &Image<S>,
    params: &DrawParams,
) where
    D: AsRef<[u8]> + AsMut<[u8]>,
    S: AsRef<[u8]>,
{
    let alpha = params.alpha.min(ALPHA_MAX);
    if alpha == 0 || dst.is_empty() || src.is_empty() {
        return;
    }
    if dst.format() == PixelFormat::Binary && alpha < ALPHA_MAX / 2 {
        return;
    }

    let bounds = Rect::new(0, 0, src.width() as i32, src.height() as i32);
    let Some(roi) = params.roi.map_or(Some(bounds), |r| r.intersection(&bounds)) else {
        return;
    };

    let mut hints = params.hints;
    if hints.contains(Hints::BILINEAR) && (roi.width <= 1 || roi.height <= 1) {
        hints.remove(Hints::BILINEAR);
    }

    let Some(placement) = Placement::new(
        (dst.width(), dst.height()),
        roi,
        (params.x, params.y),
        (params.x_scale, params.y_scale),
        hints.contains(Hints::CENTER),
    ) else {
        trace!("draw_image {} -> {}: nothing visible", src, dst);
        return;
    };

    let resample = Resample::select(hints, params.x_scale, params.y_scale);
    let black_background = hints.contains(Hints::BLACK_BACKGROUND);
    let src = src.as_view();
    let mut dst = dst.as_view_mut();

    // The alpha palette is indexed by source intensity, which palette-mapped
    // fast-path lines no longer carry.
    let fast = params.mask.is_none()
        && (src.format() == dst.format() || params.color_palette.is_some())
        && !(params.color_palette.is_some() && params.alpha_palette.is_some());

    let result = if fast {
        let fast = FastDraw {
            placement,
            resample,
            alpha,
            color_palette: params.color_palette,
            alpha_palette: params.alpha_palette,
            black_background,
        };
        fast_draw_image(arena, &mut dst, &src, &fast)
    } else {
        // With both palettes the alpha palette is indexed by source
        // intensity, so the color palette is applied after resampling.
        let (line_palette, post_palette) = match params.alpha_palette {
            Some(_) => (None, params.color_palette),
            None => (params.color_palette, None),
        };
        let source = LineSource {
            image: src,
            mask: params.mask.clone(),
            palette: line_palette,
        };
        let composite = Composite {
            alpha,
            line_format: source.format(),
            alpha_palette: params.alpha_palette,
            color_palette: post_palette,
            black_background,
        };
        general_draw_image(arena, &mut dst, &source, placement, resample, &composite)
    };

    if let Err(e) = result {
        warn!("draw_image skipped: {}", e);
    }
}

/// Last step of the general path: merges one resampled pixel, given in the
/// line format together with its mask coverage, into the destination.
///
/// For full coverage this is the per-pixel equivalent of
/// [`combine_alpha_with`](crate::blend::combine_alpha_with).
struct Composite<'a> {
    alpha: u32,
    line_format: PixelFormat,
    alpha_palette: Option<&'a AlphaPalette>,
    color_palette: Option<&'a ColorPalette>,
    black_background: bool,
}

impl Composite<'_> {
    #[inline]
    fn put(&self, out: &mut RowMut, x: usize, pixel: u32, coverage: u32) {
        let mut a = (self.alpha * coverage) >> 8;
        if let Some(palette) = self.alpha_palette {
            a = palette.apply(a, self.line_format, pixel);
        }
        let format = out.format();
        if a == 0 || (format == PixelFormat::Binary && a < ALPHA_MAX / 2) {
            return;
        }
        let fg = match self.color_palette {
            Some(palette) => map_pixel(
                format,
                PixelFormat::Rgb565,
                palette.lookup(self.line_format, pixel),
            ),
            None => map_pixel(format, self.line_format, pixel),
        };
        if format == PixelFormat::Binary {
            out.put_fast(x, fg);
            return;
        }
        let bg = if self.black_background {
            0
        } else {
            out.get_fast(x)
        };
        out.put_fast(x, blend_pixel(format, fg, bg, a));
    }
}

/// Per-pixel path for masks, mixed formats and combined palettes.
///
/// Resampling follows the fast path tap for tap, so an all-set mask draws
/// exactly what the unmasked call draws.
fn general_draw_image(
    arena: &mut FbAlloc,
    dst: &mut ImageViewMut,
    src: &LineSource,
    placement: Placement,
    resample: Resample,
    composite: &Composite,
) -> Result<(), FbAllocError> {
    trace!(
        "general_draw_image {:?} {} -> {} mask {}",
        resample,
        src.image,
        dst,
        src.mask.is_some()
    );
    let x = placement.x;
    let format = src.format();
    match resample {
        Resample::Nearest => {
            draw_nearest(dst, src, placement, composite);
            Ok(())
        }
        Resample::Area => {
            draw_area(dst, src, placement, composite);
            Ok(())
        }
        Resample::Bilinear => draw_separable::<2>(
            arena,
            dst,
            placement,
            composite,
            |line: &mut [Cell], y| interp::cache_line_bilinear(line, src, &x, y),
            |[top, bottom], frac| interp::bilinear_column(format, top, bottom, frac),
        ),
        Resample::Bicubic => draw_separable::<4>(
            arena,
            dst,
            placement,
            composite,
            |line: &mut [Cell], y| interp::cache_line_bicubic(line, src, &x, y),
            |cells, frac| interp::bicubic_column(format, cells, frac),
        ),
    }
}

fn draw_nearest(
    dst: &mut ImageViewMut,
    src: &LineSource,
    placement: Placement,
    composite: &Composite,
) {
    let Placement { x, y } = placement;
    for dy in y.start..y.end {
        let sy = y.nearest(dy);
        let row = src.image.row(sy);
        let mut out = dst.row_mut(dy as u32);
        for dx in x.start..x.end {
            let sx = x.nearest(dx);
            if src.covered(sx, sy) {
                composite.put(&mut out, dx as usize, src.pixel(row, sx), COVERED);
            }
        }
    }
}

/// Box filter over the covered pixels of each block; coverage is the
/// covered share of the block.
fn draw_area(
    dst: &mut ImageViewMut,
    src: &LineSource,
    placement: Placement,
    composite: &Composite,
) {
    let Placement { x, y } = placement;
    let format = src.format();
    for dy in y.start..y.end {
        let (y0, y1) = y.span(dy);
        let mut out = dst.row_mut(dy as u32);
        for dx in x.start..x.end {
            let (x0, x1) = x.span(dx);
            let n = (x1 - x0) * (y1 - y0);
            let (mut acc, mut count) = ([0u32; 3], 0);
            for sy in y0..y1 {
                let row = src.image.row(sy);
                for sx in x0..x1 {
                    if !src.covered(sx, sy) {
                        continue;
                    }
                    let c = channels(format, src.pixel(row, sx));
                    for (a, c) in acc.iter_mut().zip(c) {
                        *a += c;
                    }
                    count += 1;
                }
            }
            if count > 0 {
                let coverage = (count * COVERED + n / 2) / n;
                let pixel = area_value(format, acc, count);
                composite.put(&mut out, dx as usize, pixel, coverage);
            }
        }
    }
}

/// Separable resampling through `N` cache lines, one per source row tap.
///
/// Lines are regenerated only when the source row they hold changes; lines
/// still needed for the next destination row are moved up instead.
fn draw_separable<const N: usize>(
    arena: &mut FbAlloc,
    dst: &mut ImageViewMut,
    placement: Placement,
    composite: &Composite,
    mut generate: impl FnMut(&mut [Cell], u32),
    column: impl Fn([Cell; N], u32) -> (u32, u32),
) -> Result<(), FbAllocError> {
    let Placement { x, y } = placement;
    let width = dst.width() as usize;
    let mut frame = arena.frame();
    let block: &mut [Cell] = frame.alloc(N * width)?;
    let mut chunks = block.chunks_exact_mut(width);
    let mut lines: [&mut [Cell]; N] =
        std::array::from_fn(|_| chunks.next().unwrap_or_default());
    let mut held: [Option<u32>; N] = [None; N];
    // Taps run from `base - (N / 2 - 1)` to `base + N / 2`.
    let first = 1 - (N / 2) as i64;

    for dy in y.start..y.end {
        let (base, frac) = y.taps(dy);
        let rows: [u32; N] = std::array::from_fn(|i| y.clamp(base + first + i as i64));
        for i in 0..N {
            if held[i] == Some(rows[i]) {
                continue;
            }
            if let Some(j) = (i + 1..N).find(|&j| held[j] == Some(rows[i])) {
                lines.swap(i, j);
                held.swap(i, j);
            } else {
                generate(&mut *lines[i], rows[i]);
                held[i] = Some(rows[i]);
            }
        }

        let mut out = dst.row_mut(dy as u32);
        for dx in x.start..x.end {
            let d = dx as usize;
            let (pixel, coverage) = column(std::array::from_fn(|i| lines[i][d]), frac);
            composite.put(&mut out, d, pixel, coverage);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_precedence() {
        let all = Hints::AREA | Hints::BILINEAR | Hints::BICUBIC;
        assert_eq!(Resample::select(all, 0.5, 0.5), Resample::Area);
        assert_eq!(Resample::select(all, 2.0, 0.5), Resample::Bilinear);
        assert_eq!(
            Resample::select(Hints::BICUBIC | Hints::CENTER, 2.0, 2.0),
            Resample::Bicubic
        );
        assert_eq!(Resample::select(Hints::empty(), 2.0, 2.0), Resample::Nearest);
    }

    #[test]
    fn builder_defaults_are_opaque_identity() {
        let p = DrawParams::new();
        assert_eq!((p.x, p.y, p.alpha), (0, 0, 256));
        assert_eq!((p.x_scale, p.y_scale), (1.0, 1.0));
        assert!(p.mask.is_none() && p.roi.is_none());
        assert_eq!(p.hints, Hints::empty());
    }

    #[test]
    fn gray_to_rgb565_identity_copy() {
        let mut src = Image::new(5, 3, PixelFormat::Grayscale);
        for i in 0..15 {
            src.set_pixel(i % 5, i / 5, (i * 17) as u32);
        }
        for hints in [Hints::empty(), Hints::BILINEAR, Hints::BICUBIC, Hints::AREA] {
            let mut dst = Image::new(5, 3, PixelFormat::Rgb565);
            let mut arena = FbAlloc::new(4096);
            draw_image_in(&mut arena, &mut dst, &src, &DrawParams::new().with_hints(hints));
            for i in 0..15 {
                let (x, y) = (i % 5, i / 5);
                let gray = src.get_pixel(x, y).unwrap();
                let expected = map_pixel(PixelFormat::Rgb565, PixelFormat::Grayscale, gray);
                assert_eq!(dst.get_pixel(x, y), Some(expected), "{:?}", hints);
            }
            assert_eq!(arena.used(), 0);
        }
    }

    #[test]
    fn mixed_format_blend_at_half_alpha() {
        let mut src = Image::new(4, 4, PixelFormat::Rgb565);
        src.fill(0xffff);
        let mut dst = Image::new(4, 4, PixelFormat::Grayscale);
        dst.fill(0);
        let mut arena = FbAlloc::new(4096);
        draw_image_in(&mut arena, &mut dst, &src, &DrawParams::new().with_alpha(128));
        assert!(dst.as_bytes().iter().all(|&b| b == 127));
    }

    #[test]
    fn bilinear_mask_skips_unset_pixels() {
        let mut src = Image::new(4, 4, PixelFormat::Grayscale);
        src.fill(200);
        let mut mask = Image::new(4, 4, PixelFormat::Binary);
        mask.set_pixel(0, 0, 1);
        let mut dst = Image::new(4, 4, PixelFormat::Grayscale);
        dst.fill(9);
        let params = DrawParams::new()
            .with_mask(&mask)
            .with_hints(Hints::BILINEAR);
        let mut arena = FbAlloc::new(4096);
        draw_image_in(&mut arena, &mut dst, &src, &params);
        assert_eq!(dst.get_pixel(0, 0), Some(200));
        assert_eq!(dst.get_pixel(3, 3), Some(9));
    }

    #[test]
    fn oom_leaves_destination_untouched() {
        let src = Image::new(64, 4, PixelFormat::Grayscale);
        let mut dst = Image::new(64, 4, PixelFormat::Grayscale);
        dst.fill(3);
        let mut arena = FbAlloc::new(16);
        draw_image_in(&mut arena, &mut dst, &src, &DrawParams::new());
        assert!(dst.as_bytes().iter().all(|&b| b == 3));
        assert_eq!((arena.used(), arena.depth()), (0, 0));
    }

    #[test]
    fn roi_selects_source_region() {
        let mut src = Image::new(4, 4, PixelFormat::Grayscale);
        src.set_pixel(2, 3, 77);
        let mut dst = Image::new(2, 2, PixelFormat::Grayscale);
        let params = DrawParams::new().with_roi(Rect::new(2, 2, 8, 8));
        let mut arena = FbAlloc::new(4096);
        draw_image_in(&mut arena, &mut dst, &src, &params);
        assert_eq!(dst.get_pixel(0, 1), Some(77));
    }

    #[test]
    fn disjoint_roi_draws_nothing() {
        let src = Image::new(4, 4, PixelFormat::Grayscale);
        let mut dst = Image::new(4, 4, PixelFormat::Grayscale);
        dst.fill(5);
        let params = DrawParams::new().with_roi(Rect::new(10, 10, 2, 2));
        draw_image_in(&mut FbAlloc::new(1024), &mut dst, &src, &params);
        assert!(dst.as_bytes().iter().all(|&b| b == 5));
    }
}
