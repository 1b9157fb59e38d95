// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Same-format (or palette mapped) compositing.
//!
//! Each destination row is resampled into an off-screen line in the source
//! format, or RGB565 when a color palette is given, and then merged into the
//! destination with [`combine_alpha_with`]. Interpolating resamplers clamp
//! their taps to the source region so edge pixels are replicated.

use fb_alloc::{FbAlloc, FbAllocError};
use tracing::trace;

use crate::{
    blend::combine_alpha_with,
    color,
    draw::Resample,
    image::{ImageView, ImageViewMut, PixelFormat, Row, RowMut},
    interp::{
        area_value, channel_count, channels, cubic, cubic_powers, cubic_shift, finish_cubic,
        lerp16, lerp8,
    },
    palette::{palette_row_rgb565, AlphaPalette, ColorPalette},
    placement::{Axis, Placement},
};

/// Inputs of one fast-path draw.
pub(crate) struct FastDraw<'a> {
    pub placement: Placement,
    pub resample: Resample,
    pub alpha: u32,
    pub color_palette: Option<&'a ColorPalette>,
    pub alpha_palette: Option<&'a AlphaPalette>,
    pub black_background: bool,
}

/// Source rows as the resamplers see them: the image rows themselves, or
/// their palette translations staged in scratch buffers.
struct RowSource<'a, 's> {
    image: &'s ImageView<'s>,
    palette: Option<&'s ColorPalette>,
    convert: [&'a mut [u8]; 4],
    loaded: [Option<u32>; 4],
}

impl RowSource<'_, '_> {
    /// Prepares slot `slot` to serve source row `y`.
    fn load(&mut self, slot: usize, y: u32) {
        if let Some(palette) = self.palette {
            if self.loaded[slot] != Some(y) {
                palette_row_rgb565(&mut *self.convert[slot], self.image, y as i32, palette);
                self.loaded[slot] = Some(y);
            }
        }
    }

    /// Row `y` previously prepared in `slot`.
    fn row(&self, slot: usize, y: u32) -> Row<'_> {
        match self.palette {
            Some(_) => Row::Rgb565(&*self.convert[slot]),
            None => self.image.row(y),
        }
    }

    /// Rows `ys`, loaded into consecutive slots.
    fn rows<const N: usize>(&mut self, ys: [u32; N]) -> [Row<'_>; N] {
        for (slot, &y) in ys.iter().enumerate() {
            self.load(slot, y);
        }
        std::array::from_fn(|slot| self.row(slot, ys[slot]))
    }

    /// Single pixel in line format, for resamplers that read arbitrary rows.
    #[inline]
    fn pixel(&self, x: u32, y: u32) -> u32 {
        let p = self.image.row(y).get_fast(x as usize);
        match self.palette {
            Some(palette) => palette.lookup(self.image.format(), p),
            None => p,
        }
    }
}

/// Composites `src` onto `dst` using scratch lines carved from `arena`.
///
/// `dst` and `src` must share a format unless a color palette is given.
pub(crate) fn fast_draw_image(
    arena: &mut FbAlloc,
    dst: &mut ImageViewMut,
    src: &ImageView,
    params: &FastDraw,
) -> Result<(), FbAllocError> {
    let line_format = match params.color_palette {
        Some(_) => PixelFormat::Rgb565,
        None => src.format(),
    };
    let Placement { x, y } = params.placement;
    trace!(
        "fast_draw_image {:?} {} -> {} cols {}..{} rows {}..{}",
        params.resample,
        src,
        dst,
        x.start,
        x.end,
        y.start,
        y.end
    );

    let mut frame = arena.frame();
    let line_len = line_format.row_stride(dst.width());
    let lines = [frame.alloc_bytes(line_len)?, frame.alloc_bytes(line_len)?];
    let convert_len = match params.color_palette {
        Some(_) => PixelFormat::Rgb565.row_stride(src.width()),
        None => 0,
    };
    let mut rows = RowSource {
        image: src,
        palette: params.color_palette,
        convert: [
            frame.alloc_bytes(convert_len)?,
            frame.alloc_bytes(convert_len)?,
            frame.alloc_bytes(convert_len)?,
            frame.alloc_bytes(convert_len)?,
        ],
        loaded: [None; 4],
    };

    for dy in y.start..y.end {
        let mut line = RowMut::new(line_format, &mut *lines[(dy & 1) as usize]);
        match params.resample {
            Resample::Nearest => nearest_line(&mut line, &mut rows, &x, y.nearest(dy)),
            Resample::Bilinear => bilinear_line(&mut line, &mut rows, &x, &y, dy),
            Resample::Bicubic => bicubic_line(&mut line, &mut rows, &x, &y, dy),
            Resample::Area => area_line(&mut line, &rows, &x, &y, dy),
        }
        combine_alpha_with(
            params.alpha,
            params.alpha_palette,
            line.as_row(),
            &mut dst.row_mut(dy as u32),
            x.start as usize,
            x.end as usize,
            params.black_background,
        );
    }
    Ok(())
}

fn nearest_line(line: &mut RowMut, rows: &mut RowSource, x: &Axis, sy: u32) {
    let [row] = rows.rows([sy]);
    for dx in x.start..x.end {
        line.put_fast(dx as usize, row.get_fast(x.nearest(dx) as usize));
    }
}

fn bilinear_line(line: &mut RowMut, rows: &mut RowSource, x: &Axis, y: &Axis, dy: i32) {
    let (yb, yf) = y.taps(dy);
    let [r0, r1] = rows.rows([y.clamp(yb), y.clamp(yb + 1)]);

    match line.format() {
        PixelFormat::Binary => {
            // No meaningful blend of 1-bit data; take whichever tap is nearer.
            let row = if yf >= 0x8000 { r1 } else { r0 };
            for dx in x.start..x.end {
                let (xb, xf) = x.taps(dx);
                let sx = if xf >= 0x8000 { x.clamp(xb + 1) } else { x.clamp(xb) };
                line.put_fast(dx as usize, row.get_fast(sx as usize));
            }
        }
        PixelFormat::Grayscale => {
            let fy = yf >> 8;
            for dx in x.start..x.end {
                let (xb, xf) = x.taps(dx);
                let (x0, x1) = (x.clamp(xb) as usize, x.clamp(xb + 1) as usize);
                let fx = xf >> 8;
                let top = lerp8(r0.get_fast(x0), r0.get_fast(x1), fx);
                let bot = lerp8(r1.get_fast(x0), r1.get_fast(x1), fx);
                line.put_fast(dx as usize, lerp8(top, bot, fy));
            }
        }
        PixelFormat::Rgb565 => {
            for dx in x.start..x.end {
                let (xb, xf) = x.taps(dx);
                let (x0, x1) = (x.clamp(xb) as usize, x.clamp(xb + 1) as usize);
                let [p00, p10, p01, p11] = [
                    r0.get_fast(x0),
                    r0.get_fast(x1),
                    r1.get_fast(x0),
                    r1.get_fast(x1),
                ]
                .map(|p| channels(PixelFormat::Rgb565, p));
                // 8 extra bits of precision, 16-bit weights.
                let channel = |k: usize| {
                    let top = lerp16(p00[k] << 8, p10[k] << 8, xf);
                    let bot = lerp16(p01[k] << 8, p11[k] << 8, xf);
                    (lerp16(top, bot, yf) + 128) >> 8
                };
                let pixel = color::r5g6b5_to_rgb565(channel(0), channel(1), channel(2));
                line.put_fast(dx as usize, pixel);
            }
        }
    }
}

fn bicubic_line(line: &mut RowMut, rows: &mut RowSource, x: &Axis, y: &Axis, dy: i32) {
    let (yb, yf) = y.taps(dy);
    let ty = cubic_powers(yf);
    let src_rows = rows.rows([
        y.clamp(yb - 1),
        y.clamp(yb),
        y.clamp(yb + 1),
        y.clamp(yb + 2),
    ]);
    let format = line.format();
    let shift = cubic_shift(format);

    for dx in x.start..x.end {
        let (xb, xf) = x.taps(dx);
        let tx = cubic_powers(xf);
        let xs = [-1, 0, 1, 2].map(|o| x.clamp(xb + o) as usize);
        let taps = src_rows.map(|row| xs.map(|sx| channels(format, row.get_fast(sx))));
        let mut sums = [0i64; 3];
        for (k, sum) in sums.iter_mut().enumerate().take(channel_count(format)) {
            // Rows first, then the column of row results.
            let column = taps.map(|row| cubic(row.map(|c| i64::from(c[k] << shift)), tx));
            *sum = cubic(column, ty);
        }
        line.put_fast(dx as usize, finish_cubic(format, sums));
    }
}

/// Box filter: each destination pixel averages the block of source pixels
/// it covers, rounding to nearest. Binary blocks take a majority vote.
fn area_line(line: &mut RowMut, rows: &RowSource, x: &Axis, y: &Axis, dy: i32) {
    let (y0, y1) = y.span(dy);
    let format = line.format();

    for dx in x.start..x.end {
        let (x0, x1) = x.span(dx);
        let n = (x1 - x0) * (y1 - y0);
        let mut acc = [0u32; 3];
        for sy in y0..y1 {
            for sx in x0..x1 {
                let c = channels(format, rows.pixel(sx, sy));
                for (a, c) in acc.iter_mut().zip(c) {
                    *a += c;
                }
            }
        }
        line.put_fast(dx as usize, area_value(format, acc, n));
    }
}
