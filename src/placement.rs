// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Mapping between destination pixels and source positions.
//!
//! Each axis keeps a 16.16 fixed-point step (`65536 / |scale|`, floored) and
//! samples at pixel centres: destination index `i` lands on source position
//! `i * step + step / 2`. Negative scales mirror the axis.

use crate::image::Rect;

/// One fixed-point unit.
pub(crate) const ONE: i64 = 1 << 16;

/// Half a source pixel, subtracted before splitting a position into the two
/// interpolation taps.
pub(crate) const HALF: i64 = 1 << 15;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Axis {
    /// First destination coordinate drawn.
    pub start: i32,
    /// One past the last destination coordinate drawn.
    pub end: i32,
    origin: i64,
    scaled: i64,
    step: i64,
    flip: bool,
    /// First source coordinate of the region of interest.
    lo: i64,
    /// Length of the region of interest.
    len: i64,
}

impl Axis {
    /// Clips the scaled source `[lo, lo + len)` placed at `offset` against a
    /// destination of length `dst_len`. `None` when nothing is visible.
    fn new(offset: i32, scale: f32, lo: i32, len: i32, dst_len: u32, center: bool) -> Option<Self> {
        if !scale.is_finite() || scale == 0.0 || len <= 0 {
            return None;
        }
        let abs = f64::from(scale.abs());
        let scaled = (abs * f64::from(len)).floor().min(f64::from(i32::MAX)) as i64;
        if scaled <= 0 {
            return None;
        }
        let step = ((ONE as f64 / abs) as i64).max(1);

        let mut origin = i64::from(offset);
        if center {
            origin -= scaled >> 1;
        }
        let start = origin.max(0);
        let end = (origin + scaled).min(i64::from(dst_len));
        if start >= end {
            return None;
        }

        Some(Axis {
            start: start as i32,
            end: end as i32,
            origin,
            scaled,
            step,
            flip: scale < 0.0,
            lo: i64::from(lo),
            len: i64::from(len),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Index into the scaled source for destination coordinate `d`, mirrored
    /// when the axis is flipped.
    #[inline]
    fn index(&self, d: i32) -> i64 {
        let i = i64::from(d) - self.origin;
        if self.flip {
            self.scaled - 1 - i
        } else {
            i
        }
    }

    /// 16.16 source position, relative to the region of interest, of the
    /// centre of destination pixel `d`.
    #[inline]
    pub fn position(&self, d: i32) -> i64 {
        self.index(d) * self.step + self.step / 2
    }

    /// Source coordinate nearest to the centre of destination pixel `d`.
    #[inline]
    pub fn nearest(&self, d: i32) -> u32 {
        self.clamp(self.position(d) >> 16)
    }

    /// Interpolation base and fraction for destination pixel `d`: the first
    /// tap is at relative coordinate `base`, `frac` is the 16-bit weight of
    /// the next tap.
    #[inline]
    pub fn taps(&self, d: i32) -> (i64, u32) {
        let p = self.position(d) - HALF;
        (p >> 16, (p & 0xffff) as u32)
    }

    /// Absolute source coordinate of relative coordinate `v`, replicating the
    /// region's edge pixels.
    #[inline]
    pub fn clamp(&self, v: i64) -> u32 {
        (self.lo + v.clamp(0, self.len - 1)) as u32
    }

    /// Source span `[first, last)` covered by destination pixel `d` when
    /// box filtering. Always at least one pixel wide.
    #[inline]
    pub fn span(&self, d: i32) -> (u32, u32) {
        let i = self.index(d);
        let first = ((i * self.step) >> 16).clamp(0, self.len - 1);
        let last = (((i + 1) * self.step) >> 16).clamp(first + 1, self.len);
        ((self.lo + first) as u32, (self.lo + last) as u32)
    }
}

/// Where a source region lands on the destination, per axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Placement {
    pub x: Axis,
    pub y: Axis,
}

impl Placement {
    /// `roi` must already be clipped to the source image.
    pub fn new(
        dst_size: (u32, u32),
        roi: Rect,
        offset: (i32, i32),
        scale: (f32, f32),
        center: bool,
    ) -> Option<Self> {
        let x = Axis::new(offset.0, scale.0, roi.x, roi.width, dst_size.0, center)?;
        let y = Axis::new(offset.1, scale.1, roi.y, roi.height, dst_size.1, center)?;
        Some(Placement { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(offset: i32, scale: f32, len: i32, dst: u32) -> Axis {
        Axis::new(offset, scale, 0, len, dst, false).unwrap()
    }

    #[test]
    fn unit_scale_is_identity() {
        let a = axis(0, 1.0, 10, 10);
        assert_eq!((a.start, a.end), (0, 10));
        for d in 0..10 {
            assert_eq!(a.nearest(d), d as u32);
            assert_eq!(a.taps(d), (i64::from(d), 0));
        }
    }

    #[test]
    fn offsets_clip_against_destination() {
        let a = axis(-3, 1.0, 10, 5);
        assert_eq!((a.start, a.end), (0, 5));
        assert_eq!(a.nearest(0), 3);
        assert!(Axis::new(20, 1.0, 0, 10, 5, false).is_none());
        assert!(Axis::new(-10, 1.0, 0, 10, 5, false).is_none());
    }

    #[test]
    fn centering_shifts_by_half_the_scaled_size() {
        let a = Axis::new(10, 2.0, 0, 4, 40, true).unwrap();
        assert_eq!((a.start, a.end), (6, 14));
        assert_eq!(a.nearest(6), 0);
        assert_eq!(a.nearest(13), 3);
    }

    #[test]
    fn negative_scale_mirrors() {
        let a = axis(0, -1.0, 4, 4);
        let picked: Vec<u32> = (0..4).map(|d| a.nearest(d)).collect();
        assert_eq!(picked, [3, 2, 1, 0]);
    }

    #[test]
    fn degenerate_scales_are_rejected() {
        assert!(Axis::new(0, 0.0, 0, 4, 4, false).is_none());
        assert!(Axis::new(0, f32::NAN, 0, 4, 4, false).is_none());
        assert!(Axis::new(0, f32::INFINITY, 0, 4, 4, false).is_none());
        assert!(Axis::new(0, 0.1, 0, 4, 4, false).is_none());
    }

    #[test]
    fn downscale_spans_cover_blocks() {
        let a = axis(0, 0.5, 8, 8);
        assert_eq!((a.start, a.end), (0, 4));
        assert_eq!(a.span(0), (0, 2));
        assert_eq!(a.span(3), (6, 8));
    }

    #[test]
    fn roi_offsets_source_coordinates() {
        let a = Axis::new(0, 1.0, 5, 3, 10, false).unwrap();
        assert_eq!((a.start, a.end), (0, 3));
        assert_eq!(a.nearest(0), 5);
        assert_eq!(a.clamp(-4), 5);
        assert_eq!(a.clamp(10), 7);
    }
}
