// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use core::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::color;

/// Errors raised while wrapping caller-provided pixel buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The buffer cannot hold `width * height` pixels of the requested format.
    #[error("buffer too small: {needed} bytes needed, {actual} provided")]
    BufferTooSmall { needed: usize, actual: usize },

    /// The pixel format name is not one of `binary`, `grayscale`, `rgb565`.
    #[error("unknown pixel format: {0}")]
    UnknownFormat(String),
}

/// Packed pixel formats handled by the compositor.
///
/// Binary images pack 32 pixels into each little-endian row word, grayscale
/// uses one byte per pixel and RGB565 one little-endian 16-bit word per pixel
/// with 5/6/5 channel bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 1 bit per pixel
    Binary,
    /// 8 bits per pixel
    Grayscale,
    /// 16 bits per pixel, 5-6-5
    Rgb565,
}

impl PixelFormat {
    /// Bytes per row. Binary rows are padded to whole 32-bit words.
    pub const fn row_stride(self, width: u32) -> usize {
        match self {
            PixelFormat::Binary => (width as usize).div_ceil(32) * 4,
            PixelFormat::Grayscale => width as usize,
            PixelFormat::Rgb565 => width as usize * 2,
        }
    }

    pub const fn image_size(self, width: u32, height: u32) -> usize {
        self.row_stride(width) * height as usize
    }

    /// Largest pixel value representable in this format.
    pub const fn max_value(self) -> u32 {
        match self {
            PixelFormat::Binary => 1,
            PixelFormat::Grayscale => 255,
            PixelFormat::Rgb565 => 0xffff,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PixelFormat::Binary => "binary",
            PixelFormat::Grayscale => "grayscale",
            PixelFormat::Rgb565 => "rgb565",
        };
        f.write_str(name)
    }
}

impl FromStr for PixelFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bitmap" => Ok(PixelFormat::Binary),
            "grayscale" | "gray" => Ok(PixelFormat::Grayscale),
            "rgb565" => Ok(PixelFormat::Rgb565),
            _ => Err(ImageError::UnknownFormat(s.to_owned())),
        }
    }
}

/// Byte offset of the start of scanline `y`.
///
/// The stride is derived from the width and format, never stored.
#[inline]
pub const fn row_offset(format: PixelFormat, width: u32, y: u32) -> usize {
    format.row_stride(width) * y as usize
}

/// Source region of interest, in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: i32,
    /// Y coordinate of top-left corner
    pub y: i32,
    /// Width of the rectangle in pixels
    pub width: i32,
    /// Height of the rectangle in pixels
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Overlapping region of two rectangles, `None` when they are disjoint.
    ///
    /// Edges are computed in 64 bits, so rectangles reaching past
    /// `i32::MAX` are clipped rather than wrapped.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let end = |pos: i32, len: i32| i64::from(pos) + i64::from(len);
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = end(self.x, self.width).min(end(other.x, other.width));
        let y1 = end(self.y, self.height).min(end(other.y, other.height));
        let (width, height) = (x1 - i64::from(x0), y1 - i64::from(y0));
        if width <= 0 || height <= 0 {
            return None;
        }
        // Both edges of a non-empty overlap lie inside `other`.
        let clip = |v: i64| v.min(i64::from(i32::MAX)) as i32;
        Some(Rect::new(x0, y0, clip(width), clip(height)))
    }
}

/// Read-only view of one scanline, tagged with its pixel format.
#[derive(Copy, Clone, Debug)]
pub enum Row<'a> {
    Binary(&'a [u8]),
    Grayscale(&'a [u8]),
    Rgb565(&'a [u8]),
}

impl<'a> Row<'a> {
    pub fn new(format: PixelFormat, bytes: &'a [u8]) -> Self {
        match format {
            PixelFormat::Binary => Row::Binary(bytes),
            PixelFormat::Grayscale => Row::Grayscale(bytes),
            PixelFormat::Rgb565 => Row::Rgb565(bytes),
        }
    }

    pub fn format(&self) -> PixelFormat {
        match self {
            Row::Binary(_) => PixelFormat::Binary,
            Row::Grayscale(_) => PixelFormat::Grayscale,
            Row::Rgb565(_) => PixelFormat::Rgb565,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        match *self {
            Row::Binary(b) | Row::Grayscale(b) | Row::Rgb565(b) => b,
        }
    }

    /// Reads column `x` without checking it against the image width.
    ///
    /// The caller guarantees `x` lies inside the row; slice indexing still
    /// rejects reads past the end of the buffer.
    #[inline]
    pub fn get_fast(&self, x: usize) -> u32 {
        match *self {
            Row::Binary(b) => u32::from(b[x >> 3] >> (x & 7)) & 1,
            Row::Grayscale(b) => u32::from(b[x]),
            Row::Rgb565(b) => u32::from(u16::from_le_bytes([b[2 * x], b[2 * x + 1]])),
        }
    }
}

/// Mutable view of one scanline, tagged with its pixel format.
#[derive(Debug)]
pub enum RowMut<'a> {
    Binary(&'a mut [u8]),
    Grayscale(&'a mut [u8]),
    Rgb565(&'a mut [u8]),
}

impl<'a> RowMut<'a> {
    pub fn new(format: PixelFormat, bytes: &'a mut [u8]) -> Self {
        match format {
            PixelFormat::Binary => RowMut::Binary(bytes),
            PixelFormat::Grayscale => RowMut::Grayscale(bytes),
            PixelFormat::Rgb565 => RowMut::Rgb565(bytes),
        }
    }

    pub fn format(&self) -> PixelFormat {
        match self {
            RowMut::Binary(_) => PixelFormat::Binary,
            RowMut::Grayscale(_) => PixelFormat::Grayscale,
            RowMut::Rgb565(_) => PixelFormat::Rgb565,
        }
    }

    pub fn as_row(&self) -> Row<'_> {
        match self {
            RowMut::Binary(b) => Row::Binary(b),
            RowMut::Grayscale(b) => Row::Grayscale(b),
            RowMut::Rgb565(b) => Row::Rgb565(b),
        }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            RowMut::Binary(b) | RowMut::Grayscale(b) | RowMut::Rgb565(b) => b,
        }
    }

    #[inline]
    pub fn get_fast(&self, x: usize) -> u32 {
        self.as_row().get_fast(x)
    }

    /// Writes column `x`, truncating `value` to the row's pixel width.
    #[inline]
    pub fn put_fast(&mut self, x: usize, value: u32) {
        match self {
            RowMut::Binary(b) => {
                let bit = 1u8 << (x & 7);
                if value & 1 != 0 {
                    b[x >> 3] |= bit;
                } else {
                    b[x >> 3] &= !bit;
                }
            }
            RowMut::Grayscale(b) => b[x] = value as u8,
            RowMut::Rgb565(b) => {
                let [lo, hi] = (value as u16).to_le_bytes();
                b[2 * x] = lo;
                b[2 * x + 1] = hi;
            }
        }
    }
}

/// Rectangular pixel buffer.
///
/// The compositor never reallocates an image: it reads source, mask and
/// palette buffers and writes into the destination buffer in place. `B` is
/// the backing storage, an owned `Vec<u8>` or a borrowed slice wrapping a
/// framebuffer owned elsewhere.
///
/// # Example
///
/// ```
/// use edgefirst_compositor::image::{Image, PixelFormat};
///
/// let mut img = Image::new(320, 240, PixelFormat::Rgb565);
/// assert_eq!(img.size(), 320 * 240 * 2);
///
/// img.set_pixel(10, 20, 0xf800);
/// assert_eq!(img.get_pixel(10, 20), Some(0xf800));
///
/// // Out of range writes are ignored.
/// img.set_pixel(-1, 400, 0xffff);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image<B = Vec<u8>> {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: B,
}

/// Borrowed read-only image.
pub type ImageView<'a> = Image<&'a [u8]>;

/// Borrowed writable image.
pub type ImageViewMut<'a> = Image<&'a mut [u8]>;

impl Image<Vec<u8>> {
    /// Allocates a zeroed image.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0; format.image_size(width, height)],
        }
    }
}

impl<B: AsRef<[u8]>> Image<B> {
    /// Wraps an existing buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::BufferTooSmall`] if `data` is shorter than
    /// `format.image_size(width, height)`.
    pub fn from_buffer(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: B,
    ) -> Result<Self, ImageError> {
        let needed = format.image_size(width, height);
        let actual = data.as_ref().len();
        if actual < needed {
            return Err(ImageError::BufferTooSmall { needed, actual });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Size in bytes of the pixel data (excluding any trailing slack in the
    /// backing buffer).
    pub fn size(&self) -> usize {
        self.format.image_size(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.size()]
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    pub fn as_view(&self) -> ImageView<'_> {
        Image {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.as_bytes(),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0 <= x) && (x < self.width as i32) && (0 <= y) && (y < self.height as i32)
    }

    /// Scanline `y`. The caller guarantees `y < height`.
    #[inline]
    pub fn row(&self, y: u32) -> Row<'_> {
        debug_assert!(y < self.height, "row {} out of range", y);
        let stride = self.format.row_stride(self.width);
        let start = row_offset(self.format, self.width, y);
        Row::new(self.format, &self.data.as_ref()[start..start + stride])
    }

    /// Bounds-checked pixel read.
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.contains(x, y)
            .then(|| self.row(y as u32).get_fast(x as usize))
    }

    /// Reads a mask pixel as a boolean; out-of-range coordinates read as
    /// unset.
    pub fn get_mask_pixel(&self, x: i32, y: i32) -> bool {
        self.get_pixel(x, y)
            .is_some_and(|p| color::pixel_to_binary(self.format, p))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Image<B> {
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> RowMut<'_> {
        debug_assert!(y < self.height, "row {} out of range", y);
        let stride = self.format.row_stride(self.width);
        let start = row_offset(self.format, self.width, y);
        RowMut::new(self.format, &mut self.data.as_mut()[start..start + stride])
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let size = self.size();
        &mut self.data.as_mut()[..size]
    }

    pub fn as_view_mut(&mut self) -> ImageViewMut<'_> {
        let (width, height, format) = (self.width, self.height, self.format);
        Image {
            width,
            height,
            format,
            data: self.as_bytes_mut(),
        }
    }

    /// Bounds-checked pixel write. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, value: u32) {
        if self.contains(x, y) {
            self.row_mut(y as u32).put_fast(x as usize, value);
        }
    }

    /// Sets every pixel to `value`.
    pub fn fill(&mut self, value: u32) {
        let width = self.width as usize;
        for y in 0..self.height {
            let mut row = self.row_mut(y);
            for x in 0..width {
                row.put_fast(x, value);
            }
        }
    }
}

impl<B> fmt::Display for Image<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.format)
    }
}
