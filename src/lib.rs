// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Compositor Library
//!
//! Software image compositing for small camera pipelines. One source image is
//! drawn onto a destination image at an integer offset, with independent
//! horizontal and vertical scale factors, a global opacity, an optional
//! binary mask and optional color and alpha palettes.
//!
//! ## Features
//!
//! - **Pixel Formats**: 1-bit binary, 8-bit grayscale and RGB565, converted
//!   on the fly between any source and destination pair.
//! - **Resampling**: nearest neighbor, bilinear, bicubic and area averaging,
//!   selected through [`Hints`] and the scale factors.
//! - **Fixed-Point Blending**: integer-only alpha compositing matching the
//!   precision of the embedded firmware it interoperates with.
//! - **Bounded Scratch Memory**: working lines come from a stack-discipline
//!   [`fb_alloc`] arena, so drawing never touches the heap.
//!
//! ## Example
//!
//! ```
//! use edgefirst_compositor::{draw_image, DrawParams, Hints, Image, PixelFormat};
//!
//! let mut frame = Image::new(320, 240, PixelFormat::Rgb565);
//! let mut icon = Image::new(16, 16, PixelFormat::Grayscale);
//! icon.fill(255);
//!
//! // Half-transparent 2x overlay centred on the frame.
//! let params = DrawParams::new()
//!     .with_offset(160, 120)
//!     .with_scale(2.0, 2.0)
//!     .with_alpha(128)
//!     .with_hints(Hints::BILINEAR | Hints::CENTER);
//! draw_image(&mut frame, &icon, &params);
//!
//! assert_eq!(frame.get_pixel(160, 120), Some(0x7bef));
//! ```
//!
//! ## Safety
//!
//! The library contains no `unsafe` code.

pub mod blend;
pub mod color;
pub mod draw;
pub mod image;
pub mod palette;

mod fast;
mod interp;
mod placement;

pub use draw::{draw_image, draw_image_in, DrawParams, Hints, Resample};
pub use fb_alloc;
pub use image::{Image, ImageError, ImageView, ImageViewMut, PixelFormat, Rect};
pub use palette::{AlphaPalette, ColorPalette};
