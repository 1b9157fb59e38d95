// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_compositor::{AlphaPalette, ColorPalette, Hints, PixelFormat, Rect};
use std::path::PathBuf;

/// Source image mirroring options.
///
/// Mirroring is applied while drawing by negating the matching scale factor.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum MirrorSetting {
    /// No mirroring
    None,
    /// Flip horizontally (left-right)
    Horizontal,
    /// Flip vertically (top-bottom)
    Vertical,
    /// Flip both horizontally and vertically (180-degree rotation)
    Both,
}

/// Color palette applied to the source intensity.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum PaletteSetting {
    /// Draw source colors as-is
    None,
    /// Gray ramp
    Grayscale,
    /// Blue to red hue sweep
    Rainbow,
    /// Thermal camera style black-violet-red-yellow-white ramp
    Ironbow,
}

/// Alpha palette applied to the source intensity.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum AlphaPaletteSetting {
    /// Uniform opacity
    None,
    /// Opacity proportional to intensity, black is transparent
    Linear,
}

/// Resampling filter requested for scaled draws.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum ResampleSetting {
    /// Nearest neighbor
    Nearest,
    /// Bilinear interpolation
    Bilinear,
    /// Bicubic (Catmull-Rom) interpolation
    Bicubic,
    /// Box filter, used only when downscaling on both axes
    Area,
}

/// Command-line arguments for the EdgeFirst Compositor tool.
///
/// Composites one headerless raw pixel dump onto another. Arguments can be
/// specified via command line or environment variables.
///
/// # Example
///
/// ```bash
/// # Overlay a thermal frame at half opacity, scaled 4x and centred
/// edgefirst-compositor --src thermal.raw --src-size 80 60 --src-format grayscale \
///     --dst frame.raw --dst-size 320 240 --dst-format rgb565 \
///     --offset 160 120 --scale 4 4 --center --alpha 128 \
///     --palette ironbow --resample bilinear --output out.raw
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source raw image path
    #[arg(long, env = "SRC")]
    pub src: PathBuf,

    /// Source resolution in pixels (width height)
    #[arg(
        long,
        env = "SRC_SIZE",
        required = true,
        value_delimiter = ' ',
        num_args = 2
    )]
    pub src_size: Vec<u32>,

    /// Source pixel format (binary, grayscale, rgb565)
    #[arg(long, env = "SRC_FORMAT", default_value = "grayscale")]
    pub src_format: PixelFormat,

    /// Destination raw image path, a zeroed canvas is used if it does not
    /// exist
    #[arg(long, env = "DST")]
    pub dst: Option<PathBuf>,

    /// Destination resolution in pixels (width height)
    #[arg(
        long,
        env = "DST_SIZE",
        required = true,
        value_delimiter = ' ',
        num_args = 2
    )]
    pub dst_size: Vec<u32>,

    /// Destination pixel format (binary, grayscale, rgb565)
    #[arg(long, env = "DST_FORMAT", default_value = "rgb565")]
    pub dst_format: PixelFormat,

    /// Output raw image path, defaults to overwriting the destination
    #[arg(short, long, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Destination position of the source origin (x y)
    #[arg(
        long,
        env = "OFFSET",
        default_value = "0 0",
        value_delimiter = ' ',
        num_args = 2,
        allow_negative_numbers = true
    )]
    pub offset: Vec<i32>,

    /// Horizontal and vertical scale factors (x y)
    #[arg(
        long,
        env = "SCALE",
        default_value = "1 1",
        value_delimiter = ' ',
        num_args = 2,
        allow_negative_numbers = true
    )]
    pub scale: Vec<f32>,

    /// Layer opacity, 0 (transparent) to 256 (opaque)
    #[arg(long, env = "ALPHA", default_value = "256")]
    pub alpha: u32,

    /// Mask raw image path, same size as the source
    #[arg(long, env = "MASK")]
    pub mask: Option<PathBuf>,

    /// Mask pixel format (binary, grayscale, rgb565)
    #[arg(long, env = "MASK_FORMAT", default_value = "binary")]
    pub mask_format: PixelFormat,

    /// Source image mirroring setting
    #[arg(long, env = "MIRROR", default_value = "none", value_enum)]
    pub mirror: MirrorSetting,

    /// Color palette applied to the source
    #[arg(long, env = "PALETTE", default_value = "none", value_enum)]
    pub palette: PaletteSetting,

    /// Alpha palette applied to the source
    #[arg(long, env = "ALPHA_PALETTE", default_value = "none", value_enum)]
    pub alpha_palette: AlphaPaletteSetting,

    /// Resampling filter
    #[arg(long, env = "RESAMPLE", default_value = "nearest", value_enum)]
    pub resample: ResampleSetting,

    /// Center the scaled source on the offset
    #[arg(long, env = "CENTER")]
    pub center: bool,

    /// Treat the destination as black instead of reading it
    #[arg(long, env = "BLACK_BACKGROUND")]
    pub black_background: bool,

    /// Source region of interest (x y width height)
    #[arg(
        long,
        env = "ROI",
        value_delimiter = ' ',
        num_args = 4,
        allow_negative_numbers = true
    )]
    pub roi: Option<Vec<i32>>,

    /// Scratch arena size in bytes
    #[arg(long, env = "SCRATCH", default_value = "524288")]
    pub scratch: usize,

    /// Print a JSON summary of the draw on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn hints(&self) -> Hints {
        let mut hints = match self.resample {
            ResampleSetting::Nearest => Hints::empty(),
            ResampleSetting::Bilinear => Hints::BILINEAR,
            ResampleSetting::Bicubic => Hints::BICUBIC,
            ResampleSetting::Area => Hints::AREA,
        };
        hints.set(Hints::CENTER, self.center);
        hints.set(Hints::BLACK_BACKGROUND, self.black_background);
        hints
    }

    /// Scale factors with mirroring folded in.
    pub fn scale(&self) -> (f32, f32) {
        let (sx, sy) = (self.scale[0], self.scale[1]);
        match self.mirror {
            MirrorSetting::None => (sx, sy),
            MirrorSetting::Horizontal => (-sx, sy),
            MirrorSetting::Vertical => (sx, -sy),
            MirrorSetting::Both => (-sx, -sy),
        }
    }

    pub fn roi(&self) -> Option<Rect> {
        self.roi
            .as_ref()
            .map(|r| Rect::new(r[0], r[1], r[2], r[3]))
    }

    pub fn color_palette(&self) -> Option<ColorPalette> {
        match self.palette {
            PaletteSetting::None => None,
            PaletteSetting::Grayscale => Some(ColorPalette::grayscale()),
            PaletteSetting::Rainbow => Some(ColorPalette::rainbow()),
            PaletteSetting::Ironbow => Some(ColorPalette::ironbow()),
        }
    }

    pub fn alpha_palette(&self) -> Option<AlphaPalette> {
        match self.alpha_palette {
            AlphaPaletteSetting::None => None,
            AlphaPaletteSetting::Linear => Some(AlphaPalette::linear()),
        }
    }
}
