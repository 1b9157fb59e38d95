// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser;
use edgefirst_compositor::{draw_image, fb_alloc, DrawParams, Image, PixelFormat};
use serde_json::json;
use std::{error::Error, fs, io::ErrorKind, path::Path, time::Instant};
use tracing::{debug, error, info, Level};

/// Loads a headerless pixel dump of the given geometry.
fn read_raw(
    path: &Path,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Image, Box<dyn Error>> {
    let data = fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let image = Image::from_buffer(width, height, format, data)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    debug!("loaded {} from {}", image, path.display());
    Ok(image)
}

/// Loads the destination canvas, or a zeroed one when the file is missing.
fn read_canvas(
    path: Option<&Path>,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Image, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Image::new(width, height, format));
    };
    match fs::metadata(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("{} not found, drawing onto a blank canvas", path.display());
            Ok(Image::new(width, height, format))
        }
        _ => read_raw(path, width, height, format),
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    fb_alloc::set_default_capacity(args.scratch);

    let (src_w, src_h) = (args.src_size[0], args.src_size[1]);
    let (dst_w, dst_h) = (args.dst_size[0], args.dst_size[1]);

    let src = read_raw(&args.src, src_w, src_h, args.src_format)?;
    let mut dst = read_canvas(args.dst.as_deref(), dst_w, dst_h, args.dst_format)?;
    let mask = match &args.mask {
        Some(path) => Some(read_raw(path, src_w, src_h, args.mask_format)?),
        None => None,
    };

    let color_palette = args.color_palette();
    let alpha_palette = args.alpha_palette();
    let (x_scale, y_scale) = args.scale();

    let mut params = DrawParams::new()
        .with_offset(args.offset[0], args.offset[1])
        .with_scale(x_scale, y_scale)
        .with_alpha(args.alpha)
        .with_hints(args.hints());
    if let Some(mask) = &mask {
        params = params.with_mask(mask);
    }
    if let Some(palette) = &color_palette {
        params = params.with_color_palette(palette);
    }
    if let Some(palette) = &alpha_palette {
        params = params.with_alpha_palette(palette);
    }
    if let Some(roi) = args.roi() {
        params = params.with_roi(roi);
    }

    let start = Instant::now();
    draw_image(&mut dst, &src, &params);
    let elapsed = start.elapsed();
    info!("drew {} onto {} in {:?}", src, dst, elapsed);

    let output = match (&args.output, &args.dst) {
        (Some(path), _) | (None, Some(path)) => path,
        (None, None) => return Err("either --output or --dst is required".into()),
    };
    fs::write(output, dst.as_bytes()).map_err(|e| format!("{}: {}", output.display(), e))?;

    if args.json {
        let summary = json!({
            "src": { "width": src.width(), "height": src.height(), "format": src.format().to_string() },
            "dst": { "width": dst.width(), "height": dst.height(), "format": dst.format().to_string() },
            "offset": [args.offset[0], args.offset[1]],
            "scale": [x_scale, y_scale],
            "alpha": args.alpha,
            "hints": args.hints().bits(),
            "scratch": fb_alloc::default_capacity(),
            "elapsed_us": elapsed.as_micros() as u64,
            "output": output.display().to_string(),
        });
        println!("{}", summary);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    run(&args).inspect_err(|e| error!("{}", e))
}
