// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use criterion::{criterion_group, criterion_main, Criterion};
use edgefirst_compositor::{
    draw_image_in, fb_alloc::FbAlloc, ColorPalette, DrawParams, Hints, Image, PixelFormat,
};

pub fn benchmark_scale(c: &mut Criterion) {
    let fmts = [PixelFormat::Grayscale, PixelFormat::Rgb565];
    let hints = [
        ("nearest", Hints::empty()),
        ("bilinear", Hints::BILINEAR),
        ("bicubic", Hints::BICUBIC),
        ("area", Hints::AREA),
    ];
    let dims = [(160, 120), (320, 240), (640, 480)];
    let mut arena = FbAlloc::new(1024 * 1024);

    for fmt in fmts.iter() {
        for (name, hint) in hints.iter() {
            let mut group = c.benchmark_group(format!("scale/{}/{}", fmt, name));
            for src_dim in dims.iter() {
                for dst_dim in dims.iter() {
                    let src = Image::new(src_dim.0, src_dim.1, *fmt);
                    let mut dst = Image::new(dst_dim.0, dst_dim.1, *fmt);
                    let params = DrawParams::new()
                        .with_scale(
                            dst_dim.0 as f32 / src_dim.0 as f32,
                            dst_dim.1 as f32 / src_dim.1 as f32,
                        )
                        .with_hints(*hint);
                    group.bench_function(
                        format!("{}x{}-{}x{}", src_dim.0, src_dim.1, dst_dim.0, dst_dim.1),
                        |b| b.iter(|| draw_image_in(&mut arena, &mut dst, &src, &params)),
                    );
                }
            }
            group.finish();
        }
    }
}

pub fn benchmark_overlay(c: &mut Criterion) {
    let thermal = Image::new(80, 60, PixelFormat::Grayscale);
    let mut mask = Image::new(80, 60, PixelFormat::Binary);
    mask.fill(1);
    let palette = ColorPalette::ironbow();
    let mut frame = Image::new(640, 480, PixelFormat::Rgb565);
    let mut arena = FbAlloc::new(1024 * 1024);

    let mut group = c.benchmark_group("overlay");
    let base = DrawParams::new()
        .with_offset(320, 240)
        .with_scale(8.0, 8.0)
        .with_alpha(128)
        .with_color_palette(&palette)
        .with_hints(Hints::BILINEAR | Hints::CENTER);
    group.bench_function("palette", |b| {
        b.iter(|| draw_image_in(&mut arena, &mut frame, &thermal, &base))
    });
    let masked = base.clone().with_mask(&mask);
    group.bench_function("palette-mask", |b| {
        b.iter(|| draw_image_in(&mut arena, &mut frame, &thermal, &masked))
    });
    group.finish();
}

criterion_group!(benches, benchmark_scale, benchmark_overlay);
criterion_main!(benches);
