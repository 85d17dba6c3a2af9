// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-document crate: the rectify + enhance
// pipeline on a synthetic photographed page, and reading-order
// reconstruction over a dense page of word fragments.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use folio_core::{Point, TextFragment};
use folio_document::{ReadingOrder, Rectifier};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Rectify + enhance a 400x500 colour image: a bright slightly skewed page
/// with a few dark text bars on a dark desk.
fn bench_rectify_enhance(c: &mut Criterion) {
    let (width, height) = (400u32, 500u32);
    let img = RgbImage::from_fn(width, height, |x, y| {
        let on_page = (40..360).contains(&x) && (50..450).contains(&y);
        let on_text = on_page && (80..320).contains(&x) && (y / 20) % 3 == 0;
        if on_text {
            Rgb([40, 40, 50])
        } else if on_page {
            Rgb([235, 230, 220])
        } else {
            Rgb([60, 50, 40])
        }
    });
    let dynamic = DynamicImage::ImageRgb8(img);
    let corners = [
        Point::new(42.0, 48.0),
        Point::new(362.0, 55.0),
        Point::new(358.0, 452.0),
        Point::new(38.0, 446.0),
    ];
    let rectifier = Rectifier::default();

    c.bench_function("rectify_enhance (400x500 rgb)", |b| {
        b.iter(|| {
            let result = rectifier.rectify(black_box(&dynamic), black_box(&corners));
            black_box(result.ok());
        });
    });
}

/// Reconstruct 60 lines of 12 words each, fed in vertical-centre order.
fn bench_reading_order(c: &mut Criterion) {
    let mut fragments = Vec::new();
    for line in 0..60 {
        let top = line * 40;
        for word in 0..12 {
            let left = word * 70 + (line % 3);
            fragments.push(TextFragment::new("word", left, left + 55, top, top + 20));
        }
    }
    let order = ReadingOrder::default();

    c.bench_function("reading_order (720 fragments)", |b| {
        b.iter(|| black_box(order.reconstruct(black_box(&fragments))));
    });
}

criterion_group!(benches, bench_rectify_enhance, bench_reading_order);
criterion_main!(benches);
