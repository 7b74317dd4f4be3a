//! Benchmarks for docstruct assembly performance.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use docstruct::{
    build_toc, heuristic_reading_order, normalize_text, AssemblerOptions, BBox, BlockAssembler,
    LayoutRegion, OcrRegion, PageInput, TocEntry,
};

/// A two-column page with a title and a table every `lines / 4` lines.
fn create_test_page(lines: usize) -> PageInput {
    let mut ocr = Vec::with_capacity(lines);
    let mut layout = Vec::new();

    for i in 0..lines {
        let column = (i % 2) as f32;
        let row = (i / 2) as f32;
        let x0 = column * 300.0;
        let y0 = row * 14.0;
        let bbox = [x0, y0, x0 + 280.0, y0 + 12.0];

        if i % 25 == 0 {
            ocr.push(OcrRegion::new(format!("Heading {}", i), bbox, Some(14.0)));
            layout.push(LayoutRegion::new("paragraph_title", bbox));
        } else {
            ocr.push(OcrRegion::new(
                format!("Line {} of benchmark prose for docstruct.", i),
                bbox,
                Some(10.0),
            ));
        }
    }

    for start in (0..lines).step_by((lines / 4).max(1)).skip(1) {
        let y0 = (start / 2) as f32 * 14.0;
        layout.push(LayoutRegion::new("table", [0.0, y0, 600.0, y0 + 28.0]));
    }

    let boxes: Vec<BBox> = ocr.iter().map(|r| r.bbox).collect();
    let order = heuristic_reading_order(&boxes, 2).unwrap_or_default();
    PageInput::new(1)
        .with_ocr(ocr)
        .with_layout(layout)
        .with_reading_order(order)
}

/// Benchmark page assembly at various sizes.
fn bench_assemble_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_page");
    let assembler = BlockAssembler::new(AssemblerOptions::new().with_prose_font_size(10.0));

    for lines in [20, 100, 500].iter() {
        let page = create_test_page(*lines);
        group.bench_function(format!("{}_lines", lines), |b| {
            b.iter(|| assembler.assemble_page(black_box(&page)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark reading order.
fn bench_reading_order(c: &mut Criterion) {
    let page = create_test_page(500);
    let boxes: Vec<BBox> = page.ocr.iter().map(|r| r.bbox).collect();

    c.bench_function("heuristic_order_500", |b| {
        b.iter(|| heuristic_reading_order(black_box(&boxes), 2).unwrap());
    });
}

/// Benchmark TOC tree construction and page ranges.
fn bench_toc(c: &mut Criterion) {
    let entries: Vec<TocEntry> = (0..1000u32)
        .map(|i| TocEntry::new(format!("Entry {}", i), i % 3, Some(i + 1)))
        .collect();

    c.bench_function("build_toc_1000", |b| {
        b.iter(|| build_toc(black_box(&entries), 2000));
    });
}

fn bench_normalize(c: &mut Criterion) {
    let text = "The cit- ies of the “plain” — and   more…\n\n\n\n• bullet ".repeat(50);

    c.bench_function("normalize_text", |b| {
        b.iter(|| normalize_text(black_box(&text)));
    });
}

criterion_group!(
    benches,
    bench_assemble_page,
    bench_reading_order,
    bench_toc,
    bench_normalize,
);
criterion_main!(benches);
