// Dispatch benchmarks for the Tahoe bridge
//
// These benchmarks measure what validation adds to a message send:
// the bare address checks, a validated send through the headless runtime
// with and without the type-descriptor read, and the cost of a rejection
// including its diagnostic.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tahoe_bridge::handle::{self, check_address};
use tahoe_bridge::runtime::headless::Headless;
use tahoe_bridge::{Id, Provenance, Runtime, dispatch};

/// Benchmark the pure address checks on accepted and rejected addresses.
fn bench_address_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_address");

    for (label, addr) in [
        ("null", 0usize),
        ("low", 0x800),
        ("misaligned", 0x1004),
        ("plausible", 0x7f00_1000),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &addr, |b, &addr| {
            b.iter(|| check_address(black_box(addr)));
        });
    }

    group.finish();
}

/// Benchmark full validation of a live object, fresh and initialized.
fn bench_validate(c: &mut Criterion) {
    let class = Headless::class_named(c"NSObject");
    let mut group = c.benchmark_group("validate");

    group.bench_function("fresh", |b| {
        b.iter(|| unsafe { handle::validate::<Headless>(black_box(class), Provenance::Fresh) });
    });
    group.bench_function("initialized", |b| {
        b.iter(|| unsafe {
            handle::validate::<Headless>(black_box(class), Provenance::Initialized)
        });
    });

    group.finish();
}

/// Benchmark a validated send against a rejected one.
///
/// Rejections run under `capture` so their diagnostics are buffered rather
/// than written to stderr.
fn bench_send(c: &mut Criterion) {
    let number_class = Headless::class_named(c"NSNumber");
    let make = Headless::register_selector(c"numberWithUnsignedLongLong:");
    let read = Headless::register_selector(c"unsignedLongLongValue");
    let (Some(make), Some(read)) = (make, read) else {
        return;
    };
    let Ok(number) = (unsafe { dispatch::send_word::<Headless>(number_class, make, 42) }) else {
        return;
    };

    let mut group = c.benchmark_group("send");

    group.bench_function("raw", |b| {
        b.iter(|| unsafe { Headless::send_returning_word(black_box(number), read) });
    });
    group.bench_function("validated", |b| {
        b.iter(|| unsafe { dispatch::send_returning_word::<Headless>(black_box(number), read) });
    });
    group.bench_function("rejected", |b| {
        let bad = Id::from_addr(0x800);
        b.iter(|| {
            tahoe_log::capture(|| unsafe {
                dispatch::send_returning_word::<Headless>(black_box(bad), read)
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_address_checks, bench_validate, bench_send);
criterion_main!(benches);
