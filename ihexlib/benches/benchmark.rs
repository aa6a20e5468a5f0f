use criterion::{Criterion, criterion_group, criterion_main};
use ihexlib::{HexImage, RecordSize, decode, encode, equal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Full 64 KiB image with a few holes so encoding has to split runs.
fn generate_image() -> HexImage {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    (0..=u16::MAX)
        .filter(|addr| addr % 4096 != 0)
        .map(|addr| (addr, rng.random::<u8>()))
        .collect()
}

fn bench_codec(c: &mut Criterion) {
    let image = generate_image();
    let hex_16 = encode(&image, RecordSize::DEFAULT);
    let hex_32 = encode(&image, RecordSize::new(32).unwrap_or_default());

    c.bench_function("ihex_decode_64k", |b| {
        b.iter(|| {
            let decoded = decode(std::hint::black_box(&hex_16));
            std::hint::black_box(decoded);
        });
    });

    c.bench_function("ihex_encode_64k", |b| {
        b.iter(|| {
            let text = encode(std::hint::black_box(&image), RecordSize::DEFAULT);
            std::hint::black_box(text);
        });
    });

    c.bench_function("ihex_compare_64k", |b| {
        b.iter(|| {
            let same = equal(std::hint::black_box(&hex_16), std::hint::black_box(&hex_32));
            std::hint::black_box(same);
        });
    });
}

criterion_group!(
    name = ihexlib_benches;
    config = Criterion::default().sample_size(20);
    targets = bench_codec
);
criterion_main!(ihexlib_benches);
