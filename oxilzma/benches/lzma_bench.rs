//! Performance benchmarks for oxilzma
//!
//! - Compression speed per preset and per data pattern
//! - Match finder variants at equal settings
//! - Streaming writes into length-limited sinks

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxilzma::{
    EncodeStatus, Encoder, EncoderConfig, LimitedSink, MatchFinderKind, Preset, compress,
    compress_preset,
};
use std::hint::black_box;

/// Type alias for pattern generator functions
type PatternGenerator = fn(usize) -> Vec<u8>;

mod test_data {
    /// Uniform data - all bytes are the same
    pub fn uniform(size: usize) -> Vec<u8> {
        vec![0xAA; size]
    }

    /// Random data - no patterns
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    /// Text-like data
    pub fn text_like(size: usize) -> Vec<u8> {
        let text = b"The quick brown fox jumps over the lazy dog. \
                     Pack my box with five dozen liquor jugs. \
                     How vexingly quick daft zebras jump! \
                     Lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x0DDB1A5E5BAD5EED;
        while data.len() < size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let start = (seed >> 33) as usize % text.len();
            let len = (16 + (seed >> 50) as usize % 48).min(text.len() - start);
            let chunk = &text[start..start + len];
            data.extend_from_slice(&chunk[..chunk.len().min(size - data.len())]);
        }
        data
    }

    /// Binary-like data - small alphabet with runs
    pub fn binary_like(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        while data.len() < size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let run = 1 + (seed >> 60) as usize;
            let byte = ((seed >> 32) % 16) as u8;
            data.extend(std::iter::repeat_n(byte, run.min(size - data.len())));
        }
        data
    }
}

mod data_sizes {
    pub const SMALL: usize = 10 * 1024; // 10 KB
    pub const MEDIUM: usize = 100 * 1024; // 100 KB
    pub const LARGE: usize = 1024 * 1024; // 1 MB
}

fn bench_presets(c: &mut Criterion) {
    let mut group = c.benchmark_group("presets");

    let size = data_sizes::MEDIUM;
    let data = test_data::text_like(size);

    for level in [0, 3, 6, 9] {
        let preset = Preset::new(level).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("preset_{}", level)),
            &data,
            |b, data| {
                b.iter(|| {
                    let compressed = compress_preset(black_box(data), preset).unwrap();
                    black_box(compressed);
                });
            },
        );
    }

    group.finish();
}

fn bench_data_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_types");

    let patterns: [(&str, PatternGenerator); 4] = [
        ("uniform", test_data::uniform as PatternGenerator),
        ("random", test_data::random as PatternGenerator),
        ("text", test_data::text_like as PatternGenerator),
        ("binary", test_data::binary_like as PatternGenerator),
    ];

    let size = data_sizes::MEDIUM;
    let config = EncoderConfig::default();

    for (pattern_name, generator) in patterns {
        let data = generator(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(pattern_name),
            &data,
            |b, data| {
                b.iter(|| {
                    let compressed = compress(black_box(data), &config).unwrap();
                    black_box(compressed);
                });
            },
        );
    }

    group.finish();
}

fn bench_match_finders(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_finders");

    let size = data_sizes::LARGE;
    let data = test_data::text_like(size);

    for mf in [
        MatchFinderKind::Hc2,
        MatchFinderKind::Hc3,
        MatchFinderKind::Hc4,
    ] {
        let config = EncoderConfig::default().with_match_finder(mf);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(mf), &data, |b, data| {
            b.iter(|| {
                let compressed = compress(black_box(data), &config).unwrap();
                black_box(compressed);
            });
        });
    }

    group.finish();
}

/// Streams of at most 4 KB, reopened until all input is compressed.
fn bench_limited_streams(c: &mut Criterion) {
    let mut group = c.benchmark_group("limited_streams");

    let size = data_sizes::SMALL * 10;
    let data = test_data::binary_like(size);
    let config = EncoderConfig::default().with_dict_cap(1 << 20);

    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("4KB_sinks", |b| {
        b.iter(|| {
            let mut enc = Encoder::new(LimitedSink::new(Vec::new(), 4096), &config).unwrap();
            let mut taken = 0;
            let mut streams = 0;
            loop {
                let (n, status) = enc.write(&data[taken..]).unwrap();
                taken += n;
                if status == EncodeStatus::Complete && taken == data.len() {
                    if enc.close().unwrap() == EncodeStatus::Complete {
                        break;
                    }
                } else {
                    enc.close().unwrap();
                }
                enc.reopen(LimitedSink::new(Vec::new(), 4096));
                streams += 1;
            }
            black_box(streams);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_presets,
    bench_data_types,
    bench_match_finders,
    bench_limited_streams,
);
criterion_main!(benches);
