//! Criterion benchmarks for the basilica reverb engine
//!
//! Run with: cargo bench -p basilica-reverb
#![allow(missing_docs)]

use basilica_core::{ParamId, ParameterBufferPool};
use basilica_reverb::modulation::{ModulationMatrix, ModulationProcessor};
use basilica_reverb::{EngineSettings, FdnCore, RandomDensity, ReverbEngine, RoutingPreset};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_fdn(c: &mut Criterion) {
    let mut group = c.benchmark_group("FdnCore");

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("process", block_size),
            &block_size,
            |b, &len| {
                let mut fdn = FdnCore::new(SAMPLE_RATE);
                let mut pool = ParameterBufferPool::new(len);
                for id in ParamId::ALL {
                    pool.set_constant(id, id.default_value(), len);
                }
                let input = generate_test_signal(len);
                let mut left = input.clone();
                let mut right = input.clone();
                b.iter(|| {
                    left.copy_from_slice(&input);
                    right.copy_from_slice(&input);
                    fdn.process(&mut left, &mut right, &pool);
                    black_box(left[len - 1]);
                });
            },
        );
    }

    group.finish();
}

fn bench_modulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("ModulationProcessor");

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("dense", block_size),
            &block_size,
            |b, &len| {
                let matrix = ModulationMatrix::new();
                matrix.randomize(RandomDensity::Dense, 1);
                let mut processor = ModulationProcessor::new(SAMPLE_RATE, 1);
                let input = generate_test_signal(len);
                b.iter(|| {
                    let out = processor.process(&input, &input, &matrix);
                    black_box(out[0]);
                });
            },
        );
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("ReverbEngine");

    for preset in [
        RoutingPreset::Cathedral,
        RoutingPreset::ParallelSpaces,
        RoutingPreset::ShimmerLoop,
    ] {
        for &block_size in BLOCK_SIZES {
            group.bench_with_input(
                BenchmarkId::new(preset.name(), block_size),
                &block_size,
                |b, &len| {
                    let mut engine =
                        ReverbEngine::new(EngineSettings::default().with_preset(preset));
                    let _ = engine.prepare(SAMPLE_RATE, len, 2);
                    engine.handle().modulation().randomize(RandomDensity::Normal, 3);
                    let input = generate_test_signal(len);
                    let mut left = input.clone();
                    let mut right = input.clone();
                    b.iter(|| {
                        left.copy_from_slice(&input);
                        right.copy_from_slice(&input);
                        let _ = engine.process_stereo(&mut left, &mut right);
                        black_box(left[len - 1]);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_preset_switch(c: &mut Criterion) {
    c.bench_function("ReverbEngine/preset_switch_512", |b| {
        let mut engine = ReverbEngine::default();
        let _ = engine.prepare(SAMPLE_RATE, 512, 2);
        let handle = engine.handle();
        let input = generate_test_signal(512);
        let mut left = input.clone();
        let mut right = input.clone();
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            handle.load_preset_kind(if flip {
                RoutingPreset::ParallelSpaces
            } else {
                RoutingPreset::Cathedral
            });
            left.copy_from_slice(&input);
            right.copy_from_slice(&input);
            let _ = engine.process_stereo(&mut left, &mut right);
            black_box(left[511]);
        });
    });
}

criterion_group!(
    benches,
    bench_fdn,
    bench_modulation,
    bench_engine,
    bench_preset_switch
);
criterion_main!(benches);
