//! Пропускная способность перебуферизации, статистики окна и чтения GUPPI.
//!
//! cargo bench -p frsc-benchmark

use std::{hint::black_box, io::Cursor};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frsc_analyzer::{Rebuffer, StatisticsEngine, WindowBuffer};
use frsc_core::{BlockRead, GuppiHeaderBuilder, GuppiMetadata, GuppiReader};
use frsc_types::{ChannelMask, FrscResult, ReportHeader, ReportType, BYTES_PER_SAMPLE};
use rand::{rngs::SmallRng, Rng, SeedableRng};

const N_CHAN: usize = 32;
const SPC: usize = 4096;
const OVERLAP: usize = 64;

fn metadata() -> GuppiMetadata {
    GuppiMetadata {
        block_size: N_CHAN * SPC * BYTES_PER_SAMPLE,
        n_chan: N_CHAN,
        overlap: OVERLAP,
        ..GuppiMetadata::default()
    }
}

/// Случайный блок; первый байт не пробел, иначе его съест пропуск
/// выравнивания перед следующим заголовком.
fn random_block(
    rng: &mut SmallRng,
    len: usize,
) -> Vec<u8> {
    let mut block: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    block[0] = 1;
    block
}

fn bench_rebuffer(c: &mut Criterion) {
    let meta = metadata();
    let mut rng = SmallRng::seed_from_u64(42);
    let block = random_block(&mut rng, meta.block_size);

    let mut group = c.benchmark_group("rebuffer_swallow");
    group.throughput(Throughput::Bytes(meta.block_size as u64));

    for window in [1_000usize, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &n| {
            let mut rb = Rebuffer::new(&meta, n, ChannelMask::new()).unwrap();
            let mut sink = |w: &WindowBuffer, f: f64| -> FrscResult<()> {
                black_box((w.filled(), f));
                Ok(())
            };
            b.iter(|| rb.swallow(black_box(&block), &mut sink).unwrap());
        });
    }

    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let prototype = ReportHeader {
        n_ch: N_CHAN as i64,
        ..ReportHeader::default()
    };

    let mut group = c.benchmark_group("window_statistics");

    for window in [1_024usize, 16_384] {
        let meta = GuppiMetadata {
            block_size: N_CHAN * window * BYTES_PER_SAMPLE,
            n_chan: N_CHAN,
            overlap: 0,
            ..GuppiMetadata::default()
        };
        let block = random_block(&mut rng, meta.block_size);

        // Одно окно ровно из одного блока
        let mut rb = Rebuffer::new(&meta, window, ChannelMask::new()).unwrap();
        let mut captured = None;
        rb.swallow(&block, &mut |_: &WindowBuffer, _: f64| -> FrscResult<()> {
            captured = Some(());
            Ok(())
        })
        .unwrap();
        assert!(captured.is_some());

        group.throughput(Throughput::Elements((N_CHAN * window) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, _| {
            let mut engine = StatisticsEngine::new(ReportType::TimeFull0);
            b.iter(|| engine.compute(black_box(rb.window()), &prototype).unwrap());
        });
    }

    group.finish();
}

fn bench_guppi_read(c: &mut Criterion) {
    let meta = metadata();
    let mut rng = SmallRng::seed_from_u64(1);
    let builder = GuppiHeaderBuilder::from_metadata(&meta);

    let blocks = 8;
    let mut file = Vec::new();
    for _ in 0..blocks {
        builder
            .write_block(&mut file, &random_block(&mut rng, meta.block_size))
            .unwrap();
    }

    let mut group = c.benchmark_group("guppi_read");
    group.throughput(Throughput::Bytes(file.len() as u64));
    group.bench_function("header_and_block", |b| {
        let mut buf = vec![0u8; meta.block_size];
        b.iter(|| {
            let mut reader = GuppiReader::new(Cursor::new(file.as_slice()));
            while reader.read_header().unwrap().is_some() {
                match reader.read_block(&mut buf).unwrap() {
                    BlockRead::Complete => {}
                    BlockRead::Short(_) => break,
                }
            }
            black_box(reader.blocks_read())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rebuffer, bench_statistics, bench_guppi_read);
criterion_main!(benches);
