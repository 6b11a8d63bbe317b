use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use downlink_core::{
    constants::FRAME_BIT_LEN,
    fec::fixture::{FixtureInner, FixtureOuter},
    scanner::{find_access_code, AccessCode},
    stream::{StreamConfig, StreamDecoder},
    FrameDecoder,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn noise_bits(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..2u8)).collect()
}

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");

    for &frames in &[1usize, 8, 64] {
        let bits = noise_bits(FRAME_BIT_LEN * frames, 7);
        group.throughput(Throughput::Elements(bits.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("find_access_code", frames),
            &bits,
            |b, data| {
                b.iter(|| {
                    let res = find_access_code(data, 0, &AccessCode::CONVOLVED, FRAME_BIT_LEN);
                    criterion::black_box(res)
                });
            },
        );

        // Full poll over noise: scanning cost without any codec work
        group.bench_with_input(BenchmarkId::new("stream_poll", frames), &bits, |b, data| {
            b.iter(|| {
                let decoder =
                    FrameDecoder::new(FixtureInner::failing("noise"), FixtureOuter::passthrough());
                let config = StreamConfig {
                    differential: true,
                    ..StreamConfig::default()
                };
                let mut stream = StreamDecoder::with_config(decoder, config);
                stream.push_bits(data);
                criterion::black_box(stream.poll())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scanner);
criterion_main!(benches);
