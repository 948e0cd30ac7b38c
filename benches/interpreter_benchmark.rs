use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iec62056_sim::constants::OBIS_REQUEST_FRAME;
use iec62056_sim::{bcc, Interpreter};

const HANDSHAKE: &[u8] = b"/?!\r\n\x06050\r\n";

fn readout_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    for _ in 0..16 {
        data.extend_from_slice(b"noise without terminator ");
        data.extend_from_slice(OBIS_REQUEST_FRAME);
    }
    data
}

fn benchmark_handshake(c: &mut Criterion) {
    let data = readout_bytes();

    c.bench_function("interpreter_handshake", |b| {
        b.iter(|| {
            let mut interp = Interpreter::new();
            black_box(interp.process(black_box(HANDSHAKE)));
            interp.finish_baud_switch();
            for chunk in data.chunks(32) {
                black_box(interp.process(black_box(chunk)));
            }
        })
    });
}

fn benchmark_unterminated_noise(c: &mut Criterion) {
    let noise = vec![0x55u8; 4096];

    c.bench_function("interpreter_noise_4k", |b| {
        b.iter(|| {
            let mut interp = Interpreter::new();
            black_box(interp.process(black_box(&noise)));
        })
    });
}

fn benchmark_bcc(c: &mut Criterion) {
    let block = vec![0xA5u8; 1024];
    c.bench_function("bcc_1k", |b| b.iter(|| bcc(black_box(&block))));
}

criterion_group!(
    benches,
    benchmark_handshake,
    benchmark_unterminated_noise,
    benchmark_bcc
);
criterion_main!(benches);
