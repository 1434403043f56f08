use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dafdas::constants::{RECORD_BYTES, RECORD_DOUBLES, RECORD_INTEGERS};
use dafdas::translate::{encode_doubles, encode_integers, translate_doubles, translate_integers};
use dafdas::BinaryFormat;

/// Number of records translated per timed batch.
const RECORDS: usize = 256;

/// Doubles in a range every supported format can represent.
fn random_doubles(rng: &mut StdRng) -> Vec<f64> {
    (0..RECORDS * RECORD_DOUBLES)
        .map(|_| rng.random_range(-1.0e30..1.0e30))
        .collect()
}

/// Pre-encode random records in `format` so only decoding is timed.
fn encoded_records(rng: &mut StdRng, format: BinaryFormat) -> Vec<u8> {
    let values = random_doubles(rng);
    let mut bytes = vec![0u8; RECORDS * RECORD_BYTES];
    encode_doubles(format, &values, &mut bytes).unwrap();
    bytes
}

fn bench_decode_doubles(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDAF);

    for format in BinaryFormat::ALL {
        let bytes = encoded_records(&mut rng, format);
        c.bench_function(&format!("translate_doubles/{}", format.name()), |b| {
            b.iter_batched_ref(
                || vec![0.0; RECORDS * RECORD_DOUBLES],
                |output| {
                    for (record, out) in bytes
                        .chunks_exact(RECORD_BYTES)
                        .zip(output.chunks_exact_mut(RECORD_DOUBLES))
                    {
                        translate_doubles(format, black_box(record), RECORD_DOUBLES, out).unwrap();
                    }
                },
                BatchSize::LargeInput,
            )
        });
    }
}

fn bench_encode_doubles(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDA5);
    let values = random_doubles(&mut rng);

    for format in [BinaryFormat::VaxGfloat, BinaryFormat::VaxDfloat] {
        c.bench_function(&format!("encode_doubles/{}", format.name()), |b| {
            b.iter_batched_ref(
                || vec![0u8; RECORDS * RECORD_BYTES],
                |output| {
                    encode_doubles(format, black_box(&values), output).unwrap();
                },
                BatchSize::LargeInput,
            )
        });
    }
}

/// Byte swapping of integer records, the common case for foreign-endian DAS files.
fn bench_integers(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let values: Vec<i32> = (0..RECORDS * RECORD_INTEGERS).map(|_| rng.random()).collect();

    for format in [BinaryFormat::BigIeee, BinaryFormat::LtlIeee] {
        let mut bytes = vec![0u8; RECORDS * RECORD_BYTES];
        encode_integers(format, &values, &mut bytes).unwrap();

        c.bench_function(&format!("translate_integers/{}", format.name()), |b| {
            let mut output = vec![0; RECORDS * RECORD_INTEGERS];
            b.iter(|| {
                translate_integers(
                    format,
                    black_box(&bytes),
                    RECORDS * RECORD_INTEGERS,
                    &mut output,
                )
                .unwrap();
                black_box(&output);
            })
        });
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_decode_doubles, bench_encode_doubles, bench_integers
);
criterion_main!(benches);
