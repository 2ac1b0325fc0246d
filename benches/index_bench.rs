//! Criterion benchmarks for the hot paths of the build pipeline:
//! tokenization and the barrel record codec.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cordex::{PostingRecord, Tokenizer};

fn synthetic_abstract() -> String {
    let sentence = "The spike glycoprotein of the coronavirus mediates receptor \
                    binding and membrane fusion, and neutralizing antibodies \
                    target its receptor-binding domain in convalescent sera. ";
    sentence.repeat(40)
}

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = Tokenizer::new(2);
    let text = synthetic_abstract();

    c.bench_function("tokenize_abstract", |b| {
        b.iter(|| tokenizer.tokenize(black_box(&text)))
    });
}

fn bench_record_codec(c: &mut Criterion) {
    let records: Vec<PostingRecord> = (0..1024)
        .map(|i| PostingRecord {
            token_id: i % 64,
            doc_id: i,
            freq: 4,
            positions: vec![i, i + 7, i + 19, i + 31],
        })
        .collect();

    let mut encoded = Vec::new();
    for rec in &records {
        rec.write_to(&mut encoded).unwrap();
    }

    c.bench_function("encode_barrel_records", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(encoded.len());
            for rec in &records {
                rec.write_to(&mut buf).unwrap();
            }
            black_box(buf)
        })
    });

    c.bench_function("decode_barrel_records", |b| {
        b.iter(|| {
            let mut cursor = std::io::Cursor::new(black_box(&encoded));
            let mut count = 0usize;
            while let Some(rec) = PostingRecord::read_from(&mut cursor).unwrap() {
                count += rec.positions.len();
            }
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_record_codec);
criterion_main!(benches);
