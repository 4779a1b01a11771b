use bonjson::{decode_value, encode_value, DecodeFlags, EncodeFlags, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_document() -> Value {
    Value::Object(vec![
        ("name".into(), Value::String("bonjson".into())),
        ("version".into(), Value::Int(1)),
        (
            "items".into(),
            Value::Array((0..64).map(Value::Int).collect()),
        ),
        (
            "nested".into(),
            Value::Object(vec![
                ("ok".into(), Value::Bool(true)),
                ("ratio".into(), Value::Float(0.125)),
                ("note".into(), Value::Null),
            ]),
        ),
    ])
}

fn bench_encode(c: &mut Criterion) {
    let value = sample_document();
    c.bench_function("encode_mixed_document", |b| {
        b.iter(|| encode_value(black_box(&value), EncodeFlags::default()).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode_value(&sample_document(), EncodeFlags::default()).unwrap();
    c.bench_function("decode_mixed_document", |b| {
        b.iter(|| decode_value(black_box(&bytes), DecodeFlags::default()).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
