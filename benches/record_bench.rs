use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use shmseg::{
    record::{self, Record},
    RecordAccessorExt, Segment, SegmentConfig,
};
use tempfile::TempDir;

shmseg::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Sample {
        pub sequence: u64,
        pub timestamp_ns: u64,
        pub values: [f64; 8],
        pub flags: u32,
        pub valid: bool,
    }
}

fn sample() -> Sample {
    Sample {
        sequence: 42,
        timestamp_ns: 1_700_000_000_000,
        values: [0.5; 8],
        flags: 0b1011,
        valid: true,
    }
}

fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("Record_Codec");
    group.throughput(Throughput::Bytes(Sample::SIZE as u64));

    let value = sample();
    group.bench_function("encode", |b| {
        b.iter(|| record::encode(black_box(&value)).unwrap());
    });

    let bytes = record::encode(&value).unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| record::decode::<Sample>(black_box(&bytes)).unwrap());
    });

    group.finish();
}

fn benchmark_segment_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("Record_Segment");
    let dir = TempDir::new().unwrap();
    let config = SegmentConfig::new("record_bench", 4096).with_file_dir(dir.path());
    let mut segment = Segment::with_config(config).unwrap();

    let value = sample();
    group.bench_function("write_record", |b| {
        b.iter(|| segment.write_record(black_box(&value)).unwrap());
    });

    group.bench_function("read_record", |b| {
        b.iter(|| segment.read_record::<Sample>().unwrap());
    });

    group.finish();
}

criterion_group!(benches, benchmark_codec, benchmark_segment_records);
criterion_main!(benches);
