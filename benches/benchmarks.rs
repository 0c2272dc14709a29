use criterion::{black_box, criterion_group, criterion_main, Criterion};

use namfinder::align::find_nams;
use namfinder::index::{randstrobes_query, IndexParameters, StrobemerIndex};
use namfinder::io::refs::References;

fn make_reference(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

fn default_params() -> IndexParameters {
    IndexParameters::new(20, 16, 0, 7, 255, 1000).unwrap()
}

fn build_index(references: &References) -> StrobemerIndex {
    let mut index = StrobemerIndex::new(default_params());
    index.populate(references, 1000, 1).unwrap();
    index
}

fn bench_populate(c: &mut Criterion) {
    let references = References::from_sequences(vec![("bench", make_reference(100_000))]);

    c.bench_function("populate_100k", |b| {
        b.iter(|| {
            black_box(build_index(black_box(&references)));
        })
    });
}

fn bench_randstrobes_query(c: &mut Criterion) {
    let reference = make_reference(10_000);
    let read = &reference[500..650];
    let params = default_params();

    c.bench_function("randstrobes_query_150bp", |b| {
        b.iter(|| {
            black_box(randstrobes_query(black_box(read), &params));
        })
    });
}

fn bench_find_nams(c: &mut Criterion) {
    let references = References::from_sequences(vec![("bench", make_reference(100_000))]);
    let index = build_index(&references);
    let read = &references.sequences[0][5_000..5_150];
    let seeds = randstrobes_query(read, &index.parameters);

    c.bench_function("find_nams_150bp", |b| {
        b.iter(|| {
            black_box(find_nams(black_box(&seeds), &index));
        })
    });
}

criterion_group!(benches, bench_populate, bench_randstrobes_query, bench_find_nams);
criterion_main!(benches);
