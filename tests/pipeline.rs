use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use namfinder::align::{map_reads, InputBuffer, MapOpt, OutputBuffer};
use namfinder::index::{IndexParameters, StrobemerIndex};
use namfinder::io::reads::ReadSource;
use namfinder::io::refs::References;
use namfinder::util::dna;

fn pseudo_random_seq(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed;
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            b"ACGT"[(x >> 16) as usize % 4]
        })
        .collect()
}

fn setup() -> (References, StrobemerIndex) {
    let references = References::from_sequences(vec![
        ("chr1", pseudo_random_seq(5000, 21)),
        ("chr2", pseudo_random_seq(3000, 22)),
    ]);
    let params = IndexParameters::new(20, 16, 0, 7, 255, 1000).unwrap();
    let mut index = StrobemerIndex::new(params);
    index.populate(&references, 1000, 2).unwrap();
    (references, index)
}

/// 奇数编号的 read 取反向互补
fn write_reads_fastq_gz(path: &Path, references: &References, n: usize) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    for i in 0..n {
        let r = i % references.len();
        let start = (i * 53) % (references.lengths[r] - 120);
        let mut seq = references.sequences[r][start..start + 120].to_vec();
        if i % 2 == 1 {
            seq = dna::revcomp(&seq);
        }
        let seq = String::from_utf8(seq).unwrap();
        writeln!(enc, "@read{i}\n{seq}\n+\n{}", "I".repeat(120)).unwrap();
    }
    enc.finish().unwrap();
}

fn run(
    reads: &Path,
    n_threads: usize,
    chunk_size: usize,
    references: &References,
    index: &StrobemerIndex,
) -> String {
    let opt = MapOpt { n_threads, chunk_size, ..MapOpt::default() };
    let input = InputBuffer::new(ReadSource::open(reads).unwrap(), opt.chunk_size);
    let (stats, out) = map_reads(input, Vec::new(), &opt, references, index).unwrap();
    assert_eq!(stats.n_reads, 101);
    String::from_utf8(out).unwrap()
}

#[test]
fn output_does_not_depend_on_thread_count() {
    let dir = tempfile::tempdir().unwrap();
    let (references, index) = setup();
    let reads = dir.path().join("reads.fq.gz");
    write_reads_fastq_gz(&reads, &references, 101);

    let single = run(&reads, 1, 7, &references, &index);
    let four = run(&reads, 4, 7, &references, &index);
    let four_small_chunks = run(&reads, 4, 1, &references, &index);
    assert_eq!(single, four);
    assert_eq!(single, four_small_chunks);

    // reads come out in input order, each mapped back to where it was taken from
    let mut last_read = None;
    for line in single.lines() {
        let f: Vec<&str> = line.split('\t').collect();
        let i: usize = f[0].trim_start_matches("read").parse().unwrap();
        assert!(last_read.map_or(true, |last| last <= i));
        last_read = Some(i);
    }
    assert_eq!(last_read, Some(100));

    for i in [0usize, 1, 2, 3, 50, 99] {
        let name = format!("read{i}\t");
        let strand = if i % 2 == 1 { "-" } else { "+" };
        let chrom = references.names[i % references.len()].as_str();
        let start = (i * 53) % (references.lengths[i % references.len()] - 120);
        let hit = single.lines().filter(|l| l.starts_with(&name)).any(|l| {
            let f: Vec<&str> = l.split('\t').collect();
            f[1] == chrom && f[2] == strand && f[5].parse::<usize>().unwrap() >= start
                && f[6].parse::<usize>().unwrap() <= start + 120
        });
        assert!(hit, "read{i} not reported at {chrom}:{start} on {strand}");
    }
}

#[test]
fn output_file_gets_the_ordered_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.tsv");
    let output = OutputBuffer::new(File::create(&path).unwrap());
    for i in [2usize, 0, 3, 1] {
        output.output_records(format!("chunk{i}\n"), i).unwrap();
    }
    drop(output.finish().unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "chunk0\nchunk1\nchunk2\nchunk3\n");
}

#[test]
fn empty_reads_file_produces_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let (references, index) = setup();
    let reads = dir.path().join("empty.fa");
    fs::write(&reads, b"").unwrap();
    let opt = MapOpt { n_threads: 3, ..MapOpt::default() };
    let input = InputBuffer::new(ReadSource::open(&reads).unwrap(), opt.chunk_size);
    let (stats, out) = map_reads(input, Vec::new(), &opt, &references, &index).unwrap();
    assert_eq!(stats.n_reads, 0);
    assert!(out.is_empty());
}
