use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::Path;

use super::fasta::FastaReader;
use super::fastq::FastqReader;
use crate::error::Error;

/// A query read: name plus upper-cased sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

enum Format {
    Fasta(FastaReader<Box<dyn BufRead + Send>>),
    Fastq(FastqReader<Box<dyn BufRead + Send>>),
}

/// Sequential read source over a FASTA or FASTQ stream (format sniffed from
/// the first non-blank byte).
pub struct ReadSource {
    inner: Format,
}

impl ReadSource {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = super::open_maybe_gz(path)
            .with_context(|| format!("cannot open reads file '{}'", path.display()))?;
        Self::from_reader(reader)
    }

    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let first = reader
            .fill_buf()?
            .iter()
            .copied()
            .find(|b| !b.is_ascii_whitespace());
        let inner = match first {
            Some(b'@') => Format::Fastq(FastqReader::new(reader)),
            Some(b'>') | None => Format::Fasta(FastaReader::new(reader)),
            Some(other) => {
                return Err(Error::InvalidReads(format!(
                    "reads must be FASTA or FASTQ, found leading byte {:?}",
                    other as char
                ))
                .into())
            }
        };
        Ok(Self { inner })
    }

    /// 解析失败统一报告为 [`Error::InvalidReads`]
    pub fn next_record(&mut self) -> Result<Option<ReadRecord>> {
        let rec = match &mut self.inner {
            Format::Fasta(r) => r
                .next_record()
                .map_err(invalid_reads)?
                .map(|r| ReadRecord { name: r.id, seq: r.seq }),
            Format::Fastq(r) => r
                .next_record()
                .map_err(invalid_reads)?
                .map(|r| ReadRecord { name: r.id, seq: r.seq }),
        };
        Ok(rec)
    }

    /// Read up to `n` records; an empty vector means end of input.
    pub fn read(&mut self, n: usize) -> Result<Vec<ReadRecord>> {
        let mut out = Vec::with_capacity(n.min(1 << 16));
        while out.len() < n {
            match self.next_record()? {
                Some(rec) => out.push(rec),
                None => break,
            }
        }
        Ok(out)
    }
}

fn invalid_reads(err: anyhow::Error) -> anyhow::Error {
    Error::InvalidReads(format!("{err:#}")).into()
}
