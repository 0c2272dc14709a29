use anyhow::{anyhow, Result};
use std::io::BufRead;

use super::fasta::split_header;

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    line_no: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            line_no: 0,
        }
    }

    fn read_line(&mut self) -> Result<usize> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done {
            return Ok(None);
        }

        // header line starting with '@'; blank lines between records are tolerated
        loop {
            if self.read_line()? == 0 {
                self.done = true;
                return Ok(None);
            }
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        let header = self
            .buf
            .strip_prefix('@')
            .ok_or_else(|| anyhow!("line {}: FASTQ header not starting with '@'", self.line_no))?
            .trim_end()
            .to_string();
        let (id, desc) = split_header(&header);

        if self.read_line()? == 0 {
            return Err(anyhow!("line {}: unexpected EOF after header", self.line_no));
        }
        let seq = self.buf.trim_end().as_bytes().to_ascii_uppercase();

        if self.read_line()? == 0 || !self.buf.starts_with('+') {
            return Err(anyhow!("line {}: missing '+' line", self.line_no));
        }

        if self.read_line()? == 0 {
            return Err(anyhow!("line {}: missing quality line", self.line_no));
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();

        // line-wrapped FASTQ is not supported
        if qual.len() != seq.len() {
            return Err(anyhow!("record '{}': seq/qual length mismatch", id));
        }

        Ok(Some(FastqRecord { id, desc, seq, qual }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_two_records() {
        let data = b"@r1 desc\nacgt\n+\nIIII\n\n@r2\nGG\n+r2\n##\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        let a = r.next_record().unwrap().unwrap();
        assert_eq!(a.id, "r1");
        assert_eq!(a.desc.as_deref(), Some("desc"));
        assert_eq!(a.seq, b"ACGT");
        let b = r.next_record().unwrap().unwrap();
        assert_eq!(b.id, "r2");
        assert_eq!(b.qual, b"##");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let data = b"@r1\nACGT\n+\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(r.next_record().is_err());
    }

    #[test]
    fn missing_plus_line_is_an_error() {
        let data = b"@r1\nACGT\nIIII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        let err = r.next_record().unwrap_err();
        assert!(err.to_string().contains("'+'"));
    }
}
