use anyhow::Result;
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            peek_header: None,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // Find header line; anything before the first '>' is ignored
        let header = match self.peek_header.take() {
            Some(h) => h,
            None => loop {
                self.buf.clear();
                if self.reader.read_line(&mut self.buf)? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(rest) = self.buf.strip_prefix('>') {
                    break rest.trim().to_string();
                }
            },
        };

        let (id, desc) = split_header(&header);

        // Sequence lines run until the next header or EOF
        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                self.done = true;
                break;
            }
            if let Some(rest) = self.buf.strip_prefix('>') {
                self.peek_header = Some(rest.trim().to_string());
                break;
            }
            seq.extend(
                self.buf
                    .bytes()
                    .filter(|b| !b.is_ascii_whitespace())
                    .map(|b| b.to_ascii_uppercase()),
            );
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}

/// Split a FASTA/FASTQ header into its id and optional description.
pub(crate) fn split_header(header: &str) -> (String, Option<String>) {
    let mut parts = header.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    (id, desc)
}
