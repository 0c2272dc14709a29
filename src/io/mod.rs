pub mod fasta;
pub mod fastq;
pub mod reads;
pub mod refs;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a file for buffered reading, transparently decompressing gzip input.
///
/// Compression is detected from the first two bytes, not the file extension.
pub fn open_maybe_gz(path: &Path) -> std::io::Result<Box<dyn BufRead + Send>> {
    let mut reader = BufReader::new(File::open(path)?);
    let is_gz = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}
