use std::path::Path;

use crate::error::{Error, Result};
use crate::util::dna;

use super::fasta::FastaReader;

/// 参考序列集合：名称、归一化后的序列和长度，索引构建与比对阶段只读共享。
#[derive(Debug, Clone, Default)]
pub struct References {
    pub names: Vec<String>,
    pub sequences: Vec<Vec<u8>>,
    pub lengths: Vec<usize>,
}

impl References {
    /// 由 (名称, 序列) 列表构建；序列会被大写并把非 ACGT 字符替换为 N
    pub fn from_sequences<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let mut refs = References::default();
        for (name, seq) in records {
            let seq = dna::normalize_seq(&seq);
            refs.names.push(name.into());
            refs.lengths.push(seq.len());
            refs.sequences.push(seq);
        }
        refs
    }

    /// 读取（可 gzip 压缩的）FASTA 参考文件
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let reader = super::open_maybe_gz(path).map_err(|e| Error::io(path, e))?;
        let mut fasta = FastaReader::new(reader);
        let mut records = Vec::new();
        while let Some(rec) = fasta
            .next_record()
            .map_err(|e| Error::InvalidFasta(format!("{}: {e:#}", path.display())))?
        {
            records.push((rec.id, rec.seq));
        }
        let refs = Self::from_sequences(records);
        if refs.is_empty() {
            return Err(Error::InvalidFasta(format!("'{}' contains no sequences", path.display())));
        }
        if refs.total_length() == 0 {
            return Err(Error::InvalidFasta(format!(
                "'{}' contains only empty sequences",
                path.display()
            )));
        }
        Ok(refs)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.lengths.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fasta_normalizes_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.fa");
        std::fs::write(&path, b">chr1 desc\nacgtRY\n>chr2\nGGG\n").unwrap();
        let refs = References::from_fasta(&path).unwrap();
        assert_eq!(refs.names, vec!["chr1", "chr2"]);
        assert_eq!(refs.sequences[0], b"ACGTNN");
        assert_eq!(refs.lengths, vec![6, 3]);
        assert_eq!(refs.total_length(), 9);
    }

    #[test]
    fn empty_reference_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fa");
        std::fs::write(&path, b">chr1\n\n").unwrap();
        assert!(matches!(References::from_fasta(&path), Err(Error::InvalidFasta(_))));

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(References::from_fasta(&path), Err(Error::InvalidFasta(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = References::from_fasta(Path::new("/nonexistent/ref.fa")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
