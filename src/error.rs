//! 库级错误类型。
//!
//! 分为三类：参数错误（`BadParameter`）、输入错误（FASTA / reads 无效）、
//! 持久化错误（索引文件损坏、版本或参考序列不匹配）。全部为致命错误，
//! 由 CLI 顶层通过 `anyhow` 报告并退出。

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid seeding parameter: {0}")]
    BadParameter(String),
    #[error("invalid reference FASTA: {0}")]
    InvalidFasta(String),
    #[error("invalid reads file: {0}")]
    InvalidReads(String),
    #[error("corrupt index file: {0}")]
    CorruptIndex(String),
    #[error("index file format version {found} is not supported (expected {expected})")]
    IndexVersionMismatch { found: u32, expected: u32 },
    #[error("index does not match the reference: {0}")]
    IndexReferenceMismatch(String),
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("index serialization failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("cannot start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
