//! # namfinder
//!
//! 基于 strobemer 种子的 NAM（Non-overlapping Approximate Match）查找器。
//!
//! 本 crate 提供：
//!
//! - **种子生成**：canonical syncmer + randstrobe（参考序列与 query 两种变体）
//! - **索引构建**：randstrobe hash → 参考出现位置，direct / indirect 两种条目
//! - **索引持久化**：带魔数与版本号的二进制索引文件
//! - **NAM 查找**：过滤重复种子、合并共线命中并打分
//! - **后处理与流水线**：排序截断、链方向校正、多线程按序输出
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use namfinder::align::find_nams;
//! use namfinder::index::{randstrobes_query, IndexParameters, StrobemerIndex};
//! use namfinder::io::refs::References;
//!
//! let references = References::from_fasta("ref.fa".as_ref())?;
//! let params = IndexParameters::new(20, 16, 0, 7, 255, 1000)?;
//! let mut index = StrobemerIndex::new(params);
//! index.populate(&references, 1000, 4)?;
//!
//! let read = b"ACGTTGCATGCCATGACTGACTTACGGATCAGT";
//! let seeds = randstrobes_query(read, &index.parameters);
//! let (nonrepetitive_fraction, nams) = find_nams(&seeds, &index);
//! println!("{} NAMs, non-repetitive fraction {:.2}", nams.len(), nonrepetitive_fraction);
//! # Ok::<(), namfinder::error::Error>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`io`]：FASTA / FASTQ 解析、gzip 输入、参考序列集合
//! - [`index`]：种子参数、种子生成、strobemer 索引及其持久化
//! - [`align`]：NAM 查找、后处理、多线程流水线
//! - [`util`]：DNA 编码 / 反向互补等工具函数
//! - [`error`]：库级错误类型

pub mod error;
pub mod io;
pub mod index;
pub mod util;
pub mod align;

pub use error::{Error, Result};
