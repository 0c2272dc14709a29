use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use super::entry::{Entry, MapEntry, RefRandstrobe, RefRandstrobeWithHash, MAX_REFERENCES};
use super::params::{IndexParameters, ParameterBlock};
use super::randstrobes::randstrobes_reference;
use super::stats::IndexCreationStatistics;
use crate::error::{Error, Result};
use crate::io::refs::References;

const MAGIC: [u8; 4] = *b"STI\0";
pub const INDEX_FORMAT_VERSION: u32 = 2;

/// 索引元信息（可选，仅用于追溯）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct IndexBody {
    meta: IndexMeta,
    ref_lengths: Vec<u64>,
    flat_vector: Vec<RefRandstrobe>,
    /// 按 hash 升序，保证写出结果确定
    entries: Vec<(u64, MapEntry)>,
}

/// Strobemer 索引：randstrobe hash → 参考序列上的出现位置。
///
/// - 只出现一次的 hash 以 direct 条目内联存储出现记录
/// - 多次出现的 hash 以 indirect 条目指向 `flat_vector` 中按 hash 分组的连续区间
///
/// 构建（`populate`）或读取（`read`）之后不再修改，可在线程间只读共享。
#[derive(Debug)]
pub struct StrobemerIndex {
    pub parameters: IndexParameters,
    pub filter_cutoff: usize,
    pub stats: IndexCreationStatistics,
    meta: IndexMeta,
    ref_lengths: Vec<usize>,
    flat_vector: Vec<RefRandstrobe>,
    randstrobe_map: FxHashMap<u64, MapEntry>,
}

impl StrobemerIndex {
    pub fn new(parameters: IndexParameters) -> Self {
        Self {
            parameters,
            filter_cutoff: parameters.filter_cutoff,
            stats: IndexCreationStatistics::default(),
            meta: IndexMeta::default(),
            ref_lengths: Vec::new(),
            flat_vector: Vec::new(),
            randstrobe_map: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.parameters.k
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    /// 不同 hash 的数量
    pub fn len(&self) -> usize {
        self.randstrobe_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.randstrobe_map.is_empty()
    }

    /// 生成全部参考 randstrobe，按 hash 分组后建立 hash 表。
    ///
    /// 种子生成按参考序列并行，排序也在同一线程池中并行完成。
    pub fn populate(
        &mut self,
        references: &References,
        filter_cutoff: usize,
        n_threads: usize,
    ) -> Result<()> {
        if references.is_empty() || references.total_length() == 0 {
            return Err(Error::InvalidFasta("no reference sequences to index".to_string()));
        }
        if references.len() > MAX_REFERENCES {
            return Err(Error::InvalidFasta(format!(
                "{} reference sequences exceed the supported maximum of {MAX_REFERENCES}",
                references.len()
            )));
        }
        self.filter_cutoff = filter_cutoff;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads.max(1))
            .build()?;

        let timer = Instant::now();
        let params = self.parameters;
        let per_ref: Vec<Vec<RefRandstrobeWithHash>> = pool.install(|| {
            references
                .sequences
                .par_iter()
                .enumerate()
                .map(|(ref_index, seq)| randstrobes_reference(seq, ref_index, &params))
                .collect::<Result<Vec<_>>>()
        })?;
        let mut randstrobes: Vec<RefRandstrobeWithHash> = per_ref.into_iter().flatten().collect();
        let elapsed_generating_seeds = timer.elapsed();
        log::debug!("Generated {} reference randstrobes", randstrobes.len());

        let timer = Instant::now();
        pool.install(|| randstrobes.par_sort_unstable_by_key(RefRandstrobeWithHash::sort_key));
        let elapsed_sorting_seeds = timer.elapsed();

        let timer = Instant::now();
        let histogram = self.build_hash_index(&randstrobes)?;
        drop(randstrobes);
        self.ref_lengths = references.lengths.clone();

        let flat_vector_size = self.flat_vector.len();
        self.stats =
            IndexCreationStatistics::from_histogram(histogram, filter_cutoff, flat_vector_size);
        self.stats.elapsed_generating_seeds = elapsed_generating_seeds;
        self.stats.elapsed_sorting_seeds = elapsed_sorting_seeds;
        self.stats.elapsed_hash_index = timer.elapsed();
        Ok(())
    }

    /// `sorted` 必须已按 `sort_key` 排序；返回丰度直方图
    fn build_hash_index(
        &mut self,
        sorted: &[RefRandstrobeWithHash],
    ) -> Result<BTreeMap<usize, usize>> {
        let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
        let mut flat_vector: Vec<RefRandstrobe> = Vec::new();
        let mut map: FxHashMap<u64, MapEntry> = FxHashMap::default();

        let n = sorted.len();
        let mut start = 0usize;
        while start < n {
            let hash = sorted[start].hash;
            let mut end = start + 1;
            while end < n && sorted[end].hash == hash {
                end += 1;
            }
            let count = end - start;
            let inline = if count == 1 { MapEntry::direct(sorted[start].strobe) } else { None };
            let entry = match inline {
                Some(entry) => entry,
                None => {
                    let offset = flat_vector.len();
                    flat_vector.extend(sorted[start..end].iter().map(|r| r.strobe));
                    MapEntry::indirect(offset, count)?
                }
            };
            map.insert(hash, entry);
            *histogram.entry(count).or_insert(0) += 1;
            start = end;
        }

        flat_vector.shrink_to_fit();
        self.flat_vector = flat_vector;
        self.randstrobe_map = map;
        Ok(histogram)
    }

    /// 查找 hash；不存在时返回 None
    #[inline]
    pub fn find(&self, hash: u64) -> Option<Position<'_>> {
        self.randstrobe_map
            .get(&hash)
            .map(|&entry| Position { index: self, hash, entry })
    }

    /// 丰度直方图与汇总统计写入文件
    pub fn print_diagnostics(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut out = BufWriter::new(file);
        self.stats
            .write_diagnostics(&mut out, self.k())
            .and_then(|()| out.flush())
            .map_err(|e| Error::io(path, e))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush().map_err(|e| Error::io(path, e))
    }

    /// 格式：magic + 版本号，六个 i32 参数，其后为 bincode 编码的正文
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let header = Header {
            magic: MAGIC,
            version: INDEX_FORMAT_VERSION,
        };
        bincode::serialize_into(&mut *out, &header)?;
        let block = ParameterBlock {
            filter_cutoff: self.filter_cutoff as i32,
            ..self.parameters.to_block()
        };
        bincode::serialize_into(&mut *out, &block)?;

        let mut entries: Vec<(u64, MapEntry)> =
            self.randstrobe_map.iter().map(|(&h, &e)| (h, e)).collect();
        entries.sort_unstable_by_key(|&(h, _)| h);
        let body = IndexBody {
            meta: self.meta.clone(),
            ref_lengths: self.ref_lengths.iter().map(|&l| l as u64).collect(),
            flat_vector: self.flat_vector.clone(),
            entries,
        };
        bincode::serialize_into(&mut *out, &body)?;
        Ok(())
    }

    pub fn read(path: &Path, references: &References) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::read_from(&mut BufReader::new(file), references)
    }

    pub fn read_from<R: Read>(input: &mut R, references: &References) -> Result<Self> {
        let header: Header = bincode::deserialize_from(&mut *input).map_err(corrupt)?;
        if header.magic != MAGIC {
            return Err(Error::CorruptIndex("not a strobemer index file (bad magic)".to_string()));
        }
        if header.version != INDEX_FORMAT_VERSION {
            return Err(Error::IndexVersionMismatch {
                found: header.version,
                expected: INDEX_FORMAT_VERSION,
            });
        }
        let block: ParameterBlock = bincode::deserialize_from(&mut *input).map_err(corrupt)?;
        let parameters = IndexParameters::from_block(&block)
            .map_err(|e| Error::CorruptIndex(format!("stored parameters are invalid: {e}")))?;
        let body: IndexBody = bincode::deserialize_from(&mut *input).map_err(corrupt)?;

        let ref_lengths: Vec<usize> = body.ref_lengths.iter().map(|&l| l as usize).collect();
        if ref_lengths != references.lengths {
            return Err(Error::IndexReferenceMismatch(format!(
                "index was built for {} sequences ({} bp), reference has {} sequences ({} bp)",
                ref_lengths.len(),
                ref_lengths.iter().sum::<usize>(),
                references.len(),
                references.total_length()
            )));
        }
        validate_body(&body, ref_lengths.len())?;

        let mut randstrobe_map: FxHashMap<u64, MapEntry> = FxHashMap::default();
        randstrobe_map.reserve(body.entries.len());
        randstrobe_map.extend(body.entries);

        Ok(Self {
            parameters,
            filter_cutoff: block.filter_cutoff as usize,
            stats: IndexCreationStatistics {
                filter_cutoff: block.filter_cutoff as usize,
                flat_vector_size: body.flat_vector.len(),
                tot_distinct_strobemer_count: randstrobe_map.len(),
                ..Default::default()
            },
            meta: body.meta,
            ref_lengths,
            flat_vector: body.flat_vector,
            randstrobe_map,
        })
    }
}

fn corrupt(e: bincode::Error) -> Error {
    Error::CorruptIndex(e.to_string())
}

fn validate_body(body: &IndexBody, n_refs: usize) -> Result<()> {
    let flat_len = body.flat_vector.len();
    for (hash, entry) in &body.entries {
        match entry.get() {
            Entry::Direct(r) if r.reference_index() >= n_refs => {
                return Err(Error::CorruptIndex(format!(
                    "entry {hash:#x} points to unknown reference"
                )));
            }
            Entry::Indirect { offset, count } if offset as usize + count as usize > flat_len => {
                return Err(Error::CorruptIndex(format!(
                    "entry {hash:#x} points past the occurrence table"
                )));
            }
            _ => {}
        }
    }
    if body.flat_vector.iter().any(|r| r.reference_index() >= n_refs) {
        return Err(Error::CorruptIndex("occurrence table points to unknown reference".to_string()));
    }
    Ok(())
}

/// `find` 返回的句柄：借用索引，可访问该 hash 的出现次数及全部出现记录
#[derive(Debug, Clone, Copy)]
pub struct Position<'a> {
    index: &'a StrobemerIndex,
    hash: u64,
    entry: MapEntry,
}

impl<'a> Position<'a> {
    #[inline]
    pub fn count(&self) -> usize {
        self.entry.count()
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.entry.is_direct()
    }

    /// 在 flat 表中的起始下标；direct 条目返回 None
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        self.entry.offset()
    }

    /// 第一个（direct 时唯一的）出现记录
    #[inline]
    pub fn first(&self) -> RefRandstrobe {
        match self.entry.get() {
            Entry::Direct(r) => r,
            Entry::Indirect { offset, .. } => self.index.flat_vector[offset as usize],
        }
    }

    #[inline]
    pub fn position(&self) -> u32 {
        self.first().position()
    }

    #[inline]
    pub fn strobe2_offset(&self) -> usize {
        self.first().strobe2_offset()
    }

    #[inline]
    pub fn reference_index(&self) -> usize {
        self.first().reference_index()
    }

    /// 按存储顺序遍历全部 `count()` 个出现记录
    pub fn occurrences(&self) -> Occurrences<'a> {
        match self.entry.get() {
            Entry::Direct(r) => Occurrences::Direct(Some(r)),
            Entry::Indirect { offset, count } => {
                let start = offset as usize;
                Occurrences::Indirect(self.index.flat_vector[start..start + count as usize].iter())
            }
        }
    }
}

pub enum Occurrences<'a> {
    Direct(Option<RefRandstrobe>),
    Indirect(std::slice::Iter<'a, RefRandstrobe>),
}

impl Iterator for Occurrences<'_> {
    type Item = RefRandstrobe;

    #[inline]
    fn next(&mut self) -> Option<RefRandstrobe> {
        match self {
            Occurrences::Direct(r) => r.take(),
            Occurrences::Indirect(it) => it.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self {
            Occurrences::Direct(r) => usize::from(r.is_some()),
            Occurrences::Indirect(it) => it.len(),
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Occurrences<'_> {}
