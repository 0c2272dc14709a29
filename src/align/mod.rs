pub mod nam;
pub mod pipeline;
pub mod postprocess;

use std::ops::AddAssign;
use std::time::{Duration, Instant};

use crate::index::{randstrobes_query, StrobemerIndex};
use crate::io::reads::ReadRecord;
use crate::io::refs::References;
use crate::util::dna;

pub use nam::{find_nams, merge_hits_into_nams, Hit, Nam};
pub use pipeline::{map_reads, InputBuffer, OutputBuffer};

/// 映射阶段的选项
#[derive(Debug, Clone, Copy)]
pub struct MapOpt {
    /// 每个 read 最多输出的 NAM 数（L）
    pub max_nams: usize,
    /// 按分数而不是坐标输出
    pub sort_on_scores: bool,
    /// 丢弃两端序列在两个方向上都对不上的 NAM
    pub drop_unresolved: bool,
    pub n_threads: usize,
    /// 每个 chunk 的 read 数
    pub chunk_size: usize,
}

impl Default for MapOpt {
    fn default() -> Self {
        Self {
            max_nams: 1000,
            sort_on_scores: false,
            drop_unresolved: false,
            n_threads: 3,
            chunk_size: 10_000,
        }
    }
}

/// 单个 worker 的累计统计，结束时汇总
#[derive(Debug, Clone, Default)]
pub struct MappingStatistics {
    pub n_reads: usize,
    pub tot_seeds: usize,
    pub tot_nams: usize,
    pub tot_unresolved: usize,
    /// 至少一个种子因出现次数过多被跳过的 read 数
    pub n_repetitive_reads: usize,
    pub tot_construct_strobemers: Duration,
    pub tot_find_nams: Duration,
    pub tot_sort_nams: Duration,
    pub tot_postprocess: Duration,
}

impl AddAssign for MappingStatistics {
    fn add_assign(&mut self, other: Self) {
        self.n_reads += other.n_reads;
        self.tot_seeds += other.tot_seeds;
        self.tot_nams += other.tot_nams;
        self.tot_unresolved += other.tot_unresolved;
        self.n_repetitive_reads += other.n_repetitive_reads;
        self.tot_construct_strobemers += other.tot_construct_strobemers;
        self.tot_find_nams += other.tot_find_nams;
        self.tot_sort_nams += other.tot_sort_nams;
        self.tot_postprocess += other.tot_postprocess;
    }
}

impl MappingStatistics {
    pub fn log_summary(&self) {
        log::info!("Total mapping sites tried: {}", self.tot_nams);
        log::info!("Reads processed: {}", self.n_reads);
        log::info!(
            "Total time generating seeds: {:.2} s",
            self.tot_construct_strobemers.as_secs_f64()
        );
        log::info!("Total time finding NAMs: {:.2} s", self.tot_find_nams.as_secs_f64());
        log::info!("Total time sorting NAMs: {:.2} s", self.tot_sort_nams.as_secs_f64());
        log::info!("Total time resolving strands: {:.2} s", self.tot_postprocess.as_secs_f64());
        log::debug!("Total seeds: {}", self.tot_seeds);
        log::debug!("Reads with repetitive seeds skipped: {}", self.n_repetitive_reads);
        if self.tot_unresolved > 0 {
            log::debug!("NAMs with unresolved strand: {}", self.tot_unresolved);
        }
    }
}

/// 单个 read：生成种子 → 查找 NAM → 排序截断 → 方向校正 → 追加输出行
pub fn map_single_end_read(
    record: &ReadRecord,
    out: &mut String,
    statistics: &mut MappingStatistics,
    opt: &MapOpt,
    references: &References,
    index: &StrobemerIndex,
) {
    statistics.n_reads += 1;

    let timer = Instant::now();
    let query_randstrobes = randstrobes_query(&record.seq, &index.parameters);
    statistics.tot_construct_strobemers += timer.elapsed();
    statistics.tot_seeds += query_randstrobes.len();

    let timer = Instant::now();
    let (nonrepetitive_fraction, mut nams) = find_nams(&query_randstrobes, index);
    statistics.tot_find_nams += timer.elapsed();
    if nonrepetitive_fraction < 1.0 {
        statistics.n_repetitive_reads += 1;
    }
    statistics.tot_nams += nams.len();

    let timer = Instant::now();
    postprocess::sort_and_truncate(&mut nams, opt.max_nams, opt.sort_on_scores);
    statistics.tot_sort_nams += timer.elapsed();

    let timer = Instant::now();
    let read_rc = dna::revcomp(&record.seq);
    statistics.tot_unresolved += postprocess::resolve_strands(
        &mut nams,
        &record.seq,
        &read_rc,
        references,
        index.k(),
        opt.drop_unresolved,
    );
    statistics.tot_postprocess += timer.elapsed();

    postprocess::write_nams(out, &nams, &record.name, references);
}
