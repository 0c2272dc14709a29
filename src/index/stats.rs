use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

/// 中等丰度上限：出现 2..=100 次计为 mid，超过计为 high
pub const MID_ABUNDANCE_MAX: usize = 100;

/// 索引构建统计，仅用于诊断输出
#[derive(Debug, Clone, Default)]
pub struct IndexCreationStatistics {
    pub flat_vector_size: usize,
    pub tot_strobemer_count: usize,
    pub tot_occur_once: usize,
    pub frac_unique: f64,
    pub tot_high_ab: usize,
    pub tot_mid_ab: usize,
    pub tot_distinct_strobemer_count: usize,
    /// 出现次数超过 filter_cutoff 的不同 hash 数
    pub index_cutoff: usize,
    pub filter_cutoff: usize,
    /// 出现次数 → 不同 hash 数
    pub histogram: BTreeMap<usize, usize>,

    pub elapsed_generating_seeds: Duration,
    pub elapsed_sorting_seeds: Duration,
    pub elapsed_hash_index: Duration,
}

impl IndexCreationStatistics {
    /// 由丰度直方图推导各汇总项
    pub fn from_histogram(
        histogram: BTreeMap<usize, usize>,
        filter_cutoff: usize,
        flat_vector_size: usize,
    ) -> Self {
        let mut stats = IndexCreationStatistics {
            filter_cutoff,
            flat_vector_size,
            ..Default::default()
        };
        for (&count, &distinct) in &histogram {
            stats.tot_strobemer_count += count * distinct;
            stats.tot_distinct_strobemer_count += distinct;
            match count {
                1 => stats.tot_occur_once += distinct,
                c if c <= MID_ABUNDANCE_MAX => stats.tot_mid_ab += distinct,
                _ => stats.tot_high_ab += distinct,
            }
            if count > filter_cutoff {
                stats.index_cutoff += distinct;
            }
        }
        if stats.tot_distinct_strobemer_count > 0 {
            stats.frac_unique =
                stats.tot_occur_once as f64 / stats.tot_distinct_strobemer_count as f64;
        }
        stats.histogram = histogram;
        stats
    }

    pub fn log_summary(&self) {
        log::info!("  Time generating seeds: {:.2} s", self.elapsed_generating_seeds.as_secs_f64());
        log::info!("  Time sorting seeds: {:.2} s", self.elapsed_sorting_seeds.as_secs_f64());
        log::info!(
            "  Time generating hash table index: {:.2} s",
            self.elapsed_hash_index.as_secs_f64()
        );
        log::debug!("Total strobemers count: {}", self.tot_strobemer_count);
        log::debug!("Total strobemers occur once: {}", self.tot_occur_once);
        log::debug!("Fraction unique: {:.2}", self.frac_unique);
        log::debug!(
            "Total strobemers highly abundant > {}: {}",
            MID_ABUNDANCE_MAX,
            self.tot_high_ab
        );
        log::debug!(
            "Total strobemers mid abundance (between 2-{}): {}",
            MID_ABUNDANCE_MAX,
            self.tot_mid_ab
        );
        log::debug!("Total distinct strobemers stored: {}", self.tot_distinct_strobemer_count);
        log::debug!("Occurrences in flat table: {}", self.flat_vector_size);
        log::debug!("Hashes above filter cutoff {}: {}", self.filter_cutoff, self.index_cutoff);
    }

    /// 丰度直方图（TSV）+ 汇总项
    pub fn write_diagnostics<W: Write>(&self, out: &mut W, k: usize) -> std::io::Result<()> {
        writeln!(out, "# k\t{k}")?;
        writeln!(out, "# total_strobemers\t{}", self.tot_strobemer_count)?;
        writeln!(out, "# distinct_strobemers\t{}", self.tot_distinct_strobemer_count)?;
        writeln!(out, "# occur_once\t{}", self.tot_occur_once)?;
        writeln!(out, "# frac_unique\t{:.4}", self.frac_unique)?;
        writeln!(out, "# mid_abundance\t{}", self.tot_mid_ab)?;
        writeln!(out, "# high_abundance\t{}", self.tot_high_ab)?;
        writeln!(out, "# filter_cutoff\t{}", self.filter_cutoff)?;
        writeln!(out, "# above_filter_cutoff\t{}", self.index_cutoff)?;
        writeln!(out, "count\tdistinct_hashes\toccurrences")?;
        for (&count, &distinct) in &self.histogram {
            writeln!(out, "{count}\t{distinct}\t{}", count * distinct)?;
        }
        Ok(())
    }
}
