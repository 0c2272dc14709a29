use rustc_hash::FxHashMap;
use std::fmt;

use crate::index::randstrobes::QueryRandstrobe;
use crate::index::{RefRandstrobe, StrobemerIndex};

/// 每个种子的出现记录剪枝时使用的初始 diff 阈值
const INITIAL_MIN_DIFF: usize = 100_000;

/// 单个种子在参考上的一次命中，仅存在于处理当前 read 期间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub query_s: usize,
    pub query_e: usize,
    pub ref_s: usize,
    pub ref_e: usize,
    pub is_rc: bool,
}

/// 按参考编号分组的命中，两个方向的命中在同一组内
pub type HitsPerRef = FxHashMap<usize, Vec<Hit>>;

/// NAM（Non-overlapping Approximate Match）：同一参考上共线命中合并而成的区域，
/// 方向取自开启它的命中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nam {
    pub nam_id: usize,
    pub ref_id: usize,
    pub query_s: usize,
    pub query_e: usize,
    pub ref_s: usize,
    pub ref_e: usize,
    /// 最近一次并入的命中在 query 上的起点，用于判断能否继续延伸
    pub query_prev_hit_startpos: usize,
    pub ref_prev_hit_startpos: usize,
    pub n_hits: usize,
    pub score: usize,
    pub is_rc: bool,
}

impl Nam {
    fn open(nam_id: usize, ref_id: usize, h: &Hit) -> Self {
        Nam {
            nam_id,
            ref_id,
            query_s: h.query_s,
            query_e: h.query_e,
            ref_s: h.ref_s,
            ref_e: h.ref_e,
            query_prev_hit_startpos: h.query_s,
            ref_prev_hit_startpos: h.ref_s,
            n_hits: 1,
            score: 0,
            is_rc: h.is_rc,
        }
    }

    #[inline]
    pub fn query_span(&self) -> usize {
        self.query_e - self.query_s
    }

    #[inline]
    pub fn ref_span(&self) -> usize {
        self.ref_e - self.ref_s
    }

    /// 命中在 query 上严格前进、在参考上不后退，且起点落在已覆盖区间内时可并入
    #[inline]
    fn accepts(&self, h: &Hit) -> bool {
        self.query_prev_hit_startpos < h.query_s
            && h.query_s <= self.query_e
            && self.ref_prev_hit_startpos <= h.ref_s
            && h.ref_s <= self.ref_e
    }

    fn extend(&mut self, h: &Hit) {
        self.query_e = self.query_e.max(h.query_e);
        self.ref_e = self.ref_e.max(h.ref_e);
        self.query_prev_hit_startpos = h.query_s;
        self.ref_prev_hit_startpos = h.ref_s;
        self.n_hits += 1;
    }

    fn finalized(mut self) -> Self {
        self.score = nam_score(self.n_hits, self.query_span(), self.ref_span());
        self
    }
}

impl fmt::Display for Nam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Nam(query: {}..{}, ref: {}..{}, score={})",
            self.query_s, self.query_e, self.ref_s, self.ref_e, self.score
        )
    }
}

/// `n_hits * (2 * min_span - max_span)`，非正时为 1
#[inline]
pub fn nam_score(n_hits: usize, query_span: usize, ref_span: usize) -> usize {
    let min_span = query_span.min(ref_span);
    let max_span = query_span.max(ref_span);
    if 2 * min_span > max_span {
        n_hits * (2 * min_span - max_span)
    } else {
        1
    }
}

/// 将一个种子的出现记录转为命中。
///
/// 贪心剪枝：按存储顺序遍历，只接受 span 差不超过当前最小差的出现，
/// 接受后更新最小差。结果依赖存储顺序，不保证取到全局最小。
fn add_to_hits_per_ref(
    hits_per_ref: &mut HitsPerRef,
    query_s: usize,
    query_e: usize,
    is_rc: bool,
    k: usize,
    occurrences: impl Iterator<Item = RefRandstrobe>,
) -> usize {
    let mut min_diff = INITIAL_MIN_DIFF;
    let mut added = 0;
    for r in occurrences {
        let ref_s = r.position() as usize;
        let ref_e = ref_s + r.strobe2_offset() + k;
        let diff = (query_e - query_s).abs_diff(ref_e - ref_s);
        if diff <= min_diff {
            hits_per_ref.entry(r.reference_index()).or_default().push(Hit {
                query_s,
                query_e,
                ref_s,
                ref_e,
                is_rc,
            });
            min_diff = diff;
            added += 1;
        }
    }
    added
}

/// 线性扫描合并命中为 NAM。
///
/// 各参考分组按编号升序独立处理；`sort` 为 true 时先按 (query_s, ref_s) 排序。
/// query 坐标每前进超过 k，就把已被当前命中越过的 open NAM 计分输出。
pub fn merge_hits_into_nams(hits_per_ref: HitsPerRef, k: usize, sort: bool) -> Vec<Nam> {
    let mut groups: Vec<(usize, Vec<Hit>)> = hits_per_ref.into_iter().collect();
    groups.sort_unstable_by_key(|(ref_id, _)| *ref_id);

    let mut nams: Vec<Nam> = Vec::new();
    let mut nam_id_cnt = 0usize;
    for (ref_id, mut hits) in groups {
        if sort {
            hits.sort_by_key(|h| (h.query_s, h.ref_s));
        }

        let mut open_nams: Vec<Nam> = Vec::new();
        let mut prev_q_start = 0usize;
        for h in &hits {
            match open_nams.iter_mut().find(|o| o.accepts(h)) {
                Some(o) => o.extend(h),
                None => {
                    open_nams.push(Nam::open(nam_id_cnt, ref_id, h));
                    nam_id_cnt += 1;
                }
            }

            if h.query_s > prev_q_start + k {
                let (passed, still_open): (Vec<Nam>, Vec<Nam>) =
                    open_nams.into_iter().partition(|n| n.query_e < h.query_s);
                nams.extend(passed.into_iter().map(Nam::finalized));
                open_nams = still_open;
                prev_q_start = h.query_s;
            }
        }
        nams.extend(open_nams.into_iter().map(Nam::finalized));
    }
    log::trace!("merged into {} NAMs", nams.len());
    nams
}

/// 查找一个 read 的 NAM，跳过出现次数超过 filter_cutoff 的种子。
///
/// 返回 (非重复命中比例, NAM 列表)。没有任何种子命中时比例为 1.0。
pub fn find_nams(
    query_randstrobes: &[QueryRandstrobe],
    index: &StrobemerIndex,
) -> (f32, Vec<Nam>) {
    let mut hits_per_ref: HitsPerRef = FxHashMap::default();
    let k = index.k();
    let mut nr_good_hits = 0usize;
    let mut total_hits = 0usize;
    let mut tot_hits = 0usize;
    for q in query_randstrobes {
        let Some(position) = index.find(q.hash) else {
            continue;
        };
        total_hits += 1;
        if position.count() > index.filter_cutoff {
            continue;
        }
        nr_good_hits += 1;
        tot_hits += add_to_hits_per_ref(
            &mut hits_per_ref,
            q.start,
            q.end,
            q.is_reverse,
            k,
            position.occurrences(),
        );
    }
    log::trace!(
        "{} seeds found, {} non-repetitive, {} hits kept",
        total_hits,
        nr_good_hits,
        tot_hits
    );

    let nonrepetitive_fraction = if total_hits > 0 {
        nr_good_hits as f32 / total_hits as f32
    } else {
        1.0
    };
    let nams = merge_hits_into_nams(hits_per_ref, k, false);
    (nonrepetitive_fraction, nams)
}
