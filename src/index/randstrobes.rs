//! 种子生成：canonical open syncmer + randstrobe（两个 strobe）。
//!
//! 参考序列与 read 使用同一套算法；read 额外在反向互补序列上生成一遍，
//! 以 `is_reverse = true` 标记，坐标位于反向互补坐标系。

use std::collections::VecDeque;

use xxhash_rust::xxh64::xxh64;

use super::entry::{RefRandstrobe, RefRandstrobeWithHash};
use super::params::IndexParameters;
use crate::error::{Error, Result};
use crate::util::dna;

/// strobe2 选择时参与比较的 hash 位
const STROBE_SELECT_MASK: u64 = 0xffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syncmer {
    pub hash: u64,
    pub position: usize,
}

#[inline]
fn hash_kmer(canonical: u64) -> u64 {
    xxh64(&canonical.to_le_bytes(), 0)
}

#[inline]
fn bit_mask(len: usize) -> u64 {
    if len >= 32 { u64::MAX } else { (1u64 << (2 * len)) - 1 }
}

/// 滚动计算 canonical syncmer。遇到非 ACGT 字符时重新开始。
pub struct SyncmerIterator<'a> {
    seq: &'a [u8],
    k: usize,
    s: usize,
    t: usize,
    kmask: u64,
    smask: u64,
    kshift: u32,
    sshift: u32,
    xk: [u64; 2],
    xs: [u64; 2],
    qs: VecDeque<u64>,
    l: usize,
    i: usize,
}

impl<'a> SyncmerIterator<'a> {
    pub fn new(seq: &'a [u8], k: usize, s: usize, t: usize) -> Self {
        Self {
            seq,
            k,
            s,
            t,
            kmask: bit_mask(k),
            smask: bit_mask(s),
            kshift: (2 * (k - 1)) as u32,
            sshift: (2 * (s - 1)) as u32,
            xk: [0, 0],
            xs: [0, 0],
            qs: VecDeque::with_capacity(k - s + 2),
            l: 0,
            i: 0,
        }
    }

    fn reset(&mut self) {
        self.l = 0;
        self.xk = [0, 0];
        self.xs = [0, 0];
        self.qs.clear();
    }
}

impl Iterator for SyncmerIterator<'_> {
    type Item = Syncmer;

    fn next(&mut self) -> Option<Syncmer> {
        let window = self.k - self.s + 1;
        while self.i < self.seq.len() {
            let i = self.i;
            self.i += 1;
            let c = dna::to_nt4(self.seq[i]) as u64;
            if c >= 4 {
                self.reset();
                continue;
            }
            self.xk[0] = ((self.xk[0] << 2) | c) & self.kmask;
            self.xk[1] = (self.xk[1] >> 2) | ((3 - c) << self.kshift);
            self.xs[0] = ((self.xs[0] << 2) | c) & self.smask;
            self.xs[1] = (self.xs[1] >> 2) | ((3 - c) << self.sshift);
            self.l += 1;
            if self.l < self.s {
                continue;
            }
            self.qs.push_back(hash_kmer(self.xs[0].min(self.xs[1])));
            if self.qs.len() < window {
                continue;
            }
            let qs_min = self.qs.iter().copied().min().unwrap_or(u64::MAX);
            let is_syncmer = self.qs[self.t - 1] == qs_min || self.qs[window - self.t] == qs_min;
            self.qs.pop_front();
            if is_syncmer {
                return Some(Syncmer {
                    hash: hash_kmer(self.xk[0].min(self.xk[1])),
                    position: i + 1 - self.k,
                });
            }
        }
        None
    }
}

pub fn syncmers(seq: &[u8], params: &IndexParameters) -> Vec<Syncmer> {
    SyncmerIterator::new(seq, params.k, params.s, params.t_syncmer).collect()
}

/// 一个 randstrobe：两个 strobe 的起点与组合 hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Randstrobe {
    pub hash: u64,
    pub strobe1_pos: usize,
    pub strobe2_pos: usize,
}

/// 对每个 syncmer（strobe1）在窗口 `[i + w_min, i + w_max]` 内挑选 strobe2：
/// 取 `(h1 ^ h2) & mask` 中 1 最少者，相同时取最靠前者；窗口为空时 strobe2 = strobe1。
pub fn randstrobes(syncmers: &[Syncmer], params: &IndexParameters) -> Vec<Randstrobe> {
    let n = syncmers.len();
    let mut out = Vec::with_capacity(n);
    for (i, s1) in syncmers.iter().enumerate() {
        let w_start = i + params.w_min;
        let w_end = (i + params.w_max).min(n.saturating_sub(1));
        let mut best = i;
        let mut best_score = u32::MAX;
        for (j, s2) in syncmers.iter().enumerate().take(w_end + 1).skip(w_start) {
            if s2.position - s1.position > params.max_dist {
                break;
            }
            let score = ((s1.hash ^ s2.hash) & STROBE_SELECT_MASK).count_ones();
            if score < best_score {
                best = j;
                best_score = score;
            }
        }
        let s2 = syncmers[best];
        out.push(Randstrobe {
            hash: (s1.hash / 2).wrapping_add(s2.hash / 3),
            strobe1_pos: s1.position,
            strobe2_pos: s2.position,
        });
    }
    out
}

/// 参考序列上的所有 randstrobe 出现
pub fn randstrobes_reference(
    seq: &[u8],
    reference_index: usize,
    params: &IndexParameters,
) -> Result<Vec<RefRandstrobeWithHash>> {
    if seq.len() > u32::MAX as usize {
        return Err(Error::InvalidFasta(format!(
            "reference {reference_index} is longer than {} bp",
            u32::MAX
        )));
    }
    let syncmers = syncmers(seq, params);
    randstrobes(&syncmers, params)
        .into_iter()
        .map(|r| -> Result<RefRandstrobeWithHash> {
            let strobe = RefRandstrobe::new(
                reference_index,
                r.strobe1_pos as u32,
                r.strobe2_pos - r.strobe1_pos,
            )?;
            Ok(RefRandstrobeWithHash { hash: r.hash, strobe })
        })
        .collect()
}

/// read 上的种子：`[start, end)` 为 strobe1 起点到 strobe2 终点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRandstrobe {
    pub hash: u64,
    pub start: usize,
    pub end: usize,
    pub is_reverse: bool,
}

/// 先输出正向种子，再输出反向互补序列上的种子（坐标在反向互补坐标系）
pub fn randstrobes_query(seq: &[u8], params: &IndexParameters) -> Vec<QueryRandstrobe> {
    let mut out = Vec::new();
    if seq.len() < params.k {
        return out;
    }
    let rc = dna::revcomp(seq);
    for (strand, is_reverse) in [(seq, false), (rc.as_slice(), true)] {
        let syncmers = syncmers(strand, params);
        out.extend(randstrobes(&syncmers, params).into_iter().map(|r| QueryRandstrobe {
            hash: r.hash,
            start: r.strobe1_pos,
            end: r.strobe2_pos + params.k,
            is_reverse,
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: i32, s: i32, l: i32, u: i32, max_dist: i32) -> IndexParameters {
        IndexParameters::new(k, s, l, u, max_dist, 1000).unwrap()
    }

    fn pseudo_random_seq(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                b"ACGT"[(x >> 16) as usize % 4]
            })
            .collect()
    }

    #[test]
    fn every_kmer_is_a_syncmer_when_s_equals_k() {
        let p = params(10, 10, 1, 1, 255);
        let seq = pseudo_random_seq(50, 1);
        let pos: Vec<usize> = syncmers(&seq, &p).iter().map(|s| s.position).collect();
        assert_eq!(pos, (0..=40).collect::<Vec<_>>());
    }

    #[test]
    fn syncmers_restart_after_n() {
        let p = params(10, 10, 1, 1, 255);
        let mut seq = pseudo_random_seq(30, 2);
        seq[12] = b'N';
        let pos: Vec<usize> = syncmers(&seq, &p).iter().map(|s| s.position).collect();
        assert_eq!(pos, vec![0, 1, 2, 13, 14, 15, 16, 17, 18, 19, 20]);
    }

    #[test]
    fn syncmers_are_strand_symmetric() {
        let p = params(15, 9, 2, 6, 255);
        let seq = pseudo_random_seq(400, 3);
        let rc = dna::revcomp(&seq);
        let fwd = syncmers(&seq, &p);
        let mut rev: Vec<Syncmer> = syncmers(&rc, &p)
            .into_iter()
            .map(|s| Syncmer { hash: s.hash, position: seq.len() - p.k - s.position })
            .collect();
        rev.reverse();
        assert!(!fwd.is_empty());
        assert_eq!(fwd, rev);
    }

    #[test]
    fn strobe2_offset_respects_max_dist() {
        let p = params(12, 8, 2, 10, 20);
        let seq = pseudo_random_seq(1000, 4);
        let strobes = randstrobes_reference(&seq, 3, &p).unwrap();
        assert!(!strobes.is_empty());
        for r in &strobes {
            assert!(r.strobe.strobe2_offset() <= 20);
            assert_eq!(r.strobe.reference_index(), 3);
        }
    }

    #[test]
    fn fixed_window_pairs_syncmers_exactly_w_apart() {
        let p = params(10, 10, 10, 10, 255);
        let seq = pseudo_random_seq(28, 5);
        let strobes = randstrobes(&syncmers(&seq, &p), &p);
        assert_eq!(strobes.len(), 19);
        for r in &strobes {
            let expected = if r.strobe1_pos + 10 <= 18 {
                r.strobe1_pos + 10
            } else {
                r.strobe1_pos
            };
            assert_eq!(r.strobe2_pos, expected);
        }
    }

    #[test]
    fn query_seeds_match_reference_seeds_on_identical_sequence() {
        let p = params(12, 8, 2, 6, 255);
        let seq = pseudo_random_seq(300, 6);
        let reference: Vec<u64> = randstrobes_reference(&seq, 0, &p)
            .unwrap()
            .iter()
            .map(|r| r.hash)
            .collect();
        let query = randstrobes_query(&seq, &p);
        let forward: Vec<u64> = query.iter().filter(|q| !q.is_reverse).map(|q| q.hash).collect();
        assert_eq!(forward, reference);
        assert!(query.iter().any(|q| q.is_reverse));
        assert!(query.iter().all(|q| q.end <= seq.len() && q.start < q.end));
    }

    #[test]
    fn short_query_has_no_seeds() {
        let p = params(20, 16, 0, 7, 255);
        assert!(randstrobes_query(b"ACGTACGT", &p).is_empty());
    }
}
