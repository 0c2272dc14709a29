use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// strobe2 相对 strobe1 的偏移用 8 bit 打包，因此最大为 255
pub const MAX_STROBE2_OFFSET: i32 = 255;

/// 影响索引构建的种子参数，构建时即校验，之后不可变。
///
/// - `k`：syncmer / strobe 长度，要求 8 < k ≤ 32
/// - `s`：syncmer 判定用的 s-mer 长度，要求 s ≤ k 且 (k - s) 为偶数
/// - `l` / `u`：strobe2 采样窗口（以 syncmer 计）的下界 / 上界
/// - `max_dist`：strobe1 与 strobe2 起点的最大距离，≤ 255
/// - `filter_cutoff`：出现次数超过该值的种子视为重复，不参与 NAM 查找
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParameters {
    pub k: usize,
    pub s: usize,
    pub l: i32,
    pub u: i32,
    pub max_dist: usize,
    pub filter_cutoff: usize,
    /// 派生字段：(k - s) / 2 + 1
    pub t_syncmer: usize,
    /// 派生字段：max(1, l)
    pub w_min: usize,
    /// 派生字段：max(1, u)
    pub w_max: usize,
}

/// 持久化时写入的参数块：六个定宽有符号整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBlock {
    pub k: i32,
    pub s: i32,
    pub l: i32,
    pub u: i32,
    pub max_dist: i32,
    pub filter_cutoff: i32,
}

impl IndexParameters {
    pub fn new(k: i32, s: i32, l: i32, u: i32, max_dist: i32, filter_cutoff: i32) -> Result<Self> {
        if k <= 8 || k > 32 {
            return Err(Error::BadParameter(format!("k={k} not in [9,32]")));
        }
        if s <= 0 {
            return Err(Error::BadParameter(format!("s={s} must be positive")));
        }
        if s > k {
            return Err(Error::BadParameter(format!("s={s} is larger than k={k}")));
        }
        if (k - s) % 2 != 0 {
            return Err(Error::BadParameter(format!(
                "(k - s) = {} must be an even number to create canonical syncmers; set s to e.g. k-2, k-4, k-6, ...",
                k - s
            )));
        }
        if max_dist < 0 || max_dist > MAX_STROBE2_OFFSET {
            return Err(Error::BadParameter(format!(
                "maximum seed length offset (max_dist={max_dist}) is not in [0,{MAX_STROBE2_OFFSET}]"
            )));
        }
        if filter_cutoff < 0 {
            return Err(Error::BadParameter(format!("filter cutoff {filter_cutoff} is negative")));
        }
        Ok(Self {
            k: k as usize,
            s: s as usize,
            l,
            u,
            max_dist: max_dist as usize,
            filter_cutoff: filter_cutoff as usize,
            t_syncmer: ((k - s) / 2 + 1) as usize,
            w_min: l.max(1) as usize,
            w_max: u.max(1) as usize,
        })
    }

    pub fn to_block(&self) -> ParameterBlock {
        ParameterBlock {
            k: self.k as i32,
            s: self.s as i32,
            l: self.l,
            u: self.u,
            max_dist: self.max_dist as i32,
            filter_cutoff: self.filter_cutoff as i32,
        }
    }

    pub fn from_block(b: &ParameterBlock) -> Result<Self> {
        Self::new(b.k, b.s, b.l, b.u, b.max_dist, b.filter_cutoff)
    }

    /// 索引文件扩展名
    pub fn filename_extension(&self) -> &'static str {
        ".sti"
    }
}

impl fmt::Display for IndexParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IndexParameters(k={}, s={}, l={}, u={}, max_dist={}, t_syncmer={}, w_min={}, w_max={}, filter_cutoff={})",
            self.k,
            self.s,
            self.l,
            self.u,
            self.max_dist,
            self.t_syncmer,
            self.w_min,
            self.w_max,
            self.filter_cutoff
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad(k: i32, s: i32, max_dist: i32) -> String {
        match IndexParameters::new(k, s, 0, 7, max_dist, 1000) {
            Err(Error::BadParameter(msg)) => msg,
            other => panic!("expected BadParameter, got {other:?}"),
        }
    }

    #[test]
    fn accepts_exactly_the_valid_range() {
        for k in -1..=40 {
            for s in -1..=40 {
                for max_dist in [-1, 0, 100, 255, 256] {
                    let ok = IndexParameters::new(k, s, 0, 7, max_dist, 1000).is_ok();
                    let expected = k > 8
                        && k <= 32
                        && s > 0
                        && s <= k
                        && (k - s) % 2 == 0
                        && (0..=255).contains(&max_dist);
                    assert_eq!(ok, expected, "k={k} s={s} max_dist={max_dist}");
                }
            }
        }
    }

    #[test]
    fn error_names_violated_constraint() {
        assert!(bad(8, 4, 255).contains("k=8"));
        assert!(bad(33, 31, 255).contains("k=33"));
        assert!(bad(20, 21, 255).contains("larger than k"));
        assert!(bad(20, 15, 255).contains("even"));
        assert!(bad(20, 16, 256).contains("max_dist=256"));
    }

    #[test]
    fn derived_fields() {
        let p = IndexParameters::new(20, 16, 0, 7, 255, 1000).unwrap();
        assert_eq!(p.t_syncmer, 3);
        assert_eq!(p.w_min, 1);
        assert_eq!(p.w_max, 7);
        let p = IndexParameters::new(20, 20, 5, -3, 100, 10).unwrap();
        assert_eq!(p.t_syncmer, 1);
        assert_eq!(p.w_min, 5);
        assert_eq!(p.w_max, 1);
    }

    #[test]
    fn block_round_trip_recomputes_derived_fields() {
        let p = IndexParameters::new(15, 11, 2, 9, 200, 500).unwrap();
        let block = p.to_block();
        assert_eq!(
            block,
            ParameterBlock {
                k: 15,
                s: 11,
                l: 2,
                u: 9,
                max_dist: 200,
                filter_cutoff: 500
            }
        );
        assert_eq!(IndexParameters::from_block(&block).unwrap(), p);
    }
}
