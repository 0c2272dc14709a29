use std::cmp::Reverse;
use std::fmt::Write;

use super::nam::Nam;
use crate::io::refs::References;

/// 按分数降序（稳定）排序并截断到 `max_nams` 条；
/// 未要求按分数输出时，再按 (ref_id, query_s, ref_s) 升序（稳定）重排。
pub fn sort_and_truncate(nams: &mut Vec<Nam>, max_nams: usize, sort_on_scores: bool) {
    nams.sort_by_key(|n| Reverse(n.score));
    nams.truncate(max_nams);
    if !sort_on_scores {
        nams.sort_by_key(|n| (n.ref_id, n.query_s, n.ref_s));
    }
}

#[inline]
fn window(seq: &[u8], start: usize, k: usize) -> Option<&[u8]> {
    seq.get(start..start.checked_add(k)?)
}

/// NAM 两端各取 k 长窗口，与参考对应窗口比较；越界视为不匹配
fn boundaries_match(
    read: &[u8],
    query_s: usize,
    query_e: usize,
    ref_start: &[u8],
    ref_end: &[u8],
    k: usize,
) -> bool {
    let Some(q_end_start) = query_e.checked_sub(k) else {
        return false;
    };
    window(read, query_s, k) == Some(ref_start) && window(read, q_end_start, k) == Some(ref_end)
}

/// 检查 NAM 的链方向是否与边界序列一致。
///
/// 先按 NAM 当前方向比较；不一致时换到另一方向，query 坐标改写为
/// `[len - query_e, len - query_s)` 再比较，匹配则翻转 `is_rc`。
/// 两个方向都不匹配（hash 碰撞）时返回 false，NAM 保持原样。
pub fn reverse_nam_if_needed(
    nam: &mut Nam,
    read_seq: &[u8],
    read_rc: &[u8],
    references: &References,
    k: usize,
) -> bool {
    let Some(reference) = references.sequences.get(nam.ref_id) else {
        return false;
    };
    let ref_start = window(reference, nam.ref_s, k);
    let ref_end = nam.ref_e.checked_sub(k).and_then(|s| window(reference, s, k));
    let (Some(ref_start), Some(ref_end)) = (ref_start, ref_end) else {
        return false;
    };

    let (seq, seq_rc) = if nam.is_rc { (read_rc, read_seq) } else { (read_seq, read_rc) };
    if boundaries_match(seq, nam.query_s, nam.query_e, ref_start, ref_end, k) {
        return true;
    }

    let read_len = read_seq.len();
    let (Some(q_start), Some(q_end)) = (
        read_len.checked_sub(nam.query_e),
        read_len.checked_sub(nam.query_s),
    ) else {
        return false;
    };
    if boundaries_match(seq_rc, q_start, q_end, ref_start, ref_end, k) {
        nam.is_rc = !nam.is_rc;
        nam.query_s = q_start;
        nam.query_e = q_end;
        return true;
    }
    false
}

/// 对每个 NAM 做方向校正，返回无法确认方向的 NAM 数。
/// `drop_unresolved` 为 true 时移除这些 NAM，否则保留。
pub fn resolve_strands(
    nams: &mut Vec<Nam>,
    read_seq: &[u8],
    read_rc: &[u8],
    references: &References,
    k: usize,
    drop_unresolved: bool,
) -> usize {
    let mut unresolved = 0usize;
    nams.retain_mut(|nam| {
        let ok = reverse_nam_if_needed(nam, read_seq, read_rc, references, k);
        if !ok {
            unresolved += 1;
        }
        ok || !drop_unresolved
    });
    unresolved
}

/// 每个 NAM 一行，制表符分隔：
/// `query_name ref_name strand query_s query_e ref_s ref_e n_hits score`
pub fn write_nams(out: &mut String, nams: &[Nam], query_name: &str, references: &References) {
    for nam in nams {
        let ref_name = references.names.get(nam.ref_id).map_or("*", String::as_str);
        let strand = if nam.is_rc { '-' } else { '+' };
        // writing into a String cannot fail
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            query_name,
            ref_name,
            strand,
            nam.query_s,
            nam.query_e,
            nam.ref_s,
            nam.ref_e,
            nam.n_hits,
            nam.score
        );
    }
}
