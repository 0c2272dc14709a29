use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// packed 字段中 strobe2 偏移占用的低位数
const OFFSET_BITS: u32 = 8;
const OFFSET_MASK: u32 = (1 << OFFSET_BITS) - 1;
/// 参考序列编号最多 24 bit
pub const MAX_REFERENCES: usize = 1 << (32 - OFFSET_BITS);
/// count 字段最高位：置位表示 direct 条目
const DIRECT_FLAG: u32 = 0x8000_0000;

/// 参考序列上一次 randstrobe 出现：strobe1 位置 + `(reference_index << 8) | strobe2_offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefRandstrobe {
    position: u32,
    packed: u32,
}

impl RefRandstrobe {
    pub fn new(reference_index: usize, position: u32, strobe2_offset: usize) -> Result<Self> {
        if reference_index >= MAX_REFERENCES {
            return Err(Error::InvalidFasta(format!(
                "reference index {reference_index} does not fit in 24 bits (at most {MAX_REFERENCES} sequences)"
            )));
        }
        if strobe2_offset > OFFSET_MASK as usize {
            return Err(Error::BadParameter(format!("strobe2 offset {strobe2_offset} exceeds 255")));
        }
        Ok(Self::from_raw(
            position,
            ((reference_index as u32) << OFFSET_BITS) | strobe2_offset as u32,
        ))
    }

    #[inline]
    pub(crate) fn from_raw(position: u32, packed: u32) -> Self {
        Self { position, packed }
    }

    #[inline]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[inline]
    pub fn reference_index(&self) -> usize {
        (self.packed >> OFFSET_BITS) as usize
    }

    #[inline]
    pub fn strobe2_offset(&self) -> usize {
        (self.packed & OFFSET_MASK) as usize
    }

    #[inline]
    pub fn packed(&self) -> u32 {
        self.packed
    }
}

/// 构建索引时使用的带 hash 的出现记录（构建完成即丢弃）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefRandstrobeWithHash {
    pub hash: u64,
    pub strobe: RefRandstrobe,
}

impl RefRandstrobeWithHash {
    /// 排序键：同一 hash 内按 (参考编号, 位置, 偏移) 升序，决定出现记录的存储顺序
    #[inline]
    pub fn sort_key(&self) -> (u64, usize, u32, usize) {
        (
            self.hash,
            self.strobe.reference_index(),
            self.strobe.position(),
            self.strobe.strobe2_offset(),
        )
    }
}

/// hash 表条目的逻辑视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// 种子只出现一次，出现记录内联存放
    Direct(RefRandstrobe),
    /// 种子出现 `count` 次，对应 flat 表中 `[offset, offset + count)`
    Indirect { offset: u32, count: u32 },
}

/// hash 表中的紧凑条目（8 字节）。
///
/// 第二个字（count 字段）的最高位区分两种布局：
/// - 置位：direct，`(position, packed | DIRECT_FLAG)`
/// - 清零：indirect，`(offset, count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    first: u32,
    count: u32,
}

impl MapEntry {
    /// packed 字段已占用最高位（参考编号 ≥ 2^23）时无法内联，返回 None
    pub fn direct(strobe: RefRandstrobe) -> Option<Self> {
        if strobe.packed() & DIRECT_FLAG != 0 {
            return None;
        }
        Some(Self { first: strobe.position(), count: strobe.packed() | DIRECT_FLAG })
    }

    pub fn indirect(offset: usize, count: usize) -> Result<Self> {
        if count == 0 || count >= DIRECT_FLAG as usize {
            return Err(Error::CorruptIndex(format!("indirect entry count {count} out of range")));
        }
        let offset = u32::try_from(offset).map_err(|_| {
            Error::CorruptIndex(format!("flat table offset {offset} exceeds 32 bits"))
        })?;
        Ok(Self { first: offset, count: count as u32 })
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.count & DIRECT_FLAG != 0
    }

    #[inline]
    pub fn count(&self) -> usize {
        if self.is_direct() { 1 } else { self.count as usize }
    }

    /// direct 条目没有 offset
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        if self.is_direct() { None } else { Some(self.first as usize) }
    }

    #[inline]
    pub fn get(&self) -> Entry {
        if self.is_direct() {
            Entry::Direct(RefRandstrobe::from_raw(self.first, self.count & !DIRECT_FLAG))
        } else {
            Entry::Indirect { offset: self.first, count: self.count }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_randstrobe_packs_fields() {
        let r = RefRandstrobe::new(1234, 99_999, 255).unwrap();
        assert_eq!(r.reference_index(), 1234);
        assert_eq!(r.position(), 99_999);
        assert_eq!(r.strobe2_offset(), 255);
        assert_eq!(r.packed(), (1234 << 8) | 255);

        assert!(RefRandstrobe::new(MAX_REFERENCES, 0, 0).is_err());
        assert!(RefRandstrobe::new(0, 0, 256).is_err());
    }

    #[test]
    fn direct_entry_round_trips_occurrence() {
        let r = RefRandstrobe::new(7, 42, 13).unwrap();
        let e = MapEntry::direct(r).unwrap();
        assert!(e.is_direct());
        assert_eq!(e.count(), 1);
        assert_eq!(e.offset(), None);
        assert_eq!(e.get(), Entry::Direct(r));
        assert_eq!(std::mem::size_of::<MapEntry>(), 8);
    }

    #[test]
    fn direct_entry_rejects_high_reference_index() {
        let r = RefRandstrobe::new(1 << 23, 5, 0).unwrap();
        assert!(MapEntry::direct(r).is_none());
    }

    #[test]
    fn indirect_entry_bounds() {
        let e = MapEntry::indirect(10, 3).unwrap();
        assert!(!e.is_direct());
        assert_eq!(e.count(), 3);
        assert_eq!(e.offset(), Some(10));
        assert_eq!(e.get(), Entry::Indirect { offset: 10, count: 3 });

        assert!(MapEntry::indirect(0, 0).is_err());
        assert!(MapEntry::indirect(0, 1 << 31).is_err());
        assert!(MapEntry::indirect(u32::MAX as usize + 1, 2).is_err());
    }
}
