/// 2-bit 编码表：A/C/G/T（含小写、U）→ 0..4，其余字符 → 4
pub static NT4_TABLE: [u8; 256] = {
    let mut table = [4u8; 256];
    table[b'A' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b'U' as usize] = 3;
    table[b'a' as usize] = 0;
    table[b'c' as usize] = 1;
    table[b'g' as usize] = 2;
    table[b't' as usize] = 3;
    table[b'u' as usize] = 3;
    table
};

#[inline]
pub fn to_nt4(b: u8) -> u8 {
    NT4_TABLE[b as usize]
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nt4_maps_bases_and_rejects_others() {
        assert_eq!(to_nt4(b'A'), 0);
        assert_eq!(to_nt4(b'c'), 1);
        assert_eq!(to_nt4(b'G'), 2);
        assert_eq!(to_nt4(b'u'), 3);
        assert_eq!(to_nt4(b'N'), 4);
        assert_eq!(to_nt4(b'-'), 4);
    }

    #[test]
    fn revcomp_handles_n_and_case() {
        assert_eq!(revcomp(b"ACGTn"), b"NACGT");
        assert_eq!(revcomp(b"aacg"), b"CGTT");
    }

    #[test]
    fn normalize_uppercases_and_masks() {
        assert_eq!(normalize_seq(b"acgURy"), b"ACGTNN");
    }
}
