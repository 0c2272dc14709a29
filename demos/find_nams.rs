//! 演示如何在 library 模式下使用 namfinder 查找 NAM。
//!
//! 运行方式：
//! ```bash
//! cargo run --example find_nams
//! ```

use namfinder::align::{find_nams, postprocess};
use namfinder::index::{randstrobes_query, IndexParameters, StrobemerIndex};
use namfinder::io::refs::References;
use namfinder::util::dna;

fn main() -> namfinder::Result<()> {
    // 1. 构建参考序列
    let reference = b"GATTACAGGCTTACGATCGGATCCATGCAAGTCCGATTGCATTGACCGTAGGCTAACGTTAGCATGCAATCGGA";
    let references = References::from_sequences(vec![("ref1", reference.to_vec())]);
    println!("参考序列: {}", String::from_utf8_lossy(reference));
    println!("参考长度: {} bp", references.total_length());

    // 2. 构建 strobemer 索引
    let params = IndexParameters::new(12, 8, 1, 3, 255, 1000)?;
    let mut index = StrobemerIndex::new(params);
    index.populate(&references, params.filter_cutoff, 1)?;
    println!("索引构建完成：{} 个不同 hash，{}", index.len(), params);

    // 3. 正向 read：参考序列的一段子串
    let read = &reference[10..60];
    report("forward", read, &references, &index);

    // 4. 反向 read：同一段子串的反向互补
    let read_rc = dna::revcomp(read);
    report("reverse", &read_rc, &references, &index);

    Ok(())
}

fn report(name: &str, read: &[u8], references: &References, index: &StrobemerIndex) {
    let seeds = randstrobes_query(read, &index.parameters);
    let (nonrepetitive_fraction, mut nams) = find_nams(&seeds, index);
    println!(
        "\n{}: {} 个种子，{} 个 NAM，非重复比例 {:.2}",
        name,
        seeds.len(),
        nams.len(),
        nonrepetitive_fraction
    );

    postprocess::sort_and_truncate(&mut nams, 5, true);
    let rc = dna::revcomp(read);
    postprocess::resolve_strands(&mut nams, read, &rc, references, index.k(), false);

    let mut out = String::new();
    postprocess::write_nams(&mut out, &nams, name, references);
    print!("{out}");
}
