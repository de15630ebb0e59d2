use std::collections::HashMap;
use std::ops::Range;

use crate::util::dna::{to_alphabet, ALPHA_N};

/// 查询与目标区域之间的精确匹配（MEM），目标坐标为整条序列上的绝对位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemSeed {
    pub qb: usize,
    pub qe: usize,
    pub tb: usize,
    pub te: usize,
}

impl MemSeed {
    pub fn len(&self) -> usize {
        self.qe - self.qb
    }

    pub fn is_empty(&self) -> bool {
        self.qe <= self.qb
    }
}

/// 2-bit packed k-mer codes for every window of `seq`; `None` where the
/// window holds an N.
fn kmer_codes(seq: &[u8], k: usize) -> Vec<Option<u64>> {
    if k == 0 || seq.len() < k {
        return Vec::new();
    }
    let mask: u64 = if k >= 32 { u64::MAX } else { (1u64 << (2 * k)) - 1 };
    let mut out = Vec::with_capacity(seq.len() - k + 1);
    let mut code = 0u64;
    let mut valid = 0usize;
    for (i, &b) in seq.iter().enumerate() {
        let a = to_alphabet(b);
        if a == 0 || a == ALPHA_N {
            valid = 0;
            code = 0;
        } else {
            code = ((code << 2) | u64::from(a - 1)) & mask;
            valid += 1;
        }
        if i + 1 >= k {
            out.push(if valid >= k { Some(code) } else { None });
        }
    }
    out
}

/// 在 target[range] 内寻找长度至少为 `seed_len` 的精确匹配。
///
/// 先用 k-mer 表定位种子，再沿对角线向两侧无错配延伸成 MEM；
/// 同一对角线上已覆盖的位置不再重复产生种子。出现次数超过
/// `max_occ` 的 k-mer（重复序列）直接跳过。
pub fn find_region_mems(
    query: &[u8],
    target: &[u8],
    range: Range<usize>,
    seed_len: usize,
    max_occ: usize,
) -> Vec<MemSeed> {
    let range = range.start.min(target.len())..range.end.min(target.len());
    if seed_len == 0 || seed_len > 32 || query.len() < seed_len || range.len() < seed_len {
        return Vec::new();
    }

    let region = &target[range.clone()];
    let mut table: HashMap<u64, Vec<usize>> = HashMap::new();
    for (off, code) in kmer_codes(region, seed_len).into_iter().enumerate() {
        if let Some(code) = code {
            table.entry(code).or_default().push(range.start + off);
        }
    }

    let same = |a: u8, b: u8| a == b && a != b'N';
    let mut covered: HashMap<i64, usize> = HashMap::new();
    let mut mems = Vec::new();
    for (qb, code) in kmer_codes(query, seed_len).into_iter().enumerate() {
        let Some(code) = code else { continue };
        let Some(hits) = table.get(&code) else { continue };
        if hits.len() > max_occ {
            continue;
        }
        for &tb in hits {
            let diag = tb as i64 - qb as i64;
            if covered.get(&diag).is_some_and(|&end| end > qb) {
                continue;
            }
            let (mut qs, mut ts) = (qb, tb);
            while qs > 0 && ts > range.start && same(query[qs - 1], target[ts - 1]) {
                qs -= 1;
                ts -= 1;
            }
            let (mut qe, mut te) = (qb + seed_len, tb + seed_len);
            while qe < query.len() && te < range.end && same(query[qe], target[te]) {
                qe += 1;
                te += 1;
            }
            covered.insert(diag, qe);
            mems.push(MemSeed { qb: qs, qe, tb: ts, te });
        }
    }

    dedup_seeds(&mut mems);
    mems
}

fn dedup_seeds(seeds: &mut Vec<MemSeed>) {
    seeds.sort_by(|a, b| a.qb.cmp(&b.qb).then(a.tb.cmp(&b.tb)).then(a.qe.cmp(&b.qe)));
    seeds.dedup();
}
