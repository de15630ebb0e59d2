use super::{query_gap, target_gap, Block, LocalAligner};

/// 逐碱基比较：相同 +1，不同 -1，N 不计分
pub fn block_match_score(query: &[u8], target: &[u8], block: &Block) -> i32 {
    let q = &query[block.q_start..block.q_end];
    let t = &target[block.t_start..block.t_end];
    q.iter()
        .zip(t)
        .map(|(&a, &b)| {
            if a == b'N' || b == b'N' {
                0
            } else if a == b {
                1
            } else {
                -1
            }
        })
        .sum()
}

fn bits(x: i64) -> i32 {
    (64 - x.max(0).leading_zeros()) as i32
}

/// Gap cost the local aligner charges between two cDNA blocks. Long genomic
/// gaps (introns) cost only the number of bits in their length; gaps beyond
/// 100 kb, jumps back in the genome and jumps back in the query cost more.
pub fn cdna_gap_penalty(h_gap: i64, n_gap: i64) -> i32 {
    let mut acc: i64 = 2;
    if h_gap > 100_000 {
        acc += (h_gap - 100_000) / 3000;
        if h_gap > 500_000 {
            acc += (h_gap - 500_000) / 2000;
        }
    }
    let mut h = h_gap;
    if h < 0 {
        h *= -8;
        if h > 48 {
            h *= h;
        }
    }
    let mut n = n_gap;
    if n < 0 {
        acc += -n;
        n = 0;
    }
    (acc + i64::from(bits(h + n))).min(i64::from(i32::MAX)) as i32
}

/// Coarse chain score: block match scores minus cDNA gap penalties.
pub fn score_chain(query: &[u8], target: &[u8], chain: &[Block]) -> i32 {
    let mut score = 0i32;
    for (i, b) in chain.iter().enumerate() {
        score += block_match_score(query, target, b);
        if let Some(next) = chain.get(i + 1) {
            score -= cdna_gap_penalty(target_gap(b, next), query_gap(b, next));
        }
    }
    score
}

/// cDNA 打分
///
/// 每块的匹配分之和减去块间间隙罚分：
/// - 两侧都有间隙时，较短的一侧视为错配串，每碱基 1 分，并从较长一侧扣除；
/// - 负间隙（重叠）长度加倍；
/// - 查询侧（cDNA）剩余间隙每碱基 8 分；
/// - 基因组侧剩余间隙超过 30 视为内含子，只罚 1 分，否则每碱基 8 分。
pub fn score_cdna<A: LocalAligner + ?Sized>(
    aligner: &A,
    query: &[u8],
    target: &[u8],
    chain: &[Block],
) -> i32 {
    let mut score = 0i64;
    for (i, b) in chain.iter().enumerate() {
        let mut one = i64::from(aligner.block_match_score(query, target, b));
        if let Some(next) = chain.get(i + 1) {
            let mut n_gap = query_gap(b, next);
            let mut h_gap = target_gap(b, next);

            if n_gap > 0 && h_gap > 0 {
                if n_gap > h_gap {
                    n_gap -= h_gap;
                    one -= h_gap;
                    h_gap = 0;
                } else {
                    h_gap -= n_gap;
                    one -= n_gap;
                    n_gap = 0;
                }
            }
            if n_gap < 0 {
                n_gap = -2 * n_gap;
            }
            if h_gap < 0 {
                h_gap = -2 * h_gap;
            }
            if n_gap > 0 {
                one -= 8 * n_gap;
            }
            if h_gap > 30 {
                one -= 1;
            } else if h_gap > 0 {
                one -= 8 * h_gap;
            }
        }
        score += one;
    }
    score.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
