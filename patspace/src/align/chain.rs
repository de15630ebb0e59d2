use super::score::cdna_gap_penalty;
use super::seed::MemSeed;
use super::Block;

/// 种子链：按查询坐标排列的 MEM 及其 DP 得分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub seeds: Vec<MemSeed>,
    pub score: i64,
}

impl Chain {
    pub fn blocks(&self) -> Vec<Block> {
        self.seeds.iter().map(|s| Block::new(s.qb, s.tb, s.len())).collect()
    }
}

/// Drop the first `n` bases of a seed.
fn trim_front(s: &MemSeed, n: usize) -> MemSeed {
    MemSeed {
        qb: s.qb + n,
        qe: s.qe,
        tb: s.tb + n,
        te: s.te,
    }
}

/// 从种子集合中构建最佳链（DP 方法）。
///
/// 前驱必须在查询和目标两侧都起始于当前种子之前；两者重叠时从当前种子
/// 头部裁掉重叠部分（剪接点附近的 MEM 常会越过外显子边界）。种子之间
/// 按 cDNA 间隙罚分扣分，因此长内含子只付出对数代价。
pub fn best_chain(seeds: &[MemSeed]) -> Option<Chain> {
    if seeds.is_empty() {
        return None;
    }

    let mut idxs: Vec<usize> = (0..seeds.len()).collect();
    idxs.sort_by_key(|&i| (seeds[i].qb, seeds[i].tb));

    let n = idxs.len();
    let mut dp: Vec<i64> = vec![0; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut trim: Vec<usize> = vec![0; n];
    let mut best_t = 0usize;

    for (t, &i) in idxs.iter().enumerate() {
        let si = &seeds[i];
        let len_i = si.len();
        dp[t] = len_i as i64;

        for (u, &j) in idxs[..t].iter().enumerate() {
            let sj = &seeds[j];
            if sj.qb >= si.qb || sj.tb >= si.tb {
                continue;
            }
            let ov = sj.qe.saturating_sub(si.qb).max(sj.te.saturating_sub(si.tb));
            if ov >= len_i {
                continue;
            }
            let h_gap = (si.tb + ov - sj.te) as i64;
            let n_gap = (si.qb + ov - sj.qe) as i64;
            let cand = dp[u] + (len_i - ov) as i64 - i64::from(cdna_gap_penalty(h_gap, n_gap));
            if cand > dp[t] {
                dp[t] = cand;
                prev[t] = Some(u);
                trim[t] = ov;
            }
        }

        if dp[t] > dp[best_t] {
            best_t = t;
        }
    }

    let mut chain_seeds: Vec<MemSeed> = Vec::new();
    let mut cur = Some(best_t);
    while let Some(t) = cur {
        chain_seeds.push(trim_front(&seeds[idxs[t]], trim[t]));
        cur = prev[t];
    }
    chain_seeds.reverse();

    Some(Chain {
        seeds: chain_seeds,
        score: dp[best_t],
    })
}
