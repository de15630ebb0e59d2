use std::ops::Range;

use log::trace;

use super::chain::best_chain;
use super::seed::find_region_mems;
use super::sw::{banded_sw_with_buf, SwBuffer, SwParams};
use super::{query_gap, target_gap, Block, LocalAligner};

/// 局部比对参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyOpt {
    /// 精确种子长度（k-mer），不超过 32
    pub seed_len: usize,
    /// 区域内出现次数超过该值的 k-mer 不作种子
    pub max_seed_occ: usize,
    /// 端点无间隙延伸允许的最大回落
    pub x_drop: i32,
    /// 两侧都不超过该长度的链内间隙才用 SW 填补
    pub fill_max_gap: usize,
    pub sw: SwParams,
}

impl Default for FuzzyOpt {
    fn default() -> Self {
        Self {
            seed_len: 10,
            max_seed_occ: 64,
            x_drop: 4,
            fill_max_gap: 48,
            sw: SwParams::default(),
        }
    }
}

/// Seed-chain-extend aligner for cDNA against a genomic region.
#[derive(Debug, Clone, Default)]
pub struct FuzzyAligner {
    pub opt: FuzzyOpt,
}

fn base_score(a: u8, b: u8) -> i32 {
    if a == b'N' || b == b'N' {
        0
    } else if a == b {
        1
    } else {
        -1
    }
}

impl FuzzyAligner {
    pub fn new(opt: FuzzyOpt) -> Self {
        Self { opt }
    }

    /// Fill the gaps between chained blocks. Gaps on one diagonal become
    /// part of an ungapped block; small gaps off the diagonal get SW blocks.
    fn fill_gaps(&self, query: &[u8], target: &[u8], chain: Vec<Block>) -> Vec<Block> {
        let mut buf = SwBuffer::new();
        let mut out: Vec<Block> = Vec::with_capacity(chain.len());
        for b in chain {
            let Some(last) = out.last().copied() else {
                out.push(b);
                continue;
            };
            let qg = query_gap(&last, &b);
            let tg = target_gap(&last, &b);
            let small = qg as usize <= self.opt.fill_max_gap && tg as usize <= self.opt.fill_max_gap;
            if qg >= 0 && qg == tg && small {
                if let Some(prev) = out.last_mut() {
                    prev.q_end = b.q_end;
                    prev.t_end = b.t_end;
                }
                continue;
            }
            if qg > 0 && tg > 0 && small {
                let q = &query[last.q_end..b.q_start];
                let t = &target[last.t_end..b.t_start];
                let mut p = self.opt.sw;
                p.band_width += qg.abs_diff(tg) as usize;
                let res = banded_sw_with_buf(q, t, p, &mut buf);
                if res.score > 0 {
                    trace!("gap fill {}x{} -> {}", qg, tg, res.cigar());
                    out.extend(res.blocks(last.q_end, last.t_end));
                }
            }
            out.push(b);
        }
        out
    }

    /// Ungapped X-drop extension of the first block leftwards and the last
    /// block rightwards, never leaving `range`.
    fn extend_ends(&self, query: &[u8], target: &[u8], range: &Range<usize>, blocks: &mut [Block]) {
        if let Some(first) = blocks.first_mut() {
            let (mut score, mut best, mut best_ext) = (0i32, 0i32, 0usize);
            let mut ext = 0usize;
            while ext < first.q_start && ext < first.t_start - range.start {
                ext += 1;
                score += base_score(query[first.q_start - ext], target[first.t_start - ext]);
                if score > best {
                    best = score;
                    best_ext = ext;
                } else if best - score > self.opt.x_drop {
                    break;
                }
            }
            first.q_start -= best_ext;
            first.t_start -= best_ext;
        }
        if let Some(last) = blocks.last_mut() {
            let (mut score, mut best, mut best_ext) = (0i32, 0i32, 0usize);
            let mut ext = 0usize;
            while last.q_end + ext < query.len() && last.t_end + ext < range.end {
                score += base_score(query[last.q_end + ext], target[last.t_end + ext]);
                ext += 1;
                if score > best {
                    best = score;
                    best_ext = ext;
                } else if best - score > self.opt.x_drop {
                    break;
                }
            }
            last.q_end += best_ext;
            last.t_end += best_ext;
        }
    }
}

impl LocalAligner for FuzzyAligner {
    fn align(&self, query: &[u8], target: &[u8], range: Range<usize>) -> Option<Vec<Block>> {
        let range = range.start.min(target.len())..range.end.min(target.len());
        let mems = find_region_mems(query, target, range.clone(), self.opt.seed_len, self.opt.max_seed_occ);
        let chain = best_chain(&mems)?;
        trace!("chain of {} seeds from {} MEMs, dp score {}", chain.seeds.len(), mems.len(), chain.score);

        let mut blocks = self.fill_gaps(query, target, chain.blocks());
        self.extend_ends(query, target, &range, &mut blocks);
        blocks.retain(|b| !b.is_empty());
        if blocks.is_empty() {
            None
        } else {
            Some(blocks)
        }
    }
}
