//! 局部比对与 cDNA 打分
//!
//! - [`fuzzy`]：区域内的 cDNA 局部比对器，输出按位置排列的无间隙块链
//! - [`score`]：块匹配分、粗链分与 cDNA 打分
//! - [`solid`]：去掉链两端不牢靠的小片段

pub mod chain;
pub mod fuzzy;
pub mod score;
pub mod seed;
pub mod solid;
pub mod sw;

pub use fuzzy::{FuzzyAligner, FuzzyOpt};
pub use score::{block_match_score, cdna_gap_penalty, score_cdna, score_chain};
pub use solid::{solid_match, SolidCore, MIN_SEG_SIZE};
pub use sw::{banded_sw, SwParams};

use std::ops::Range;

/// 一个无间隙比对块：查询 [q_start, q_end) 对 target [t_start, t_end)。
/// 块内可以有错配，但两侧长度相等。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub q_start: usize,
    pub q_end: usize,
    pub t_start: usize,
    pub t_end: usize,
}

impl Block {
    pub fn new(q_start: usize, t_start: usize, len: usize) -> Self {
        Self {
            q_start,
            q_end: q_start + len,
            t_start,
            t_end: t_start + len,
        }
    }

    pub fn len(&self) -> usize {
        self.q_end - self.q_start
    }

    pub fn is_empty(&self) -> bool {
        self.q_end <= self.q_start
    }
}

/// Query-side gap from `a` to the following block `b`; negative on overlap.
#[inline]
pub fn query_gap(a: &Block, b: &Block) -> i64 {
    b.q_start as i64 - a.q_end as i64
}

/// Target-side gap from `a` to the following block `b`.
#[inline]
pub fn target_gap(a: &Block, b: &Block) -> i64 {
    b.t_start as i64 - a.t_end as i64
}

/// Local aligner used to verify a candidate region.
///
/// Coordinates of returned blocks are absolute: query offsets into `query`,
/// target offsets into the whole `target` sequence (not the searched range).
/// Blocks come back ordered and non-overlapping in query coordinates.
pub trait LocalAligner {
    fn align(&self, query: &[u8], target: &[u8], range: Range<usize>) -> Option<Vec<Block>>;

    /// Base-level score of one block.
    fn block_match_score(&self, query: &[u8], target: &[u8], block: &Block) -> i32 {
        block_match_score(query, target, block)
    }

    /// Coarse whole-chain score used to decide whether a chain is worth
    /// trimming at all.
    fn score_chain(&self, query: &[u8], target: &[u8], chain: &[Block]) -> i32 {
        score_chain(query, target, chain)
    }
}
