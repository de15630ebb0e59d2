use std::fmt::Write as _;

use super::Block;

const NEG_INF: i32 = i32::MIN / 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwParams {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub band_width: usize,
}

impl Default for SwParams {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_penalty: 1,
            gap_open: 2,
            gap_extend: 1,
            band_width: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwOp {
    /// aligned column, match or mismatch
    Match,
    /// base only in the query
    Ins,
    /// base only in the reference
    Del,
}

impl SwOp {
    fn code(self) -> char {
        match self {
            SwOp::Match => 'M',
            SwOp::Ins => 'I',
            SwOp::Del => 'D',
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SwResult {
    pub score: i32,
    pub query_start: usize,
    pub query_end: usize,
    pub ref_start: usize,
    pub ref_end: usize,
    /// run-length encoded operations
    pub ops: Vec<(SwOp, usize)>,
    pub nm: u32,
}

impl SwResult {
    fn empty() -> Self {
        Self {
            score: 0,
            query_start: 0,
            query_end: 0,
            ref_start: 0,
            ref_end: 0,
            ops: Vec::new(),
            nm: 0,
        }
    }

    pub fn cigar(&self) -> String {
        let mut cigar = String::new();
        for &(op, len) in &self.ops {
            let _ = write!(&mut cigar, "{}{}", len, op.code());
        }
        cigar
    }

    /// 每段连续的 M 变成一个块，坐标加上给定偏移
    pub fn blocks(&self, q_offset: usize, r_offset: usize) -> Vec<Block> {
        let mut out = Vec::new();
        let mut qi = q_offset + self.query_start;
        let mut rj = r_offset + self.ref_start;
        for &(op, len) in &self.ops {
            match op {
                SwOp::Match => {
                    out.push(Block::new(qi, rj, len));
                    qi += len;
                    rj += len;
                }
                SwOp::Ins => qi += len,
                SwOp::Del => rj += len,
            }
        }
        out
    }
}

/// 带状仿射间隙 Smith-Waterman 局部对齐
pub fn banded_sw(query: &[u8], reference: &[u8], p: SwParams) -> SwResult {
    banded_sw_with_buf(query, reference, p, &mut SwBuffer::new())
}

/// DP 工作缓冲区，可跨调用复用
#[derive(Default)]
pub struct SwBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

impl SwBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, size: usize) {
        self.h.clear();
        self.h.resize(size, 0);
        self.e.clear();
        self.e.resize(size, NEG_INF);
        self.f.clear();
        self.f.resize(size, NEG_INF);
    }
}

pub fn banded_sw_with_buf(query: &[u8], reference: &[u8], p: SwParams, buf: &mut SwBuffer) -> SwResult {
    let m = query.len();
    let n = reference.len();
    if m == 0 || n == 0 {
        return SwResult::empty();
    }

    let cols = n + 1;
    buf.reset((m + 1) * cols);
    let h = &mut buf.h;
    let e = &mut buf.e;
    let f = &mut buf.f;
    let band = p.band_width as isize;

    let subst = |i: usize, j: usize| {
        if query[i - 1] == reference[j - 1] {
            p.match_score
        } else {
            -p.mismatch_penalty
        }
    };

    let mut best_score = 0i32;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..=m {
        let j_start = (i as isize - band).max(1) as usize;
        let j_end = ((i as isize + band).min(n as isize)).max(0) as usize;
        if j_start > j_end {
            continue;
        }
        for j in j_start..=j_end {
            let idx = i * cols + j;
            let up = (i - 1) * cols + j;
            let left = idx - 1;
            let diag = up - 1;

            e[idx] = (h[up] - p.gap_open - p.gap_extend).max(e[up] - p.gap_extend);
            f[idx] = (h[left] - p.gap_open - p.gap_extend).max(f[left] - p.gap_extend);
            let val = (h[diag] + subst(i, j)).max(e[idx]).max(f[idx]).max(0);
            h[idx] = val;

            if val > best_score {
                best_score = val;
                best_i = i;
                best_j = j;
            }
        }
    }

    if best_score <= 0 {
        return SwResult::empty();
    }

    // backtrack from best cell
    let mut rev_ops: Vec<SwOp> = Vec::new();
    let mut i = best_i;
    let mut j = best_j;
    while i > 0 && j > 0 {
        let idx = i * cols + j;
        let here = h[idx];
        if here == 0 {
            break;
        }
        let diag = (i - 1) * cols + (j - 1);
        if here == h[diag] + subst(i, j) {
            rev_ops.push(SwOp::Match);
            i -= 1;
            j -= 1;
        } else if here == e[idx] {
            rev_ops.push(SwOp::Ins);
            i -= 1;
        } else if here == f[idx] {
            rev_ops.push(SwOp::Del);
            j -= 1;
        } else {
            break;
        }
    }
    rev_ops.reverse();

    let mut nm = 0u32;
    let (mut qi, mut rj) = (i, j);
    let mut ops: Vec<(SwOp, usize)> = Vec::new();
    for &op in &rev_ops {
        match op {
            SwOp::Match => {
                if query[qi] != reference[rj] {
                    nm += 1;
                }
                qi += 1;
                rj += 1;
            }
            SwOp::Ins => {
                nm += 1;
                qi += 1;
            }
            SwOp::Del => {
                nm += 1;
                rj += 1;
            }
        }
        match ops.last_mut() {
            Some((last, len)) if *last == op => *len += 1,
            _ => ops.push((op, 1)),
        }
    }

    SwResult {
        score: best_score,
        query_start: i,
        query_end: best_i,
        ref_start: j,
        ref_end: best_j,
        ops,
        nm,
    }
}
