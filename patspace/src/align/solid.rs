use super::{query_gap, Block};

/// Shortest segment, and shortest trimmed alignment, accepted as solid.
pub const MIN_SEG_SIZE: usize = 11;

/// 比对链中"牢靠"的部分：块下标闭区间 [left, right] 及其查询坐标范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidCore {
    pub left: usize,
    pub right: usize,
    pub q_start: usize,
    pub q_end: usize,
}

impl SolidCore {
    pub fn len(&self) -> usize {
        self.q_end - self.q_start
    }

    pub fn is_empty(&self) -> bool {
        self.q_end <= self.q_start
    }

    pub fn blocks<'a>(&self, chain: &'a [Block]) -> &'a [Block] {
        &chain[self.left..=self.right]
    }
}

/// Drop the small, loosely attached fragments the local aligner leaves at
/// both ends of a chain, so those bases stay free to align elsewhere (for
/// instance the other exon of a spliced transcript).
///
/// From each end, block lengths accumulate into a run; a block longer than
/// `MIN_SEG_SIZE` or a run longer than twice that anchors the trim. A query
/// gap of more than one base before the next block resets the run. Returns
/// `None` when an end runs out of blocks or the trimmed extent is shorter
/// than `MIN_SEG_SIZE`.
pub fn solid_match(chain: &[Block]) -> Option<SolidCore> {
    let mut left = 0usize;
    let mut run = 0usize;
    loop {
        let b = chain.get(left)?;
        let seg = b.len();
        run += seg;
        if seg > MIN_SEG_SIZE || run > MIN_SEG_SIZE * 2 {
            break;
        }
        if let Some(next) = chain.get(left + 1) {
            if query_gap(b, next) > 1 {
                run = 0;
            }
        }
        left += 1;
    }

    // NOTE: the right-hand scan measures the gap from the left anchor's end,
    // not from the block being scanned, so it is not a mirror of the loop
    // above. Downstream .glu output depends on this; keep it until the
    // scoring owners decide otherwise.
    let anchor = chain[left];
    let mut right = chain.len().checked_sub(1)?;
    run = 0;
    loop {
        let b = &chain[right];
        let seg = b.len();
        run += seg;
        if seg > MIN_SEG_SIZE || run > MIN_SEG_SIZE * 2 {
            break;
        }
        let next_ix = right.checked_sub(1)?;
        if query_gap(&anchor, &chain[next_ix]) > 1 {
            run = 0;
        }
        right = next_ix;
    }

    let q_start = anchor.q_start;
    let q_end = chain[right].q_end;
    if q_end < q_start + MIN_SEG_SIZE {
        return None;
    }
    Some(SolidCore {
        left,
        right,
        q_start,
        q_end,
    })
}
