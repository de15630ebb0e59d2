//! 候选区域（clump）验证
//!
//! 每个候选区域两侧各扩 `min_match * pat_size` 碱基后交给局部比对器，
//! 依次经过粗分阈值、solid 裁剪和 cDNA 归一化得分三道关卡；
//! 任何一关失败都只是静默放弃，只在计数器里留下痕迹。

use std::fmt::Write as _;
use std::ops::AddAssign;

use super::pool::{AlignmentHit, HitHandle, HitPool, ReadDir, Strand};
use crate::align::{score_cdna, solid_match, LocalAligner};
use crate::index::genome::Genome;
use crate::index::{CandidateLocator, CandidateRegion};

/// Coarse chain score a clump must reach before trimming.
pub const MIN_CHAIN_SCORE: i32 = 22;
/// Cooked score a trimmed alignment must exceed to become a hit.
pub const MIN_COOKED_SCORE: f64 = 0.25;

/// 诊断计数器：提交 / 比对器接受 / 粗分通过 / solid 通过
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClumpStats {
    pub submitted: u64,
    pub accepted: u64,
    pub ok_score: u64,
    pub solid_match: u64,
}

impl AddAssign for ClumpStats {
    fn add_assign(&mut self, o: Self) {
        self.submitted += o.submitted;
        self.accepted += o.accepted;
        self.ok_score += o.ok_score;
        self.solid_match += o.solid_match;
    }
}

/// One orientation of one query, as searched.
#[derive(Debug, Clone, Copy)]
pub struct QuerySeq<'a> {
    pub name: &'a str,
    /// 已按 `strand` 定向的序列
    pub dna: &'a [u8],
    pub strand: Strand,
    pub dir: ReadDir,
}

/// Collects what evaluating one work unit produces: pool handles of the
/// accepted hits, their `.hit` lines, and the counters.
pub struct HitSink<'p> {
    pub pool: &'p mut HitPool,
    pub handles: Vec<HitHandle>,
    pub lines: String,
    pub stats: ClumpStats,
}

impl<'p> HitSink<'p> {
    pub fn new(pool: &'p mut HitPool) -> Self {
        Self {
            pool,
            handles: Vec::new(),
            lines: String::new(),
            stats: ClumpStats::default(),
        }
    }
}

pub struct ClumpEvaluator<'g, A: LocalAligner + ?Sized> {
    genome: &'g Genome,
    aligner: &'g A,
    margin: usize,
}

impl<'g, A: LocalAligner + ?Sized> ClumpEvaluator<'g, A> {
    pub fn new(genome: &'g Genome, aligner: &'g A, margin: usize) -> Self {
        Self {
            genome,
            aligner,
            margin,
        }
    }

    /// Evaluate every candidate region the locator reports for `query`.
    pub fn evaluate_all<L: CandidateLocator + ?Sized>(&self, locator: &L, query: &QuerySeq<'_>, sink: &mut HitSink<'_>) {
        for region in locator.find_candidates(query.dna) {
            self.evaluate(&region, query, sink);
        }
    }

    /// Align `query` inside one candidate region. On success the hit is
    /// added to the sink and its line written; otherwise nothing but the
    /// counters changes.
    pub fn evaluate(
        &self,
        region: &CandidateRegion,
        query: &QuerySeq<'_>,
        sink: &mut HitSink<'_>,
    ) -> Option<HitHandle> {
        let target = self.genome.targets.get(region.target_ix)?;
        let start = region.offset.saturating_sub(self.margin);
        let end = (region.offset + region.size + self.margin).min(target.len());

        sink.stats.submitted += 1;
        let chain = self.aligner.align(query.dna, &target.dna, start..end)?;
        sink.stats.accepted += 1;
        if self.aligner.score_chain(query.dna, &target.dna, &chain) < MIN_CHAIN_SCORE {
            return None;
        }
        sink.stats.ok_score += 1;

        let old_start = chain.first()?.q_start;
        let old_end = chain.last()?.q_end;
        let core = solid_match(&chain)?;
        let core_blocks = core.blocks(&chain);
        let solid_score = score_cdna(self.aligner, query.dna, &target.dna, core_blocks);
        let cooked = f64::from(solid_score) / core.len() as f64;
        if cooked <= MIN_COOKED_SCORE {
            return None;
        }
        sink.stats.solid_match += 1;

        let t_start = core_blocks.first()?.t_start;
        let t_end = core_blocks.last()?.t_end;
        let _ = writeln!(
            sink.lines,
            "{:3.1}% {} {}:{}-{} (old {}-{}) of {} at {}.{}:{}-{}",
            100.0 * cooked,
            query.strand.as_char(),
            query.name,
            core.q_start,
            core.q_end,
            old_start,
            old_end,
            query.dna.len(),
            target.name,
            target.seq_ix,
            t_start,
            t_end
        );

        let hit = AlignmentHit::normalized(
            target.bac_ix,
            target.seq_ix,
            core.q_start,
            core.q_end,
            query.dna.len(),
            query.strand,
            query.dir,
            cooked,
        );
        let handle = sink.pool.acquire(hit);
        sink.handles.push(handle);
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{Block, FuzzyAligner};
    use crate::io::fasta::DnaSeq;
    use crate::util::dna::{pseudo_random_dna, revcomp};
    use std::cell::RefCell;
    use std::ops::Range;

    /// Returns a fixed chain and, optionally, a fixed coarse score.
    struct FixedAligner {
        chain: Option<Vec<Block>>,
        coarse: Option<i32>,
        seen: RefCell<Vec<Range<usize>>>,
    }

    impl FixedAligner {
        fn new(chain: Option<Vec<Block>>, coarse: Option<i32>) -> Self {
            Self {
                chain,
                coarse,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl LocalAligner for FixedAligner {
        fn align(&self, _query: &[u8], _target: &[u8], range: Range<usize>) -> Option<Vec<Block>> {
            self.seen.borrow_mut().push(range);
            self.chain.clone()
        }

        fn score_chain(&self, query: &[u8], target: &[u8], chain: &[Block]) -> i32 {
            self.coarse
                .unwrap_or_else(|| crate::align::score_chain(query, target, chain))
        }
    }

    fn genome() -> Genome {
        let mut g = Genome::default();
        g.add_bac(
            "bac0.fa",
            vec![
                DnaSeq {
                    name: "c0".to_string(),
                    dna: pseudo_random_dna(3000, 21),
                },
                DnaSeq {
                    name: "c1".to_string(),
                    dna: pseudo_random_dna(5000, 22),
                },
            ],
        );
        g
    }

    fn region(target_ix: usize, offset: usize, size: usize) -> CandidateRegion {
        CandidateRegion {
            target_ix,
            bac_ix: 0,
            seq_ix: target_ix,
            offset,
            size,
        }
    }

    fn plus<'a>(name: &'a str, dna: &'a [u8]) -> QuerySeq<'a> {
        QuerySeq {
            name,
            dna,
            strand: Strand::Plus,
            dir: ReadDir::Five,
        }
    }

    #[test]
    fn exact_match_becomes_hit_line() {
        let g = genome();
        let query = g.targets[1].dna[1000..1400].to_vec();
        let aligner = FuzzyAligner::default();
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        let h = eval.evaluate(&region(1, 1000, 400), &plus("q1", &query), &mut sink);
        assert!(h.is_some());
        assert_eq!(
            sink.lines,
            "100.0% + q1:0-400 (old 0-400) of 400 at c1.1:1000-1400\n"
        );
        assert_eq!(
            sink.stats,
            ClumpStats {
                submitted: 1,
                accepted: 1,
                ok_score: 1,
                solid_match: 1
            }
        );
        let hit = sink.pool.get(sink.handles[0]).cloned().unwrap();
        assert_eq!((hit.bac_ix, hit.seq_ix, hit.start, hit.end), (0, 1, 0, 400));
        assert!(hit.cooked_score > MIN_COOKED_SCORE);
    }

    #[test]
    fn minus_strand_hit_is_normalized_but_line_is_not() {
        let g = genome();
        let forward = g.targets[1].dna[2000..2300].to_vec();
        // query as read is the reverse complement of the genome; searched
        // as minus strand it lines up again
        let mut query = revcomp(&forward);
        query.extend(std::iter::repeat(b'N').take(100));
        let searched = revcomp(&query);
        let aligner = FuzzyAligner::default();
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        let q = QuerySeq {
            name: "q2",
            dna: &searched,
            strand: Strand::Minus,
            dir: ReadDir::Three,
        };
        let h = eval.evaluate(&region(1, 2000, 300), &q, &mut sink).unwrap();
        assert!(sink.lines.starts_with("100.0% - q2:100-400 (old 100-400) of 400 at c1.1:2000-2300"));
        let hit = sink.pool.get(h).unwrap();
        assert_eq!((hit.start, hit.end), (0, 300));
        assert_eq!(hit.dir, ReadDir::Three);
    }

    #[test]
    fn region_is_widened_and_clipped() {
        let g = genome();
        let aligner = FixedAligner::new(None, None);
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        let q = plus("q", b"ACGTACGTACGT");
        assert!(eval.evaluate(&region(0, 10, 100), &q, &mut sink).is_none());
        assert!(eval.evaluate(&region(0, 2900, 90), &q, &mut sink).is_none());
        assert!(eval.evaluate(&region(0, 500, 100), &q, &mut sink).is_none());
        assert_eq!(*aligner.seen.borrow(), vec![0..154, 2856..3000, 456..644]);
        assert_eq!(sink.stats.submitted, 3);
        assert_eq!(sink.stats.accepted, 0);
    }

    #[test]
    fn low_coarse_score_skips_trimming() {
        let g = genome();
        let query = g.targets[0].dna[100..200].to_vec();
        let aligner = FixedAligner::new(Some(vec![Block::new(0, 100, 100)]), Some(MIN_CHAIN_SCORE - 1));
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        assert!(eval.evaluate(&region(0, 100, 100), &plus("q", &query), &mut sink).is_none());
        assert_eq!((sink.stats.accepted, sink.stats.ok_score, sink.stats.solid_match), (1, 0, 0));
        assert!(sink.lines.is_empty());
        assert_eq!(sink.pool.live(), 0);
    }

    #[test]
    fn coarse_score_at_threshold_goes_on_to_trim() {
        let g = genome();
        let query = g.targets[0].dna[100..200].to_vec();
        let aligner = FixedAligner::new(Some(vec![Block::new(0, 100, 100)]), Some(MIN_CHAIN_SCORE));
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        assert!(eval.evaluate(&region(0, 100, 100), &plus("q", &query), &mut sink).is_some());
        assert_eq!((sink.stats.ok_score, sink.stats.solid_match), (1, 1));
    }

    #[test]
    fn cooked_score_at_threshold_is_rejected() {
        let g = genome();
        // 11 matching bases then 33 Ns: cDNA score 11 over 44 bases
        let mut query = g.targets[0].dna[100..144].to_vec();
        query[11..].fill(b'N');
        let aligner = FixedAligner::new(Some(vec![Block::new(0, 100, 44)]), Some(40));
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        assert_eq!(score_cdna(&aligner, &query, &g.targets[0].dna, &[Block::new(0, 100, 44)]), 11);
        assert!(eval.evaluate(&region(0, 100, 44), &plus("q", &query), &mut sink).is_none());
        assert_eq!((sink.stats.ok_score, sink.stats.solid_match), (1, 0));
        assert!(sink.lines.is_empty());
        assert_eq!(sink.pool.live(), 0);
    }

    #[test]
    fn failed_trim_rejects_clump() {
        let g = genome();
        let query = g.targets[0].dna[100..200].to_vec();
        // three short fragments with two-base gaps: nothing solid
        let chain = vec![Block::new(0, 100, 3), Block::new(5, 105, 3), Block::new(10, 110, 3)];
        let aligner = FixedAligner::new(Some(chain), Some(40));
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        assert!(eval.evaluate(&region(0, 100, 100), &plus("q", &query), &mut sink).is_none());
        assert_eq!((sink.stats.ok_score, sink.stats.solid_match), (1, 0));
    }

    #[test]
    fn noisy_core_is_rejected() {
        let g = genome();
        // unrelated query against the block: cooked score far below 0.25
        let query = pseudo_random_dna(100, 777);
        let aligner = FixedAligner::new(Some(vec![Block::new(0, 100, 100)]), Some(40));
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        assert!(eval.evaluate(&region(0, 100, 100), &plus("q", &query), &mut sink).is_none());
        assert_eq!((sink.stats.ok_score, sink.stats.solid_match), (1, 0));
        assert!(sink.handles.is_empty());
    }

    #[test]
    fn every_hit_clears_the_cooked_threshold() {
        let g = genome();
        let aligner = FuzzyAligner::default();
        let eval = ClumpEvaluator::new(&g, &aligner, 44);
        let mut pool = HitPool::new();
        let mut sink = HitSink::new(&mut pool);
        for (i, seed) in [(0usize, 31u32), (1, 32), (1, 33)] {
            let mut query = g.targets[i].dna[200..500].to_vec();
            // sprinkle mismatches
            let noise = pseudo_random_dna(query.len(), seed);
            for (j, b) in query.iter_mut().enumerate() {
                if j % 7 == 0 {
                    *b = noise[j];
                }
            }
            eval.evaluate(&region(i, 200, 300), &plus("q", &query), &mut sink);
        }
        for &h in &sink.handles {
            assert!(sink.pool.get(h).unwrap().cooked_score > MIN_COOKED_SCORE);
        }
    }

    #[test]
    fn stats_add_up() {
        let mut a = ClumpStats {
            submitted: 3,
            accepted: 2,
            ok_score: 1,
            solid_match: 1,
        };
        a += ClumpStats {
            submitted: 1,
            accepted: 1,
            ok_score: 1,
            solid_match: 0,
        };
        assert_eq!((a.submitted, a.accepted, a.ok_score, a.solid_match), (4, 3, 2, 1));
    }
}
