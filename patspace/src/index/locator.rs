//! 模式空间候选区域定位
//!
//! 基因组按 target 切成定长 block。查询序列按 `pat_size` 不重叠地切片，
//! 每片在 FM 索引中精确查找，命中计入所在 block。相邻两个 block 的命中数之和
//! 达到 `min_match` 即视为显著；同一 target 上相距不超过 `max_intron` 的显著
//! block 合并为一个候选区域（clump），交给局部比对器验证。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fm::FmIndex;
use super::genome::Genome;
use super::{CandidateLocator, CandidateRegion};
use crate::util::dna;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorOpt {
    /// 查询切片长度
    pub pat_size: usize,
    /// 相邻 block 对的最少命中数
    pub min_match: usize,
    pub block_size: usize,
    /// 同一 clump 内 block 之间的最大距离
    pub max_intron: usize,
    /// 出现次数超过此值的切片视为重复序列而忽略
    pub max_pat_count: usize,
}

impl Default for LocatorOpt {
    fn default() -> Self {
        Self {
            pat_size: 11,
            min_match: 4,
            block_size: 1024,
            max_intron: 32 * 1024,
            max_pat_count: 16 * 1024,
        }
    }
}

impl LocatorOpt {
    /// Bases added on each side of a clump before local alignment.
    pub fn clump_margin(&self) -> usize {
        self.min_match * self.pat_size
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BlockPos {
    target_ix: usize,
    bac_ix: usize,
    seq_ix: usize,
    offset: usize,
    size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockLocator {
    opt: LocatorOpt,
    fm: FmIndex,
    blocks: Vec<BlockPos>,
    /// 每条 target 的第一个 block 编号
    first_block: Vec<usize>,
}

impl BlockLocator {
    pub fn build(genome: &Genome, opt: LocatorOpt) -> Self {
        let block_size = opt.block_size.max(1);
        let mut blocks = Vec::new();
        let mut first_block = Vec::with_capacity(genome.targets.len());
        for (target_ix, t) in genome.targets.iter().enumerate() {
            first_block.push(blocks.len());
            let mut offset = 0;
            while offset < t.len() {
                blocks.push(BlockPos {
                    target_ix,
                    bac_ix: t.bac_ix,
                    seq_ix: t.seq_ix,
                    offset,
                    size: block_size.min(t.len() - offset),
                });
                offset += block_size;
            }
        }
        let fm = FmIndex::build(genome.targets.iter().map(|t| t.dna.as_slice()), 128);
        log::debug!(
            "locator: {} blocks over {} targets, FM text {} bases",
            blocks.len(),
            first_block.len(),
            fm.text_len()
        );
        Self {
            opt: LocatorOpt {
                block_size,
                ..opt
            },
            fm,
            blocks,
            first_block,
        }
    }

    pub fn opt(&self) -> &LocatorOpt {
        &self.opt
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn block_of(&self, target_ix: usize, offset: usize) -> usize {
        self.first_block[target_ix] + offset / self.opt.block_size
    }

    /// 统计查询切片在各 block 上的命中数
    fn count_block_hits(&self, query: &[u8]) -> BTreeMap<usize, u32> {
        let mut counts = BTreeMap::new();
        for tile in query.chunks_exact(self.opt.pat_size) {
            if dna::is_homopolymer(tile) || tile.contains(&b'N') {
                continue;
            }
            let Some((l, r)) = self.fm.backward_search(tile) else {
                continue;
            };
            if r - l > self.opt.max_pat_count {
                continue;
            }
            for &pos in self.fm.sa_interval_positions(l, r) {
                if let Some((t, off)) = self.fm.map_text_pos(pos) {
                    *counts.entry(self.block_of(t, off as usize)).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Blocks that belong to a significant neighbouring pair, in block
    /// order, plus the number of hits they carry.
    fn significant_blocks(&self, counts: &BTreeMap<usize, u32>) -> (Vec<usize>, u64) {
        let get = |i: usize| counts.get(&i).copied().unwrap_or(0);
        let last = self.blocks.len() - 1;
        let mut pairs: Vec<usize> = counts
            .keys()
            .flat_map(|&k| [k.saturating_sub(1), k])
            .filter(|&i| i <= last)
            .collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut hit_blocks: Vec<usize> = Vec::new();
        let mut total = 0u64;
        for i in pairs {
            let a = get(i);
            let b = if i < last { get(i + 1) } else { 0 };
            if (a + b) as usize >= self.opt.min_match {
                if a > 0 && hit_blocks.last() != Some(&i) {
                    hit_blocks.push(i);
                    total += u64::from(a);
                }
                if b > 0 {
                    hit_blocks.push(i + 1);
                    total += u64::from(b);
                }
            }
        }
        (hit_blocks, total)
    }

    fn region(first: &BlockPos, last: &BlockPos) -> CandidateRegion {
        CandidateRegion {
            target_ix: first.target_ix,
            bac_ix: first.bac_ix,
            seq_ix: first.seq_ix,
            offset: first.offset,
            size: last.offset + last.size - first.offset,
        }
    }
}

impl CandidateLocator for BlockLocator {
    fn find_candidates(&self, query: &[u8]) -> Vec<CandidateRegion> {
        if self.opt.pat_size == 0 || query.len() < self.opt.pat_size || self.blocks.is_empty() {
            return Vec::new();
        }
        let counts = self.count_block_hits(query);
        let (hit_blocks, total) = self.significant_blocks(&counts);
        if hit_blocks.is_empty() || total * (self.opt.pat_size as u64) * 8 <= query.len() as u64 {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut first = &self.blocks[hit_blocks[0]];
        let mut pre = first;
        for &b in &hit_blocks[1..] {
            let cur = &self.blocks[b];
            let distance = cur.offset.saturating_sub(pre.offset + pre.size);
            if cur.target_ix != pre.target_ix || distance > self.opt.max_intron {
                out.push(Self::region(first, pre));
                first = cur;
            }
            pre = cur;
        }
        out.push(Self::region(first, pre));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fasta::DnaSeq;
    use crate::util::dna::pseudo_random_dna;

    fn genome_of(seqs: &[(&str, Vec<u8>)]) -> Genome {
        let mut g = Genome::default();
        g.add_bac(
            "bac0.fa",
            seqs.iter()
                .map(|(n, d)| DnaSeq {
                    name: n.to_string(),
                    dna: d.clone(),
                })
                .collect(),
        );
        g
    }

    #[test]
    fn locates_exact_substring() {
        let target = pseudo_random_dna(6000, 11);
        let g = genome_of(&[("ctg0", pseudo_random_dna(3000, 5)), ("ctg1", target.clone())]);
        let loc = BlockLocator::build(&g, LocatorOpt::default());
        let query = &target[2500..2900];
        let regions = loc.find_candidates(query);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!((r.target_ix, r.seq_ix), (1, 1));
        assert!(r.offset <= 2500 && r.offset + r.size >= 2900);
    }

    #[test]
    fn far_apart_exons_split_into_two_clumps() {
        let target = pseudo_random_dna(50_000, 3);
        let g = genome_of(&[("ctg0", target.clone())]);
        let opt = LocatorOpt {
            max_intron: 10_000,
            ..LocatorOpt::default()
        };
        let loc = BlockLocator::build(&g, opt);
        let mut query = target[1000..1300].to_vec();
        query.extend_from_slice(&target[40_000..40_300]);
        let regions = loc.find_candidates(&query);
        assert_eq!(regions.len(), 2);
        assert!(regions[0].offset + regions[0].size <= 40_000);
        assert!(regions[1].offset >= 30_000);
    }

    #[test]
    fn repeat_masking_drops_common_tiles() {
        let target = pseudo_random_dna(4000, 17);
        let g = genome_of(&[("ctg0", target.clone())]);
        let opt = LocatorOpt {
            max_pat_count: 0,
            ..LocatorOpt::default()
        };
        let loc = BlockLocator::build(&g, opt);
        assert!(loc.find_candidates(&target[100..500]).is_empty());
    }

    #[test]
    fn too_few_hits_for_query_size() {
        let target = pseudo_random_dna(4000, 23);
        let g = genome_of(&[("ctg0", target.clone())]);
        let loc = BlockLocator::build(&g, LocatorOpt::default());
        // 44 matching bases buried in 2000 unrelated ones
        let mut query = pseudo_random_dna(1000, 99);
        query.extend_from_slice(&target[200..244]);
        query.extend(pseudo_random_dna(1000, 98));
        assert!(loc.find_candidates(&query).is_empty());
    }
}
