use serde::{Deserialize, Serialize};

use super::sa;
use crate::util::dna;

/// 一条 target 在拼接文本中的位置
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub offset: u32,
    pub len: u32,
}

/// 朴素 FM 索引：
/// - 所有 target 依次拼接，之间以 0（$）分隔。
/// - 采用定长分块的 Occ 采样（块内顺扫补偿）。
/// - 保存完整 SA，方便从区间直接取得位置。
#[derive(Debug, Serialize, Deserialize)]
pub struct FmIndex {
    block: u32,
    /// C[i] = 文本中字母 < i 的累计数量
    c: Vec<u32>,
    bwt: Vec<u8>,
    /// occ_samples[block_id * SIGMA + c]
    occ_samples: Vec<u32>,
    sa: Vec<u32>,
    spans: Vec<TextSpan>,
}

impl FmIndex {
    /// Index a set of sequences (already normalised to ACGTN).
    pub fn build<'a>(seqs: impl IntoIterator<Item = &'a [u8]>, block: usize) -> Self {
        let mut text: Vec<u8> = Vec::new();
        let mut spans = Vec::new();
        for seq in seqs {
            let offset = text.len() as u32;
            text.extend(seq.iter().map(|&b| dna::to_alphabet(b)));
            spans.push(TextSpan {
                offset,
                len: seq.len() as u32,
            });
            text.push(0);
        }

        let sa = sa::build_sa(&text);
        let n = text.len();
        let bwt: Vec<u8> = sa
            .iter()
            .map(|&p| {
                let i = p as usize;
                if i == 0 {
                    text[n - 1]
                } else {
                    text[i - 1]
                }
            })
            .collect();

        let mut freq = [0u32; dna::SIGMA];
        for &ch in &bwt {
            freq[ch as usize] += 1;
        }
        let mut c = vec![0u32; dna::SIGMA];
        let mut acc = 0u32;
        for (slot, f) in c.iter_mut().zip(freq) {
            *slot = acc;
            acc += f;
        }

        let block = block.max(1);
        let num_blocks = (n + block - 1) / block;
        let mut occ_samples = vec![0u32; num_blocks * dna::SIGMA];
        let mut running = [0u32; dna::SIGMA];
        for bi in 0..num_blocks {
            occ_samples[bi * dna::SIGMA..(bi + 1) * dna::SIGMA].copy_from_slice(&running);
            let end = ((bi + 1) * block).min(n);
            for &ch in &bwt[bi * block..end] {
                running[ch as usize] += 1;
            }
        }

        Self {
            block: block as u32,
            c,
            bwt,
            occ_samples,
            sa,
            spans,
        }
    }

    /// BWT[0..pos) 中 c 的出现次数
    #[inline]
    fn occ(&self, c: u8, pos: usize) -> u32 {
        if pos == 0 {
            return 0;
        }
        let block = self.block as usize;
        let bi = (pos - 1) / block;
        let base = self.occ_samples[bi * dna::SIGMA + c as usize];
        let add = self.bwt[bi * block..pos].iter().filter(|&&ch| ch == c).count() as u32;
        base + add
    }

    /// 反向搜索精确匹配；pattern 为 ACGTN 碱基（不应包含 N）
    pub fn backward_search(&self, pattern: &[u8]) -> Option<(usize, usize)> {
        if self.bwt.is_empty() || pattern.is_empty() {
            return None;
        }
        let mut l = 0usize;
        let mut r = self.bwt.len();
        for &b in pattern.iter().rev() {
            let a = dna::to_alphabet(b);
            let c0 = self.c[a as usize] as usize;
            l = c0 + self.occ(a, l) as usize;
            r = c0 + self.occ(a, r) as usize;
            if l >= r {
                return None;
            }
        }
        Some((l, r))
    }

    pub fn sa_interval_positions(&self, l: usize, r: usize) -> &[u32] {
        &self.sa[l..r]
    }

    /// 文本位置 -> (target 序号, target 内偏移)；落在分隔符上返回 None
    pub fn map_text_pos(&self, pos: u32) -> Option<(usize, u32)> {
        let i = self.spans.partition_point(|s| s.offset <= pos);
        let span = self.spans.get(i.checked_sub(1)?)?;
        if pos < span.offset + span.len {
            Some((i - 1, pos - span.offset))
        } else {
            None
        }
    }

    pub fn target_count(&self) -> usize {
        self.spans.len()
    }

    pub fn text_len(&self) -> usize {
        self.bwt.len()
    }
}
