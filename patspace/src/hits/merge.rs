//! 重叠消解与合并（glue）报告
//!
//! 一条查询（或一对 EST）的全部命中按 BAC 分组；同一 BAC 内的命中被贪心地
//! 分进互不大幅重叠的 clump。一个 clump 若跨越同一 BAC 的两个以上 contig，
//! 说明这些 contig 应当相连，写出一行 glue 报告。

use std::fmt;

use log::debug;

use super::pool::{AlignmentHit, HitHandle, HitPool, ReadDir};

/// 一次 glue 事件
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub name: String,
    pub bac_name: String,
    pub members: Vec<AlignmentHit>,
    pub switched_strand: bool,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} glues {} contigs", self.name, self.bac_name)?;
        for m in &self.members {
            write!(
                f,
                " {} {} {}' ({}-{}) {:3.1}%",
                m.seq_ix,
                m.strand.as_char(),
                m.dir.as_char(),
                m.start,
                m.end,
                100.0 * m.cooked_score
            )?;
        }
        Ok(())
    }
}

fn dir_rank(dir: ReadDir) -> u8 {
    match dir {
        ReadDir::Five => 0,
        ReadDir::Three => 1,
    }
}

/// True unless `hit` overlaps some clump member of the same direction by
/// more than a third of its own length.
pub fn no_major_overlap(hit: &AlignmentHit, clump: &[AlignmentHit]) -> bool {
    let max_overlap = (hit.len() / 3) as i64;
    clump.iter().filter(|c| c.dir == hit.dir).all(|c| {
        let s = hit.start.max(c.start) as i64;
        let e = hit.end.min(c.end) as i64;
        e - s <= max_overlap
    })
}

fn all_same_contig(clump: &[AlignmentHit]) -> bool {
    match clump.first() {
        Some(first) => clump.iter().all(|h| h.seq_ix == first.seq_ix),
        None => true,
    }
}

/// Partition one BAC's hits into clumps, pass after pass over the leftovers,
/// and report the clumps that span more than one contig. Every handle is
/// released once its clump is done.
fn resolve_bac(
    pool: &mut HitPool,
    run: Vec<(HitHandle, AlignmentHit)>,
    name: &str,
    bac_name: &str,
    reports: &mut Vec<MergeReport>,
) {
    let mut remaining = run;
    while !remaining.is_empty() {
        let mut members: Vec<AlignmentHit> = Vec::new();
        let mut clump: Vec<HitHandle> = Vec::new();
        let mut leftover: Vec<(HitHandle, AlignmentHit)> = Vec::new();
        for (h, hit) in remaining {
            if no_major_overlap(&hit, &members) {
                members.push(hit);
                clump.push(h);
            } else {
                leftover.push((h, hit));
            }
        }

        if members.len() > 1 && !all_same_contig(&members) {
            let first_strand = members[0].strand;
            let switched_strand = members.iter().any(|m| m.strand != first_strand);
            if switched_strand {
                debug!("{} switches strand gluing {}", name, bac_name);
            }
            reports.push(MergeReport {
                name: name.to_string(),
                bac_name: bac_name.to_string(),
                members,
                switched_strand,
            });
        }
        pool.release_all(clump);
        remaining = leftover;
    }
}

/// 消解一条查询（或一对 EST）的全部命中
///
/// 命中按 (BAC, 方向 5' 在前, 起点) 稳定排序；同一 BAC 只有一条命中时直接释放。
/// 返回的报告按 BAC 顺序排列。调用之后 `handles` 全部失效。
pub fn resolve(pool: &mut HitPool, handles: &[HitHandle], name: &str, bac_names: &[String]) -> Vec<MergeReport> {
    let mut hits: Vec<(HitHandle, AlignmentHit)> = handles
        .iter()
        .filter_map(|&h| pool.get(h).map(|hit| (h, hit.clone())))
        .collect();
    hits.sort_by_key(|(_, hit)| (hit.bac_ix, dir_rank(hit.dir), hit.start));

    let mut reports = Vec::new();
    let mut iter = hits.into_iter().peekable();
    while let Some(first) = iter.next() {
        let bac_ix = first.1.bac_ix;
        let mut run = vec![first];
        while let Some(next) = iter.next_if(|(_, hit)| hit.bac_ix == bac_ix) {
            run.push(next);
        }
        if run.len() == 1 {
            pool.release_all(run.into_iter().map(|(h, _)| h));
            continue;
        }
        let bac_name = bac_names.get(bac_ix).map(String::as_str).unwrap_or("");
        resolve_bac(pool, run, name, bac_name, &mut reports);
    }
    reports
}
