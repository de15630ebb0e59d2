//! `.hit` / `.glu` / `.ok` 输出

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use super::manifest::Manifest;
use crate::hits::MergeReport;
use crate::index::genome::Genome;

pub fn hit_path(out_root: &str) -> String {
    format!("{}.hit", out_root)
}

pub fn glu_path(out_root: &str) -> String {
    format!("{}.glu", out_root)
}

pub fn ok_path(out_root: &str) -> String {
    format!("{}.ok", out_root)
}

/// Writes the hits and glue streams. Only one writer exists per run; the
/// parallel workers hand their text back to it in input order.
pub struct ReportWriter<W: Write> {
    hit: W,
    glu: W,
}

impl ReportWriter<BufWriter<File>> {
    pub fn create(out_root: &str) -> Result<Self> {
        let hit = hit_path(out_root);
        let glu = glu_path(out_root);
        let hit = File::create(&hit).with_context(|| format!("cannot create '{}'", hit))?;
        let glu = File::create(&glu).with_context(|| format!("cannot create '{}'", glu))?;
        Ok(Self::new(BufWriter::new(hit), BufWriter::new(glu)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(hit: W, glu: W) -> Self {
        Self { hit, glu }
    }

    /// 命中文件头：版本、cDNA 清单、基因组文件及其中每条序列的长度
    pub fn write_header(&mut self, cdna: &Manifest, genome_list: &Manifest, genome: &Genome) -> Result<()> {
        writeln!(self.hit, "Pattern space {} cDNA matcher", env!("CARGO_PKG_VERSION"))?;
        write!(self.hit, "cDNA files: ")?;
        for w in &cdna.words {
            write!(self.hit, " {}", w)?;
        }
        writeln!(self.hit)?;
        writeln!(self.hit, "{} genomic files", genome_list.words.len())?;
        for (bac_ix, bac) in genome.bacs.iter().enumerate() {
            write!(self.hit, "{} els in {} ", bac.target_count, bac.name)?;
            for t in genome.bac_targets(bac_ix) {
                write!(self.hit, "{} ", t.len())?;
            }
            writeln!(self.hit)?;
        }
        Ok(())
    }

    /// Hit lines arrive preformatted, newline included.
    pub fn write_hits(&mut self, lines: &str) -> Result<()> {
        self.hit.write_all(lines.as_bytes())?;
        Ok(())
    }

    pub fn write_merge(&mut self, report: &MergeReport) -> Result<()> {
        writeln!(self.glu, "{}", report)?;
        Ok(())
    }

    /// Flush both streams and hand them back.
    pub fn finish(mut self) -> Result<(W, W)> {
        self.hit.flush().context("cannot flush hits output")?;
        self.glu.flush().context("cannot flush glue output")?;
        Ok((self.hit, self.glu))
    }
}

/// Written last; its presence tells batch tooling the run completed.
pub fn write_ok_marker(out_root: &str) -> Result<()> {
    let path = ok_path(out_root);
    std::fs::write(&path, "ok").with_context(|| format!("cannot write '{}'", path))?;
    Ok(())
}
