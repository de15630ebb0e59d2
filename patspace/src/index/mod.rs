pub mod fm;
pub mod genome;
pub mod locator;
pub mod sa;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PatSpaceError;
use genome::Genome;
use locator::{BlockLocator, LocatorOpt};

/// A stretch of one target sequence worth handing to the local aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRegion {
    /// 在 [`Genome::targets`] 中的序号
    pub target_ix: usize,
    pub bac_ix: usize,
    pub seq_ix: usize,
    pub offset: usize,
    pub size: usize,
}

/// Finds regions of the genome a query probably aligns to. May be called
/// any number of times per query; regions come back in genome order.
pub trait CandidateLocator {
    fn find_candidates(&self, query: &[u8]) -> Vec<CandidateRegion>;
}

/// 索引元信息
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct IndexMeta {
    pub genome_files: Vec<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// Genome plus candidate index, saved by `patspace index` and reloaded by
/// `patspace find --index`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenomeIndex {
    pub meta: IndexMeta,
    pub genome: Genome,
    pub locator: BlockLocator,
}

impl GenomeIndex {
    pub fn build(genome: Genome, opt: LocatorOpt) -> Self {
        let locator = BlockLocator::build(&genome, opt);
        let meta = IndexMeta {
            genome_files: genome.bac_names(),
            ..Default::default()
        };
        Self {
            meta,
            genome,
            locator,
        }
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path)
            .with_context(|| format!("cannot create index '{}'", path))?;
        bincode::serialize_into(std::io::BufWriter::new(f), self)
            .with_context(|| format!("cannot write index '{}'", path))?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("cannot open index '{}'", path))?;
        let idx: Self = bincode::deserialize_from(std::io::BufReader::new(f))
            .with_context(|| format!("cannot decode index '{}'", path))?;
        Ok(idx)
    }

    /// The index must have been built from exactly these genome files.
    pub fn check_manifest<'a>(&self, index_path: &str, files: impl Iterator<Item = &'a str>) -> Result<()> {
        let expected: Vec<&str> = files.collect();
        if expected.iter().copied().ne(self.meta.genome_files.iter().map(String::as_str)) {
            return Err(PatSpaceError::IndexMismatch {
                index: index_path.to_string(),
                expected: expected.join(" "),
                found: self.meta.genome_files.join(" "),
            }
            .into());
        }
        Ok(())
    }

    /// Locator flags given next to a prebuilt index are only accepted when
    /// they are the defaults or match what the index was built with.
    pub fn check_locator(&self, index_path: &str, requested: &LocatorOpt) -> Result<()> {
        let built = self.locator.opt();
        if requested != built && *requested != LocatorOpt::default() {
            return Err(PatSpaceError::LocatorMismatch {
                index: index_path.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
