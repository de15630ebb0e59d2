use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PatSpaceError;
use crate::io::fasta::{DnaSeq, FaReader};
use crate::io::manifest::Manifest;

/// One genomic sequence (a contig of some BAC).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub bac_ix: usize,
    /// 在所属 BAC 内的序号
    pub seq_ix: usize,
    pub dna: Vec<u8>,
}

impl Target {
    pub fn len(&self) -> usize {
        self.dna.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dna.is_empty()
    }
}

/// A BAC: one genome file, holding its contigs as a contiguous run of
/// targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bac {
    pub name: String,
    pub first_target: usize,
    pub target_count: usize,
}

/// All target sequences, loaded once and held for the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Genome {
    pub bacs: Vec<Bac>,
    pub targets: Vec<Target>,
}

impl Genome {
    pub fn add_bac(&mut self, name: &str, seqs: Vec<DnaSeq>) {
        let bac_ix = self.bacs.len();
        self.bacs.push(Bac {
            name: name.to_string(),
            first_target: self.targets.len(),
            target_count: seqs.len(),
        });
        for (seq_ix, seq) in seqs.into_iter().enumerate() {
            self.targets.push(Target {
                name: seq.name,
                bac_ix,
                seq_ix,
                dna: seq.dna,
            });
        }
    }

    /// Read every genome file of the manifest; each becomes one BAC.
    pub fn load(manifest: &Manifest) -> Result<Self> {
        let mut genome = Self::default();
        for path in manifest.files() {
            let fh = std::fs::File::open(path)
                .with_context(|| format!("cannot open genome FASTA '{}'", path))?;
            let seqs = FaReader::new(std::io::BufReader::new(fh))
                .read_all()
                .with_context(|| format!("cannot read genome FASTA '{}'", path))?;
            if seqs.is_empty() {
                return Err(PatSpaceError::EmptyGenome {
                    path: path.to_string(),
                }
                .into());
            }
            log::debug!("{}: {} sequences", path, seqs.len());
            genome.add_bac(path, seqs);
        }
        if genome.bacs.is_empty() {
            return Err(PatSpaceError::EmptyManifest {
                path: manifest.path.clone(),
            }
            .into());
        }
        Ok(genome)
    }

    pub fn bac_targets(&self, bac_ix: usize) -> &[Target] {
        let bac = &self.bacs[bac_ix];
        &self.targets[bac.first_target..bac.first_target + bac.target_count]
    }

    pub fn bac_names(&self) -> Vec<String> {
        self.bacs.iter().map(|b| b.name.clone()).collect()
    }

    pub fn total_len(&self) -> usize {
        self.targets.iter().map(Target::len).sum()
    }
}
