//! 5'/3' EST pairs.
//!
//! The first mate seen is cached here until its partner shows up in the
//! query stream; then both go out together and the slot is emptied again.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::BufRead;

use crate::error::PatSpaceError;
use crate::hits::ReadDir;

#[derive(Debug, Default)]
struct EstPair {
    name5: String,
    name3: String,
    seq5: Option<Vec<u8>>,
    seq3: Option<Vec<u8>>,
}

/// A pair whose two sequences are both available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletePair {
    pub name5: String,
    pub dna5: Vec<u8>,
    pub name3: String,
    pub dna3: Vec<u8>,
}

impl CompletePair {
    /// Label used for glue reports of the combined pair.
    pub fn merged_name(&self) -> String {
        format!("{}_AND_{}", self.name5, self.name3)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PairOffer {
    /// Not a registered pair member; process on its own.
    Unpaired,
    /// First mate; cached until the partner arrives.
    Cached,
    Complete(CompletePair),
}

#[derive(Debug, Default)]
pub struct EstPairRegistry {
    by_name: HashMap<String, (usize, ReadDir)>,
    pairs: Vec<EstPair>,
}

impl EstPairRegistry {
    pub fn load(path: &str) -> Result<Self> {
        let fh = std::fs::File::open(path)
            .with_context(|| format!("cannot open pair file '{}'", path))?;
        let reg = Self::from_reader(path, std::io::BufReader::new(fh))?;
        Ok(reg)
    }

    /// Rows are `name5 name3`; blank rows are skipped, anything else is fatal.
    pub fn from_reader<R: BufRead>(path: &str, reader: R) -> Result<Self> {
        let mut reg = Self::default();
        let mut line_count = 0usize;
        for line in reader.split(b'\n') {
            let line = line.with_context(|| format!("cannot read pair file '{}'", path))?;
            let line = String::from_utf8_lossy(&line);
            line_count += 1;
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                [] => continue,
                [name5, name3] => reg.add(name5, name3),
                _ => {
                    return Err(PatSpaceError::PairLine {
                        words: words.len(),
                        line: line_count,
                        path: path.to_string(),
                    }
                    .into())
                }
            }
        }
        log::info!("Read {} lines of pair info", line_count);
        Ok(reg)
    }

    /// Register a pair. A name registered again points at the newer pair.
    pub fn add(&mut self, name5: &str, name3: &str) {
        let ix = self.pairs.len();
        self.pairs.push(EstPair {
            name5: name5.to_string(),
            name3: name3.to_string(),
            ..Default::default()
        });
        self.by_name.insert(name5.to_string(), (ix, ReadDir::Five));
        self.by_name.insert(name3.to_string(), (ix, ReadDir::Three));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn offer(&mut self, name: &str, dna: &[u8]) -> PairOffer {
        let Some(&(ix, dir)) = self.by_name.get(name) else {
            return PairOffer::Unpaired;
        };
        let pair = &mut self.pairs[ix];
        let (this, other) = match dir {
            ReadDir::Five => (&mut pair.seq5, &mut pair.seq3),
            ReadDir::Three => (&mut pair.seq3, &mut pair.seq5),
        };
        let Some(partner) = other.take() else {
            *this = Some(dna.to_vec());
            return PairOffer::Cached;
        };
        *this = None;
        let (dna5, dna3) = match dir {
            ReadDir::Five => (dna.to_vec(), partner),
            ReadDir::Three => (partner, dna.to_vec()),
        };
        PairOffer::Complete(CompletePair {
            name5: pair.name5.clone(),
            dna5,
            name3: pair.name3.clone(),
            dna3,
        })
    }

    /// Names of mates still waiting for a partner.
    pub fn pending(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for p in &self.pairs {
            if p.seq5.is_some() {
                out.push(p.name5.as_str());
            }
            if p.seq3.is_some() {
                out.push(p.name3.as_str());
            }
        }
        out
    }
}
