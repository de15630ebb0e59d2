use anyhow::Result;
use std::io::BufRead;

use crate::util::dna;

/// One named DNA sequence, bases upper-cased and normalised to ACGTN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnaSeq {
    pub name: String,
    pub dna: Vec<u8>,
}

impl DnaSeq {
    pub fn len(&self) -> usize {
        self.dna.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dna.is_empty()
    }
}

/// Streaming FASTA reader.
///
/// The record name is the first word of the header line. Whitespace and
/// digits inside sequence lines are ignored (numbered GenBank-style dumps
/// read fine). The line buffer and the sequence buffer are reused across
/// records, so a long stream of short ESTs costs no reallocation after the
/// largest record has been seen.
pub struct FaReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    seq_buf: Vec<u8>,
    done: bool,
    peek_name: Option<String>,
}

/// First word after '>'; header bytes need not be UTF-8.
fn header_name(line: &[u8]) -> String {
    let word = line[1..]
        .split(|b| b.is_ascii_whitespace())
        .find(|w| !w.is_empty())
        .unwrap_or(&[]);
    String::from_utf8_lossy(word).into_owned()
}

impl<R: BufRead> FaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            seq_buf: Vec::with_capacity(64 * 1024),
            done: false,
            peek_name: None,
        }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        Ok(self.reader.read_until(b'\n', &mut self.line)? > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<DnaSeq>> {
        if self.done {
            return Ok(None);
        }

        // anything before the first '>' is skipped
        let name = if let Some(name) = self.peek_name.take() {
            name
        } else {
            loop {
                if !self.read_line()? {
                    self.done = true;
                    return Ok(None);
                }
                if self.line.first() == Some(&b'>') {
                    break header_name(&self.line);
                }
            }
        };

        self.seq_buf.clear();
        loop {
            if !self.read_line()? {
                self.done = true;
                break;
            }
            if self.line.first() == Some(&b'>') {
                self.peek_name = Some(header_name(&self.line));
                break;
            }
            for &b in &self.line {
                if b.is_ascii_whitespace() || b.is_ascii_digit() {
                    continue;
                }
                self.seq_buf.push(dna::normalize_base(b));
            }
        }

        Ok(Some(DnaSeq {
            name,
            dna: self.seq_buf.clone(),
        }))
    }

    /// Drain the rest of the stream.
    pub fn read_all(&mut self) -> Result<Vec<DnaSeq>> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push(rec);
        }
        Ok(out)
    }
}
