use anyhow::{Context, Result};
use std::io::BufRead;

/// A list file naming FASTA inputs, one or more per line. Words that start
/// with `//` are kept (they show up in the run header) but never opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: String,
    pub words: Vec<String>,
}

pub fn is_comment(word: &str) -> bool {
    word.starts_with("//")
}

impl Manifest {
    pub fn load(path: &str) -> Result<Self> {
        let fh = std::fs::File::open(path)
            .with_context(|| format!("cannot open manifest '{}'", path))?;
        Self::from_reader(path, std::io::BufReader::new(fh))
    }

    pub fn from_reader<R: BufRead>(path: &str, reader: R) -> Result<Self> {
        let mut words = Vec::new();
        for line in reader.split(b'\n') {
            let line = line.with_context(|| format!("cannot read manifest '{}'", path))?;
            words.extend(String::from_utf8_lossy(&line).split_whitespace().map(str::to_string));
        }
        Ok(Self {
            path: path.to_string(),
            words,
        })
    }

    /// Files that are actually read.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str).filter(|w| !is_comment(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn comments_are_kept_but_not_listed() {
        let m = Manifest::from_reader("x.lst", Cursor::new("a.fa b.fa\n//c.fa\n\nd.fa\n")).unwrap();
        assert_eq!(m.words.len(), 4);
        assert_eq!(m.files().collect::<Vec<_>>(), vec!["a.fa", "b.fa", "d.fa"]);
    }

    #[test]
    fn non_utf8_bytes_do_not_abort() {
        let m = Manifest::from_reader("x.lst", Cursor::new(&b"a.fa M\xfcller.fa\n"[..])).unwrap();
        assert_eq!(m.words.len(), 2);
        assert_eq!(m.words[0], "a.fa");
    }
}
