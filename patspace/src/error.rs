//! Fatal input errors. Anything in here aborts the run before the `.ok`
//! marker is written.

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PatSpaceError {
    #[error("{words} words in pair line {line} of {path}")]
    PairLine { words: usize, line: usize, path: String },
    #[error("manifest {path} lists no files")]
    EmptyManifest { path: String },
    #[error("genome file {path} contains no sequences")]
    EmptyGenome { path: String },
    #[error("index {index} was built from [{found}], genome manifest lists [{expected}]")]
    IndexMismatch {
        index: String,
        expected: String,
        found: String,
    },
    #[error("index {index} was built with other locator settings; drop the locator flags or rebuild it")]
    LocatorMismatch { index: String },
}

/// Prefix used on errors raised while one accession is being processed, so a
/// failure on a cluster node can be traced back to its input.
pub fn accession_context(accession: &str) -> String {
    let host = std::env::var("HOST").unwrap_or_default();
    format!("[error host {} accession {}]", host, accession)
}
