pub mod fasta;
pub mod manifest;
pub mod report;
