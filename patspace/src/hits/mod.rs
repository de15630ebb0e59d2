//! 命中记录、候选区域验证与合并报告
//!
//! - [`pool`]：带代数句柄的命中记录池
//! - [`clump`]：对单个候选区域做比对、裁剪、打分，产生命中
//! - [`merge`]：按 BAC 分组消解重叠，输出 glue 报告

pub mod clump;
pub mod merge;
pub mod pool;

pub use clump::{ClumpEvaluator, ClumpStats, HitSink, QuerySeq, MIN_CHAIN_SCORE, MIN_COOKED_SCORE};
pub use merge::{resolve, MergeReport};
pub use pool::{AlignmentHit, HitHandle, HitPool, ReadDir, Strand};
