//! # patspace
//!
//! 模式空间（pattern space）cDNA 对基因组比对器。
//!
//! 把 cDNA / EST 序列比对到尚未完成拼接的 BAC 上；当一条 cDNA（或一对 5'/3'
//! EST）同时落在同一 BAC 的两个以上 contig 上时，报告这些 contig 应当相连
//! （glue）。流程：
//!
//! - **候选定位**：基因组切成定长 block，查询切片在 FM 索引中精确查找，
//!   命中足够多的相邻 block 合成候选区域
//! - **局部比对**：区域内 k-mer 种子 → MEM → cDNA 间隙罚分的 DP 链 →
//!   Smith-Waterman 填补小间隙 → 两端 X-drop 延伸
//! - **裁剪与打分**：去掉链两端不牢靠的小片段，按 cDNA 规则打分
//! - **合并**：按 BAC 分组、贪心去重叠，输出 glue 报告
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use patspace::pipeline::{find, FindOpt, FindPaths};
//!
//! let paths = FindPaths {
//!     genome_list: "genome.lst".to_string(),
//!     cdna_list: "cdna.lst".to_string(),
//!     pair_file: "pairs.txt".to_string(),
//!     out_root: "out/run1".to_string(),
//!     index: None,
//! };
//! let stats = find(&paths, &FindOpt::default())?;
//! println!("{} glue lines", stats.merges);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`io`]：FASTA 读取、输入清单、`.hit` / `.glu` / `.ok` 输出
//! - [`index`]：基因组、后缀数组 / FM 索引、候选区域定位
//! - [`align`]：局部比对、cDNA 打分、solid 裁剪
//! - [`hits`]：命中记录池、候选区域验证、重叠消解与合并报告
//! - [`pairs`]：5'/3' EST 配对
//! - [`pipeline`]：查询驱动与并行批处理
//! - [`util`]：DNA 编码 / 反向互补等工具函数

pub mod align;
pub mod error;
pub mod hits;
pub mod index;
pub mod io;
pub mod logging;
pub mod pairs;
pub mod pipeline;
pub mod util;
