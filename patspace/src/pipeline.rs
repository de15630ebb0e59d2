//! 查询驱动
//!
//! 输入顺序上的决定（是否成对、先到的一端缓存）由单线程驱动完成，
//! 产出的工作单元（单条查询或完整的一对）按批交给 rayon 线程池并行评估；
//! 每个 worker 持有自己的命中记录池。结果按输入顺序由唯一的写出端落盘，
//! 因此任意线程数下输出逐字节相同。

use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use std::io::{BufRead, Write};
use std::time::Instant;

use crate::align::{FuzzyAligner, FuzzyOpt, LocalAligner};
use crate::error::accession_context;
use crate::hits::{resolve, ClumpEvaluator, ClumpStats, HitPool, HitSink, MergeReport, QuerySeq, ReadDir, Strand};
use crate::index::genome::Genome;
use crate::index::locator::LocatorOpt;
use crate::index::{CandidateLocator, GenomeIndex};
use crate::io::fasta::FaReader;
use crate::io::manifest::Manifest;
use crate::io::report::{write_ok_marker, ReportWriter};
use crate::pairs::{CompletePair, EstPairRegistry, PairOffer};
use crate::util::dna::revcomp;

/// Queries processed between two debug progress records.
const PROGRESS_EVERY: u64 = 4096;

/// `find` 的全部参数
#[derive(Debug, Clone)]
pub struct FindOpt {
    pub threads: usize,
    /// 每批并行评估的工作单元数
    pub batch_size: usize,
    /// 不短于此长度的查询直接跳过
    pub max_query_size: usize,
    pub locator: LocatorOpt,
    pub aligner: FuzzyOpt,
}

impl Default for FindOpt {
    fn default() -> Self {
        Self {
            threads: 1,
            batch_size: 512,
            max_query_size: 20_000,
            locator: LocatorOpt::default(),
            aligner: FuzzyOpt::default(),
        }
    }
}

/// One independent piece of work: an unpaired query, or both mates of a
/// pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkUnit {
    Single { name: String, dna: Vec<u8> },
    Pair(CompletePair),
}

impl WorkUnit {
    /// Name used on glue lines and in error context.
    pub fn label(&self) -> String {
        match self {
            WorkUnit::Single { name, .. } => name.clone(),
            WorkUnit::Pair(p) => p.merged_name(),
        }
    }
}

#[derive(Debug, Default)]
pub struct UnitResult {
    pub label: String,
    pub hit_lines: String,
    pub merges: Vec<MergeReport>,
    pub stats: ClumpStats,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// 读入的查询条数（含被跳过的）
    pub queries: u64,
    pub skipped: u64,
    pub units: u64,
    pub merges: u64,
    pub clumps: ClumpStats,
}

/// Everything read-only a worker needs to evaluate a work unit.
pub struct Matcher<'a, L: ?Sized, A: ?Sized> {
    genome: &'a Genome,
    locator: &'a L,
    aligner: &'a A,
    margin: usize,
    bac_names: Vec<String>,
}

impl<'a, L, A> Matcher<'a, L, A>
where
    L: CandidateLocator + ?Sized,
    A: LocalAligner + ?Sized,
{
    pub fn new(genome: &'a Genome, locator: &'a L, aligner: &'a A, margin: usize) -> Self {
        Self {
            genome,
            locator,
            aligner,
            margin,
            bac_names: genome.bac_names(),
        }
    }

    fn search(&self, evaluator: &ClumpEvaluator<'_, A>, name: &str, dna: &[u8], dir: ReadDir, sink: &mut HitSink<'_>) {
        let forward = QuerySeq {
            name,
            dna,
            strand: Strand::Plus,
            dir,
        };
        evaluator.evaluate_all(self.locator, &forward, sink);
        let rc = revcomp(dna);
        let reverse = QuerySeq {
            name,
            dna: &rc,
            strand: Strand::Minus,
            dir,
        };
        evaluator.evaluate_all(self.locator, &reverse, sink);
    }

    /// Search every orientation of the unit, then resolve its hits into
    /// glue reports. All pool records are back in the pool on return.
    pub fn process_unit(&self, pool: &mut HitPool, unit: &WorkUnit) -> UnitResult {
        let evaluator = ClumpEvaluator::new(self.genome, self.aligner, self.margin);
        let label = unit.label();
        let mut sink = HitSink::new(pool);
        match unit {
            WorkUnit::Single { name, dna } => {
                self.search(&evaluator, name, dna, ReadDir::Five, &mut sink);
            }
            WorkUnit::Pair(p) => {
                self.search(&evaluator, &p.name5, &p.dna5, ReadDir::Five, &mut sink);
                self.search(&evaluator, &p.name3, &p.dna3, ReadDir::Three, &mut sink);
            }
        }
        let HitSink {
            pool,
            handles,
            lines,
            stats,
        } = sink;
        let merges = resolve(pool, &handles, &label, &self.bac_names);
        debug_assert_eq!(pool.live(), 0);
        UnitResult {
            label,
            hit_lines: lines,
            merges,
            stats,
        }
    }
}

/// Sequential front end plus batched parallel back end.
pub struct Pipeline<'a, L: ?Sized, A: ?Sized> {
    matcher: Matcher<'a, L, A>,
    pairs: EstPairRegistry,
    workers: rayon::ThreadPool,
    batch: Vec<WorkUnit>,
    batch_size: usize,
    max_query_size: usize,
    processed: u64,
    stats: RunStats,
}

impl<'a, L, A> Pipeline<'a, L, A>
where
    L: CandidateLocator + Sync + ?Sized,
    A: LocalAligner + Sync + ?Sized,
{
    pub fn new(matcher: Matcher<'a, L, A>, pairs: EstPairRegistry, opt: &FindOpt) -> Result<Self> {
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(opt.threads.max(1))
            .build()
            .context("cannot start worker threads")?;
        Ok(Self {
            matcher,
            pairs,
            workers,
            batch: Vec::new(),
            batch_size: opt.batch_size.max(1),
            max_query_size: opt.max_query_size,
            processed: 0,
            stats: RunStats::default(),
        })
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Take one query from the input stream.
    pub fn feed<W: Write>(&mut self, name: String, dna: Vec<u8>, out: &mut ReportWriter<W>) -> Result<()> {
        self.stats.queries += 1;
        if dna.len() >= self.max_query_size {
            debug!("skipping {}: {} bases", name, dna.len());
            self.stats.skipped += 1;
            return Ok(());
        }

        match self.pairs.offer(&name, &dna) {
            PairOffer::Unpaired => self.batch.push(WorkUnit::Single { name, dna }),
            PairOffer::Cached => {}
            PairOffer::Complete(pair) => self.batch.push(WorkUnit::Pair(pair)),
        }

        self.processed += 1;
        if self.processed % PROGRESS_EVERY == 0 {
            debug!(
                "{} queries, {} solid hits so far",
                self.processed, self.stats.clumps.solid_match
            );
        }

        if self.batch.len() >= self.batch_size {
            self.flush(out)?;
        }
        Ok(())
    }

    /// Evaluate the pending batch and write its results in input order.
    pub fn flush<W: Write>(&mut self, out: &mut ReportWriter<W>) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let units = std::mem::take(&mut self.batch);
        let matcher = &self.matcher;
        let results: Vec<UnitResult> = self.workers.install(|| {
            units
                .par_iter()
                .map_init(HitPool::new, |pool, unit| matcher.process_unit(pool, unit))
                .collect()
        });

        for r in results {
            out.write_hits(&r.hit_lines)
                .with_context(|| accession_context(&r.label))?;
            for m in &r.merges {
                out.write_merge(m).with_context(|| accession_context(&r.label))?;
            }
            self.stats.units += 1;
            self.stats.merges += r.merges.len() as u64;
            self.stats.clumps += r.stats;
        }
        Ok(())
    }

    /// Stream every record of one cDNA FASTA file through the pipeline.
    pub fn run_file<W: Write>(&mut self, path: &str, out: &mut ReportWriter<W>) -> Result<()> {
        let fh = std::fs::File::open(path).with_context(|| format!("cannot open cDNA FASTA '{}'", path))?;
        self.run_reader(path, FaReader::new(std::io::BufReader::new(fh)), out)
    }

    /// Read errors name the last accession read, as output errors do.
    pub fn run_reader<R: BufRead, W: Write>(
        &mut self,
        path: &str,
        mut reader: FaReader<R>,
        out: &mut ReportWriter<W>,
    ) -> Result<()> {
        let before = self.stats.queries;
        let mut last = String::new();
        loop {
            let rec = reader.next_record().with_context(|| {
                if last.is_empty() {
                    format!("cannot read cDNA FASTA '{}'", path)
                } else {
                    format!("{} cannot read cDNA FASTA '{}' after this record", accession_context(&last), path)
                }
            })?;
            let Some(rec) = rec else { break };
            last.clone_from(&rec.name);
            self.feed(rec.name, rec.dna, out)?;
        }
        self.flush(out)?;
        info!("{}: {} queries", path, self.stats.queries - before);
        Ok(())
    }

    /// Flush what is left. Mates still waiting for a partner are dropped.
    pub fn finish<W: Write>(mut self, out: &mut ReportWriter<W>) -> Result<RunStats> {
        self.flush(out)?;
        for name in self.pairs.pending() {
            debug!("{} never met its mate", name);
        }
        Ok(self.stats)
    }
}

/// Input and output locations of a `find` run.
#[derive(Debug, Clone)]
pub struct FindPaths {
    pub genome_list: String,
    pub cdna_list: String,
    pub pair_file: String,
    pub out_root: String,
    /// 预先构建的索引；为空时现场构建
    pub index: Option<String>,
}

/// 完整的一次比对运行：读清单、建索引、逐文件处理查询、写完成标记
pub fn find(paths: &FindPaths, opt: &FindOpt) -> Result<RunStats> {
    let start = Instant::now();
    let genome_list = Manifest::load(&paths.genome_list)?;
    let cdna_list = Manifest::load(&paths.cdna_list)?;
    info!(
        "{} genome files, {} cDNA files",
        genome_list.files().count(),
        cdna_list.files().count()
    );
    let pairs = EstPairRegistry::load(&paths.pair_file)?;

    let index = match &paths.index {
        Some(index_path) => {
            let idx = GenomeIndex::load_from_file(index_path)?;
            idx.check_manifest(index_path, genome_list.files())?;
            idx.check_locator(index_path, &opt.locator)?;
            info!("loaded index {}, locator settings {:?}", index_path, idx.locator.opt());
            idx
        }
        None => {
            let genome = Genome::load(&genome_list)?;
            GenomeIndex::build(genome, opt.locator)
        }
    };
    info!(
        "genome: {} BACs, {} sequences, {} bases",
        index.genome.bacs.len(),
        index.genome.targets.len(),
        index.genome.total_len()
    );

    let mut out = ReportWriter::create(&paths.out_root)?;
    out.write_header(&cdna_list, &genome_list, &index.genome)?;

    let aligner = FuzzyAligner::new(opt.aligner);
    let margin = index.locator.opt().clump_margin();
    let matcher = Matcher::new(&index.genome, &index.locator, &aligner, margin);
    let mut pipeline = Pipeline::new(matcher, pairs, opt)?;
    for path in cdna_list.files() {
        pipeline.run_file(path, &mut out)?;
    }
    let stats = pipeline.finish(&mut out)?;
    out.finish()?;

    let c = &stats.clumps;
    info!(
        "submitted {} accepted {} ok score {} solid match {}",
        c.submitted, c.accepted, c.ok_score, c.solid_match
    );
    info!(
        "{} queries ({} skipped), {} glue lines",
        stats.queries, stats.skipped, stats.merges
    );
    info!("Total time is {:.2}s", start.elapsed().as_secs_f64());

    write_ok_marker(&paths.out_root)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::locator::BlockLocator;
    use crate::io::fasta::DnaSeq;
    use crate::util::dna::pseudo_random_dna;

    struct Fixture {
        genome: Genome,
        locator: BlockLocator,
        aligner: FuzzyAligner,
    }

    fn fixture() -> Fixture {
        let mut genome = Genome::default();
        genome.add_bac(
            "bac0.fa",
            vec![
                DnaSeq {
                    name: "c0".to_string(),
                    dna: pseudo_random_dna(3000, 41),
                },
                DnaSeq {
                    name: "c1".to_string(),
                    dna: pseudo_random_dna(2500, 42),
                },
            ],
        );
        genome.add_bac(
            "bac1.fa",
            vec![DnaSeq {
                name: "d0".to_string(),
                dna: pseudo_random_dna(4000, 43),
            }],
        );
        let locator = BlockLocator::build(&genome, LocatorOpt::default());
        Fixture {
            genome,
            locator,
            aligner: FuzzyAligner::default(),
        }
    }

    fn run(fx: &Fixture, pairs: EstPairRegistry, opt: &FindOpt, queries: Vec<(String, Vec<u8>)>) -> (String, String, RunStats) {
        let matcher = Matcher::new(&fx.genome, &fx.locator, &fx.aligner, fx.locator.opt().clump_margin());
        let mut pipeline = Pipeline::new(matcher, pairs, opt).unwrap();
        let mut out = ReportWriter::new(Vec::new(), Vec::new());
        for (name, dna) in queries {
            pipeline.feed(name, dna, &mut out).unwrap();
        }
        let stats = pipeline.finish(&mut out).unwrap();
        let (hit, glu) = out.finish().unwrap();
        (String::from_utf8(hit).unwrap(), String::from_utf8(glu).unwrap(), stats)
    }

    /// Query spanning the end of c0 into the start of c1.
    fn spanning(fx: &Fixture) -> Vec<u8> {
        let mut q = fx.genome.targets[0].dna[1000..1300].to_vec();
        q.extend_from_slice(&fx.genome.targets[1].dna[500..800]);
        q
    }

    #[test]
    fn unpaired_query_glues_two_contigs() {
        let fx = fixture();
        let q = spanning(&fx);
        let (hit, glu, stats) = run(&fx, EstPairRegistry::default(), &FindOpt::default(), vec![("q1".to_string(), q)]);
        assert_eq!(hit.lines().count(), 2);
        assert!(hit.lines().all(|l| l.contains("% + q1:")));
        assert!(hit.contains(" at c0.0:1000-"));
        assert!(hit.contains(" at c1.1:"));
        assert!(glu.starts_with("q1 glues bac0.fa contigs 0 + 5' (0-"));
        assert!(glu.contains(" 1 + 5' ("));
        assert_eq!(glu.lines().count(), 1);
        assert_eq!(stats.units, 1);
        assert_eq!(stats.merges, 1);
        assert_eq!(stats.clumps.solid_match, 2);
        assert!(stats.clumps.submitted >= 2);
    }

    #[test]
    fn pair_is_held_until_mate_arrives() {
        let fx = fixture();
        let mut pairs = EstPairRegistry::default();
        pairs.add("p5", "p3");
        let p5 = fx.genome.targets[0].dna[1000..1300].to_vec();
        let p3 = revcomp(&fx.genome.targets[1].dna[500..800]);
        let queries = vec![
            ("p3".to_string(), p3),
            ("lonely".to_string(), pseudo_random_dna(300, 99)),
            ("p5".to_string(), p5),
        ];
        let (hit, glu, stats) = run(&fx, pairs, &FindOpt::default(), queries);
        assert_eq!(
            glu,
            "p5_AND_p3 glues bac0.fa contigs 0 + 5' (0-300) 100.0% 1 - 3' (0-300) 100.0%\n"
        );
        let lines: Vec<&str> = hit.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "100.0% + p5:0-300 (old 0-300) of 300 at c0.0:1000-1300");
        assert_eq!(lines[1], "100.0% - p3:0-300 (old 0-300) of 300 at c1.1:500-800");
        assert_eq!(stats.units, 2);
        assert_eq!(stats.queries, 3);
    }

    #[test]
    fn half_pair_is_dropped() {
        let fx = fixture();
        let mut pairs = EstPairRegistry::default();
        pairs.add("p5", "p3");
        let p5 = fx.genome.targets[0].dna[1000..1300].to_vec();
        let (hit, glu, stats) = run(&fx, pairs, &FindOpt::default(), vec![("p5".to_string(), p5)]);
        assert!(hit.is_empty());
        assert!(glu.is_empty());
        assert_eq!(stats.units, 0);
        assert_eq!(stats.clumps, ClumpStats::default());
    }

    #[test]
    fn oversized_query_is_skipped() {
        let fx = fixture();
        let opt = FindOpt {
            max_query_size: 600,
            ..FindOpt::default()
        };
        let q = spanning(&fx);
        assert_eq!(q.len(), 600);
        let (hit, glu, stats) = run(&fx, EstPairRegistry::default(), &opt, vec![("big".to_string(), q)]);
        assert!(hit.is_empty() && glu.is_empty());
        assert_eq!((stats.queries, stats.skipped, stats.units), (1, 1, 0));
    }

    #[test]
    fn output_does_not_depend_on_thread_count() {
        let fx = fixture();
        let mut queries = Vec::new();
        for i in 0..12usize {
            let t = &fx.genome.targets[i % 3].dna;
            let s = 100 + i * 97;
            let mut q = t[s..s + 250].to_vec();
            if i % 2 == 1 {
                q = revcomp(&q);
            }
            if i % 4 == 0 {
                q.extend_from_slice(&fx.genome.targets[1].dna[1200..1400]);
            }
            queries.push((format!("q{}", i), q));
        }
        let serial = run(&fx, EstPairRegistry::default(), &FindOpt::default(), queries.clone());
        let parallel_opt = FindOpt {
            threads: 3,
            batch_size: 5,
            ..FindOpt::default()
        };
        let parallel = run(&fx, EstPairRegistry::default(), &parallel_opt, queries);
        assert_eq!(serial.0, parallel.0);
        assert_eq!(serial.1, parallel.1);
        assert_eq!(serial.2, parallel.2);
        assert!(serial.2.clumps.solid_match >= 12);
    }

    #[test]
    fn pool_is_empty_after_each_unit() {
        let fx = fixture();
        let matcher = Matcher::new(&fx.genome, &fx.locator, &fx.aligner, 44);
        let mut pool = HitPool::new();
        let unit = WorkUnit::Single {
            name: "q".to_string(),
            dna: spanning(&fx),
        };
        for _ in 0..3 {
            let r = matcher.process_unit(&mut pool, &unit);
            assert_eq!(r.merges.len(), 1);
            assert_eq!(pool.live(), 0);
        }
        assert_eq!(pool.acquired_total(), pool.released_total());
        assert_eq!(pool.capacity(), 2);
    }

    use std::io::Read;

    /// Serves `data`, then fails like a truncated network mount.
    struct BrokenAfter(std::io::Cursor<Vec<u8>>);

    impl Read for BrokenAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(std::io::Error::new(std::io::ErrorKind::Other, "stale file handle")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn read_error_names_last_accession() {
        let fx = fixture();
        let matcher = Matcher::new(&fx.genome, &fx.locator, &fx.aligner, 44);
        let mut pipeline = Pipeline::new(matcher, EstPairRegistry::default(), &FindOpt::default()).unwrap();
        let mut out = ReportWriter::new(Vec::new(), Vec::new());
        let data = b">q1\nACGTACGT\n>q2\nACG".to_vec();
        let reader = FaReader::new(std::io::BufReader::new(BrokenAfter(std::io::Cursor::new(data))));
        let err = pipeline.run_reader("est.fa", reader, &mut out).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("[error host "), "{}", msg);
        assert!(msg.contains("accession q1] cannot read cDNA FASTA 'est.fa'"), "{}", msg);
        assert_eq!(pipeline.stats().queries, 1);
    }
}
