//! Scan Command Implementation
//!
//! Drives instance readers over one or more input shards and reports what
//! they produced. Useful for checking a graph, an input file and a reader
//! configuration together before handing them to a trainer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use sagebatch_data::graph::{GraphClient, InMemoryGraph};
use sagebatch_data::input::LineParser;
use sagebatch_data::instance::Instance;
use sagebatch_data::negative_sampling::{
    NegativeSampler, NegativeSamplingConfig, SamplingStrategy, SelfExclusion,
};
use sagebatch_data::reader::{build_reader, ReaderConfig, ReaderKind, ReaderStats};

/// Negative sampling strategy selectable from the command line
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum SamplerArg {
    /// Uniform over distinct destinations
    #[default]
    Uniform,
    /// Proportional to destination frequency
    Frequency,
}

impl From<SamplerArg> for SamplingStrategy {
    fn from(arg: SamplerArg) -> Self {
        match arg {
            SamplerArg::Uniform => SamplingStrategy::Uniform,
            SamplerArg::Frequency => SamplingStrategy::Frequency,
        }
    }
}

/// Read every batch of the given inputs
///
/// Each input file is read by its own reader. All readers share the graph
/// and the negative sampler.
///
/// # Example
///
/// ```bash
/// sagebatch scan \
///     --graph edges.txt \
///     --input part-0.txt --input part-1.txt \
///     --config "num_neg=5;num_neighbors=10,5" \
///     --workers 2
/// ```
#[derive(Args, Debug, Clone)]
pub struct ScanCommand {
    /// Edge list of the graph, one `src dst [weight]` edge per line
    #[arg(long, short = 'g', env = "SAGEBATCH_GRAPH")]
    pub graph: PathBuf,

    /// Treat graph edges as directed
    #[arg(long)]
    pub directed: bool,

    /// Input shard; may be repeated
    #[arg(long, short = 'i', required = true)]
    pub input: Vec<PathBuf>,

    /// Reader options as `key=value;key=value`, applied after --config-file
    #[arg(long, short = 'c', default_value = "")]
    pub config: String,

    /// JSON reader configuration file
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Reader kind
    #[arg(long, default_value = "unsup_bipartite_graphsage")]
    pub reader: String,

    /// Negative sampling strategy
    #[arg(long, value_enum, default_value = "uniform")]
    pub sampler: SamplerArg,

    /// Temperature of the frequency sampler
    #[arg(long, default_value = "1.0")]
    pub temperature: f32,

    /// Allow a negative to equal its positive destination
    #[arg(long)]
    pub allow_self_negatives: bool,

    /// Seed of the graph and negative samplers
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Number of shards read in parallel
    #[arg(long, short = 'w', default_value = "1")]
    pub workers: usize,

    /// Write the first batch of the first shard as JSON
    #[arg(long)]
    pub dump_first: Option<PathBuf>,
}

/// Totals of one input shard
#[derive(Debug, Clone, Serialize)]
pub struct ShardSummary {
    /// The input file
    pub input: PathBuf,
    /// Reader totals
    pub stats: ReaderStats,
}

/// Result of a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    /// Reader kind used
    pub reader: String,
    /// Per-shard totals, in input order
    pub shards: Vec<ShardSummary>,
    /// Totals over all shards
    pub total: ReaderStats,
}

impl ScanCommand {
    /// Resolves the reader configuration from --config-file and --config
    pub fn reader_config(&self) -> Result<ReaderConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                ReaderConfig::from_json_str(&text)
                    .with_context(|| format!("Invalid config file {:?}", path))?
            }
            None => ReaderConfig::default(),
        };
        config
            .apply_kv_str(&self.config)
            .context("Invalid --config")?;
        config.validate()?;
        Ok(config)
    }

    fn negative_sampler(&self) -> Arc<dyn NegativeSampler> {
        let exclusion = if self.allow_self_negatives {
            SelfExclusion::Allow
        } else {
            SelfExclusion::ExcludeQuery
        };
        NegativeSamplingConfig::default()
            .with_strategy(self.sampler.into())
            .with_temperature(self.temperature)
            .with_self_exclusion(exclusion)
            .with_seed(self.seed)
            .build()
    }

    /// Execute the scan command
    pub fn run(&self) -> Result<ScanSummary> {
        let kind: ReaderKind = self.reader.parse()?;
        let config = self.reader_config()?;
        info!("Reader: {}, inputs: {}", kind, self.input.len());

        let graph: Arc<dyn GraphClient> = Arc::new(
            InMemoryGraph::load(&self.graph, !self.directed)
                .with_context(|| format!("Failed to load graph {:?}", self.graph))?
                .with_seed(self.seed),
        );
        let sampler = self.negative_sampler();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.max(1))
            .build()
            .context("Failed to create worker pool")?;
        let shards = pool.install(|| {
            self.input
                .par_iter()
                .enumerate()
                .map(|(shard, path)| {
                    self.scan_shard(shard, path, kind, &config, graph.clone(), sampler.clone())
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut total = ReaderStats::default();
        for shard in &shards {
            total.merge(&shard.stats);
        }
        info!(
            "Scan finished: {} batch(es), {} record(s), {} row(s)",
            total.batches, total.records, total.rows
        );
        Ok(ScanSummary {
            reader: kind.to_string(),
            shards,
            total,
        })
    }

    fn scan_shard(
        &self,
        shard: usize,
        path: &Path,
        kind: ReaderKind,
        config: &ReaderConfig,
        graph: Arc<dyn GraphClient>,
        sampler: Arc<dyn NegativeSampler>,
    ) -> Result<ShardSummary> {
        let parser =
            LineParser::open(path).with_context(|| format!("Failed to open input {:?}", path))?;
        let mut reader = build_reader(kind, config.clone(), graph, sampler, parser)?;
        let mut inst = Instance::new();

        let mut batch = 0usize;
        while reader
            .get_batch(&mut inst)
            .with_context(|| format!("Batch {} of {:?} failed", batch, path))?
        {
            if shard == 0 && batch == 0 {
                if let Some(out) = &self.dump_first {
                    dump_instance(out, &inst)?;
                }
            }
            batch += 1;
        }

        Ok(ShardSummary {
            input: path.to_path_buf(),
            stats: reader.stats(),
        })
    }
}

fn dump_instance(path: &Path, inst: &Instance) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create dump file {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, inst)?;
    writer.flush()?;
    info!("Wrote first batch to {:?}", path);
    Ok(())
}
