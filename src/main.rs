//! framefp CLI - index a corpus of frames and find which frame a crop came from.
//!
//! # Usage
//!
//! ```bash
//! # Detect corners and store them next to every image
//! framefp detect --config framefp.yaml
//!
//! # Build and persist the index of full frames
//! framefp index --config framefp.yaml
//!
//! # Which frame does this hint come from?
//! framefp query frame12-2.jpg --config framefp.yaml
//! framefp query frame12-2.jpg --config framefp.yaml --json
//!
//! # Portable JSON copy of the index
//! framefp export --config framefp.yaml --out index.json
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use framefp::{
    CandidateOverlap, DecodingSource, Degradation, FingerprintCache, FingerprintIndex,
    FramefpConfig, HarrisProvider, ImageId, IndexStore, Inventory, KeypointSource,
    KeypointSourceKind, MatchOutcome, Matcher, SidecarSource, build_corpus_index, write_sidecar,
};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Geometric keypoint-pair image fingerprinting.
#[derive(Parser)]
#[command(name = "framefp", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the built-in corner detector and write keypoint sidecars
    Detect {
        #[arg(long)]
        config: PathBuf,
    },
    /// Fingerprint the full frames of the corpus and persist the index
    Index {
        #[arg(long)]
        config: PathBuf,
    },
    /// Match an inventory image (usually a hint crop) against the index
    Query {
        /// Image id, e.g. frame12-2.jpg
        image_id: String,
        #[arg(long)]
        config: PathBuf,
        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the index as a JSON document
    Export {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Detect { config } => detect(&load_config(&config)?),
        Command::Index { config } => {
            let cfg = load_config(&config)?;
            let index = build_and_save(&cfg)?;
            println!("indexed {} frames", index.len());
            Ok(())
        }
        Command::Query {
            image_id,
            config,
            json,
        } => query(&load_config(&config)?, &image_id, json),
        Command::Export { config, out } => {
            let cfg = load_config(&config)?;
            let index = load_or_build(&cfg)?;
            let file = File::create(&out).with_context(|| format!("creating {}", out.display()))?;
            index.write_json(BufWriter::new(file))?;
            println!("wrote {} entries to {}", index.len(), out.display());
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<FramefpConfig> {
    FramefpConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

fn scan(cfg: &FramefpConfig) -> Result<Inventory> {
    let dir = &cfg.corpus.dir;
    Inventory::scan_dir(dir, &cfg.ingest_config())
        .with_context(|| format!("scanning corpus {}", dir.display()))
}

fn keypoint_source(cfg: &FramefpConfig) -> Result<Box<dyn KeypointSource>> {
    Ok(match cfg.corpus.keypoint_source {
        KeypointSourceKind::Sidecar => Box::new(SidecarSource::new(cfg.ingest_config())),
        KeypointSourceKind::Decode => Box::new(DecodingSource::new(
            HarrisProvider::new(cfg.corpus.harris.clone())?,
            cfg.ingest_config(),
        )),
    })
}

fn detect(cfg: &FramefpConfig) -> Result<()> {
    let inventory = scan(cfg)?;
    let ingest_cfg = cfg.ingest_config();
    let decoder = DecodingSource::new(
        HarrisProvider::new(cfg.corpus.harris.clone())?,
        ingest_cfg.clone(),
    );

    let mut written = 0;
    for entry in &inventory {
        match decoder.keypoints(entry) {
            Ok(keypoints) => {
                write_sidecar(entry, &keypoints, &ingest_cfg)?;
                written += 1;
            }
            Err(err) => warn!(image_id = %entry.id, error = %err, "sidecar_skipped"),
        }
    }
    println!("wrote {written} of {} keypoint sidecars", inventory.len());
    Ok(())
}

fn build_and_save(cfg: &FramefpConfig) -> Result<FingerprintIndex> {
    let inventory = scan(cfg)?;
    let source = keypoint_source(cfg)?;
    let build = build_corpus_index(&inventory, source.as_ref(), &cfg.fingerprint_config())?;
    for (image_id, cause) in &build.degraded {
        eprintln!("degraded: {image_id}: {}", describe(cause));
    }

    let store = IndexStore::open(cfg.index_config()?)?;
    store.save(&build.index)?;
    Ok(build.index)
}

/// Stored index if there is one, otherwise a fresh build.
fn load_or_build(cfg: &FramefpConfig) -> Result<FingerprintIndex> {
    let store = IndexStore::open(cfg.index_config()?)?;
    let index = store.load()?;
    if !index.is_empty() {
        return Ok(index);
    }
    info!("stored index is empty, building from corpus");
    drop(store);
    build_and_save(cfg)
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    #[serde(flatten)]
    outcome: &'a MatchOutcome,
    frame: Option<u32>,
    ranked: Vec<&'a CandidateOverlap>,
    degradation: Option<&'a Degradation>,
}

fn query(cfg: &FramefpConfig, image_id: &str, json: bool) -> Result<()> {
    let inventory = scan(cfg)?;
    let Some(entry) = inventory.find(image_id) else {
        bail!("{image_id} is not in corpus {}", cfg.corpus.dir.display());
    };

    let matcher = Matcher::new(load_or_build(cfg)?, cfg.fingerprint_config(), cfg.match_config())?;
    let mut cache = FingerprintCache::new(cfg.fingerprint_config())?;
    if let Some(cache_cfg) = cfg.cache_config() {
        cache = cache.with_store(IndexStore::open(cache_cfg)?);
    }

    let source = keypoint_source(cfg)?;
    let report = cache.get_or_compute(source.as_ref(), entry)?;
    let result = matcher.match_fingerprint(&report.fingerprint)?;
    let frame = result
        .best_image_id()
        .and_then(|id| ImageId::new(id).kind().frame());
    let ranked = result.top(cfg.match_config().max_ranked);

    if json {
        let output = QueryOutput {
            query: image_id,
            outcome: &result.outcome,
            frame,
            ranked,
            degradation: report.degradation.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(cause) = &report.degradation {
        println!("warning: {image_id}: {}", describe(cause));
    }
    match &result.outcome {
        MatchOutcome::Matched { image_id: best, overlap } => match frame {
            Some(frame) => println!("{image_id} -> frame {frame} ({best}), overlap {overlap}"),
            None => println!("{image_id} -> {best}, overlap {overlap}"),
        },
        MatchOutcome::NoConfidentMatch => println!("{image_id} -> no confident match"),
    }
    for candidate in ranked {
        println!("  {:>6}  {}", candidate.overlap, candidate.image_id);
    }
    Ok(())
}

fn describe(cause: &Degradation) -> String {
    match cause {
        Degradation::InsufficientKeypoints { found } => {
            format!("only {found} keypoint(s), fingerprint is empty")
        }
        Degradation::Decode { message }
        | Degradation::Detection { message }
        | Degradation::Sidecar { message } => message.clone(),
    }
}
