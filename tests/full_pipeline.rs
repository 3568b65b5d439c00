//! End-to-end: synthetic frames on disk -> corner detection -> index ->
//! hint crops matched back to their frame.

use std::fs;
use std::path::Path;

use framefp::{
    BackendConfig, DecodingSource, FingerprintCache, FingerprintConfig, FingerprintIndex,
    FramefpConfig, HarrisProvider, ImageId, IndexConfig, IndexDocument, IndexStore, IngestConfig,
    Inventory, KeypointSource, MatchConfig, MatchOutcome, Matcher, SidecarSource,
    build_corpus_index, match_entry, write_sidecar,
};
use image::{GrayImage, Luma, imageops};
use tempfile::TempDir;

const SIZE: u32 = 160;
const CELL: u32 = 80;

struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u32) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as f64
    }
}

fn inside(p: (f64, f64), t: &[(f64, f64); 3]) -> bool {
    let edge = |a: (f64, f64), b: (f64, f64)| (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    let d = [edge(t[0], t[1]), edge(t[1], t[2]), edge(t[2], t[0])];
    d.iter().all(|v| *v >= 0.0) || d.iter().all(|v| *v <= 0.0)
}

/// One small triangle per 80x80 cell, kept 25px away from the cell border so
/// crops along cell borders cut nothing.
fn frame(seed: u64) -> GrayImage {
    let mut rng = Lcg(seed);
    let mut triangles = Vec::new();
    for cell_y in 0..SIZE / CELL {
        for cell_x in 0..SIZE / CELL {
            let origin = ((cell_x * CELL + 25) as f64, (cell_y * CELL + 25) as f64);
            loop {
                let t = [
                    (origin.0 + rng.next(30), origin.1 + rng.next(30)),
                    (origin.0 + rng.next(30), origin.1 + rng.next(30)),
                    (origin.0 + rng.next(30), origin.1 + rng.next(30)),
                ];
                let area = ((t[1].0 - t[0].0) * (t[2].1 - t[0].1)
                    - (t[2].0 - t[0].0) * (t[1].1 - t[0].1))
                    .abs();
                if area > 200.0 {
                    triangles.push(t);
                    break;
                }
            }
        }
    }
    GrayImage::from_fn(SIZE, SIZE, |x, y| {
        let p = (x as f64 + 0.5, y as f64 + 0.5);
        if triangles.iter().any(|t| inside(p, t)) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn crop(img: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
    imageops::crop_imm(img, x, y, w, h).to_image()
}

/// Three frames plus hints: the left half of frame 2, the bottom right cell
/// of frame 1 and an empty crop of frame 3.
fn corpus() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let frames: Vec<GrayImage> = [11u64, 22, 33].iter().map(|s| frame(*s)).collect();
    for (i, img) in frames.iter().enumerate() {
        let id = ImageId::full(i as u32 + 1, "png");
        img.save(dir.path().join(id.as_str())).unwrap();
    }
    crop(&frames[1], 0, 0, CELL, SIZE)
        .save(dir.path().join("frame2-1.png"))
        .unwrap();
    crop(&frames[0], CELL, CELL, CELL, CELL)
        .save(dir.path().join("frame1-1.png"))
        .unwrap();
    GrayImage::from_pixel(40, 40, Luma([0]))
        .save(dir.path().join("frame3-1.png"))
        .unwrap();
    // Not part of the naming scheme; ignored by the inventory.
    fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
    dir
}

fn fingerprint_cfg() -> FingerprintConfig {
    FingerprintConfig::new().with_k(2)
}

fn decoder() -> DecodingSource<HarrisProvider> {
    DecodingSource::new(HarrisProvider::default(), IngestConfig::default())
}

fn best_frame(matcher: &Matcher, cache: &FingerprintCache, inventory: &Inventory, id: &str) -> Option<u32> {
    let entry = inventory.find(id).unwrap();
    let result = match_entry(matcher, cache, &decoder(), entry).unwrap();
    result
        .best_image_id()
        .and_then(|best| ImageId::new(best).kind().frame())
}

#[test]
fn hints_match_their_source_frames() {
    let dir = corpus();
    let inventory = Inventory::scan_dir(dir.path(), &IngestConfig::default()).unwrap();
    assert_eq!(inventory.len(), 6);
    assert_eq!(inventory.full_frames().count(), 3);

    let build = build_corpus_index(&inventory, &decoder(), &fingerprint_cfg()).unwrap();
    assert!(build.is_clean(), "degraded: {:?}", build.degraded);
    assert_eq!(
        build.index.ids().collect::<Vec<_>>(),
        vec!["frame1-full.png", "frame2-full.png", "frame3-full.png"]
    );

    let matcher = Matcher::new(build.index, fingerprint_cfg(), MatchConfig::default()).unwrap();
    let cache = FingerprintCache::new(fingerprint_cfg()).unwrap();

    assert_eq!(best_frame(&matcher, &cache, &inventory, "frame2-1.png"), Some(2));
    assert_eq!(best_frame(&matcher, &cache, &inventory, "frame1-1.png"), Some(1));
    assert_eq!(best_frame(&matcher, &cache, &inventory, "frame3-full.png"), Some(3));
}

#[test]
fn blank_hint_is_no_confident_match() {
    let dir = corpus();
    let inventory = Inventory::scan_dir(dir.path(), &IngestConfig::default()).unwrap();
    let build = build_corpus_index(&inventory, &decoder(), &fingerprint_cfg()).unwrap();
    let matcher = Matcher::new(build.index, fingerprint_cfg(), MatchConfig::default()).unwrap();
    let cache = FingerprintCache::new(fingerprint_cfg()).unwrap();

    let entry = inventory.find("frame3-1.png").unwrap();
    let report = cache.get_or_compute(&decoder(), entry).unwrap();
    assert!(report.is_degraded());

    let result = matcher.match_fingerprint(&report.fingerprint).unwrap();
    assert_eq!(result.outcome, MatchOutcome::NoConfidentMatch);
    assert_eq!(result.overlap_counts(), vec![0, 0, 0]);
}

#[test]
fn sidecars_reproduce_the_decoded_index() {
    let dir = corpus();
    let ingest_cfg = IngestConfig::default();
    let inventory = Inventory::scan_dir(dir.path(), &ingest_cfg).unwrap();
    let decoder = decoder();
    for entry in &inventory {
        let keypoints = decoder.keypoints(entry).unwrap();
        write_sidecar(entry, &keypoints, &ingest_cfg).unwrap();
    }

    let decoded = build_corpus_index(&inventory, &decoder, &fingerprint_cfg()).unwrap();
    let stored =
        build_corpus_index(&inventory, &SidecarSource::new(ingest_cfg), &fingerprint_cfg()).unwrap();
    for (a, b) in decoded.index.iter().zip(stored.index.iter()) {
        assert_eq!(a.image_id(), b.image_id());
        assert_eq!(a.tokens(), b.tokens());
    }
}

fn assert_same_index(a: &FingerprintIndex, b: &FingerprintIndex) {
    assert_eq!(a.ids().collect::<Vec<_>>(), b.ids().collect::<Vec<_>>());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.fingerprint(), y.fingerprint());
    }
}

#[test]
fn persisted_index_round_trips() {
    let dir = corpus();
    let inventory = Inventory::scan_dir(dir.path(), &IngestConfig::default()).unwrap();
    let build = build_corpus_index(&inventory, &decoder(), &fingerprint_cfg()).unwrap();

    let db = dir.path().join("index.redb");
    let cfg = IndexConfig::new().with_backend(BackendConfig::redb(db.to_string_lossy().to_string()));
    {
        let store = IndexStore::open(cfg.clone()).unwrap();
        assert_eq!(store.save(&build.index).unwrap(), 3);
    }
    let loaded = IndexStore::open(cfg).unwrap().load().unwrap();
    assert_same_index(&build.index, &loaded);

    let json = build.index.to_json_string().unwrap();
    let doc: IndexDocument = serde_json::from_str(&json).unwrap();
    let imported = FingerprintIndex::try_from(doc).unwrap();
    assert_same_index(&build.index, &imported);
    assert_eq!(imported.to_json_string().unwrap(), json);
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let yaml = format!(
        r#"
version: "1"
fingerprint:
  k: 2
corpus:
  dir: "{}"
  keypoint_source: "decode"
index:
  backend: "redb"
  path: "{}"
  cache_path: "{}"
"#,
        dir.display(),
        dir.join("index.redb").display(),
        dir.join("cache.redb").display(),
    );
    let path = dir.join("framefp.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn config_file_drives_the_pipeline() {
    let dir = corpus();
    let cfg = FramefpConfig::from_file(write_config(dir.path())).unwrap();
    let inventory = Inventory::scan_dir(&cfg.corpus.dir, &cfg.ingest_config()).unwrap();
    let source = DecodingSource::new(
        HarrisProvider::new(cfg.corpus.harris.clone()).unwrap(),
        cfg.ingest_config(),
    );

    let build = build_corpus_index(&inventory, &source, &cfg.fingerprint_config()).unwrap();
    IndexStore::open(cfg.index_config().unwrap())
        .unwrap()
        .save(&build.index)
        .unwrap();

    let index = IndexStore::open(cfg.index_config().unwrap())
        .unwrap()
        .load()
        .unwrap();
    let matcher = Matcher::new(index, cfg.fingerprint_config(), cfg.match_config()).unwrap();
    let cache = FingerprintCache::new(cfg.fingerprint_config())
        .unwrap()
        .with_store(IndexStore::open(cfg.cache_config().unwrap()).unwrap());

    let entry = inventory.find("frame2-1.png").unwrap();
    let result = match_entry(&matcher, &cache, &source, entry).unwrap();
    assert_eq!(result.best_image_id(), Some("frame2-full.png"));
    assert_eq!(cache.computed(), 1);
}
