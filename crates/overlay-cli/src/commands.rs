use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use overlay_cache::CacheStats;
use overlay_placement::{DetectionReport, OverlayConfig, PlacementCoordinator};
use overlay_types::{Anchor, Detection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cli::*;
use crate::sim::{FsAssetLoader, LoggingScene, ModelBlob, SimulatedHitTester};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::CheckConfig(args) => cmd_check_config(args, cli.format),
        Command::Replay(args) => cmd_replay(args, cli.format).await,
    }
}

fn cmd_check_config(args: CheckConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = OverlayConfig::load(&args.path)
        .with_context(|| format!("invalid config {}", args.path.display()))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{} {} is valid", "✓".green().bold(), args.path.display().to_string().bold());
    println!("  Default model: {}", config.default_model.cyan());
    println!("  Default scale: {}", config.default_scale);
    println!("  Manual category: {}", config.manual_category.yellow());
    println!("  Models:");
    for (category, model) in &config.models {
        let scale = config.scale_table().scale_for(category);
        println!("    {:<16} {} (scale {})", category.yellow(), model.cyan(), scale);
    }
    for category in config.scales.keys().filter(|c| !config.models.contains_key(*c)) {
        println!(
            "    {:<16} {} (scale {})",
            category.yellow(),
            config.default_model.dimmed(),
            config.scales[category]
        );
    }
    Ok(())
}

/// One recorded camera frame: its size, detections, and optional taps.
#[derive(Debug, Deserialize)]
struct FrameBatch {
    frame_width: u32,
    frame_height: u32,
    #[serde(default)]
    detections: Vec<Detection>,
    /// Raw anchors of manual placements made during this frame.
    #[serde(default)]
    taps: Vec<u64>,
}

#[derive(Debug, Default, Serialize)]
struct ReplaySummary {
    batches: usize,
    detections: usize,
    placed: usize,
    manual: usize,
    no_surface: usize,
    invalid: usize,
    abandoned: usize,
    attach_failed: usize,
    active: usize,
    /// Scene nodes still attached after teardown.
    leaked_nodes: usize,
    cache: CacheStats,
}

impl ReplaySummary {
    fn record(&mut self, report: &DetectionReport) {
        self.batches += 1;
        self.detections += report.detections;
        self.placed += report.placed.len();
        self.no_surface += report.no_surface;
        self.invalid += report.invalid;
        self.abandoned += report.abandoned;
        self.attach_failed += report.attach_failed;
    }
}

fn read_batches(path: &Path) -> anyhow::Result<Vec<FrameBatch>> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&input)
        .with_context(|| format!("malformed detections in {}", path.display()))
}

async fn cmd_replay(args: ReplayArgs, format: OutputFormat) -> anyhow::Result<()> {
    let summary = replay(&args).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

/// Run every recorded frame through a fresh coordinator, then tear it down.
async fn replay(args: &ReplayArgs) -> anyhow::Result<ReplaySummary> {
    let config = match &args.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => OverlayConfig::default(),
    };
    let batches = read_batches(&args.detections)?;

    let scene = Arc::new(LoggingScene::new());
    let coordinator = PlacementCoordinator::<ModelBlob>::from_config(
        &config,
        Arc::new(FsAssetLoader::new(&args.assets)),
        Arc::new(SimulatedHitTester::new(args.miss_every)),
        scene.clone(),
    );

    let mut summary = ReplaySummary::default();
    for (index, batch) in batches.iter().enumerate() {
        let report = coordinator
            .on_detections(&batch.detections, batch.frame_width, batch.frame_height)
            .await;
        info!(batch = index, placed = report.placed.len(), "replayed frame");
        summary.record(&report);

        for tap in &batch.taps {
            if coordinator.on_manual_placement(Anchor::from_raw(*tap)).await.is_some() {
                summary.manual += 1;
            }
        }
    }
    summary.active = coordinator.active_count();
    summary.cache = coordinator.resources().stats();

    coordinator.teardown();
    coordinator.resources().dispose();
    summary.leaked_nodes = scene.live();
    Ok(summary)
}

fn print_summary(summary: &ReplaySummary) {
    println!(
        "{} Replayed {} frames, {} detections",
        "✓".green().bold(),
        summary.batches.to_string().bold(),
        summary.detections.to_string().bold()
    );
    println!("  Placed: {}", summary.placed.to_string().green());
    println!("  Manual: {}", summary.manual.to_string().green());
    println!("  No surface: {}", summary.no_surface.to_string().yellow());
    println!("  Invalid: {}", summary.invalid.to_string().yellow());
    println!("  Load failures: {}", summary.abandoned.to_string().red());
    println!("  Attach failures: {}", summary.attach_failed.to_string().red());
    println!("  Active at end: {}", summary.active);
    println!(
        "  Cache: {} hits, {} coalesced, {} loads, {} failed",
        summary.cache.hits, summary.cache.coalesced, summary.cache.misses, summary.cache.failures
    );
    if summary.leaked_nodes > 0 {
        println!("  {} {} nodes still attached", "!".red().bold(), summary.leaked_nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_parse_with_optional_fields() {
        let input = r#"[
            {
                "frame_width": 640,
                "frame_height": 480,
                "detections": [
                    {
                        "bounding_box": {"left": 10, "top": 10, "right": 50, "bottom": 50},
                        "categories": [{"label": "couch", "score": 0.8}]
                    }
                ]
            },
            {"frame_width": 640, "frame_height": 480, "taps": [7]}
        ]"#;
        let batches: Vec<FrameBatch> = serde_json::from_str(input).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].detections[0].top_category().unwrap().label, "couch");
        assert!(batches[1].detections.is_empty());
        assert_eq!(batches[1].taps, vec![7]);
    }

    #[tokio::test]
    async fn replay_runs_batches_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        std::fs::create_dir(&assets).unwrap();
        std::fs::write(assets.join("sofa.glb"), b"glTF").unwrap();
        std::fs::write(assets.join("default.glb"), b"glTF").unwrap();

        let detections = dir.path().join("frames.json");
        std::fs::write(
            &detections,
            r#"[{"frame_width": 100, "frame_height": 100, "detections": [
                {"bounding_box": {"left": 40, "top": 40, "right": 60, "bottom": 60},
                 "categories": [{"label": "couch", "score": 0.9}]}
            ], "taps": [3]}]"#,
        )
        .unwrap();

        let args = ReplayArgs {
            config: None,
            assets,
            detections,
            miss_every: 0,
        };
        let summary = replay(&args).await.unwrap();
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.detections, 1);
        assert_eq!(summary.placed, 1);
        assert_eq!(summary.manual, 1);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.cache.misses, 2);
        assert_eq!(summary.leaked_nodes, 0);

        cmd_replay(args, OutputFormat::Json).await.unwrap();
    }

    #[tokio::test]
    async fn replay_counts_misses_and_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tv.glb"), b"glTF").unwrap();

        let detections = dir.path().join("frames.json");
        std::fs::write(
            &detections,
            r#"[{"frame_width": 100, "frame_height": 100, "detections": [
                {"bounding_box": {"left": 0, "top": 0, "right": 10, "bottom": 10},
                 "categories": [{"label": "tv", "score": 0.9}]},
                {"bounding_box": {"left": 0, "top": 0, "right": 10, "bottom": 10},
                 "categories": [{"label": "tv", "score": 0.9}]},
                {"bounding_box": {"left": 0, "top": 0, "right": 10, "bottom": 10},
                 "categories": [{"label": "bed", "score": 0.9}]}
            ]}]"#,
        )
        .unwrap();

        let args = ReplayArgs {
            config: None,
            assets: dir.path().to_path_buf(),
            detections,
            miss_every: 2,
        };
        let summary = replay(&args).await.unwrap();
        assert_eq!(summary.no_surface, 1);
        assert_eq!(summary.placed, 1);
        assert_eq!(summary.abandoned, 1);
        assert_eq!(summary.cache.failures, 1);
        assert_eq!(summary.leaked_nodes, 0);
    }

    #[tokio::test]
    async fn replay_reports_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let detections = dir.path().join("frames.json");
        std::fs::write(&detections, "{not json").unwrap();

        let args = ReplayArgs {
            config: None,
            assets: dir.path().to_path_buf(),
            detections,
            miss_every: 0,
        };
        let err = cmd_replay(args, OutputFormat::Text).await.unwrap_err();
        assert!(err.to_string().contains("malformed detections"));
    }
}
