use anyhow::{Context, Result};
use std::env;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info};

use truthlens::db::Database;
use truthlens::environment::Settings;
use truthlens::filter::types::RawArticle;
use truthlens::filter::ArticleScoringPipeline;
use truthlens::logging::configure_logging;
use truthlens::viral::{CrossSourceVerifier, ViralClusterDetector};
use truthlens::TARGET_VIRAL;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    configure_logging("truthlens", &settings.log_dir);

    info!("Opening database at {}", settings.database_path);
    let db = Database::new(&settings.database_path).await?;

    let pipeline = ArticleScoringPipeline::from_settings(db.clone(), &settings);
    pipeline.credibility_store().initialize_defaults().await?;

    // Optional JSON file of raw articles to ingest before the first run.
    if let Some(path) = env::args().nth(1) {
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
        let articles: Vec<RawArticle> =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
        pipeline.ingest_batch(articles).await?;
    }

    let detector = ViralClusterDetector::from_settings(db.clone(), &settings);
    let verifier = CrossSourceVerifier::from_settings(db.clone(), &settings);

    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
        }
        let _ = cancel_tx.send(true);
    });

    info!(
        "Running detection and verification every {:?} over a {}h window",
        settings.run_interval, settings.detection_window_hours
    );

    loop {
        run_cycle(&detector, &verifier, &settings).await;

        tokio::select! {
            _ = cancel_rx.changed() => {
                info!("Ctrl-C received, stopping.");
                break;
            }
            _ = sleep(settings.run_interval) => {}
        }
    }

    db.close().await;
    Ok(())
}

/// One detection pass followed by verification of the most viral unverified stories.
///
/// Failures are logged; the next cycle tries again.
async fn run_cycle(detector: &ViralClusterDetector, verifier: &CrossSourceVerifier, settings: &Settings) {
    match detector.detect().await {
        Ok(created) => info!(target: TARGET_VIRAL, "Detection found {} new viral stories", created.len()),
        Err(e) => error!(target: TARGET_VIRAL, "Viral detection failed: {}", e),
    }

    match verifier
        .verify_pending(settings.verify_batch_limit, settings.verify_min_virality)
        .await
    {
        Ok(verified) => {
            for story in &verified {
                info!(target: TARGET_VIRAL, " - {} => {} ({}%)", story.title, story.verification.status, story.verification.confidence_score);
            }
        }
        Err(e) => error!(target: TARGET_VIRAL, "Verification batch failed: {}", e),
    }
}
