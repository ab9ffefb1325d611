//! Replay binary: `fer-replay <input.jsonl> [output.jsonl]`.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::fs::File;
use tokio::io::{BufReader, BufWriter};
use tracing::info;

use fer_replay::{logging, run_replay, PipelineControl, ReplayConfig, ReplaySession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .context("usage: fer-replay <input.jsonl> [output.jsonl]")?;
    let output = args.next();

    let config = ReplayConfig::from_env();
    info!("Replay config: {:?}", config);

    let metrics_handle = match &config.metrics_dump {
        Some(_) => Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?,
        ),
        None => None,
    };

    let smoothing = config.load_smoothing_config().await?;
    info!("Smoothing config: {:?}", smoothing);

    let control = PipelineControl::new();
    let signal_control = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_control.cancel();
        }
    });

    let mut session = ReplaySession::new(&config, smoothing, control);
    let reader = BufReader::new(
        File::open(&input)
            .await
            .with_context(|| format!("Failed to open {}", input))?,
    );

    match &output {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path))?;
            run_replay(&mut session, reader, BufWriter::new(file)).await?;
        }
        None => run_replay(&mut session, reader, tokio::io::stdout()).await?,
    }

    let summary = session.summary();
    info!(
        frames_processed = summary.frames_processed,
        frames_skipped = summary.frames_skipped,
        config_updates = summary.config_updates,
        "Replay finished"
    );
    info!("Summary: {}", serde_json::to_string(summary)?);

    for (key, timeline) in session.timelines() {
        info!(
            ?key,
            points = timeline.len(),
            latest = ?timeline.latest(),
            "Final timeline"
        );
    }

    if let (Some(handle), Some(path)) = (metrics_handle, &config.metrics_dump) {
        tokio::fs::write(path, handle.render())
            .await
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        info!("Metrics written to {}", path.display());
    }

    Ok(())
}
