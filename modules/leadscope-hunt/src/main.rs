use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use leadscope_common::Config;
use leadscope_hunt::campaign::Campaign;
use leadscope_hunt::insight::{HttpInsightClient, InsightClient, NoopInsightClient};
use leadscope_hunt::sink::{MemorySink, PostgresSink, RecordSink};
use leadscope_hunt::sources;

#[derive(Parser, Debug)]
#[command(name = "leadscope-hunt", about = "Multi-source entity collection campaign")]
struct Args {
    /// Use the in-memory sink even when DATABASE_URL is set.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscope=info".parse()?))
        .init();

    let args = Args::parse();

    info!("LeadScope campaign starting...");

    let config = Config::from_env()?;

    let sink: Arc<dyn RecordSink> = match (&config.database_url, args.offline) {
        (Some(url), false) => {
            let sink = PostgresSink::connect(url).await?;
            sink.migrate().await?;
            Arc::new(sink)
        }
        _ => {
            warn!("No database configured, persisting to the in-memory sink");
            Arc::new(MemorySink::new())
        }
    };

    let insight: Arc<dyn InsightClient> = match config.insight_api_url {
        Some(ref url) => Arc::new(HttpInsightClient::new(url)),
        None => Arc::new(NoopInsightClient),
    };

    let phases = sources::build_phases(&config);
    let campaign = Campaign::new(&config, phases, sink.clone(), insight)?;

    // Interrupt stops new task submission and lets in-flight work drain.
    let cancel = campaign.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, draining in-flight tasks");
            cancel.cancel();
        }
    });

    let stats = campaign.run().await?;
    let total = sink.count().await?;
    info!(records_in_sink = total, "Campaign complete. {stats}");

    Ok(())
}
