pub mod aggregate;
pub mod cache;
pub mod color;
pub mod config;
pub mod error;
pub mod geokey;
pub mod navigation;
pub mod server;
pub mod sources;
pub mod types;

#[cfg(test)]
mod testutil;

use aggregate::DataAggregator;
use anyhow::Context;
use clap::{Parser, Subcommand};
use navigation::NavigationController;
use sources::{DataSources, HttpSources};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the drill-down navigation API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Fetch one view model and print it as JSON
    Snapshot {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// State FIPS code (e.g. 36); omit for the nation view
        #[arg(long)]
        state: Option<String>,
        /// County GEOID (e.g. 36001); requires --state
        #[arg(long, requires = "state")]
        county: Option<String>,
    },
}

fn build_aggregator(app_config: &config::AppConfig) -> anyhow::Result<Arc<DataAggregator>> {
    let sources = Arc::new(HttpSources::new(
        app_config.sources.clone(),
        &app_config.fetch,
    )?) as Arc<dyn DataSources>;
    Ok(Arc::new(DataAggregator::new(sources)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let aggregator = build_aggregator(&app_config)?;
            let mut nav = NavigationController::new(aggregator);

            println!("Bootstrapping nation datasets...");
            nav.bootstrap()
                .await
                .context("Initial data load failed; no nation view can be rendered")?;
            println!("Bootstrap complete.");

            server::start_server(app_config, nav).await?;
        }
        Commands::Snapshot {
            config,
            state,
            county,
        } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let aggregator = build_aggregator(&app_config)?;

            let rendered = match (state, county) {
                (None, _) => {
                    let view = aggregator.build_nation_view().await?;
                    serde_json::to_string_pretty(&view)?
                }
                (Some(state), None) => {
                    let id = geokey::normalize_state(state.as_str())?;
                    let view = aggregator.build_state_view(&id).await?;
                    serde_json::to_string_pretty(&view)?
                }
                (Some(state), Some(county)) => {
                    let state_id = geokey::normalize_state(state.as_str())?;
                    let county_id = geokey::normalize_county(county.as_str())?;
                    let view = aggregator.build_county_view(&state_id, &county_id).await?;
                    serde_json::to_string_pretty(&view)?
                }
            };
            println!("{rendered}");
        }
    }

    Ok(())
}
