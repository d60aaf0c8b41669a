use clap::{Parser, Subcommand};
use iive_map::config::{AppConfig, LoggingConfig};
use iive_map::dashboard::{Dashboard, DashboardView};
use iive_map::{page, render, server};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the choropleth for one year to an SVG or PNG file
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Defaults to the latest configured year
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long, value_name = "FILE", default_value = "iive.png")]
        out: PathBuf,
    },
    /// Print the county table for one year
    Table {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long)]
        year: Option<i32>,
    },
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("iive_map={},tower_http=info", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn pick_year(dashboard: &Dashboard, year: Option<i32>) -> anyhow::Result<i32> {
    let year = match year {
        Some(year) => year,
        None => dashboard.default_year().ok_or_else(|| anyhow::anyhow!("No years configured"))?,
    };
    if !dashboard.is_supported_year(year) {
        anyhow::bail!("Year {} is not one of {:?}", year, dashboard.years());
    }
    Ok(year)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Serve { config } | Commands::Render { config, .. } | Commands::Table { config, .. } => config,
    };
    let app_config = AppConfig::load_or_default(config_path)?;
    init_logging(&app_config.logging);
    if !config_path.exists() {
        tracing::info!("No config at {:?}, using defaults", config_path);
    }

    let dashboard = Dashboard::new(app_config)?;

    match &cli.command {
        Commands::Serve { .. } => {
            // Warm the cache so the first page view does not wait on the API.
            dashboard.warm_up().await?;
            server::start_server(dashboard).await?;
        }
        Commands::Render { year, out, .. } => {
            let year = pick_year(&dashboard, *year)?;
            match dashboard.view(year).await? {
                DashboardView::Ready { year, rows, bounds } => {
                    render::save_map(&rows, bounds, year, &dashboard.config().map, out)?;
                }
                DashboardView::NoData { error } => {
                    if let Some(error) = error {
                        eprintln!("{}", error);
                    }
                    anyhow::bail!(page::NO_DATA_WARNING);
                }
                DashboardView::EmptyYear { year } => anyhow::bail!(page::empty_year_warning(year)),
            }
        }
        Commands::Table { year, .. } => {
            let year = pick_year(&dashboard, *year)?;
            match dashboard.view(year).await? {
                DashboardView::Ready { rows, .. } => {
                    println!("{:<20} {:>12} {:>10} {:>14}", "Maakond", "Elussünnid", "Surmad", "Loomulik iive");
                    for row in rows.iter().map(|r| r.table_row()) {
                        println!("{:<20} {:>12} {:>10} {:>14}", row.region, row.births, row.deaths, row.natural_change);
                    }
                }
                DashboardView::NoData { error } => {
                    if let Some(error) = error {
                        eprintln!("{}", error);
                    }
                    println!("{}", page::NO_DATA_WARNING);
                }
                DashboardView::EmptyYear { year } => println!("{}", page::empty_year_warning(year)),
            }
        }
    }

    Ok(())
}
