pub mod aggregate;
pub mod carving;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod render;
pub mod server;
pub mod types;

use clap::{Parser, Subcommand};
use geo::Coord;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one viewport to JSON on stdout
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Upper-left viewport corner x
        #[arg(long)]
        left: f64,
        /// Upper-left viewport corner y
        #[arg(long)]
        top: f64,
        /// Lower-right viewport corner x
        #[arg(long)]
        right: f64,
        /// Lower-right viewport corner y
        #[arg(long)]
        bottom: f64,
    },
    /// Serve renders over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render {
            config,
            left,
            top,
            right,
            bottom,
        } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let regions = data::load_regions(&app_config)?;
            let cities = data::load_cities(&app_config)?;

            let viewport = types::Viewport::new(
                Coord { x: *left, y: *top },
                Coord {
                    x: *right,
                    y: *bottom,
                },
            );
            let options = app_config.render.to_options();
            let output = render::render_map(&viewport, &regions, &cities, &options)?;

            let response = server::RenderResponse {
                cells: output.cells.iter().map(render::CellOutput::from).collect(),
                table: output.point_table,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let regions = data::load_regions(&app_config)?;
            let cities = data::load_cities(&app_config)?;

            server::start_server(app_config, regions, cities).await?;
        }
    }

    Ok(())
}
