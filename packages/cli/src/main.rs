#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for crime risk lookup and prediction.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crime_risk_geocoder::Geocoder;
use crime_risk_prediction_models::{Borough, Gender, PlaceType, Race, UserQuery};
use crime_risk_predictor::{PredictionContext, PredictionOutcome, paths};
use crime_risk_server::ServerConfig;
use crime_risk_spatial::SpatialLocator;

#[derive(Parser)]
#[command(name = "crime_risk", about = "NYC crime risk lookup and prediction")]
struct Cli {
    /// Data directory holding `model/` and `boundaries/` (overrides
    /// `CRIME_RISK_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the precinct and borough containing a point
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Predict the most likely crime category for a visit
    Predict {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Visit date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Visit hour, 0-23
        #[arg(long)]
        hour: u32,
        /// Place type (e.g. "On street", "In park")
        #[arg(long, default_value = "On street")]
        place: String,
        #[arg(long)]
        age: u32,
        /// Race category (e.g. "WHITE", "BLACK HISPANIC")
        #[arg(long)]
        race: Race,
        /// "Male" or "Female"
        #[arg(long)]
        gender: Gender,
        /// Precinct number; skips the boundary lookup when given with `--borough`
        #[arg(long, requires = "borough")]
        precinct: Option<u32>,
        /// Borough name; skips the boundary lookup when given with `--precinct`
        #[arg(long, requires = "precinct")]
        borough: Option<Borough>,
    },
    /// Look up the coordinates of an address or place name
    Geocode {
        /// Free-form query (e.g. "Empire State Building")
        query: String,
    },
    /// Start the API server
    Serve {
        /// Address to bind (overrides `BIND_ADDR`)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(paths::data_dir);
    let model_dir = data_dir.join("model");
    let boundaries_dir = data_dir.join("boundaries");

    match cli.command {
        Commands::Locate { lat, lon } => {
            let locator = SpatialLocator::load(&boundaries_dir)?;
            let location = locator.locate(lat, lon);
            println!("Precinct: {}", display_or_none(location.precinct));
            println!("Borough:  {}", display_or_none(location.borough));
            if !location.is_resolved() {
                println!("No location resolved; predictions are unavailable here.");
            }
        }
        Commands::Predict {
            lat,
            lon,
            date,
            hour,
            place,
            age,
            race,
            gender,
            precinct,
            borough,
        } => {
            let context = PredictionContext::load(&model_dir)?;
            let query = UserQuery {
                observation_date: date,
                observation_hour: hour,
                latitude: lat,
                longitude: lon,
                place_type: PlaceType::from_label_lossy(&place),
                age,
                race,
                gender,
                precinct,
                borough,
            };

            let outcome = if query.is_location_resolved() {
                context.predict(&query)?
            } else {
                let locator = SpatialLocator::load(&boundaries_dir)?;
                context.predict_at(&query, &locator)?
            };
            print_outcome(&outcome);
        }
        Commands::Geocode { query } => {
            let geocoder = Geocoder::nominatim()?;
            match geocoder.geocode(&query).await? {
                Some(point) => {
                    println!("{:.6}, {:.6}", point.latitude, point.longitude);
                    if let Some(name) = point.display_name {
                        println!("{name}");
                    }
                }
                None => {
                    println!("No match for {query:?}");
                }
            }
        }
        Commands::Serve { bind, port } => {
            let defaults = ServerConfig::from_env();
            let config = ServerConfig {
                model_dir,
                boundaries_dir,
                bind_addr: bind.unwrap_or(defaults.bind_addr),
                port: port.unwrap_or(defaults.port),
            };

            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(crime_risk_server::run_server(config))
            })
            .await??;
        }
    }

    Ok(())
}

fn display_or_none<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "(none)".to_string(), |v| v.to_string())
}

fn print_outcome(outcome: &PredictionOutcome) {
    let prediction = &outcome.prediction;
    println!(
        "Precinct {} ({}): most likely {}",
        outcome.precinct, outcome.borough, prediction.category
    );
    if let Some(probabilities) = &prediction.probabilities {
        for p in probabilities {
            println!("  {:<16} {:>6.1}%", p.category, p.probability * 100.0);
        }
    }
    println!();
    println!("Offenses:");
    for offense in &prediction.offenses {
        println!("  - {offense}");
    }
    if !outcome.substitutions.is_empty() {
        println!();
        println!(
            "{} input(s) fell back to a default encoding; see the log for details.",
            outcome.substitutions.len()
        );
    }
}
