// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use waymark_core::cache::GeocodeCache;
use waymark_core::place::is_valid_coordinate;
use waymark_core::{
    BatchOutcome, CameraState, GoogleGeocoder, LocationResolver, MapAnimationController,
    MapSession, PrimaryDestination, Settings,
};
use waymark_extract::{parse_heading, EntityExtractor};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Geocoding API key
    #[arg(short, long, env = "WAYMARK_GEOCODE_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    /// Settings file (defaults to settings.json in the config directory);
    /// extractor.json is read from the same directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate place names found in an itinerary
    Extract {
        /// Itinerary file, or - for stdin
        input: PathBuf,
    },
    /// Geocode the candidates of an itinerary and print the ones that resolve
    Resolve {
        input: PathBuf,
        /// Disambiguating context (defaults to the itinerary heading)
        #[arg(long)]
        context: Option<String>,
    },
    /// Show the zoom sequence a fly-to would run, without geocoding
    Plan {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Starting zoom level
        #[arg(long, default_value_t = 2)]
        zoom: u8,
    },
    /// Full pipeline: markers plus the camera run to the destination
    Run { input: PathBuf },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("waymark")
        .build();
    // Only fails if a logger is already installed
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::try_load(path)?,
        None => Settings::load(&Settings::default_path()),
    };
    settings.validate()?;
    Ok(settings)
}

/// `extractor.json` sits next to the settings file given with `--config`.
fn extractor_path(config: Option<&Path>) -> Option<PathBuf> {
    config.map(|path| {
        path.parent()
            .unwrap_or_else(|| Path::new(""))
            .join("extractor.json")
    })
}

fn load_extractor(config: Option<&Path>) -> Result<EntityExtractor> {
    match extractor_path(config) {
        Some(path) => Ok(EntityExtractor::at_path(path)),
        None => EntityExtractor::new(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Extract { input } => {
            let text = read_input(input)?;
            let names = load_extractor(cli.config.as_deref())?.extract(&text);
            if cli.json {
                print_json(&names)?;
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
        }
        Commands::Resolve { input, context } => {
            let settings = load_settings(cli.config.as_deref())?;
            let text = read_input(input)?;
            let names = load_extractor(cli.config.as_deref())?.extract(&text);
            let context = context.clone().or_else(|| parse_heading(&text));

            let key = settings.api_key(cli.key.as_deref()).ok_or_else(|| {
                anyhow::anyhow!("No API key. Pass --key or set WAYMARK_GEOCODE_KEY.")
            })?;
            let geocoder =
                GoogleGeocoder::new(&settings.endpoint, &key, settings.request_timeout())?;
            let resolver = LocationResolver::new(
                Arc::new(geocoder),
                GeocodeCache::new(settings.cache_capacity, settings.cache_ttl()),
            );

            let places = resolver.resolve_all(&names, context.as_deref()).await;
            if cli.json {
                print_json(&places)?;
            } else {
                println!(
                    "Resolved {} of {} candidates{}",
                    places.len(),
                    names.len(),
                    context.map(|c| format!(" near {}", c)).unwrap_or_default()
                );
                for place in &places {
                    println!("{:>10.5} {:>11.5}  {}", place.lat, place.lng, place.name);
                }
            }
        }
        Commands::Plan { lat, lng, zoom } => {
            if !is_valid_coordinate(*lat, *lng) {
                anyhow::bail!("({}, {}) is not a valid coordinate", lat, lng);
            }
            let settings = load_settings(cli.config.as_deref())?;
            let controller =
                MapAnimationController::new(CameraState::default(), settings.animation);
            let destination = PrimaryDestination {
                name: String::new(),
                lat: *lat,
                lng: *lng,
            };
            let target = controller.plan(*zoom, &destination);
            if cli.json {
                print_json(&target)?;
            } else {
                let steps: Vec<String> =
                    target.zoom_sequence.iter().map(u8::to_string).collect();
                println!("Target: {}, {}", target.lat, target.lng);
                println!("Zoom: {} → {}", zoom, steps.join(" → "));
            }
        }
        Commands::Run { input } => {
            let settings = load_settings(cli.config.as_deref())?;
            let text = read_input(input)?;
            let mut session =
                MapSession::from_settings(settings, cli.key.as_deref(), CameraState::default())?
                    .with_extractor(load_extractor(cli.config.as_deref())?);
            session.init()?;

            let outcome = session.ingest(&text).await;
            if let Some(driver) = session.driver() {
                driver.finished().await;
            }

            if cli.json {
                print_json(&outcome)?;
            } else if let BatchOutcome::Applied { markers, .. } = &outcome {
                match session.destination() {
                    Some(d) => println!("Destination: {} ({}, {})", d.name, d.lat, d.lng),
                    None => println!("Destination: unknown"),
                }
                println!("Markers: {}", markers.len());
                for place in markers.iter() {
                    println!("{:>10.5} {:>11.5}  {}", place.lat, place.lng, place.name);
                }
                if let Some(target) = session.camera_target() {
                    let steps: Vec<String> =
                        target.zoom_sequence.iter().map(u8::to_string).collect();
                    println!("Camera: {}", steps.join(" → "));
                }
                if let Some(driver) = session.driver() {
                    driver.with_camera(|cam| {
                        println!("Final view: {}, {} @ zoom {}", cam.lat, cam.lng, cam.zoom)
                    });
                }
            }
            session.dispose();
        }
    }

    Ok(())
}
