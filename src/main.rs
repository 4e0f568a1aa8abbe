use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stillsky_core::{Config, TemperatureUnit};
use stillsky_weather::{
    ApiConfig, Coordinates, FetchSession, FetchState, FetchTarget, FixedPosition, ForecastSeries,
    IconSize, LocationResolver, OpenWeatherClient, WeatherOrchestrator, WeatherSnapshot,
    DEMO_LOCATION_NAME,
};

const ABOUT: &str = "Weather for a city or a position, from OpenWeatherMap";

#[derive(Parser, Debug)]
#[command(name = "stillsky", version, about = ABOUT)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Temperature unit for output, overriding the config
    #[arg(long, global = true, value_enum)]
    unit: Option<UnitArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for places matching a name
    Search {
        query: String,
    },
    /// Fetch current conditions and the forecast
    Weather(WeatherArgs),
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct WeatherArgs {
    #[arg(long, requires = "lon", allow_hyphen_values = true, conflicts_with_all = ["city", "locate"])]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    #[arg(long, conflicts_with = "locate")]
    city: Option<String>,

    /// Use the position from `[location]` in the config
    #[arg(long)]
    locate: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a config file with default values
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show,
    /// Check the config for errors
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnitArg {
    Celsius,
    Fahrenheit,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Celsius => TemperatureUnit::Celsius,
            UnitArg::Fahrenheit => TemperatureUnit::Fahrenheit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Config { action } = &cli.command {
        return run_config(action, cli.config.as_deref());
    }

    let (mut config, validation) = Config::load_validated(cli.config.as_deref())?;
    if let Some(unit) = cli.unit {
        config.weather.temperature_unit = unit.into();
    }

    stillsky_core::init(&config.logging.level)?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }
    tracing::info!("StillSky started");

    let client = OpenWeatherClient::new(ApiConfig::from(&config.weather))
        .context("Failed to build HTTP client")?;
    let resolver = LocationResolver::new(client.clone(), config.search.clone());

    match cli.command {
        Command::Search { query } => {
            let candidates = resolver.search(&query).await;
            if candidates.is_empty() {
                println!("No locations found for \"{}\"", query.trim());
            }
            for (i, c) in candidates.iter().enumerate() {
                println!(
                    "{:>2}. {:<24} {:<28} {}",
                    i + 1,
                    c.name,
                    c.region_label(),
                    c.coordinates()
                );
            }
        }
        Command::Weather(args) => {
            let mut orchestrator =
                WeatherOrchestrator::new(client.clone(), resolver, config.demo.clone());
            if let Some((lat, lon)) = config.location.coordinates() {
                orchestrator = orchestrator
                    .with_geolocator(Arc::new(FixedPosition(Coordinates::new(lat, lon))));
            }

            let target = match (args.lat, args.lon, args.city) {
                (Some(lat), Some(lon), _) => FetchTarget::Coordinates(Coordinates::new(lat, lon)),
                (_, _, Some(city)) => FetchTarget::City(city),
                _ if args.locate => FetchTarget::CurrentPosition,
                _ => FetchTarget::City(String::new()),
            };

            let mut session = FetchSession::new();
            let state = orchestrator.run(&mut session, target).await;
            print_state(state, &client, config.weather.temperature_unit);
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

fn run_config(action: &ConfigAction, path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path()?,
    };

    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load(Some(path.as_path()))?;
            println!("# {}", path.display());
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Validate => {
            let config = Config::load(Some(path.as_path()))?;
            let result = config.validate();
            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
            for error in &result.errors {
                println!("error: {}", error);
            }
            if !result.is_valid() {
                anyhow::bail!("{} is invalid", path.display());
            }
            println!("{} is valid", path.display());
        }
    }

    Ok(())
}

fn print_state(state: &FetchState, client: &OpenWeatherClient, unit: TemperatureUnit) {
    match state {
        FetchState::Success {
            report,
            display_name,
        } => {
            print_snapshot(display_name, &report.snapshot, client, unit);
            print_forecast(&report.forecast, unit);
        }
        FetchState::Fallback { snapshot, advisory } => {
            println!("! {}", advisory);
            println!();
            print_snapshot(DEMO_LOCATION_NAME, snapshot, client, unit);
        }
        FetchState::Idle | FetchState::Loading { .. } => {}
    }
}

fn print_snapshot(
    name: &str,
    s: &WeatherSnapshot,
    client: &OpenWeatherClient,
    unit: TemperatureUnit,
) {
    println!("{}", name);
    println!(
        "  {}  {} ({})",
        unit.format(s.temperature),
        s.condition.kind().description(),
        s.condition.description
    );
    println!(
        "  Feels like {}   Low {}   High {}",
        unit.format(s.feels_like),
        unit.format(s.temp_min),
        unit.format(s.temp_max)
    );
    println!(
        "  Humidity {}%   Pressure {} hPa   Wind {:.1} m/s",
        s.humidity, s.pressure, s.wind_speed
    );
    if let Some(km) = s.visibility_km() {
        println!("  Visibility {:.1} km", km);
    }
    println!(
        "  Sunrise {}   Sunset {}",
        s.sunrise.format("%H:%M UTC"),
        s.sunset.format("%H:%M UTC")
    );
    println!(
        "  Icon {}",
        client.icon_url(&s.condition.icon, IconSize::Double)
    );
}

fn print_forecast(forecast: &ForecastSeries, unit: TemperatureUnit) {
    println!();
    println!("Next 24 hours");
    for entry in forecast.next_24_hours() {
        println!(
            "  {}  {:>6}  {:>3}%  {}",
            entry.time.format("%a %H:%M"),
            unit.format(entry.temperature),
            entry.precipitation_chance(),
            entry.condition.description
        );
    }

    println!();
    println!("5-day forecast");
    for entry in forecast.next_5_days() {
        println!(
            "  {}  {:>6} / {:<6}  {}",
            entry.time.format("%a %d %b"),
            unit.format(entry.temp_max),
            unit.format(entry.temp_min),
            entry.condition.kind().description()
        );
    }
}
