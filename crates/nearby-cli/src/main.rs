mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nearby_core::params::{self, parse_widget_parameter};
use nearby_core::{
    AppError, Config, ConfigError, FileLogger, JsonFileManager, PerformanceDebugger, StorageDir,
    WidgetParams,
};
use nearby_places::{
    build_snapshot, flickr_pick, map_size, provider_for, Coordinates, RunContext, Services,
    Snapshot,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(name = "nearby", version, about, long_about = None)]
struct Cli {
    /// Widget parameter as JSON, e.g. '{"apiKey":"...","debug":true}'
    #[arg(short, long, env = "NEARBY_PARAM")]
    param: Option<String>,

    /// Base name of the parameter, metrics and log files
    #[arg(short, long)]
    name: Option<String>,

    /// Path to config.toml
    #[arg(short, long, env = "NEARBY_CONFIG")]
    config: Option<PathBuf>,

    /// Latitude override (requires --lng)
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    lat: Option<f64>,

    /// Longitude override (requires --lat)
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lng: Option<f64>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Widget summary when the parameters set `debug`, the detail list otherwise
    Run {
        /// Also save the map image here
        #[arg(long)]
        map_out: Option<PathBuf>,
    },
    /// Widget summary: area name, place count, refresh time
    Widget {
        #[arg(long)]
        map_out: Option<PathBuf>,
    },
    /// Detail list with links for every nearby place
    List {
        #[arg(long)]
        map_out: Option<PathBuf>,
    },
    /// Fetch and save the static map image
    Map {
        /// Output file; the extension is added when missing
        #[arg(long)]
        out: PathBuf,
        /// Center on a place name instead of the current location
        #[arg(long)]
        city: Option<String>,
    },
    /// Pick a photo from the configured Flickr photoset
    Flickr {
        /// Seed for a repeatable pick
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Inspect or store parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },
}

#[derive(Subcommand)]
enum ParamsAction {
    /// Show the resolved parameters and where they came from
    Show,
    /// Store parameters as the parameter file
    Save {
        /// Parameters as JSON
        #[arg(id = "params_json", value_name = "JSON")]
        json: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Presentation {
    Widget,
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = nearby_core::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{}\n{}", e, e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let (config, _) = Config::load_validated(cli.config.as_deref())?;
    let name = cli.name.clone().unwrap_or_else(|| config.script_name.clone());
    let storage = StorageDir::new(&config.storage_dir);
    let files = JsonFileManager::new(storage.clone());

    if let Some(Commands::Params {
        action: ParamsAction::Save { json },
    }) = &cli.command
    {
        let params = parse_widget_parameter(Some(json.as_str()))?
            .ok_or_else(|| ConfigError::Invalid("parameters must be a JSON object".into()))?;
        let path = files.write(&name, &params)?;
        println!("Saved parameters to {}", path.display());
        return Ok(());
    }

    let widget_argument = parse_widget_parameter(cli.param.as_deref())?;
    let Some((mut params, source)) = params::resolve(
        widget_argument,
        || params::load_stored(&files, &name),
        config.defaults.as_ref(),
    ) else {
        println!("No valid parameters!");
        return Ok(());
    };
    tracing::info!("Using params from {}", source);

    if let (Some(lat), Some(lng)) = (cli.lat, cli.lng) {
        params.latitude = Some(lat);
        params.longitude = Some(lng);
    }

    if let Some(Commands::Params {
        action: ParamsAction::Show,
    }) = &cli.command
    {
        let json = serde_json::to_string_pretty(&params).map_err(|e| AppError::Other(e.into()))?;
        println!("# from {}\n{}", source, json);
        return Ok(());
    }

    let services = Services::from_config(&config)?;
    let perf = PerformanceDebugger::new();
    let logger = FileLogger::new(storage.clone(), name.clone());
    let ctx = RunContext {
        perf: &perf,
        logger: &logger,
    };

    let result = dispatch(&cli, &config, &services, &ctx, &params).await;
    if let Err(e) = &result {
        logger.error(e.to_string());
    }

    if let Err(e) = perf.append_to_file(&storage, &name) {
        tracing::warn!("Could not write performance metrics: {}", e);
    }
    if let Err(e) = logger.flush() {
        tracing::warn!("Could not write log file: {}", e);
    }

    result
}

async fn dispatch(
    cli: &Cli,
    config: &Config,
    services: &Services,
    ctx: &RunContext<'_>,
    params: &WidgetParams,
) -> Result<(), AppError> {
    let provider = provider_for(
        params
            .coordinates()
            .map(|(lat, lng)| Coordinates::new(lat, lng)),
    );

    let (presentation, map_out) = match &cli.command {
        None => (default_presentation(params), None),
        Some(Commands::Run { map_out }) => (default_presentation(params), map_out.as_deref()),
        Some(Commands::Widget { map_out }) => (Presentation::Widget, map_out.as_deref()),
        Some(Commands::List { map_out }) => (Presentation::List, map_out.as_deref()),
        Some(Commands::Map { out, city: Some(city) }) => {
            let url = services.maps.url_for_city(
                params.api_key(),
                city,
                map_size(params.widget_size),
            )?;
            let image = ctx
                .perf
                .wrap("static_map", services.maps.fetch_image(&url))
                .await?;
            let path = render::save_map(&image, out)?;
            println!("Saved map of {} to {}", city, path.display());
            return Ok(());
        }
        Some(Commands::Map { out, city: None }) => {
            let snapshot = build_snapshot(
                services,
                ctx,
                params,
                provider.as_ref(),
                config.widget.refresh_hours,
                true,
            )
            .await?;
            match save_snapshot_map(&snapshot, out)? {
                Some(path) => println!("Saved map to {}", path.display()),
                None => {
                    return Err(AppError::Service(
                        "the static map could not be fetched".to_string(),
                    ))
                }
            }
            return Ok(());
        }
        Some(Commands::Flickr { seed }) => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(*s),
                None => StdRng::from_entropy(),
            };
            let photo = flickr_pick(
                services,
                ctx,
                params,
                provider.as_ref(),
                config.flickr.nearby_slack_meters,
                &mut rng,
            )
            .await?;
            if cli.json {
                let json = serde_json::to_string_pretty(&photo)
                    .map_err(|e| AppError::Other(e.into()))?;
                println!("{}", json);
            } else {
                print!("{}", render::render_photo(photo.as_ref()));
            }
            return Ok(());
        }
        Some(Commands::Params { .. }) => return Ok(()),
    };

    let snapshot = build_snapshot(
        services,
        ctx,
        params,
        provider.as_ref(),
        config.widget.refresh_hours,
        map_out.is_some(),
    )
    .await?;

    if cli.json {
        let json = render::snapshot_json(&snapshot).map_err(|e| AppError::Other(e.into()))?;
        println!("{}", json);
    } else {
        match presentation {
            Presentation::Widget => print!("{}", render::render_widget(&snapshot)),
            Presentation::List => print!("{}", render::render_list(&snapshot)),
        }
    }

    if let Some(out) = map_out {
        match save_snapshot_map(&snapshot, out)? {
            Some(path) => tracing::info!("Saved map to {}", path.display()),
            None => tracing::warn!("No map image to save"),
        }
    }

    Ok(())
}

fn default_presentation(params: &WidgetParams) -> Presentation {
    if params.debug {
        Presentation::Widget
    } else {
        Presentation::List
    }
}

fn save_snapshot_map(snapshot: &Snapshot, out: &Path) -> Result<Option<PathBuf>, AppError> {
    match &snapshot.map {
        Some(image) => Ok(Some(render::save_map(image, out)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let cli = Cli::try_parse_from(["nearby", "--lat", "41.68", "--lng", "-70.2", "list"]).unwrap();
        assert_eq!(cli.lat, Some(41.68));
        assert_eq!(cli.lng, Some(-70.2));
        assert!(matches!(cli.command, Some(Commands::List { map_out: None })));
    }

    #[test]
    fn test_lat_requires_lng() {
        assert!(Cli::try_parse_from(["nearby", "--lat", "41.68"]).is_err());
    }

    #[test]
    fn test_default_presentation_follows_debug() {
        let mut params = WidgetParams::default();
        assert!(default_presentation(&params) == Presentation::List);
        params.debug = true;
        assert!(default_presentation(&params) == Presentation::Widget);
    }

    #[test]
    fn test_params_save_subcommand() {
        let cli = Cli::try_parse_from(["nearby", "params", "save", r#"{"apiKey":"k"}"#]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Params {
                action: ParamsAction::Save { .. }
            })
        ));
    }
}
