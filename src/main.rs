//! Headless studio runner.
//!
//! Reads a JSON array of studio commands, plays them against a fresh session,
//! waits for garment loads and image decodes to settle, then writes the
//! exported design plus every decal bitmap as PNG.
//!
//! Usage: `vestra [--config studio.json] [--out dir] script.json`

use std::path::{Path, PathBuf};
use std::time::Duration;
use vestra::scene::serialization::{save_design_to_file, SerializationError};
use vestra::{Studio, StudioCommand, StudioConfig};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] vestra::config::ConfigError),
    #[error("failed to read script {path}: {source}")]
    Script {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid command script: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Design(#[from] SerializationError),
    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create output directory: {0}")]
    Io(#[from] std::io::Error),
}

struct Args {
    config: Option<PathBuf>,
    out: PathBuf,
    script: PathBuf,
}

fn parse_args() -> Result<Args, CliError> {
    let mut config = None;
    let mut out = PathBuf::from("vestra-out");
    let mut script = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(args.next().ok_or_else(|| {
                    CliError::Usage("--config needs a path".to_string())
                })?));
            }
            "--out" => {
                out = PathBuf::from(
                    args.next()
                        .ok_or_else(|| CliError::Usage("--out needs a path".to_string()))?,
                );
            }
            other if script.is_none() => script = Some(PathBuf::from(other)),
            other => return Err(CliError::Usage(format!("unexpected argument '{}'", other))),
        }
    }
    let script = script.ok_or_else(|| {
        CliError::Usage("usage: vestra [--config studio.json] [--out dir] script.json".to_string())
    })?;
    Ok(Args {
        config,
        out,
        script,
    })
}

fn load_script(path: &Path) -> Result<Vec<StudioCommand>, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Script {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

fn write_outputs(studio: &Studio, out: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(out)?;
    let design_path = out.join("design.json");
    save_design_to_file(&studio.export_design(), &design_path)?;
    log::info!("Design written to {}", design_path.display());

    for element in studio.design().elements() {
        let Some(bitmap) = studio.bitmaps().get(element.bitmap) else {
            log::warn!("Element {} has no bitmap", element.id);
            continue;
        };
        let path = out.join(format!("{}.png", element.id));
        bitmap.save(&path).map_err(|source| CliError::Output {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Wrote {}", path.display());
    }
    Ok(())
}

fn run() -> Result<(), CliError> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => StudioConfig::load(path)?,
        None => StudioConfig::from_env()?,
    };
    let commands = load_script(&args.script)?;

    let mut studio = Studio::new(config);
    for command in commands {
        let outcome = studio.apply(command);
        log::debug!("-> {:?}", outcome);
    }
    studio.block_until_idle(SETTLE_TIMEOUT);

    for event in studio.status_mut().drain() {
        if event.is_failure() {
            log::warn!("{:?}", event);
        }
    }
    log::info!(
        "{} elements, {} render decals, status: {}",
        studio.design().len(),
        studio.render_list().len(),
        studio.status().summary()
    );
    write_outputs(&studio, &args.out)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
