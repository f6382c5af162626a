use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::fs;
use std::path::PathBuf;

use glide::{Scene, Simulator};
use glide_config::GlideConfig;
use glide_core::persist::{JsonFileStore, ScrollStateStore, SessionStore};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        eprintln!(
            "Usage: cargo run -- <scene.json> [--config <glide.toml>] [--state <file>] [--frame-ms <ms>] [--out <file>]"
        );
        bail!("missing <scene.json>");
    }

    let input = PathBuf::from(args.remove(0));
    if !input.exists() {
        bail!("scene file not found: {}", input.display());
    }

    let mut config_path: Option<PathBuf> = None;
    let mut state_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;
    let mut frame_ms: Option<f64> = None;
    let mut i = 0usize;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(path)) => config_path = Some(PathBuf::from(path)),
            ("--state", Some(path)) => state_path = Some(PathBuf::from(path)),
            ("--out", Some(path)) => out_path = Some(PathBuf::from(path)),
            ("--frame-ms", Some(ms)) => {
                frame_ms = Some(
                    ms.parse()
                        .with_context(|| format!("--frame-ms expects a number, got `{ms}`"))?,
                )
            }
            (flag @ ("--config" | "--state" | "--out" | "--frame-ms"), None) => {
                bail!("{flag} expects a value")
            }
            (other, _) => bail!("unknown argument: {other}"),
        }
        i += 2;
    }

    let config = match &config_path {
        Some(path) => {
            let mut config = GlideConfig::load_from_file(path).map_err(|e| anyhow!(e))?;
            config.merge_with_env();
            config
        }
        None => GlideConfig::load(),
    };

    let store: Box<dyn ScrollStateStore> = match state_path {
        Some(path) => Box::new(JsonFileStore::open(path)),
        None => Box::new(SessionStore::new()),
    };

    let scene = Scene::load(&input)?;
    let mut sim = Simulator::new(&scene, config, Some(store))?;
    if let Some(ms) = frame_ms {
        sim = sim.with_frame_interval(ms);
    }
    sim.run(&scene.script)?;
    log::info!("replayed {} steps in {} frames", scene.script.len(), sim.frames());

    let snapshot = sim.finish()?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    match out_path {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
