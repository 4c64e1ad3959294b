//! Sheen command line
//!
//! `sheen render` composites a scene file to PNG on either backend,
//! `sheen inspect` prints the decoded instance records.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sheen::scene::describe_instance;
use sheen::{GpuContext, RenderSettings, Scene, SceneDefaults, render_cpu, render_gpu};
use sheen_config::{Backend, Config};

#[derive(Parser, Debug)]
#[command(name = "sheen", version, about = "Instanced quad and glyph compositor")]
struct Cli {
    /// Config file (defaults to ~/.sheen/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene to a PNG file
    Render {
        scene: PathBuf,

        /// Output path (defaults to the config's output path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
    /// Print the instance records a scene decodes to
    Inspect { scene: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Cpu,
    Gpu,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Cpu => Backend::Cpu,
            BackendArg::Gpu => Backend::Gpu,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path).with_context(|| format!("loading config {path:?}")),
        None => Config::load().context("loading config"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise start at info and switch to the config level once loaded
    let level_from_env = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    if !level_from_env {
        log::set_max_level(log::LevelFilter::Info);
    }

    let config = load_config(cli.config.as_ref())?;
    if !level_from_env {
        match config.general.level_filter() {
            Some(level) => log::set_max_level(level),
            None => log::warn!("Unknown log level {:?} in config, staying at info", config.general.log_level),
        }
    }

    let defaults = SceneDefaults {
        width: config.output.width,
        height: config.output.height,
        shadow_radius: config.shadow.radius,
        shadow_intensity: config.shadow.intensity,
        color_mode: config.atlas.color_mode.into(),
    };

    match cli.command {
        Command::Render {
            scene,
            output,
            backend,
        } => {
            let scene = Scene::load(&scene, &defaults).with_context(|| format!("loading scene {scene:?}"))?;

            let settings = RenderSettings {
                color_mode: config.atlas.color_mode.into(),
                filter: config.atlas.filter.into(),
                depth: config.raster.depth_compare.into(),
                clear: config.output.clear_color()?,
                max_instances: config.raster.max_instances,
            };

            let backend = backend.map(Backend::from).unwrap_or(config.general.backend);
            let image = match backend {
                Backend::Cpu => render_cpu(&scene, &settings)?,
                Backend::Gpu => {
                    let gpu = GpuContext::new().context("initializing GPU")?;
                    render_gpu(&gpu, &scene, &settings)?
                }
            };

            let output = output.unwrap_or(config.output.path);
            image.save(&output).with_context(|| format!("writing {output:?}"))?;
            log::info!("Wrote {:?}", output);
        }
        Command::Inspect { scene } => {
            let scene = Scene::load(&scene, &defaults).with_context(|| format!("loading scene {scene:?}"))?;
            println!(
                "{}x{}, color atlas {}x{}, mask atlas {}x{}",
                scene.width,
                scene.height,
                scene.color_atlas.width(),
                scene.color_atlas.height(),
                scene.mask_atlas.width(),
                scene.mask_atlas.height()
            );
            for (i, record) in scene.instances.iter().enumerate() {
                println!("{}", describe_instance(i, record));
            }
        }
    }

    Ok(())
}
