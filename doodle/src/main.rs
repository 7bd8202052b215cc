#![warn(clippy::pedantic)]

//! Maintenance tool for level and doodad files.
//!
//! ```text
//! doodle show <file>...
//! doodle resave <file>...
//! doodle convert <in> <out> [json|gzip|zipfile]
//! ```
//!
//! Bare names are looked up in the user's levels and doodads.

use anyhow::{bail, Context, Result as AnyResult};
use doodle_core::{
    doodad::Doodad,
    drawing::{Drawing, DrawingFormat},
    environment::{Environment, DOODAD_EXTENSION, LEVEL_EXTENSION},
    level::Level,
    Settings,
};
use std::path::{Path, PathBuf};

const USAGE: &str = "usage: doodle show <file>... | resave <file>... | convert <in> <out> [json|gzip|zipfile]";

/// A loaded file of either kind.
enum Loaded {
    Level(Level),
    Doodad(Doodad),
}

impl Loaded {
    fn load(path: &Path) -> AnyResult<Self> {
        let name = path.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(DOODAD_EXTENSION) {
            Ok(Self::Doodad(Doodad::load_file(path)?))
        } else if name.ends_with(LEVEL_EXTENSION) {
            Ok(Self::Level(Level::load_file(path)?))
        } else {
            bail!("{} is neither a {LEVEL_EXTENSION} nor a {DOODAD_EXTENSION}", path.display())
        }
    }
    fn write(&mut self, path: &Path, format: DrawingFormat, settings: &Settings) -> AnyResult<()> {
        match self {
            Self::Level(level) => level.write_file(path, format, settings)?,
            Self::Doodad(doodad) => doodad.write_file(path, format, settings)?,
        }
        Ok(())
    }
    fn describe(&mut self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        match self {
            Self::Level(level) => {
                let chunks = level.chunker.iter_chunks().len();
                let _ = writeln!(out, "  level {:?} by {}", level.base.title, level.base.author);
                let _ = writeln!(out, "  game version {}, file version {}", level.base.game_version, level.base.version);
                let _ = writeln!(out, "  page {} ({}x{}), wallpaper {}", level.page_type, level.max_width, level.max_height, level.wallpaper);
                let _ = writeln!(out, "  {chunks} chunks of {}px, world {}", level.chunker.size(), level.chunker.world_size());
                let _ = writeln!(out, "  {} actors, {} swatches", level.actors.len(), level.palette.len());
                for file in level.files.list("") {
                    let _ = writeln!(out, "  file {file}");
                }
            }
            Self::Doodad(doodad) => {
                let _ = writeln!(out, "  doodad {:?} by {}", doodad.base.title, doodad.base.author);
                let _ = writeln!(out, "  {}px, hitbox {}, {} swatches", doodad.size(), doodad.hitbox, doodad.palette.len());
                for layer in doodad.layers() {
                    let _ = writeln!(out, "  layer {:?}: {} chunks", layer.name, layer.chunker.iter_chunks().len());
                }
                for (name, value) in &doodad.tags {
                    let _ = writeln!(out, "  tag {name}={value}");
                }
            }
        }
        out
    }
}

#[allow(clippy::cast_precision_loss)]
fn file_size(path: &Path) -> String {
    std::fs::metadata(path).map_or_else(|_| "?".to_owned(), |m| human_bytes::human_bytes(m.len() as f64))
}

fn show(env: &Environment, names: &[String]) -> AnyResult<()> {
    for name in names {
        let path = env.find_file(name)?;
        let format = DrawingFormat::sniff(&std::fs::read(&path)?)?;
        let mut loaded = Loaded::load(&path).with_context(|| format!("loading {}", path.display()))?;
        println!("{} ({format}, {})", path.display(), file_size(&path));
        print!("{}", loaded.describe());
    }
    Ok(())
}

/// Save files again in the configured format. Files are independent, so they go in parallel.
fn resave(env: &Environment, names: &[String]) -> AnyResult<()> {
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    let paths: Vec<PathBuf> = names
        .iter()
        .map(|name| env.find_file(name))
        .collect::<Result<_, _>>()?;
    let format = env.settings.drawing_format;
    let failures = paths
        .par_iter()
        .filter(|path| {
            let result = Loaded::load(path).and_then(|mut loaded| loaded.write(path, format, &env.settings));
            match result {
                Ok(()) => {
                    log::info!("resaved {} as {format} ({})", path.display(), file_size(path));
                    false
                }
                Err(e) => {
                    log::error!("failed to resave {}: {e:#}", path.display());
                    true
                }
            }
        })
        .count();
    if failures > 0 {
        bail!("{failures} of {} files failed", paths.len());
    }
    Ok(())
}

fn convert(env: &Environment, args: &[String]) -> AnyResult<()> {
    let (input, output, format) = match args {
        [input, output] => (input, output, env.settings.drawing_format),
        [input, output, format] => (
            input,
            output,
            format
                .parse::<DrawingFormat>()
                .with_context(|| format!("unknown format {format:?}"))?,
        ),
        _ => bail!(USAGE),
    };
    let input = env.find_file(input)?;
    let mut loaded = Loaded::load(&input)?;
    let output = Path::new(output);
    loaded.write(output, format, &env.settings)?;
    println!("{} -> {} ({format}, {})", input.display(), output.display(), file_size(output));
    Ok(())
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let settings = Settings::load();
    let env = match Environment::from_user_dirs(settings.clone()) {
        Some(env) => env,
        None => {
            log::warn!("no user data directory, using the working directory");
            Environment::new(".", settings)
        }
    };
    if let Err(e) = env.init() {
        log::warn!("failed to create user directories:\n{e:?}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        Some((command, rest)) if command == "show" && !rest.is_empty() => show(&env, rest),
        Some((command, rest)) if command == "resave" && !rest.is_empty() => resave(&env, rest),
        Some((command, rest)) if command == "convert" => convert(&env, rest),
        _ => bail!(USAGE),
    }
}
