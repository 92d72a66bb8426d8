mod app;
mod config;
mod engine;
mod particles;
mod rain;
mod scheduler;
mod surface;

use std::env;

use anyhow::Result;

use crate::config::{load_settings, project_paths, save_settings_atomic, Settings};

fn print_help() {
    println!(
        r#"neonrain — layered cyberpunk backdrop: glyph rain, drifting particles, scanlines

USAGE:
  neonrain [OPTIONS]

OPTIONS:
  -h, --help         Show this help message
  -V, --version      Show version information
      --seed N       Seed the random source (0 = entropy)
      --fps N        Rain frame interval cap, frames per second
      --particles N  Particle population (30-120)
      --continuous   Uncapped redraw instead of a fixed interval
      --no-scanlines Disable the static scanline overlay

KEYS (runtime):
  q / Esc           Quit
  space             Pause / resume (full detach and reattach)
  s                 Toggle scanlines
  r                 Reseed randomness
  + / -             Faster / slower (fixed interval mode)
"#
    );
}

fn apply_flags(args: &[String], s: &mut Settings) -> Result<()> {
    let mut it = args.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--seed" => {
                let v = it.next().ok_or_else(|| anyhow::anyhow!("--seed needs a value"))?;
                s.seed = v.parse()?;
            }
            "--fps" => {
                let v = it.next().ok_or_else(|| anyhow::anyhow!("--fps needs a value"))?;
                let fps: u64 = v.parse()?;
                s.frame_ms = (1000 / fps.clamp(1, 240)).max(4);
            }
            "--particles" => {
                let v = it
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--particles needs a value"))?;
                s.particle_count = v.parse::<usize>()?.clamp(1, 500);
            }
            "--continuous" => s.continuous = true,
            "--no-scanlines" => s.scanlines = false,
            other => anyhow::bail!("unknown option: {other} (try --help)"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("neonrain {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let paths = project_paths()?;
    let mut settings = load_settings(&paths.settings_path);
    apply_flags(&args, &mut settings)?;

    app::run(&settings)?;

    save_settings_atomic(&paths.settings_path, &settings).ok();
    Ok(())
}
