use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Settings {
    /// Side of one rain glyph cell, in abstract pixel units.
    pub(crate) glyph_size: u32,
    /// Rain frame interval in milliseconds; the particle layer runs at 4/5 of it.
    pub(crate) frame_ms: u64,
    /// Translucency of the per-frame fill that fades old glyphs (0..1).
    pub(crate) fade_alpha: f32,
    /// Rows a drop advances per tick. Fractional values give smoother fall.
    pub(crate) drop_step: f32,
    /// A drop past the bottom survives while a uniform draw stays below this.
    pub(crate) reset_threshold: f64,
    pub(crate) particle_count: usize,
    /// Max particle velocity component, subpixels per tick.
    pub(crate) particle_speed: f32,
    /// Redraw as fast as the terminal accepts frames instead of pacing.
    pub(crate) continuous: bool,
    pub(crate) scanlines: bool,
    /// 0 means seed from entropy.
    pub(crate) seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            glyph_size: 18,
            frame_ms: 50,
            fade_alpha: 0.18,
            drop_step: 1.0,
            reset_threshold: 0.975,
            particle_count: 60,
            particle_speed: 0.25,
            continuous: false,
            scanlines: true,
            seed: 0,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "neonrain", "Neonrain")
        .context("could not resolve project directories")?;
    let dir = proj.config_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        settings_path: dir.join("settings.json"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
