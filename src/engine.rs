use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::Settings;
use crate::particles::ParticleField;
use crate::rain::RainLayer;
use crate::scheduler::{FrameScheduler, TimingMode};

/// Every third terminal row gets dimmed by the static scanline overlay.
pub(crate) const SCANLINE_PERIOD: usize = 3;
pub(crate) const SCANLINE_DIM: f32 = 0.72;

/// The full stacked backdrop, bottom to top: glyph rain, particle field,
/// scanline overlay. Owns every surface and both schedulers; the host only
/// feeds it time, randomness and resize events, and reads the surfaces
/// back out for presentation.
pub(crate) struct Backdrop {
    pub(crate) rain: RainLayer,
    pub(crate) field: ParticleField,
    pub(crate) scanlines: bool,
    glyph_size: u32,
    rain_sched: FrameScheduler,
    field_sched: FrameScheduler,
}

impl Backdrop {
    /// Binds the layers to a drawable area of `cols` x `rows` terminal
    /// cells. With no drawable area there is nothing to bind: no surface
    /// is built and no scheduler starts, and a later attach with real
    /// dimensions is free to succeed.
    pub(crate) fn attach<R: Rng>(
        cols: u16,
        rows: u16,
        settings: &Settings,
        rng: &mut R,
    ) -> Option<Self> {
        if cols == 0 || rows == 0 {
            return None;
        }

        let glyph = settings.glyph_size.max(1);
        let (rain_w, rain_h) = rain_dims(cols, rows, glyph);
        let (px_w, px_h) = pixel_dims(cols, rows);

        let rain = RainLayer::new(rain_w, rain_h, settings);
        let field = ParticleField::new(
            px_w,
            px_h,
            settings.particle_count,
            settings.particle_speed,
            rng,
        );

        // The particle layer runs a touch hotter than the rain, at 4/5
        // of the configured interval.
        let (rain_mode, field_mode) = if settings.continuous {
            (TimingMode::Continuous, TimingMode::Continuous)
        } else {
            (
                TimingMode::Fixed(Duration::from_millis(settings.frame_ms)),
                TimingMode::Fixed(Duration::from_millis(settings.frame_ms * 4 / 5)),
            )
        };

        Some(Self {
            rain,
            field,
            scanlines: settings.scanlines,
            glyph_size: glyph,
            rain_sched: FrameScheduler::new(rain_mode),
            field_sched: FrameScheduler::new(field_mode),
        })
    }

    pub(crate) fn is_live(&self) -> bool {
        self.rain_sched.is_live() || self.field_sched.is_live()
    }

    /// Advances whichever layers are due at `now`. After teardown this
    /// dispatches nothing and no surface is touched.
    pub(crate) fn tick<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        if self.rain_sched.fires(now) {
            let rain = &mut self.rain;
            self.rain_sched.dispatch(|| rain.tick(rng));
        }
        if self.field_sched.fires(now) {
            let field = &mut self.field;
            self.field_sched.dispatch(|| field.tick());
        }
    }

    /// How long the host may sleep before a layer is due again.
    pub(crate) fn until_due(&self, now: Instant) -> Duration {
        self.rain_sched
            .until_due(now)
            .min(self.field_sched.until_due(now))
    }

    /// Applied synchronously from the host's event loop, so it is totally
    /// ordered against ticks. Rebuilds the grid, leaves particles alone.
    /// A resize delivered after teardown is a no-op.
    pub(crate) fn handle_resize(&mut self, cols: u16, rows: u16) {
        if !self.is_live() {
            return;
        }
        let (rain_w, rain_h) = rain_dims(cols, rows, self.glyph_size);
        let (px_w, px_h) = pixel_dims(cols, rows);
        self.rain.resize(rain_w, rain_h);
        self.field.resize(px_w, px_h);
    }

    /// Stops both schedulers. Idempotent; the second call changes nothing.
    pub(crate) fn teardown(&mut self) {
        self.rain_sched.stop();
        self.field_sched.stop();
    }
}

/// One rain glyph per terminal cell: the abstract pixel area is the cell
/// grid scaled up by the glyph size.
fn rain_dims(cols: u16, rows: u16, glyph: u32) -> (u32, u32) {
    (cols as u32 * glyph, rows as u32 * glyph)
}

/// Braille resolution, 2x4 subpixels per cell.
fn pixel_dims(cols: u16, rows: u16) -> (u32, u32) {
    (cols as u32 * 2, rows as u32 * 4)
}
