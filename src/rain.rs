use rand::Rng;

use crate::config::Settings;
use crate::surface::{GlyphSurface, Rgb};

// Mostly katakana, padded out with Latin capitals and digits. Which
// characters exactly is pure decoration.
const ALPHABET: &str = "アァカサタナハマヤャラワガザダバパイィキシチニヒミリヰギジヂビピ\
ウゥクスツヌフムユュルグズヅブプエェケセテネヘメレヱゲゼデベペ\
オォコソトノホモヨョロヲゴゾドボポヴッンABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub(crate) const RAIN_BG: Rgb = Rgb::new(10, 20, 30);
const RAIN_FG: Rgb = Rgb::new(0, 255, 247);

/// Falling-glyph layer. One drop per grid column, tracked as a fractional
/// row offset; the trail is produced by fading the whole surface a little
/// each tick before painting the new glyph row.
pub(crate) struct RainLayer {
    glyph_size: u32,
    step: f32,
    fade_alpha: f32,
    reset_threshold: f64,
    alphabet: Vec<char>,
    pub(crate) drops: Vec<f32>,
    pub(crate) surface: GlyphSurface,
}

impl RainLayer {
    pub(crate) fn new(width: u32, height: u32, s: &Settings) -> Self {
        let surface = GlyphSurface::new(width, height, s.glyph_size, RAIN_BG);
        let drops = vec![1.0; surface.columns()];
        Self {
            glyph_size: s.glyph_size.max(1),
            step: s.drop_step,
            fade_alpha: s.fade_alpha,
            reset_threshold: s.reset_threshold,
            alphabet: ALPHABET.chars().collect(),
            drops,
            surface,
        }
    }

    pub(crate) fn columns(&self) -> usize {
        self.surface.columns()
    }

    /// Resize discards every drop and reseeds the grid at the new width.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        self.drops = vec![1.0; self.surface.columns()];
    }

    pub(crate) fn tick<R: Rng>(&mut self, rng: &mut R) {
        self.surface.fade(self.fade_alpha);

        let g = self.glyph_size as f32;
        let height = self.surface.height as f32;

        for i in 0..self.drops.len() {
            let ch = self.alphabet[rng.gen_range(0..self.alphabet.len())];
            self.surface.put_glyph(i as f32 * g, self.drops[i] * g, ch, RAIN_FG);

            // A drop below the bottom edge respawns at the top with a
            // small probability per tick, so columns desynchronize.
            if self.drops[i] * g > height && rng.gen::<f64>() > self.reset_threshold {
                self.drops[i] = 0.0;
            }
            self.drops[i] += self.step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::{rngs::StdRng, SeedableRng};

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn alphabet_is_large_and_mixed() {
        let chars: Vec<char> = ALPHABET.chars().collect();
        assert!(chars.len() >= 60);
        assert!(chars.iter().any(|c| ('\u{30A0}'..='\u{30FF}').contains(c)));
        assert!(chars.iter().any(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn columns_track_width_over_resizes() {
        let s = settings();
        let mut layer = RainLayer::new(900, 540, &s);
        assert_eq!(layer.columns(), 50);
        assert_eq!(layer.drops.len(), 50);

        for w in [0u32, 17, 18, 35, 36, 541, 900, 1279] {
            layer.resize(w, 540);
            let want = (w / s.glyph_size) as usize;
            assert_eq!(layer.columns(), want);
            assert_eq!(layer.drops.len(), want);
            assert!(layer.drops.iter().all(|&d| d == 1.0));
        }
    }

    #[test]
    fn one_tick_without_resets_advances_every_drop_by_the_step() {
        // width=900, glyph=18: fifty drops seeded to 1.0. StepRng yielding
        // zeros forces every reset draw to 0.0, which never exceeds the
        // threshold, so no drop resets.
        let s = settings();
        let mut layer = RainLayer::new(900, 540, &s);
        let mut rng = StepRng::new(0, 0);
        layer.tick(&mut rng);
        assert_eq!(layer.drops.len(), 50);
        assert!(layer.drops.iter().all(|&d| d == 1.0 + s.drop_step));
    }

    #[test]
    fn overflowing_drop_resets_at_roughly_the_configured_rate() {
        let mut s = settings();
        s.glyph_size = 18;
        // Single-column layer; force the drop past the bottom every trial.
        let mut layer = RainLayer::new(18, 36, &s);
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);

        let trials = 10_000;
        let mut resets = 0;
        for _ in 0..trials {
            layer.drops[0] = 1000.0;
            layer.tick(&mut rng);
            if layer.drops[0] < 1000.0 {
                resets += 1;
            }
        }
        // Expected rate 2.5%; 250 +/- ~60 is four standard deviations.
        assert!((190..=310).contains(&resets), "resets = {resets}");
    }

    #[test]
    fn drop_on_screen_never_resets() {
        let s = settings();
        let mut layer = RainLayer::new(180, 3600, &s);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let before = layer.drops.clone();
            layer.tick(&mut rng);
            for (b, a) in before.iter().zip(layer.drops.iter()) {
                // Still above the bottom edge, so the only change is +step.
                assert_eq!(*a, *b + s.drop_step);
            }
        }
    }

    #[test]
    fn tick_paints_glyphs_on_the_surface() {
        let s = settings();
        let mut layer = RainLayer::new(180, 180, &s);
        let mut rng = StdRng::seed_from_u64(1);
        layer.tick(&mut rng);
        let painted = (0..layer.columns())
            .filter(|&c| layer.surface.cell(c, 1).ch != ' ')
            .count();
        // Drops all start at row 1.
        assert_eq!(painted, layer.columns());
    }
}
