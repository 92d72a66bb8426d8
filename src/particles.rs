use rand::Rng;

use crate::surface::{PixelSurface, Rgb};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tint {
    Cyan,
    Green,
}

impl Tint {
    pub(crate) fn rgb(self) -> Rgb {
        match self {
            Tint::Cyan => Rgb::new(0, 255, 247),
            Tint::Green => Rgb::new(0, 255, 153),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Particle {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) dx: f32,
    pub(crate) dy: f32,
    pub(crate) radius: f32,
    pub(crate) tint: Tint,
}

/// Drifting dot layer. The population is fixed at attach time and only
/// mutated afterwards; a resize changes the surface, never the particles.
pub(crate) struct ParticleField {
    pub(crate) particles: Vec<Particle>,
    pub(crate) surface: PixelSurface,
}

impl ParticleField {
    pub(crate) fn new<R: Rng>(
        width: u32,
        height: u32,
        count: usize,
        speed: f32,
        rng: &mut R,
    ) -> Self {
        let w = width as f32;
        let h = height as f32;
        let particles = (0..count)
            .map(|_| Particle {
                x: rng.gen::<f32>() * w,
                y: rng.gen::<f32>() * h,
                dx: (rng.gen::<f32>() - 0.5) * 2.0 * speed,
                dy: (rng.gen::<f32>() - 0.5) * 2.0 * speed,
                radius: rng.gen::<f32>() * 1.5 + 0.5,
                tint: if rng.gen_bool(0.5) {
                    Tint::Cyan
                } else {
                    Tint::Green
                },
            })
            .collect();
        Self {
            particles,
            surface: PixelSurface::new(width, height),
        }
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }

    /// Hard clear, draw, advance with mirror bounces. No trail on this
    /// layer, unlike the rain surface.
    pub(crate) fn tick(&mut self) {
        self.surface.clear();
        let w = self.surface.width as f32;
        let h = self.surface.height as f32;

        for p in &mut self.particles {
            self.surface.fill_circle_glow(p.x, p.y, p.radius, p.tint.rgb());
            let (x, dx) = advance(p.x, p.dx, w);
            let (y, dy) = advance(p.y, p.dy, h);
            p.x = x;
            p.dx = dx;
            p.y = y;
            p.dy = dy;
        }
    }
}

/// One axis of motion. A step that would land outside `[0, limit]` flips
/// the velocity toward the interior and recomputes the position from the
/// flipped velocity, so the particle is reflected rather than clamped.
pub(crate) fn advance(pos: f32, vel: f32, limit: f32) -> (f32, f32) {
    let next = pos + vel;
    if next >= 0.0 && next <= limit {
        return (next, vel);
    }
    let vel = if next < 0.0 { vel.abs() } else { -vel.abs() };
    (pos + vel, vel)
}
