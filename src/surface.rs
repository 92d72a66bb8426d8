use crossterm::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let one = |x: u8, y: u8| -> u8 {
            (x as f32 + (y as f32 - x as f32) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: one(a.r, b.r),
            g: one(a.g, b.g),
            b: one(a.b, b.b),
        }
    }

    pub(crate) fn scale(self, k: f32) -> Rgb {
        let k = k.max(0.0);
        let s = |v: u8| -> u8 { ((v as f32) * k).round().clamp(0.0, 255.0) as u8 };
        Rgb {
            r: s(self.r),
            g: s(self.g),
            b: s(self.b),
        }
    }

    pub(crate) fn dist2(a: Rgb, b: Rgb) -> u32 {
        let d = |x: u8, y: u8| {
            let v = x as i32 - y as i32;
            (v * v) as u32
        };
        d(a.r, b.r) + d(a.g, b.g) + d(a.b, b.b)
    }

    pub(crate) fn to_color(self) -> Color {
        Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GlyphCell {
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
}

/// Raster for the rain layer. Addressed in abstract pixel units; stores one
/// glyph per `glyph_size`-sided cell. Owned by exactly one layer.
pub(crate) struct GlyphSurface {
    pub(crate) width: u32,
    pub(crate) height: u32,
    glyph: u32,
    cols: usize,
    rows: usize,
    bg: Rgb,
    cells: Vec<GlyphCell>,
}

impl GlyphSurface {
    pub(crate) fn new(width: u32, height: u32, glyph: u32, bg: Rgb) -> Self {
        let glyph = glyph.max(1);
        let cols = (width / glyph) as usize;
        let rows = (height / glyph) as usize;
        Self {
            width,
            height,
            glyph,
            cols,
            rows,
            bg,
            cells: vec![GlyphCell { ch: ' ', fg: bg }; cols * rows],
        }
    }

    pub(crate) fn columns(&self) -> usize {
        self.cols
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn cell(&self, col: usize, row: usize) -> GlyphCell {
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col]
        } else {
            GlyphCell {
                ch: ' ',
                fg: self.bg,
            }
        }
    }

    /// New dimensions, fresh content. Old glyphs are discarded.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.cols = (width / self.glyph) as usize;
        self.rows = (height / self.glyph) as usize;
        self.cells = vec![
            GlyphCell {
                ch: ' ',
                fg: self.bg
            };
            self.cols * self.rows
        ];
    }

    /// The translucent full-surface fill. Blends every cell toward the
    /// background, which is what leaves the fading trail behind each drop.
    pub(crate) fn fade(&mut self, alpha: f32) {
        for c in &mut self.cells {
            c.fg = Rgb::lerp(c.fg, self.bg, alpha);
            // Once a glyph has faded into the background it stops being a
            // glyph at all, so the presenter can skip it.
            if Rgb::dist2(c.fg, self.bg) < 16 {
                c.ch = ' ';
                c.fg = self.bg;
            }
        }
    }

    /// Paint one glyph at a pixel position. Positions outside the raster
    /// are ignored, not errors.
    pub(crate) fn put_glyph(&mut self, px: f32, py: f32, ch: char, fg: Rgb) {
        if px < 0.0 || py < 0.0 {
            return;
        }
        let col = (px / self.glyph as f32) as usize;
        let row = (py / self.glyph as f32) as usize;
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = GlyphCell { ch, fg };
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Subpixel raster for the particle layer (2x4 subpixels per terminal
/// cell, braille resolution). Owned by exactly one layer.
pub(crate) struct PixelSurface {
    pub(crate) width: u32,
    pub(crate) height: u32,
    px: Vec<Pixel>,
}

impl PixelSurface {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            px: vec![Pixel::default(); (width as usize) * (height as usize)],
        }
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.px = vec![Pixel::default(); (width as usize) * (height as usize)];
    }

    pub(crate) fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> Pixel {
        if x < self.width && y < self.height {
            self.px[(y as usize) * (self.width as usize) + (x as usize)]
        } else {
            Pixel::default()
        }
    }

    fn blend_over(&mut self, x: i32, y: i32, color: Rgb, a: f32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize) * (self.width as usize) + (x as usize);
        let dst = self.px[i];

        let sa = a.clamp(0.0, 1.0);
        let da = dst.a as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            return;
        }
        let one = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };
        self.px[i] = Pixel {
            r: one(color.r, dst.r),
            g: one(color.g, dst.g),
            b: one(color.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }

    /// Filled circle with a soft halo: full alpha inside `radius`, falling
    /// off quadratically out to twice the radius.
    pub(crate) fn fill_circle_glow(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb) {
        let reach = radius * 2.0;
        let x0 = (cx - reach).floor() as i32;
        let x1 = (cx + reach).ceil() as i32;
        let y0 = (cy - reach).floor() as i32;
        let y1 = (cy + reach).ceil() as i32;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x as f32 + 0.5) - cx;
                let dy = (y as f32 + 0.5) - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d <= radius {
                    self.blend_over(x, y, color, 0.9);
                } else if d <= reach {
                    let t = (d - radius) / (reach - radius).max(1e-6);
                    self.blend_over(x, y, color, 0.55 * (1.0 - t) * (1.0 - t));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb = Rgb::new(10, 20, 30);

    #[test]
    fn glyph_surface_derives_grid_from_pixel_size() {
        let s = GlyphSurface::new(900, 540, 18, BG);
        assert_eq!(s.columns(), 50);
        assert_eq!(s.rows(), 30);
        // Non-multiples truncate.
        let s = GlyphSurface::new(910, 541, 18, BG);
        assert_eq!(s.columns(), 50);
        assert_eq!(s.rows(), 30);
    }

    #[test]
    fn fade_is_a_blend_not_a_clear() {
        let mut s = GlyphSurface::new(36, 36, 18, BG);
        let fg = Rgb::new(0, 255, 247);
        s.put_glyph(0.0, 0.0, 'ネ', fg);
        s.fade(0.18);
        let c = s.cell(0, 0);
        assert_eq!(c.ch, 'ネ');
        assert_ne!(c.fg, fg, "one fade must dim the glyph");
        assert_ne!(c.fg, BG, "one fade must not erase the glyph");

        // Repeated fades decay monotonically toward the background and
        // eventually release the cell.
        let mut prev = Rgb::dist2(c.fg, BG);
        for _ in 0..200 {
            s.fade(0.18);
            let d = Rgb::dist2(s.cell(0, 0).fg, BG);
            assert!(d <= prev);
            prev = d;
        }
        assert_eq!(s.cell(0, 0).ch, ' ');
    }

    #[test]
    fn put_glyph_outside_raster_is_ignored() {
        let mut s = GlyphSurface::new(36, 36, 18, BG);
        s.put_glyph(-1.0, 0.0, 'x', Rgb::new(255, 255, 255));
        s.put_glyph(0.0, 900.0, 'x', Rgb::new(255, 255, 255));
        for row in 0..s.rows() {
            for col in 0..s.columns() {
                assert_eq!(s.cell(col, row).ch, ' ');
            }
        }
    }

    #[test]
    fn circle_glow_lights_core_brighter_than_halo() {
        let mut s = PixelSurface::new(20, 20);
        s.fill_circle_glow(10.0, 10.0, 2.0, Rgb::new(0, 255, 153));
        let core = s.get(10, 10);
        let halo = s.get(13, 10);
        let far = s.get(0, 0);
        assert!(core.a > halo.a);
        assert!(halo.a > 0);
        assert_eq!(far.a, 0);
    }

    #[test]
    fn clear_empties_every_pixel() {
        let mut s = PixelSurface::new(8, 8);
        s.fill_circle_glow(4.0, 4.0, 3.0, Rgb::new(0, 255, 247));
        s.clear();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(s.get(x, y), Pixel::default());
            }
        }
    }
}
