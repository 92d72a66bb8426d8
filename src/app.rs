use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::{rngs::StdRng, SeedableRng};

use crate::config::Settings;
use crate::engine::{Backdrop, SCANLINE_DIM, SCANLINE_PERIOD};
use crate::rain::RAIN_BG;
use crate::surface::Rgb;

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Rgb,
    bg: Rgb,
}

impl Cell {
    fn blank() -> Self {
        Self {
            ch: ' ',
            fg: RAIN_BG,
            bg: RAIN_BG,
        }
    }
}

struct CellBuffer {
    w: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            cells: vec![Cell::blank(); (w as usize) * (h as usize)],
        }
    }

    fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
}

struct Terminal {
    out: io::Stdout,
    cols: u16,
    rows: u16,
    prev: Option<CellBuffer>,
    cur: CellBuffer,
}

impl Terminal {
    fn begin() -> Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            EnterAlternateScreen,
            DisableLineWrap,
            cursor::Hide,
            SetBackgroundColor(RAIN_BG.to_color()),
            Clear(ClearType::All)
        )?;
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: None,
            cur: CellBuffer::new(cols, rows),
        })
    }

    fn end(&mut self) -> Result<()> {
        execute!(
            self.out,
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.prev = None;
        self.cur = CellBuffer::new(cols, rows);
    }

    /// Writes the composed frame, skipping cells unchanged since the last
    /// present and re-issuing colors only when they differ.
    fn present(&mut self) -> Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        let mut last_fg: Option<Rgb> = None;
        let mut last_bg: Option<Rgb> = None;

        for y in 0..self.rows {
            let mut x = 0;
            while x < self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if let Some(prev) = &self.prev {
                    if prev.cells[i] == c {
                        x += 1;
                        continue;
                    }
                }
                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg.to_color()))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg.to_color()))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
                x += 1;
            }
        }

        queue!(self.out, EndSynchronizedUpdate)?;
        self.out.flush()?;

        let done = std::mem::replace(&mut self.cur, CellBuffer::new(self.cols, self.rows));
        self.prev = Some(done);
        Ok(())
    }
}

const BRAILLE_DOTS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// Flattens the stacked layers into the cell buffer, bottom to top:
/// rain glyphs, then particle subpixels as braille (which win the cell
/// where both are present), then the scanline dimming.
fn compose(term: &mut Terminal, bd: &Backdrop) {
    let cols = term.cols;
    let rows = term.rows;

    for y in 0..rows {
        for x in 0..cols {
            let rain = bd.rain.surface.cell(x as usize, y as usize);
            let mut cell = Cell {
                ch: rain.ch,
                fg: rain.fg,
                bg: RAIN_BG,
            };

            let mut dots: u8 = 0;
            let mut acc = (0u32, 0u32, 0u32, 0u32);
            for sy in 0..4u32 {
                for sx in 0..2u32 {
                    let p = bd.field.surface.get(x as u32 * 2 + sx, y as u32 * 4 + sy);
                    if p.a > 24 {
                        dots |= BRAILLE_DOTS[sy as usize][sx as usize];
                        acc.0 += p.r as u32;
                        acc.1 += p.g as u32;
                        acc.2 += p.b as u32;
                        acc.3 += 1;
                    }
                }
            }
            if dots != 0 {
                let n = acc.3;
                cell.ch = char::from_u32(0x2800 + dots as u32).unwrap_or('•');
                cell.fg = Rgb::new(
                    (acc.0 / n) as u8,
                    (acc.1 / n) as u8,
                    (acc.2 / n) as u8,
                );
            }

            if bd.scanlines && (y as usize) % SCANLINE_PERIOD == SCANLINE_PERIOD - 1 {
                cell.fg = cell.fg.scale(SCANLINE_DIM);
            }

            let i = term.cur.idx(x, y);
            term.cur.cells[i] = cell;
        }
    }
}

fn seeded_rng(seed: u64) -> StdRng {
    if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    }
}

pub(crate) fn run(settings: &Settings) -> Result<()> {
    let mut term = Terminal::begin()?;
    let result = run_loop(&mut term, settings);
    term.end()?;
    result
}

fn run_loop(term: &mut Terminal, settings: &Settings) -> Result<()> {
    let mut settings = settings.clone();
    let mut rng = seeded_rng(settings.seed);
    let mut backdrop = Backdrop::attach(term.cols, term.rows, &settings, &mut rng);
    let mut paused = false;

    loop {
        let timeout = match &backdrop {
            Some(bd) if !paused => bd.until_due(Instant::now()),
            _ => Duration::from_millis(50),
        };

        let mut wait = timeout;
        while event::poll(wait)? {
            wait = Duration::ZERO;
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => match k.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        if let Some(bd) = &mut backdrop {
                            bd.teardown();
                        }
                        return Ok(());
                    }
                    KeyCode::Char(' ') => {
                        // Full detach on pause; resume reattaches from
                        // scratch, which is the lifecycle the engine
                        // promises to survive.
                        paused = !paused;
                        if paused {
                            if let Some(bd) = &mut backdrop {
                                bd.teardown();
                            }
                        } else {
                            backdrop =
                                Backdrop::attach(term.cols, term.rows, &settings, &mut rng);
                        }
                    }
                    KeyCode::Char('s') => {
                        settings.scanlines = !settings.scanlines;
                        if let Some(bd) = &mut backdrop {
                            bd.scanlines = settings.scanlines;
                        }
                    }
                    KeyCode::Char('r') => {
                        rng = StdRng::from_entropy();
                        if let Some(bd) = &mut backdrop {
                            bd.teardown();
                        }
                        backdrop = Backdrop::attach(term.cols, term.rows, &settings, &mut rng);
                    }
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        settings.frame_ms = settings.frame_ms.saturating_sub(5).max(10);
                        backdrop = reattach(backdrop, term, &settings, &mut rng);
                    }
                    KeyCode::Char('-') => {
                        settings.frame_ms = (settings.frame_ms + 5).min(200);
                        backdrop = reattach(backdrop, term, &settings, &mut rng);
                    }
                    _ => {}
                },
                Event::Resize(w, h) => {
                    term.resize(w, h);
                    let live = backdrop.as_ref().map_or(false, Backdrop::is_live);
                    if live {
                        if let Some(bd) = &mut backdrop {
                            bd.handle_resize(w, h);
                        }
                    } else if !paused {
                        // The first attach may have found no drawable
                        // area; a resize is the natural retry point.
                        backdrop = Backdrop::attach(w, h, &settings, &mut rng);
                    }
                }
                _ => {}
            }
        }

        if paused {
            continue;
        }
        if let Some(bd) = &mut backdrop {
            bd.tick(Instant::now(), &mut rng);
            compose(term, bd);
            term.present()?;
        }
    }
}

fn reattach(
    backdrop: Option<Backdrop>,
    term: &Terminal,
    settings: &Settings,
    rng: &mut StdRng,
) -> Option<Backdrop> {
    if let Some(mut bd) = backdrop {
        bd.teardown();
    }
    Backdrop::attach(term.cols, term.rows, settings, rng)
}
