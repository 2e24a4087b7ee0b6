use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{self, Stdout, Write};

use crate::config::Rgb;
use crate::error::{Result, VizError};
use crate::render::{layout_bars, BarSpec, Geometry, RenderFrame, Renderer, CAP_GAP};

/// vertical partials (height)
const VBLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const CAP_GLYPH: char = '▀';
/// Virtual pixels per character row.
pub const PIXELS_PER_ROW: u32 = 8;
const HEADER_ROWS: u16 = 1;
const FOOTER_ROWS: u16 = 1;

/// Raw mode + alternate screen for the lifetime of the value.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(ClearType::All),
        ) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = execute!(out, ResetColor, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Draws bars with eighth-block glyphs; each character row is
/// `PIXELS_PER_ROW` pixels tall.
pub struct TerminalRenderer<W: Write> {
    out: W,
    cols: u16,
    rows: u16,
    track_terminal: bool,
    title: String,
}

impl TerminalRenderer<Stdout> {
    /// Renders to stdout, following the terminal size.
    pub fn stdout(title: impl Into<String>) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out: io::stdout(),
            cols,
            rows,
            track_terminal: true,
            title: title.into(),
        })
    }
}

impl<W: Write> TerminalRenderer<W> {
    /// Renders to `out` with a fixed character grid.
    pub fn with_size(out: W, cols: u16, rows: u16, title: impl Into<String>) -> Self {
        Self {
            out,
            cols,
            rows,
            track_terminal: false,
            title: title.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn bar_rows(&self) -> u16 {
        self.rows.saturating_sub(HEADER_ROWS + FOOTER_ROWS)
    }

    fn refresh_size(&mut self) {
        if self.track_terminal {
            if let Ok((cols, rows)) = terminal::size() {
                self.cols = cols;
                self.rows = rows;
            }
        }
    }

    fn write_frame(&mut self, frame: &RenderFrame<'_>) -> io::Result<()> {
        let geom = self.geometry();
        let bars = layout_bars(frame, geom);
        let rows = self.bar_rows();

        queue!(
            self.out,
            ResetColor,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        let (cell_w, bar_w) = column_widths(self.cols, bars.len());
        let visible = visible_bars(self.cols, bars.len());

        let mut header = format!(" {}  |  scale {:.2}", self.title, frame.scale);
        if visible < bars.len() {
            header.push_str(&format!("  |  {}/{} bars shown", visible, bars.len()));
        }
        if let Some(status) = frame.status {
            header.push_str("  |  ");
            header.push_str(status);
        }
        header.push_str("  |  q to quit");
        let header: String = header.chars().take(self.cols as usize).collect();
        queue!(self.out, Print(header))?;

        for row_top in 0..rows {
            let row_from_bottom = (rows - 1 - row_top) as u32;
            queue!(self.out, cursor::MoveTo(0, HEADER_ROWS + row_top))?;
            let mut current: Option<Rgb> = None;
            for bar in bars.iter().take(visible) {
                let (ch, color) = cell_for(bar, row_from_bottom);
                if let Some(c) = color {
                    if current != Some(c) {
                        queue!(
                            self.out,
                            SetForegroundColor(Color::Rgb { r: c.r, g: c.g, b: c.b })
                        )?;
                        current = Some(c);
                    }
                }
                for _ in 0..bar_w {
                    queue!(self.out, Print(ch))?;
                }
                for _ in bar_w..cell_w {
                    queue!(self.out, Print(' '))?;
                }
            }
        }

        queue!(
            self.out,
            ResetColor,
            cursor::MoveTo(0, HEADER_ROWS + rows),
            Print("▁".repeat(self.cols as usize))
        )?;
        self.out.flush()
    }
}

/// Per-bar column pitch and filled width for `num_bars` over `cols`.
fn column_widths(cols: u16, num_bars: usize) -> (u32, u32) {
    let cell_w = (cols as u32 / num_bars.max(1) as u32).max(1);
    let bar_w = if cell_w > 1 { cell_w - 1 } else { 1 };
    (cell_w, bar_w)
}

/// How many of `num_bars` fit on a row of `cols` characters.
fn visible_bars(cols: u16, num_bars: usize) -> usize {
    let (cell_w, bar_w) = column_widths(cols, num_bars);
    let cols = cols as u32;
    if cols < bar_w {
        return 0;
    }
    (((cols - bar_w) / cell_w + 1) as usize).min(num_bars)
}

/// Glyph for one character cell of `bar`, counted from the bottom row.
fn cell_for(bar: &BarSpec, row_from_bottom: u32) -> (char, Option<Rgb>) {
    let lo = row_from_bottom * PIXELS_PER_ROW;
    let hi = lo + PIXELS_PER_ROW;
    if bar.height >= hi {
        return ('█', Some(bar.color));
    }
    if bar.height > lo {
        return (VBLOCKS[(bar.height - lo) as usize], Some(bar.color));
    }
    if bar.cap_height > 0 {
        let cap_lo = bar.height + CAP_GAP;
        let cap_hi = cap_lo + bar.cap_height;
        if cap_lo < hi && cap_hi > lo {
            return (CAP_GLYPH, Some(bar.cap_color));
        }
    }
    (' ', None)
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn geometry(&self) -> Geometry {
        Geometry {
            width: self.cols as u32,
            height: self.bar_rows() as u32 * PIXELS_PER_ROW,
        }
    }

    fn draw(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        self.refresh_size();
        self.write_frame(frame)
            .map_err(|e| VizError::Render(e.to_string()))
    }
}
