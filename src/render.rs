use crate::config::{ColorMode, Rgb};
use crate::error::Result;

/// Pixels per unit of magnitude at scale 1.
pub const PIXELS_PER_MAGNITUDE: f32 = 50.0;
/// Vertical gap between a bar and its cap.
pub const CAP_GAP: u32 = 5;
/// Caps never exceed this share of the maximum bar height.
pub const CAP_MAX_FRACTION: f32 = 0.1;
pub const CAP_BRIGHTNESS: f32 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

/// Everything a renderer needs for one frame.
#[derive(Debug)]
pub struct RenderFrame<'a> {
    pub displayed: &'a [f32],
    pub caps: &'a [f32],
    pub scale: f32,
    pub color_mode: ColorMode,
    pub min_bar_height: u32,
    pub max_bar_height_fraction: f32,
    pub use_caps: bool,
    pub status: Option<&'a str>,
}

/// Drawing surface the processing loop hands its results to.
pub trait Renderer {
    fn geometry(&self) -> Geometry;
    fn draw(&mut self, frame: &RenderFrame<'_>) -> Result<()>;
}

/// One bar ready for rasterization, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarSpec {
    pub height: u32,
    pub cap_height: u32,
    pub color: Rgb,
    pub cap_color: Rgb,
}

/// `clamp(mag * 50 / scale + min, min, render_height * max_fraction)`.
pub fn pixel_height(
    mag: f32,
    scale: f32,
    min_bar_height: u32,
    render_height: u32,
    max_fraction: f32,
) -> f32 {
    let lo = min_bar_height as f32;
    let hi = (render_height as f32 * max_fraction).max(lo);
    (mag * PIXELS_PER_MAGNITUDE / scale + lo).clamp(lo, hi)
}

/// HSV to 8-bit RGB. `v` is capped at 1.0; channels are truncated.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let v = v.min(1.0);
    let to_u8 = |x: f32| (x * 255.0) as u8;
    if s == 0.0 {
        return Rgb::new(to_u8(v), to_u8(v), to_u8(v));
    }
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u8 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Rgb::new(to_u8(r), to_u8(g), to_u8(b))
}

/// Bar and cap colors for bar `index` of `num_bars`.
pub fn bar_colors(mode: ColorMode, index: usize, num_bars: usize) -> (Rgb, Rgb) {
    match mode {
        ColorMode::Fixed(c) => (c, Rgb::WHITE),
        ColorMode::Rainbow => {
            let hue = index as f32 / num_bars.max(1) as f32;
            (hsv_to_rgb(hue, 1.0, 1.0), hsv_to_rgb(hue, 1.0, CAP_BRIGHTNESS))
        }
    }
}

/// Maps a frame onto `geom`: pixel heights, cap heights and colors.
pub fn layout_bars(frame: &RenderFrame<'_>, geom: Geometry) -> Vec<BarSpec> {
    let n = frame.displayed.len();
    let max_height = geom.height as f32 * frame.max_bar_height_fraction;
    let cap_limit = (max_height * CAP_MAX_FRACTION) as u32;

    frame
        .displayed
        .iter()
        .enumerate()
        .map(|(i, &mag)| {
            let height = pixel_height(
                mag,
                frame.scale,
                frame.min_bar_height,
                geom.height,
                frame.max_bar_height_fraction,
            ) as u32;
            let cap_height = if frame.use_caps {
                let cap = frame.caps.get(i).copied().unwrap_or(0.0).max(0.0);
                (cap as u32).min(cap_limit)
            } else {
                0
            };
            let (color, cap_color) = bar_colors(frame.color_mode, i, n);
            BarSpec {
                height,
                cap_height,
                color,
                cap_color,
            }
        })
        .collect()
}
