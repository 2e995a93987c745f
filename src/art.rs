use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};
use reqwest::Client;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::display::DisplayMode;

const ASCII_RAMP: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

/// Download and decode a TMDB backdrop.
pub async fn fetch_backdrop(client: &Client, path: &str, size: &str) -> Result<DynamicImage> {
  let url = CatalogClient::image_url(path, size);
  let response = client.get(&url).send().await.with_context(|| format!("Failed to fetch {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Backdrop {} returned {}", url, response.status()));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  let image = image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image (URL: {})", url))?;
  debug!(path = %path, width = image.width(), height = image.height(), "art: backdrop decoded");
  Ok(image)
}

/// Pixel size to resize to so the image fills `area` in `mode`.
///
/// Half-block cells hold two pixel rows; ASCII cells hold one.
pub fn target_size(area: Rect, mode: DisplayMode) -> (u32, u32) {
  let w = area.width as u32;
  let rows = area.height as u32;
  match mode {
    DisplayMode::Direct => (w, rows * 2),
    DisplayMode::Ascii | DisplayMode::Off => (w, rows),
  }
}

pub fn fit(image: &DynamicImage, area: Rect, mode: DisplayMode) -> DynamicImage {
  let (w, h) = target_size(area, mode);
  image.resize_to_fill(w.max(1), h.max(1), FilterType::Triangle)
}

/// Draws an already-fitted image into the buffer.
pub struct BackdropWidget<'a> {
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

impl Widget for BackdropWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Direct => render_half_blocks(self.image, area, buf),
      DisplayMode::Ascii => render_ascii(self.image, area, buf),
      DisplayMode::Off => {}
    }
  }
}

fn render_half_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let cols = rgb.width().min(area.width as u32);
  let rows = rgb.height().div_ceil(2).min(area.height as u32);

  for row in 0..rows {
    for col in 0..cols {
      let top = rgb.get_pixel(col, row * 2);
      let bottom_y = row * 2 + 1;
      let bg = if bottom_y < rgb.height() {
        let bottom = rgb.get_pixel(col, bottom_y);
        Color::Rgb(bottom[0], bottom[1], bottom[2])
      } else {
        Color::Reset
      };
      let style = Style::default().fg(Color::Rgb(top[0], top[1], top[2])).bg(bg);
      buf.set_string(area.x + col as u16, area.y + row as u16, "▀", style);
    }
  }
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let cols = luma.width().min(area.width as u32);
  let rows = luma.height().min(area.height as u32);
  let last = ASCII_RAMP.len() - 1;

  for row in 0..rows {
    for col in 0..cols {
      let level = luma.get_pixel(col, row)[0] as usize * last / 255;
      buf.set_string(area.x + col as u16, area.y + row as u16, ASCII_RAMP[level.min(last)], Style::default());
    }
  }
}
