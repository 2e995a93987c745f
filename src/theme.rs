use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub rating: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  // Deep navy with indigo accents.
  Theme {
    name: "Midnight",
    bg: Color::Rgb(10, 15, 28),
    fg: Color::Rgb(226, 228, 240),
    accent: Color::Rgb(129, 140, 248),
    muted: Color::Rgb(120, 126, 150),
    border: Color::Rgb(48, 56, 84),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(79, 70, 229),
    stripe_bg: Color::Rgb(16, 22, 38),
    status: Color::Rgb(147, 197, 253),
    error: Color::Rgb(248, 113, 113),
    rating: Color::Rgb(250, 204, 21),
    key_fg: Color::Rgb(10, 15, 28),
    key_bg: Color::Rgb(129, 140, 248),
  },
  Theme {
    name: "Dusk",
    bg: Color::Rgb(26, 29, 41),
    fg: Color::Rgb(236, 228, 220),
    accent: Color::Rgb(236, 72, 153),
    muted: Color::Rgb(140, 130, 140),
    border: Color::Rgb(70, 60, 80),
    highlight_fg: Color::Rgb(26, 29, 41),
    highlight_bg: Color::Rgb(244, 114, 182),
    stripe_bg: Color::Rgb(32, 34, 48),
    status: Color::Rgb(196, 181, 253),
    error: Color::Rgb(251, 146, 60),
    rating: Color::Rgb(253, 224, 71),
    key_fg: Color::Rgb(26, 29, 41),
    key_bg: Color::Rgb(236, 72, 153),
  },
  // Plain terminal palette for light backgrounds and 16-color terminals.
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Blue,
    error: Color::Red,
    rating: Color::Yellow,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}
