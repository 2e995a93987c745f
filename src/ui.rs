use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, Row, RowId};
use crate::art::{self, BackdropWidget};
use crate::media::{Episode, MediaItem};
use crate::theme::Theme;

const CHIP_WIDTH: usize = 24;
const ROW_HEIGHT: u16 = 3;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// First index of a window of `fit` entries that keeps `selected` in view.
fn scroll_start(selected: usize, fit: usize) -> usize {
  selected.saturating_sub(fit.saturating_sub(1))
}

fn rounded_block(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

/// "2019 · Movie · 2h 22m · ★ 8.4"
fn meta_line(item: &MediaItem) -> String {
  let mut parts = Vec::new();
  if let Some(year) = item.year() {
    parts.push(year.to_string());
  }
  parts.push(item.kind().label().to_string());
  if let Some(extent) = item.runtime_label().or_else(|| item.seasons_label()) {
    parts.push(extent);
  }
  if item.vote_average() > 0.0 {
    parts.push(format!("★ {:.1}", item.vote_average()));
  }
  parts.join(" · ")
}

/// "Episode 3 · 2011-04-17 · 58m · ★ 8.1"
fn episode_meta(episode: &Episode) -> String {
  let mut parts = vec![format!("Episode {}", episode.episode_number)];
  if let Some(date) = episode.air_date.as_deref().filter(|d| !d.is_empty()) {
    parts.push(date.to_string());
  }
  if let Some(minutes) = episode.runtime.filter(|m| *m > 0) {
    parts.push(format!("{}m", minutes));
  }
  if episode.vote_average > 0.0 {
    parts.push(format!("★ {:.1}", episode.vote_average));
  }
  parts.join(" · ")
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, input_area, main_area, status_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_input(frame, app, input_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ sinema ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("{}  v{} ", app.language(), env!("CARGO_PKG_VERSION"));
  let width = version.chars().count() as u16;
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.mode == AppMode::Details && app.details.is_some() {
    render_details(frame, app, area);
  } else if app.active_query.is_some() {
    render_search(frame, app, area);
  } else {
    render_browse(frame, app, area);
  }
}

fn render_browse(frame: &mut Frame, app: &mut App, area: Rect) {
  let banner_h = (area.height / 2).clamp(6, 14).min(area.height);
  let [banner_area, rows_area] = Layout::vertical([Constraint::Length(banner_h), Constraint::Min(0)]).areas(area);
  render_featured(frame, app, banner_area);
  render_rows(frame, app, rows_area);
}

fn render_featured(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = rounded_block(theme)
    .title(" Featured ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let Some(item) = app.featured.clone() else {
    let loading = Paragraph::new("Loading…").style(Style::default().fg(theme.muted)).alignment(Alignment::Center);
    frame.render_widget(loading, inner);
    return;
  };

  let text_area = if app.display_mode.shows_art() {
    let [art_area, text_area] =
      Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).spacing(1).areas(inner);
    render_art(frame, app, art_area, item.backdrop_path());
    text_area
  } else {
    inner
  };

  let w = text_area.width as usize;
  let genres: Vec<&str> = item.genres().iter().take(2).map(|g| g.name.as_str()).collect();
  let lines = vec![
    Line::from(Span::styled(truncate_str(item.title(), w), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
    Line::from(Span::styled(meta_line(&item), Style::default().fg(theme.rating))),
    Line::from(Span::styled(genres.join(" · "), Style::default().fg(theme.muted))),
    Line::from(""),
    Line::from(Span::styled(item.overview().to_string(), Style::default().fg(theme.fg))),
  ];
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), text_area);
}

/// Draw the cached backdrop for `path` into `area`, refitting when the area changes.
fn render_art(frame: &mut Frame, app: &mut App, area: Rect, path: Option<&str>) {
  let Some(path) = path else { return };
  let Some((source_path, image)) = &app.art.source else { return };
  if source_path != path {
    return;
  }
  let needs_fit = match &app.art.fitted {
    Some((p, w, h, _)) => p != path || *w != area.width || *h != area.height,
    None => true,
  };
  if needs_fit {
    let fitted = art::fit(image, area, app.display_mode);
    app.art.fitted = Some((path.to_string(), area.width, area.height, fitted));
  }
  if let Some((_, _, _, ref fitted)) = app.art.fitted {
    frame.render_widget(BackdropWidget { image: fitted, display_mode: app.display_mode }, area);
  }
}

fn render_rows(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let rows = app.visible_rows();
  if rows.is_empty() {
    let msg = Paragraph::new("Nothing to show yet.").style(Style::default().fg(theme.muted)).alignment(Alignment::Center);
    frame.render_widget(msg, area);
    return;
  }

  let fit = (area.height / ROW_HEIGHT).max(1) as usize;
  let focus = app.focus.min(rows.len() - 1);
  let start = scroll_start(focus, fit);

  for (slot, (i, id)) in rows.iter().enumerate().skip(start).take(fit).enumerate() {
    let row_area = Rect { y: area.y + slot as u16 * ROW_HEIGHT, height: ROW_HEIGHT.min(area.height), ..area };
    let focused = app.mode == AppMode::Browse && i == focus;
    render_row(frame, app, *id, app.row(*id), focused, row_area);
  }
}

fn render_row(frame: &mut Frame, app: &App, id: RowId, row: &Row, focused: bool, area: Rect) {
  let theme = app.theme();
  let title_style = if focused {
    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(theme.fg)
  };
  let mut title = vec![Span::styled(format!(" {}", row.title), title_style)];
  if row.loading {
    title.push(Span::styled("  loading…", Style::default().fg(theme.muted)));
  } else if !row.items.is_empty() {
    title.push(Span::styled(format!("  {}/{}", row.selected + 1, row.items.len()), Style::default().fg(theme.muted)));
  }
  frame.render_widget(Line::from(title), Rect { height: 1, ..area });

  if area.height < 2 {
    return;
  }
  let fit = (area.width as usize / (CHIP_WIDTH + 1)).max(1);
  let start = scroll_start(row.selected, fit);
  let spans: Vec<Span> = row
    .items
    .iter()
    .enumerate()
    .skip(start)
    .take(fit)
    .flat_map(|(i, item)| {
      let label = chip_label(app, id, item);
      let chip = format!(" {:<width$}", truncate_str(&label, CHIP_WIDTH - 2), width = CHIP_WIDTH - 2);
      let style = if focused && i == row.selected {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else if i == row.selected {
        Style::default().fg(theme.fg).bg(theme.stripe_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.fg).bg(theme.stripe_bg)
      };
      [Span::styled(format!("{} ", chip), style), Span::raw(" ")]
    })
    .collect();
  frame.render_widget(Line::from(spans), Rect { y: area.y + 1, height: 1, ..area });
}

fn chip_label(app: &App, id: RowId, item: &MediaItem) -> String {
  let resume = match id {
    RowId::ContinueWatching => app.history.get(item.id(), item.kind()).and_then(|h| h.episode_label()),
    _ => None,
  };
  match resume {
    Some(label) => format!("{} {}", label, item.title()),
    None => item.title().to_string(),
  }
}

fn render_search(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let query = app.active_query.as_deref().unwrap_or_default();
  let block = rounded_block(theme)
    .title(format!(" Results for \"{}\" ", truncate_str(query, 40)))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .padding(Padding::vertical(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  if app.visible_rows().is_empty() {
    let text = if app.searching { "Searching…" } else { "No results found" };
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(theme.muted)).alignment(Alignment::Center), inner);
    return;
  }
  render_rows(frame, app, inner);
}

fn render_details(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some(item) = app.details.as_ref().map(|d| d.item.clone()) else { return };

  let block = rounded_block(theme)
    .title(format!(" {} ", item.title()))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let has_seasons = !item.seasons().is_empty();
  let top_h = if has_seasons { (inner.height / 2).max(6).min(inner.height) } else { inner.height };
  let [top_area, episodes_area] = Layout::vertical([Constraint::Length(top_h), Constraint::Min(0)]).areas(inner);

  let text_area = if app.display_mode.shows_art() {
    let [art_area, text_area] =
      Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).spacing(2).areas(top_area);
    render_art(frame, app, art_area, item.backdrop_path());
    text_area
  } else {
    top_area
  };

  let mut lines = vec![
    Line::from(Span::styled(item.title().to_string(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
    Line::from(Span::styled(meta_line(&item), Style::default().fg(theme.rating))),
  ];
  if !item.genres().is_empty() {
    let genres: Vec<&str> = item.genres().iter().map(|g| g.name.as_str()).collect();
    lines.push(Line::from(Span::styled(genres.join(", "), Style::default().fg(theme.muted))));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(item.overview().to_string(), Style::default().fg(theme.fg))));
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), text_area);

  if has_seasons {
    render_episodes(frame, app, episodes_area);
  }
}

fn render_episodes(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some(view) = app.details.as_mut() else { return };
  if area.height < 2 {
    return;
  }

  let tabs: Vec<Span> = view
    .item
    .seasons()
    .iter()
    .enumerate()
    .flat_map(|(i, season)| {
      let label = if season.name.is_empty() { format!("Season {}", season.season_number) } else { season.name.clone() };
      let style = if i == view.season_idx {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.muted)
      };
      [Span::styled(format!(" {} ", label), style), Span::raw(" ")]
    })
    .collect();
  let [tabs_area, list_area] = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
  frame.render_widget(Line::from(tabs), tabs_area);

  let [list_area, episode_area] =
    Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).spacing(2).areas(list_area);

  let inner_w = list_area.width.saturating_sub(4) as usize;
  let items: Vec<ListItem> = view
    .current_season()
    .map(|s| s.episodes.as_slice())
    .unwrap_or_default()
    .iter()
    .enumerate()
    .map(|(i, ep)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let label = format!("{:>2}. {}", ep.episode_number, ep.name);
      ListItem::new(Line::from(Span::styled(truncate_str(&label, inner_w), Style::default().fg(theme.fg)))).bg(bg)
    })
    .collect();

  if items.is_empty() {
    let msg = Paragraph::new("No episodes listed.").style(Style::default().fg(theme.muted));
    frame.render_widget(msg, list_area);
    return;
  }

  if let Some(episode) = view.selected_episode() {
    let overview =
      if episode.overview.trim().is_empty() { "No description available." } else { episode.overview.as_str() };
    let lines = vec![
      Line::from(Span::styled(episode.name.clone(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
      Line::from(Span::styled(episode_meta(episode), Style::default().fg(theme.rating))),
      Line::from(""),
      Line::from(Span::styled(overview.to_string(), Style::default().fg(theme.fg))),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), episode_area);
  }

  let list = List::new(items)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  frame.render_stateful_widget(list, list_area, &mut view.episodes);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ♪ {}", info), Style::default().fg(theme.status))
  } else if app.searching {
    (" Searching…".to_string(), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Search { theme.accent } else { theme.border };
  // Show that typed text has not been committed to a search yet.
  let title = if app.input != app.debouncer.committed() { " Search movies & series … " } else { " Search movies & series " };
  let input_block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = if visible.is_empty() && app.mode != AppMode::Search {
    Paragraph::new("Press / to search").style(Style::default().fg(theme.muted))
  } else {
    Paragraph::new(visible).style(Style::default().fg(theme.fg))
  };
  frame.render_widget(paragraph.block(input_block), area);

  if app.mode == AppMode::Search {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Search => vec![("Enter", "Search"), ("↓", "Browse"), ("Esc", "Clear"), ("^t", "Theme")],
    AppMode::Browse => {
      let mut k = vec![("Enter", "Details"), ("p", "Play"), ("←→↑↓", "Navigate"), ("/", "Search")];
      if app.active_query.is_none() && app.featured.is_some() {
        k.push(("f", "Featured"));
        k.push(("P", "Play featured"));
      } else if app.active_query.is_some() {
        k.push(("Esc", "Clear"));
      }
      k.push(("q", "Quit"));
      k
    }
    AppMode::Details => {
      let series = app.details.as_ref().is_some_and(|d| !d.item.seasons().is_empty());
      let mut k = vec![("Enter", "Play")];
      if series {
        k.push(("[ ]", "Season"));
        k.push(("j/k", "Episode"));
      }
      k.push(("Esc", "Back"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let label = format!("{} · {} ", app.display_mode.label(), theme.name);
  let width = label.chars().count() as u16;
  let right = Line::from(Span::styled(&label, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}
