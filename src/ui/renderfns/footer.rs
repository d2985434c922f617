use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{App, NoticeLevel, ViewState};
use crate::cache::CacheSource;

const VIEWS: [&str; 3] = ["Summary", "Records", "Calendar"];

/// Draw the status line: view tabs on the left, sync state on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
  let mut spans = vec![Span::raw(" ")];

  let current = app.view().label();
  for (i, name) in VIEWS.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
    }
    let style = if *name == current {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(format!("{} {}", i + 1, name), style));
  }

  if let ViewState::Records { order, .. } = app.view() {
    spans.push(Span::styled(
      format!("  <o> {}", order.label()),
      Style::default().fg(Color::DarkGray),
    ));
  }

  spans.push(Span::raw("   "));
  spans.extend(status_spans(app));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn status_spans(app: &App) -> Vec<Span<'static>> {
  let warn = Style::default().fg(Color::Yellow);
  let error = Style::default().fg(Color::Red).bold();
  let info = Style::default().fg(Color::Green);
  let mut spans = Vec::new();

  if app.is_loading() {
    spans.push(Span::styled("Loading... ", info));
  } else if app.is_refreshing() {
    spans.push(Span::styled("Refreshing... ", info));
  }

  if let Some(load_error) = app.load_error() {
    spans.push(Span::styled(format!("{} ", load_error), error));
    let remedy = if load_error.is_retryable() {
      ":retry or :reset "
    } else {
      ":reset "
    };
    spans.push(Span::styled(remedy, warn));
  }

  if !app.logged_in() && !app.is_loading() {
    spans.push(Span::styled("[logged out] ", warn));
  }

  match app.data_source() {
    Some(CacheSource::Offline) => spans.push(Span::styled("[offline] ", warn)),
    Some(CacheSource::Cache) => spans.push(Span::styled("[cached] ", warn)),
    _ => {}
  }

  if let Some(seconds) = app.cooldown_remaining() {
    spans.push(Span::styled(
      format!("refresh in {}s ", seconds),
      Style::default().fg(Color::DarkGray),
    ));
  }

  if let Some(notice) = app.notice() {
    let style = match notice.level {
      NoticeLevel::Info => info,
      NoticeLevel::Warn => warn,
    };
    spans.push(Span::styled(notice.text.clone(), style));
  }

  spans
}
