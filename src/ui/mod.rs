mod components;
mod renderfns;
mod views;

use crate::app::{App, Mode, ViewState};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, ListState, Paragraph, Wrap};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, content, footer] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  let subject = app.selected_subject();
  let scope = app.scope_label();
  renderfns::draw_header(
    frame,
    header,
    app.title(),
    &scope,
    subject.as_deref(),
    app.min_percentage(),
  );

  draw_content(frame, content, app);
  renderfns::draw_footer(frame, footer, app);

  match app.mode() {
    Mode::Command => components::draw_command_palette(
      frame,
      content,
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    ),
    Mode::ConfirmReset => components::draw_reset_confirmation(frame, content),
    Mode::Normal => {}
  }
}

fn draw_content(frame: &mut Frame, area: Rect, app: &mut App) {
  if app.current_records_empty() {
    if let Some(message) = placeholder(app) {
      let paragraph = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
      frame.render_widget(paragraph, area);
      return;
    }
  }

  match app.view() {
    ViewState::Summary => {
      let data = app.summary();
      views::draw_summary(frame, area, &data, app.quarters(), app.min_percentage());
    }
    ViewState::Records { order, .. } => {
      let order = *order;
      let records = app.sorted_records();
      if let Some(list_state) = app.records_list_state() {
        views::draw_records(frame, area, &records, list_state, order);
      }
    }
    ViewState::Calendar { .. } => {
      let calendar = app.calendar();
      views::draw_calendar(frame, area, calendar.as_ref());
    }
  }
}

/// Message shown instead of a view when there is nothing to show yet
fn placeholder(app: &App) -> Option<String> {
  if app.is_loading() {
    return Some("Loading attendance...".to_string());
  }
  if let Some(error) = app.load_error() {
    return Some(format!(
      "Could not load attendance: {}\n\nRun :retry to try again, or :reset to clear saved data and log in again.",
      error
    ));
  }
  if !app.logged_in() {
    return Some("Not logged in to the portal. Check your username and ATTENDR_PASSWORD, then :retry.".to_string());
  }
  None
}

/// Keep a list selection inside `len` items
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
  } else {
    match state.selected() {
      Some(i) if i >= len => state.select(Some(len - 1)),
      None => state.select(Some(0)),
      _ => {}
    }
  }
}
