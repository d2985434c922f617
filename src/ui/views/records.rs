use crate::analytics::SortOrder;
use crate::portal::types::AttendanceRecord;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Date-sorted list of every visible lecture
pub fn draw_records(
  frame: &mut Frame,
  area: Rect,
  records: &[AttendanceRecord],
  list_state: &mut ListState,
  order: SortOrder,
) {
  ensure_valid_selection(list_state, records.len());

  let block = Block::default()
    .title(format!(" Records ({}, {}) ", records.len(), order.label()))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if records.is_empty() {
    let paragraph = Paragraph::new("No attendance in this scope.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = records
    .iter()
    .map(|r| {
      ListItem::new(Line::from(vec![
        Span::styled(format!("{:<11}", r.date), Style::default().fg(Color::Cyan)),
        Span::styled(
          format!("{:<8}", truncate(r.status.label(), 8)),
          Style::default().fg(status_color(&r.status)),
        ),
        Span::raw(format!("{:<32} ", truncate(&r.subject, 32))),
        Span::styled(
          format!("{:<10} ", truncate(&r.lecture_type, 10)),
          Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
          format!("{:<15} ", truncate(&r.lecture_time, 15)),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(truncate(&r.teacher, 24)),
      ]))
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  frame.render_stateful_widget(list, area, list_state);
}
