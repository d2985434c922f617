use crate::commands::Command;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Most suggestions shown at once
const MAX_SUGGESTIONS: usize = 7;

/// Draw the `:` palette with autocomplete, anchored top-left of `area`
pub fn draw_command_palette(
  frame: &mut Frame,
  area: Rect,
  input: &str,
  suggestions: &[&Command],
  selected: usize,
) {
  let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;
  let width = (area.width * 3 / 5).clamp(30, 64).min(area.width);
  let height = (3 + shown).min(area.height);
  let palette = Rect::new(area.x + 1, area.y + 1, width.saturating_sub(1), height);

  frame.render_widget(Clear, palette);

  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow))
    .title(" Command ");
  let inner = block.inner(palette);
  frame.render_widget(block, palette);

  if inner.height == 0 {
    return;
  }

  let [input_area, list_area] =
    Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

  let prompt = Line::from(vec![
    Span::styled(":", Style::default().fg(Color::Yellow)),
    Span::raw(input),
    Span::styled("_", Style::default().fg(Color::Yellow)),
  ]);
  frame.render_widget(Paragraph::new(prompt), input_area);

  if suggestions.is_empty() || list_area.height == 0 {
    return;
  }

  let items: Vec<ListItem> = suggestions
    .iter()
    .take(MAX_SUGGESTIONS)
    .map(|cmd| {
      ListItem::new(Line::from(vec![
        Span::styled(format!("{:<10}", cmd.name), Style::default().fg(Color::Cyan)),
        Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
      ]))
    })
    .collect();

  let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
  let mut state = ListState::default().with_selected(Some(selected.min(MAX_SUGGESTIONS - 1)));
  frame.render_stateful_widget(list, list_area, &mut state);
}
