use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Centered y/N prompt for the full reset
pub fn draw_reset_confirmation(frame: &mut Frame, area: Rect) {
  let width = 52.min(area.width);
  let height = 7.min(area.height);
  let dialog = Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  );

  frame.render_widget(Clear, dialog);

  let text = vec![
    Line::from("Delete all saved attendance and log in again?"),
    Line::from(Span::styled(
      "Only local data is removed.",
      Style::default().fg(Color::DarkGray),
    )),
    Line::from(""),
    Line::from(vec![
      Span::styled("y", Style::default().fg(Color::Red).bold()),
      Span::raw(" reset   "),
      Span::styled("any other key", Style::default().fg(Color::Cyan)),
      Span::raw(" cancel"),
    ]),
  ];

  let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
    Block::default()
      .title(" Full reset ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red)),
  );
  frame.render_widget(paragraph, dialog);
}
