use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, scope, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  scope: &str,
  subject: Option<&str>,
  min_percentage: f64,
) {
  let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
  let hint = |h: &'static str| Span::styled(h, Style::default().fg(Color::DarkGray));
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let header = Line::from(vec![
    Span::styled(" attendr ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    sep(),
    Span::styled(format!(" {} ", scope), Style::default().fg(Color::Yellow).bold()),
    sep(),
    Span::styled(
      format!(" {} ", subject.unwrap_or("All subjects")),
      Style::default().fg(Color::White),
    ),
    sep(),
    Span::styled(
      format!(" min {:.0}% ", min_percentage),
      Style::default().fg(Color::White),
    ),
    Span::raw(" "),
    key("<r>"),
    hint(" refresh  "),
    key("<[ ]>"),
    hint(" quarter  "),
    key("<s>"),
    hint(" subject  "),
    key("<+ ->"),
    hint(" min  "),
    key("<:>"),
    hint(" command  "),
    key("<q>"),
    hint(" quit"),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
