use crate::analytics::{Quarter, Stats};
use crate::app::SummaryData;
use crate::ui::renderfns::{percentage_color, truncate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

/// Overall numbers, safe-bunk projection, quarter strip and per-subject table
pub fn draw_summary(
  frame: &mut Frame,
  area: Rect,
  data: &SummaryData,
  quarters: &[Quarter],
  min_percentage: f64,
) {
  let quarter_rows = if quarters.is_empty() { 0 } else { 3 };
  let [top, strip, table] = Layout::vertical([
    Constraint::Length(8),
    Constraint::Length(quarter_rows),
    Constraint::Min(3),
  ])
  .areas(area);

  let [overall, bunk] =
    Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);

  draw_overall(frame, overall, &data.overall, min_percentage);
  draw_bunk(frame, bunk, data, min_percentage);
  if !quarters.is_empty() {
    draw_quarter_strip(frame, strip, quarters, &data.quarter_percentages, min_percentage);
  }
  draw_subject_table(frame, table, data, min_percentage);
}

fn block(title: &str) -> Block<'_> {
  Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue))
}

fn draw_overall(frame: &mut Frame, area: Rect, stats: &Stats, min: f64) {
  let label = Style::default().fg(Color::DarkGray);
  let mut lines = vec![
    Line::from(vec![
      Span::styled("Attendance  ", label),
      Span::styled(
        format!("{}%", stats.percentage),
        Style::default()
          .fg(percentage_color(stats.percent_value(), min))
          .bold(),
      ),
    ]),
    Line::from(vec![
      Span::styled("Present     ", label),
      Span::styled(stats.present.to_string(), Style::default().fg(Color::Green)),
    ]),
    Line::from(vec![
      Span::styled("Absent      ", label),
      Span::styled(stats.absent.to_string(), Style::default().fg(Color::Red)),
    ]),
    Line::from(vec![
      Span::styled("Leave       ", label),
      Span::styled(stats.leave.to_string(), Style::default().fg(Color::Yellow)),
      Span::styled(format!("   of {} classes", stats.total), label),
    ]),
    Line::from(Span::styled(
      format!("{} count toward the percentage", stats.counted()),
      label,
    )),
  ];

  if stats.unrecognized > 0 {
    lines.push(Line::from(Span::styled(
      format!("{} with unknown status", stats.unrecognized),
      Style::default().fg(Color::Magenta),
    )));
  }

  frame.render_widget(Paragraph::new(lines).block(block(" Overall ")), area);
}

fn draw_bunk(frame: &mut Frame, area: Rect, data: &SummaryData, min: f64) {
  let bunk = &data.bunk;
  let label = Style::default().fg(Color::DarkGray);

  let lines = if bunk.counted_classes == 0 {
    vec![Line::from(Span::styled("No classes counted yet", label))]
  } else if bunk.safe_bunks == 0 {
    vec![
      Line::from(Span::styled(
        format!("No classes can be skipped at {:.0}%", min),
        Style::default().fg(Color::Red).bold(),
      )),
      Line::from(Span::styled(
        format!("Currently at {}%", bunk.current_percentage),
        label,
      )),
    ]
  } else {
    vec![
      Line::from(vec![
        Span::styled("Can skip    ", label),
        Span::styled(
          format!("{} classes", bunk.safe_bunks),
          Style::default().fg(Color::Green).bold(),
        ),
      ]),
      Line::from(vec![
        Span::styled("Afterwards  ", label),
        Span::raw(format!(
          "{}% ({} of {} classes)",
          bunk.projected_percentage, data.overall.present, bunk.projected_classes
        )),
      ]),
      Line::from(vec![
        Span::styled("Minimum     ", label),
        Span::raw(format!("{:.0}%", min)),
      ]),
    ]
  };

  frame.render_widget(Paragraph::new(lines).block(block(" Safe to skip ")), area);
}

fn draw_quarter_strip(
  frame: &mut Frame,
  area: Rect,
  quarters: &[Quarter],
  percentages: &[String],
  min: f64,
) {
  let mut spans = Vec::new();
  for (i, (quarter, pct)) in quarters.iter().zip(percentages).enumerate() {
    if i > 0 {
      spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::raw(format!("Q{} ", i + 1)));
    spans.push(Span::styled(
      format!("{}%", pct),
      Style::default().fg(percentage_color(pct.parse().unwrap_or(0.0), min)),
    ));
    spans.push(Span::styled(
      format!(" ({})", quarter),
      Style::default().fg(Color::DarkGray),
    ));
  }

  frame.render_widget(
    Paragraph::new(Line::from(spans)).block(block(" Quarters ")),
    area,
  );
}

fn draw_subject_table(frame: &mut Frame, area: Rect, data: &SummaryData, min: f64) {
  let header = Row::new(["Subject", "Present", "Absent", "Leave", "Total", "%"])
    .style(Style::default().fg(Color::Cyan).bold());

  let rows: Vec<Row> = data
    .subjects
    .iter()
    .map(|s| {
      Row::new(vec![
        Cell::from(truncate(&s.subject, 40)),
        Cell::from(s.stats.present.to_string()),
        Cell::from(s.stats.absent.to_string()),
        Cell::from(s.stats.leave.to_string()),
        Cell::from(s.stats.total.to_string()),
        Cell::from(s.stats.percentage.clone())
          .style(Style::default().fg(percentage_color(s.stats.percent_value(), min))),
      ])
    })
    .collect();

  let widths = [
    Constraint::Min(20),
    Constraint::Length(8),
    Constraint::Length(8),
    Constraint::Length(7),
    Constraint::Length(7),
    Constraint::Length(8),
  ];

  let title = format!(" Subjects ({}) ", data.subjects.len());
  let table = Table::new(rows, widths).header(header).block(block(&title));
  frame.render_widget(table, area);
}
