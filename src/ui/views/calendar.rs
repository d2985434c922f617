use crate::analytics::{DayStatus, MonthCalendar};
use chrono::{Datelike, NaiveDate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn day_color(status: DayStatus) -> Color {
  match status {
    DayStatus::Present => Color::Green,
    DayStatus::Absent => Color::Red,
    DayStatus::Mixed => Color::Yellow,
    DayStatus::LeaveOnly => Color::Blue,
    DayStatus::NoClasses => Color::DarkGray,
  }
}

/// Sunday-first month grid; each day shows present/total
pub fn draw_calendar(frame: &mut Frame, area: Rect, calendar: Option<&MonthCalendar>) {
  let Some(calendar) = calendar else {
    frame.render_widget(Paragraph::new("Invalid month"), area);
    return;
  };

  let title = NaiveDate::from_ymd_opt(calendar.year, calendar.month, 1)
    .map(|d| format!(" {} ", d.format("%B %Y")))
    .unwrap_or_default();

  let [grid_area, legend_area] =
    Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

  let header = Row::new(WEEKDAYS).style(Style::default().fg(Color::Cyan).bold());

  let rows: Vec<Row> = calendar
    .weeks
    .iter()
    .map(|week| {
      Row::new(week.iter().map(|day| match day {
        Some(day) => {
          let style = Style::default().fg(day_color(day.status));
          let counts = if day.records.is_empty() {
            String::new()
          } else {
            format!(" {}/{}", day.stats.present, day.records.len())
          };
          Cell::from(format!("{:>2}{}", day.date.day(), counts)).style(style)
        }
        None => Cell::from(""),
      }))
      .height(2)
    })
    .collect();

  let table = Table::new(rows, [Constraint::Ratio(1, 7); 7])
    .header(header)
    .block(
      Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
  frame.render_widget(table, grid_area);

  let legend = Line::from(vec![
    Span::styled(" present ", Style::default().fg(day_color(DayStatus::Present))),
    Span::styled(" absent ", Style::default().fg(day_color(DayStatus::Absent))),
    Span::styled(" mixed ", Style::default().fg(day_color(DayStatus::Mixed))),
    Span::styled(" leave ", Style::default().fg(day_color(DayStatus::LeaveOnly))),
    Span::styled("   <h/l> month", Style::default().fg(Color::DarkGray)),
  ]);
  frame.render_widget(Paragraph::new(legend), legend_area);
}
