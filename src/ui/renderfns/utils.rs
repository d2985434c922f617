use ratatui::prelude::Color;

use crate::portal::types::Status;

/// Truncate to at most `max_len` characters, ending with "..." when cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    return s.to_string();
  }
  let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
  format!("{}...", kept)
}

/// Display color for an attendance status
pub fn status_color(status: &Status) -> Color {
  match status {
    Status::Present => Color::Green,
    Status::Absent => Color::Red,
    Status::Leave => Color::Yellow,
    Status::Unrecognized(_) => Color::Magenta,
  }
}

/// Green at or above the minimum, red below it
pub fn percentage_color(percentage: f64, min: f64) -> Color {
  if percentage >= min {
    Color::Green
  } else {
    Color::Red
  }
}
