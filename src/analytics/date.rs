use chrono::NaiveDate;

/// Parse a portal date.
///
/// Accepts `DD/MM/YYYY` (one or two digit day and month) and falls back to
/// ISO `YYYY-MM-DD`. Returns `None` for anything else.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }

  NaiveDate::parse_from_str(raw, "%d/%m/%Y")
    .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
    .ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_portal_format() {
    assert_eq!(parse_date("31/03/2025"), NaiveDate::from_ymd_opt(2025, 3, 31));
    assert_eq!(parse_date("1/4/2025"), NaiveDate::from_ymd_opt(2025, 4, 1));
    assert_eq!(parse_date(" 01/04/2025 "), NaiveDate::from_ymd_opt(2025, 4, 1));
  }

  #[test]
  fn test_parse_iso_fallback() {
    assert_eq!(parse_date("2025-01-15"), NaiveDate::from_ymd_opt(2025, 1, 15));
  }

  #[test]
  fn test_unparseable_dates() {
    assert_eq!(parse_date(""), None);
    assert_eq!(parse_date("yesterday"), None);
    assert_eq!(parse_date("31/02/2025"), None);
  }
}
