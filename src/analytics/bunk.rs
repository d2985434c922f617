use super::stats::format_percentage;

/// How many more classes can be missed while staying at the minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BunkProjection {
  pub safe_bunks: usize,
  pub current_percentage: String,
  /// Percentage after missing all `safe_bunks` classes
  pub projected_percentage: String,
  /// Classes counted now (leaves excluded)
  pub counted_classes: usize,
  /// Classes counted after the projected absences
  pub projected_classes: usize,
}

/// Largest `N` with `present / (total - leave + N) >= min_percentage / 100`,
/// assuming every one of the `N` future classes is an absence.
///
/// `min_percentage` is clamped to `[1, 100]`.
pub fn safe_bunk_calculator(
  total: usize,
  present: usize,
  leave: usize,
  min_percentage: f64,
) -> BunkProjection {
  let counted = total.saturating_sub(leave);
  let min = min_percentage.clamp(1.0, 100.0);
  let current_percentage = format_percentage(present, counted);

  let keeps_minimum = |classes: usize| present as f64 * 100.0 >= min * classes as f64;

  if counted == 0 || !keeps_minimum(counted) {
    return BunkProjection {
      safe_bunks: 0,
      projected_percentage: current_percentage.clone(),
      current_percentage,
      counted_classes: counted,
      projected_classes: counted,
    };
  }

  // Closed-form estimate, then nudge to absorb floating point error
  let estimate = (present as f64 * 100.0 / min - counted as f64).floor();
  let mut bunks = if estimate > 0.0 { estimate as usize } else { 0 };
  while bunks > 0 && !keeps_minimum(counted + bunks) {
    bunks -= 1;
  }
  while keeps_minimum(counted + bunks + 1) {
    bunks += 1;
  }

  BunkProjection {
    safe_bunks: bunks,
    current_percentage,
    projected_percentage: format_percentage(present, counted + bunks),
    counted_classes: counted,
    projected_classes: counted + bunks,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exact_threshold() {
    // 17 / 20 = 85%
    let projection = safe_bunk_calculator(17, 17, 0, 85.0);
    assert_eq!(projection.safe_bunks, 3);
    assert_eq!(projection.projected_percentage, "85.00");
    assert_eq!(projection.projected_classes, 20);
  }

  #[test]
  fn test_leaves_are_excluded() {
    // counted = 10, 10 / 12 = 83.3% < 85, 10 / 11 = 90.9%
    let projection = safe_bunk_calculator(12, 10, 1, 85.0);
    assert_eq!(projection.counted_classes, 11);
    assert_eq!(projection.current_percentage, "90.91");
    assert_eq!(projection.safe_bunks, 0);
  }

  #[test]
  fn test_below_minimum_gives_zero() {
    let projection = safe_bunk_calculator(10, 7, 0, 75.0);
    assert_eq!(projection.safe_bunks, 0);
    assert_eq!(projection.projected_percentage, "70.00");
  }

  #[test]
  fn test_zero_whenever_below_minimum() {
    for total in 1..30usize {
      for present in 0..=total {
        let current = present as f64 / total as f64 * 100.0;
        let projection = safe_bunk_calculator(total, present, 0, 80.0);
        if current < 80.0 {
          assert_eq!(projection.safe_bunks, 0, "{}/{}", present, total);
        } else {
          let after = present as f64 / (total + projection.safe_bunks) as f64 * 100.0;
          let one_more = present as f64 / (total + projection.safe_bunks + 1) as f64 * 100.0;
          assert!(after >= 80.0 - 1e-9);
          assert!(one_more < 80.0);
        }
      }
    }
  }

  #[test]
  fn test_no_counted_classes() {
    let projection = safe_bunk_calculator(3, 0, 3, 85.0);
    assert_eq!(projection.safe_bunks, 0);
    assert_eq!(projection.current_percentage, "0.00");
  }

  #[test]
  fn test_min_percentage_is_clamped() {
    let projection = safe_bunk_calculator(1, 1, 0, 0.0);
    // Clamped to 1%: 1 / 100 still keeps the minimum
    assert_eq!(projection.safe_bunks, 99);
  }
}
