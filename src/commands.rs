/// Command palette entries and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "summary",
    aliases: &["sum", "stats"],
    description: "Overall and per-subject attendance",
  },
  Command {
    name: "records",
    aliases: &["rec", "list"],
    description: "Every lecture, sorted by date",
  },
  Command {
    name: "calendar",
    aliases: &["cal", "month"],
    description: "Month view of attendance",
  },
  Command {
    name: "refresh",
    aliases: &["sync"],
    description: "Fetch fresh attendance in the background",
  },
  Command {
    name: "retry",
    aliases: &["reload"],
    description: "Repeat the last failed load",
  },
  Command {
    name: "reset",
    aliases: &[],
    description: "Clear cached data and log in again",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit attendr",
  },
];

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  // Stable, so equal ranks keep palette order
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` when nothing matches.
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  let aliases = || cmd.aliases.iter();

  if cmd.name == input {
    Some(0)
  } else if aliases().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) || aliases().any(|a| a.contains(input)) {
    Some(4)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_wins() {
    assert_eq!(get_suggestions("reset")[0].name, "reset");
    assert_eq!(get_suggestions("Records")[0].name, "records");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("cal")[0].name, "calendar");
    assert_eq!(get_suggestions("q")[0].name, "quit");
  }

  #[test]
  fn test_prefix_keeps_palette_order() {
    let names: Vec<_> = get_suggestions("re").iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["records", "refresh", "retry", "reset"]);
  }

  #[test]
  fn test_substring_match() {
    assert_eq!(get_suggestions("mmar")[0].name, "summary");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
