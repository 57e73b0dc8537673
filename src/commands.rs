/// Available commands and autocomplete logic
use crate::api::ResourceKind;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

/// What running a command does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  Open(ResourceKind),
  Quit,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "leads",
    aliases: &["l", "lead"],
    description: "Sales leads",
    action: CommandAction::Open(ResourceKind::Lead),
  },
  Command {
    name: "groups",
    aliases: &["g", "customer-groups", "customers"],
    description: "Customer groups",
    action: CommandAction::Open(ResourceKind::CustomerGroup),
  },
  Command {
    name: "orders",
    aliases: &["o", "sales-orders", "so"],
    description: "Sales orders",
    action: CommandAction::Open(ResourceKind::SalesOrder),
  },
  Command {
    name: "invoices",
    aliases: &["i", "inv"],
    description: "Invoices",
    action: CommandAction::Open(ResourceKind::Invoice),
  },
  Command {
    name: "deliveries",
    aliases: &["d", "delivery-notes", "dn"],
    description: "Delivery notes",
    action: CommandAction::Open(ResourceKind::DeliveryNote),
  },
  Command {
    name: "payments",
    aliases: &["p", "pay"],
    description: "Payments",
    action: CommandAction::Open(ResourceKind::Payment),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit bizdesk",
    action: CommandAction::Quit,
  },
];

/// Resolve a command name or alias exactly
pub fn find(name: &str) -> Option<&'static Command> {
  let name = name.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == name || cmd.aliases.contains(&name.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  // Lower rank sorts first
  let rank = |cmd: &Command| -> Option<u32> {
    let alias = |f: &dyn Fn(&str) -> bool| cmd.aliases.iter().any(|a| f(a));
    if cmd.name == input_lower {
      Some(0)
    } else if alias(&|a| a == input_lower) {
      Some(1)
    } else if cmd.name.starts_with(&input_lower) {
      Some(2)
    } else if alias(&|a| a.starts_with(&input_lower)) {
      Some(3)
    } else if cmd.name.contains(&input_lower) {
      Some(4)
    } else if alias(&|a| a.contains(&input_lower)) {
      Some(5)
    } else {
      None
    }
  };

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd).map(|r| (cmd, r)))
    .collect();

  // Stable sort keeps declaration order within a rank
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("invoices");
    assert_eq!(suggestions[0].name, "invoices");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("so");
    assert_eq!(suggestions[0].name, "orders");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("pay");
    assert_eq!(suggestions[0].name, "payments");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("iver");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "deliveries");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }

  #[test]
  fn test_every_resource_has_a_command() {
    for kind in ResourceKind::ALL {
      assert!(
        COMMANDS
          .iter()
          .any(|cmd| cmd.action == CommandAction::Open(kind)),
        "no command opens {}",
        kind
      );
    }
  }

  #[test]
  fn test_find() {
    assert_eq!(find("G").unwrap().name, "groups");
    assert_eq!(find("exit").unwrap().action, CommandAction::Quit);
    assert!(find("gro").is_none());
  }
}
