use std::sync::LazyLock;

use regex::Regex;

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^/([^@\s]+)@?(\S*)\s?(.*)\n?$").expect("command grammar must compile")
});

/// A message text split into command parts.
///
/// Only trust `name`, `bot` and `args` when `valid` is true; on invalid input
/// every field is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub valid: bool,
    pub text: String,
    pub name: String,
    /// Target bot username from a `/cmd@bot` suffix, empty when absent.
    pub bot: String,
    pub args: String,
}

impl Command {
    /// Parse a message text. Never fails: anything outside the grammar is
    /// simply "not a command".
    pub fn parse(text: &str) -> Self {
        let Some(caps) = COMMAND_RE.captures(text) else {
            return Self::default();
        };

        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Self {
            valid: true,
            text: group(0),
            name: group(1),
            bot: group(2),
            args: group(3),
        }
    }

    /// True when the command names a specific bot.
    pub fn is_addressed(&self) -> bool {
        !self.bot.is_empty()
    }

    /// Arguments split on whitespace.
    pub fn arg_list(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }
}
