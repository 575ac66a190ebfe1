//! Console transport: a client that speaks for the local terminal, and the
//! parser for the management commands typed into it.

use std::any::Any;

use hotplug_core::Client;

/// Client handle for a host driven from stdin.
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    /// Name routed messages are sent as.
    user: String,
}

impl ConsoleClient {
    /// Creates a console client speaking as `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

impl Client for ConsoleClient {
    fn id(&self) -> &str {
        &self.user
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `/list`
    List,
    /// `/info <id>`
    Info(String),
    /// `/load <id>`
    Load(String),
    /// `/unload <id>`
    Unload(String),
    /// `/reload <id>`
    Reload(String),
    /// `/reload-all`
    ReloadAll,
    /// `/refresh`
    Refresh,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything not starting with `/`, routed as a text message.
    Say(String),
}

/// Help text printed by `/help`.
pub const HELP: &str = "\
Commands:
  /list               list known plugins
  /info <id>          show one plugin record
  /load <id>          load a plugin
  /unload <id>        unload a plugin
  /reload <id>        reload a plugin from a fresh load of its unit
  /reload-all         reload every active plugin
  /refresh            unload everything and rescan the plugin roots
  /help               show this text
  /quit               unload plugins and exit
Any other line is sent to plugins as a text message.";

impl ConsoleCommand {
    /// Parses one line. `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(format!("Too many arguments for /{name}"));
        }

        let with_id = |make: fn(String) -> Self| {
            arg.clone()
                .map(make)
                .ok_or_else(|| format!("Usage: /{name} <plugin id>"))
        };

        let command = match name {
            "list" => Self::List,
            "info" => with_id(Self::Info)?,
            "load" => with_id(Self::Load)?,
            "unload" => with_id(Self::Unload)?,
            "reload" => with_id(Self::Reload)?,
            "reload-all" => Self::ReloadAll,
            "refresh" => Self::Refresh,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("Unknown command /{other}, try /help")),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_routed() {
        assert_eq!(
            ConsoleCommand::parse("  hello there ").unwrap(),
            Some(ConsoleCommand::Say("hello there".to_string()))
        );
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_management_commands() {
        assert_eq!(
            ConsoleCommand::parse("/load Echo").unwrap(),
            Some(ConsoleCommand::Load("Echo".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("/reload-all").unwrap(),
            Some(ConsoleCommand::ReloadAll)
        );
        assert_eq!(ConsoleCommand::parse("/exit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_bad_commands() {
        assert!(ConsoleCommand::parse("/unload").unwrap_err().contains("Usage"));
        assert!(ConsoleCommand::parse("/load a b").is_err());
        assert!(ConsoleCommand::parse("/frobnicate").unwrap_err().contains("Unknown"));
    }

    #[test]
    fn test_console_client_id() {
        let client = ConsoleClient::new("alice");
        assert_eq!(client.id(), "alice");
    }
}
