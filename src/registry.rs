use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dispatch::RequestContext;
use crate::error::{BotError, BotResult};
use crate::response::OutboundAction;

/// What a handler callback produces: an action to send, nothing, or a failure.
pub type HandlerResult = BotResult<Option<OutboundAction>>;

pub type Callback = Arc<dyn Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Command,
    Keyword,
    Inline,
}

impl HandlerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Command => "command",
            HandlerKind::Keyword => "keyword",
            HandlerKind::Inline => "inline",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "command" | "commands" => Ok(HandlerKind::Command),
            "keyword" | "keywords" => Ok(HandlerKind::Keyword),
            "inline" | "inlines" => Ok(HandlerKind::Inline),
            _ => Err(BotError::UnknownHandlerKind(s.to_string())),
        }
    }
}

/// One name or several names sharing the same callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    fn into_vec(self) -> Vec<String> {
        match self {
            Names::One(name) => vec![name],
            Names::Many(names) => names,
        }
    }
}

impl From<&str> for Names {
    fn from(name: &str) -> Self {
        Names::One(name.to_string())
    }
}

impl From<String> for Names {
    fn from(name: String) -> Self {
        Names::One(name)
    }
}

impl From<Vec<String>> for Names {
    fn from(names: Vec<String>) -> Self {
        Names::Many(names)
    }
}

impl From<Vec<&str>> for Names {
    fn from(names: Vec<&str>) -> Self {
        Names::Many(names.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for Names {
    fn from(names: &[&str]) -> Self {
        Names::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(names: [&str; N]) -> Self {
        Names::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

#[derive(Clone)]
pub struct Entry {
    pub name: String,
    pub help: Option<String>,
    callback: Callback,
}

impl Entry {
    pub fn call(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        (self.callback)(ctx)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

/// Entries of one kind, in registration order.
#[derive(Debug, Clone, Default)]
struct Table {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Table {
    fn upsert(&mut self, entry: Entry) {
        match self.index.get(&entry.name) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&pos| &self.entries[pos])
    }
}

/// Frozen handler table. Built once through [`RegistryBuilder`] and shared
/// read-only by every dispatch.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: Table,
    keywords: Table,
    inlines: Table,
}

impl Registry {
    fn table(&self, kind: HandlerKind) -> &Table {
        match kind {
            HandlerKind::Command => &self.commands,
            HandlerKind::Keyword => &self.keywords,
            HandlerKind::Inline => &self.inlines,
        }
    }

    fn table_mut(&mut self, kind: HandlerKind) -> &mut Table {
        match kind {
            HandlerKind::Command => &mut self.commands,
            HandlerKind::Keyword => &mut self.keywords,
            HandlerKind::Inline => &mut self.inlines,
        }
    }

    pub fn get(&self, kind: HandlerKind, name: &str) -> Option<&Entry> {
        self.table(kind).get(name)
    }

    /// Entries of a kind in registration order.
    pub fn entries(&self, kind: HandlerKind) -> &[Entry] {
        &self.table(kind).entries
    }

    pub fn names(&self, kind: HandlerKind) -> Vec<&str> {
        self.entries(kind).iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self, kind: HandlerKind) -> usize {
        self.table(kind).entries.len()
    }

    pub fn is_empty(&self, kind: HandlerKind) -> bool {
        self.table(kind).entries.is_empty()
    }
}

pub struct RegistryBuilder {
    registry: Registry,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// A builder with the built-in `/help` command already registered.
    pub fn new() -> Self {
        let mut builder = Self {
            registry: Registry::default(),
        };
        builder.add(
            HandlerKind::Command,
            "help",
            help_command,
            Some("Prints this message"),
        );
        builder
    }

    /// Register under a kind given by name. Returns `false` and registers
    /// nothing when the kind is unknown.
    pub fn register<F>(
        &mut self,
        kind: &str,
        names: impl Into<Names>,
        callback: F,
        help: Option<&str>,
    ) -> bool
    where
        F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        match kind.parse::<HandlerKind>() {
            Ok(kind) => {
                self.add(kind, names, callback, help);
                true
            }
            Err(e) => {
                warn!("Registration skipped: {}", e);
                false
            }
        }
    }

    /// Register a callback under every given name. Re-registering a name
    /// replaces its callback and help but keeps its position.
    pub fn add<F>(
        &mut self,
        kind: HandlerKind,
        names: impl Into<Names>,
        callback: F,
        help: Option<&str>,
    ) -> &mut Self
    where
        F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        for name in names.into().into_vec() {
            debug!("Registered {} handler: {}", kind, name);
            self.registry.table_mut(kind).upsert(Entry {
                name,
                help: help.map(str::to_string),
                callback: Arc::clone(&callback),
            });
        }
        self
    }

    pub fn command<F>(mut self, names: impl Into<Names>, help: &str, callback: F) -> Self
    where
        F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(HandlerKind::Command, names, callback, Some(help));
        self
    }

    pub fn keyword<F>(mut self, names: impl Into<Names>, callback: F) -> Self
    where
        F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(HandlerKind::Keyword, names, callback, None);
        self
    }

    pub fn inline<F>(mut self, names: impl Into<Names>, callback: F) -> Self
    where
        F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(HandlerKind::Inline, names, callback, None);
        self
    }

    pub fn build(self) -> Registry {
        info!(
            "Registry ready: {} commands, {} keywords, {} inline handlers",
            self.registry.len(HandlerKind::Command),
            self.registry.len(HandlerKind::Keyword),
            self.registry.len(HandlerKind::Inline),
        );
        self.registry
    }
}

/// Lists every registered command, read from the registry at call time.
fn help_command(ctx: &RequestContext<'_>) -> HandlerResult {
    let mut text = String::from("All commands are listed below:\n");
    for entry in ctx.registry.entries(HandlerKind::Command) {
        match &entry.help {
            Some(help) => text.push_str(&format!("/{}: {}\n", entry.name, help)),
            None => text.push_str(&format!("/{}\n", entry.name)),
        }
    }
    OutboundAction::text(ctx.update, text).map(Some)
}
