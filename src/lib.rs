//! Webhook router for Telegram-style chat bots.
//!
//! An inbound update is matched against registered command, keyword and
//! inline handlers (in that order), at most one handler answers, and its
//! outbound action is sent back through a [`platform::Transport`].

pub mod bot;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod outbound;
pub mod platform;
pub mod registry;
pub mod response;
pub mod server;
pub mod update;

pub use bot::{Bot, DispatchReport};
pub use command::Command;
pub use dispatch::{Dispatcher, RequestContext};
pub use error::{BotError, BotResult};
pub use registry::{HandlerKind, HandlerResult, Registry, RegistryBuilder};
pub use response::{OutboundAction, ResponseBuilder, Targeting};
pub use update::InboundUpdate;
