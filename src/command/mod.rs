//! Inbound remote commands.
//!
//! The loop polls for commands newly arrived since a checkpoint (the highest
//! command id already processed). Polling failures are logged and the tick
//! continues; motion monitoring is never interrupted by command I/O.

pub mod telegram;

pub use telegram::TelegramCommandChannel;

use anyhow::Result;

/// A remote command as delivered by the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCommand {
    /// Monotonically increasing identifier; the caller's checkpoint advances
    /// to the maximum id seen.
    pub id: i64,
    pub text: String,
}

/// Capability to fetch commands newer than a checkpoint.
pub trait CommandChannel {
    fn poll_new(&mut self, since: Option<i64>) -> Result<Vec<RemoteCommand>>;
}
