//! Channel trait: the boundary between the session flow and whatever draws
//! it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;
use crate::flow::FlowState;

/// A raw line of user input.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel the input came from.
    pub channel: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            content: content.to_string(),
            received_at: Utc::now(),
        }
    }
}

/// Stream of input lines from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A presentation front-end: produces user input, renders flow snapshots.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, for logs.
    fn name(&self) -> &str;

    /// Begin reading input.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Draw whatever changed in `state` since the last call.
    async fn render(&self, state: &FlowState) -> Result<(), ChannelError>;

    /// Show a short out-of-band notice (e.g. why input was ignored).
    async fn notify(&self, notice: &str) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
