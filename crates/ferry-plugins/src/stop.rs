use async_trait::async_trait;

use crate::error::PluginError;
use crate::plugin::{Plugin, PluginReply, Turn};

/// Ends the chain without replying. Put it first to silence a conversation.
pub struct StopPlugin;

#[async_trait]
impl Plugin for StopPlugin {
    fn name(&self) -> &str {
        "stop"
    }

    async fn handle(&self, _turn: &Turn<'_>) -> Result<PluginReply, PluginError> {
        Ok(PluginReply::stop())
    }
}
