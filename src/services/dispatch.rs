//! Message dispatch: `data.msg.<schema>` query, then one chat post per message.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppError;
use crate::model::{MessageQueryInput, MessageQueryOutput, Schema};
use crate::services::chat::{ChatClient, render};
use crate::services::policy::{PolicyClient, query_as};

#[derive(Clone)]
pub struct MessageDispatcher {
    policy: Arc<dyn PolicyClient>,
    chat: Arc<dyn ChatClient>,
}

impl MessageDispatcher {
    pub fn new(policy: Arc<dyn PolicyClient>, chat: Arc<dyn ChatClient>) -> Self {
        Self { policy, chat }
    }

    /// Returns the number of messages sent.
    ///
    /// Messages go out in policy order. The first failed post stops the loop;
    /// messages already posted are not retracted.
    pub async fn dispatch(
        &self,
        schema: &Schema,
        input: &MessageQueryInput,
    ) -> Result<usize, AppError> {
        let query = schema.to_query();
        debug!(%query, input = ?input.redacted(), "message query");

        let output: MessageQueryOutput = query_as(self.policy.as_ref(), &query, input).await?;

        for (i, message) in output.messages.iter().enumerate() {
            let post = render::render(message);
            self.chat.post_message(&post).await.inspect_err(|err| {
                info!(%schema, index = i, channel = %post.channel, error = %err, "chat post failed");
            })?;
        }

        info!(%schema, sent = output.messages.len(), "messages dispatched");
        Ok(output.messages.len())
    }
}
