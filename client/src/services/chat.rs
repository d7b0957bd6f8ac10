use crate::{client::join, Client, Result};
use maffisol_types::api::ChatMessage;

impl Client {
    pub async fn chat_messages(&self) -> Result<Vec<ChatMessage>> {
        let url = join(&self.endpoints.base, &["chat", "messages"])?;
        self.get_json(url).await
    }

    /// Stores a public chat message and returns it as saved.
    pub async fn send_chat_message(&self, sender_id: &str, message: &str) -> Result<ChatMessage> {
        let url = join(&self.endpoints.base, &["chat", "send"])?;
        self.post_json(url, &ChatMessage::public(sender_id, message))
            .await
    }
}
