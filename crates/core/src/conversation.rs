//! Conversation-related types.

use sidekick_model::ModelMessage;

/// Represents a conversation.
///
/// A conversation is a flat list of messages. A *turn* starts at a user
/// message and runs up to the next one, so trimming or rolling back at a
/// turn boundary never separates a tool call from its result.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    items: Vec<Item>,
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
}

impl Item {
    pub(crate) fn new(msg: ModelMessage, transcript: String) -> Self {
        Self { msg, transcript }
    }

    /// Returns the message sent to the model.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }

    /// Returns the transcript of this item.
    ///
    /// The transcript is a string representation of the message item,
    /// which can be exported later. But transcript alone is not enough
    /// to reconstruct the message item.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

impl Conversation {
    /// Returns all items, oldest first.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of user turns.
    pub fn turn_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.msg, ModelMessage::User(_)))
            .count()
    }

    #[inline]
    pub(crate) fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    /// Drops the oldest turns so that at most `max_turns` remain.
    pub(crate) fn keep_last_turns(&mut self, max_turns: usize) {
        let turn_starts: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches!(item.msg, ModelMessage::User(_)))
            .map(|(idx, _)| idx)
            .collect();
        if turn_starts.len() <= max_turns {
            return;
        }
        let cut = match max_turns {
            0 => self.items.len(),
            n => turn_starts[turn_starts.len() - n],
        };
        self.items.drain(..cut);
    }

    /// Builds the message list of a model request.
    pub(crate) fn to_messages(
        &self,
        system_prompt: Option<&str>,
    ) -> Vec<ModelMessage> {
        system_prompt
            .map(|prompt| ModelMessage::System(prompt.to_owned()))
            .into_iter()
            .chain(self.items.iter().map(|item| item.msg.clone()))
            .collect()
    }
}
