use crate::studio::prompts::WELCOME_MESSAGE;
use crate::studio::request::TattooRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Loading,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub content: MessageContent,
    pub image_url: Option<String>,
    pub prompt: Option<String>,
    pub request: Option<TattooRequest>,
    pub needle_recommendation: Option<String>,
    pub color_palette: Option<Vec<String>>,
}

impl Message {
    fn new(id: u64, sender: Sender, content: MessageContent) -> Self {
        Self {
            id,
            sender,
            content,
            image_url: None,
            prompt: None,
            request: None,
            needle_recommendation: None,
            color_palette: None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Loading => None,
        }
    }
}

/// Everything a settled turn writes over its placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotReply {
    pub content: String,
    pub image_url: Option<String>,
    pub prompt: Option<String>,
    pub request: Option<TattooRequest>,
    pub needle_recommendation: Option<String>,
    pub color_palette: Option<Vec<String>>,
}

impl BotReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("a request is already in progress")]
    Busy,
    #[error("message {0} does not exist")]
    UnknownMessage(u64),
    #[error("message {0} carries no tattoo request to regenerate")]
    NotRegenerable(u64),
}

/// Proof that a placeholder is outstanding. Consumed by
/// [`Conversation::settle`], so each turn settles exactly once.
#[derive(Debug)]
#[must_use = "a pending turn must be settled"]
pub struct PendingTurn {
    index: usize,
    placeholder_id: u64,
}

impl PendingTurn {
    pub fn placeholder_id(&self) -> u64 {
        self.placeholder_id
    }
}

/// Append-only transcript. At most one loading placeholder exists at a time.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
    pending: Option<u64>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let mut conversation = Self {
            messages: Vec::new(),
            next_id: 1,
            pending: None,
        };
        let id = conversation.allocate_id();
        conversation.messages.push(Message::new(
            id,
            Sender::Bot,
            MessageContent::Text(WELCOME_MESSAGE.to_string()),
        ));
        conversation
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn get(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Appends the user entry and a loading placeholder in one step.
    pub fn begin_turn(
        &mut self,
        user_text: impl Into<String>,
        user_image_url: Option<String>,
    ) -> Result<PendingTurn, TurnError> {
        if self.is_busy() {
            return Err(TurnError::Busy);
        }

        let user_id = self.allocate_id();
        let mut user_message = Message::new(
            user_id,
            Sender::User,
            MessageContent::Text(user_text.into()),
        );
        user_message.image_url = user_image_url;
        self.messages.push(user_message);

        let placeholder_id = self.allocate_id();
        self.messages.push(Message::new(
            placeholder_id,
            Sender::Bot,
            MessageContent::Loading,
        ));
        self.pending = Some(placeholder_id);

        Ok(PendingTurn {
            index: self.messages.len() - 1,
            placeholder_id,
        })
    }

    /// Overwrites the placeholder in place; the log length does not change.
    pub fn settle(&mut self, turn: PendingTurn, reply: BotReply) -> &Message {
        self.pending = None;
        let slot = &mut self.messages[turn.index];
        debug_assert_eq!(slot.id, turn.placeholder_id);
        *slot = Message {
            id: turn.placeholder_id,
            sender: Sender::Bot,
            content: MessageContent::Text(reply.content),
            image_url: reply.image_url,
            prompt: reply.prompt,
            request: reply.request,
            needle_recommendation: reply.needle_recommendation,
            color_palette: reply.color_palette,
        };
        slot
    }

    pub fn regenerable_request(&self, id: u64) -> Result<TattooRequest, TurnError> {
        let message = self.get(id).ok_or(TurnError::UnknownMessage(id))?;
        match (&message.sender, &message.request) {
            (Sender::Bot, Some(request)) => Ok(request.clone()),
            _ => Err(TurnError::NotRegenerable(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_welcome_message() {
        let conversation = Conversation::new();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].sender, Sender::Bot);
        assert_eq!(conversation.messages()[0].text(), Some(WELCOME_MESSAGE));
        assert!(!conversation.is_busy());
    }

    #[test]
    fn begin_turn_appends_user_and_placeholder() {
        let mut conversation = Conversation::new();
        let turn = conversation.begin_turn("ciao", None).unwrap();

        assert_eq!(conversation.len(), 3);
        let messages = conversation.messages();
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[2].content, MessageContent::Loading);
        assert_eq!(messages[2].id, turn.placeholder_id());
        assert!(conversation.is_busy());

        let settled = conversation.settle(turn, BotReply::text("fatto"));
        assert_eq!(settled.text(), Some("fatto"));
        assert_eq!(conversation.len(), 3);
        assert!(!conversation.is_busy());
        assert!(conversation
            .messages()
            .iter()
            .all(|message| message.content != MessageContent::Loading));
    }

    #[test]
    fn second_submission_is_rejected_while_pending() {
        let mut conversation = Conversation::new();
        let turn = conversation.begin_turn("primo", None).unwrap();
        assert_eq!(
            conversation.begin_turn("secondo", None).unwrap_err(),
            TurnError::Busy
        );
        assert_eq!(conversation.len(), 3);

        conversation.settle(turn, BotReply::text("ok"));
        assert!(conversation.begin_turn("secondo", None).is_ok());
        assert_eq!(conversation.len(), 5);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut conversation = Conversation::new();
        let turn = conversation.begin_turn("a", None).unwrap();
        conversation.settle(turn, BotReply::text("b"));
        let ids: Vec<u64> = conversation.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn only_bot_messages_with_requests_are_regenerable() {
        let mut conversation = Conversation::new();
        assert_eq!(
            conversation.regenerable_request(1).unwrap_err(),
            TurnError::NotRegenerable(1)
        );
        assert_eq!(
            conversation.regenerable_request(42).unwrap_err(),
            TurnError::UnknownMessage(42)
        );
        let turn = conversation.begin_turn("a", None).unwrap();
        conversation.settle(turn, BotReply::text("nessuna immagine"));
        assert_eq!(
            conversation.regenerable_request(3).unwrap_err(),
            TurnError::NotRegenerable(3)
        );
    }
}
