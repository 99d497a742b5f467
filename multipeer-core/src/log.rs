//! Append-only chat log. Cleared only as a whole; never persisted.

use crate::identity::PeerId;

/// Where a message came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Origin {
    Local,
    Remote(PeerId),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    pub text: String,
    pub origin: Origin,
}

impl Message {
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: String, origin: Origin) {
        self.messages.push(Message { text, origin });
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
