//! Email and SMS senders used by the account flows.
//!
//! Messages are not delivered anywhere; they are appended to the provider's
//! [`Outbox`] so callers and tests can inspect them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collection::ServiceCollection;
use crate::error::DiResult;
use crate::traits::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: Channel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    EmptyRecipient,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::EmptyRecipient => write!(f, "Message recipient is empty"),
        }
    }
}

impl std::error::Error for MessageError {}

/// Messages sent through one provider.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<SentMessage>>,
}

impl Outbox {
    pub fn push(&self, message: SentMessage) {
        self.sent.lock().push(message);
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

pub trait MessageSender: Send + Sync {
    fn send_message(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MessageError>;
}

pub trait EmailSender: Send + Sync {
    fn send_email(&self, email: &str, subject: &str, message: &str) -> Result<(), MessageError>;
}

pub trait SmsSender: Send + Sync {
    fn send_sms(&self, number: &str, message: &str) -> Result<(), MessageError>;
}

/// Sender behind both [`EmailSender`] and [`SmsSender`].
pub struct AuthMessageSender {
    outbox: Arc<Outbox>,
}

impl AuthMessageSender {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self { outbox }
    }

    fn deliver(&self, channel: Channel, recipient: &str, subject: &str, body: &str) -> Result<(), MessageError> {
        if recipient.trim().is_empty() {
            return Err(MessageError::EmptyRecipient);
        }
        tracing::debug!(?channel, recipient, "message queued");
        self.outbox.push(SentMessage {
            channel,
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

impl MessageSender for AuthMessageSender {
    fn send_message(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MessageError> {
        let channel = if recipient.contains('@') {
            Channel::Email
        } else {
            Channel::Sms
        };
        self.deliver(channel, recipient, subject, body)
    }
}

impl EmailSender for AuthMessageSender {
    fn send_email(&self, email: &str, subject: &str, message: &str) -> Result<(), MessageError> {
        self.deliver(Channel::Email, email, subject, message)
    }
}

impl SmsSender for AuthMessageSender {
    fn send_sms(&self, number: &str, message: &str) -> Result<(), MessageError> {
        self.deliver(Channel::Sms, number, "", message)
    }
}

/// Registers the per-provider [`Outbox`] singleton and transient
/// `dyn EmailSender`, `dyn SmsSender` and `dyn MessageSender` bindings, each
/// backed by a new [`AuthMessageSender`].
pub fn add_message_senders(services: &mut ServiceCollection) -> DiResult<&mut ServiceCollection> {
    services
        .add_singleton_factory::<Outbox, _>(|_| Outbox::default())?
        .add_transient_trait_try_factory::<dyn EmailSender, _>(|r| {
            Ok(Arc::new(AuthMessageSender::new(r.get::<Outbox>()?)) as Arc<dyn EmailSender>)
        })?
        .add_transient_trait_try_factory::<dyn SmsSender, _>(|r| {
            Ok(Arc::new(AuthMessageSender::new(r.get::<Outbox>()?)) as Arc<dyn SmsSender>)
        })?
        .add_transient_trait_try_factory::<dyn MessageSender, _>(|r| {
            Ok(Arc::new(AuthMessageSender::new(r.get::<Outbox>()?)) as Arc<dyn MessageSender>)
        })
}
