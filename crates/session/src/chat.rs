//! Live chat between the patient and a doctor responder.
//!
//! A [`ChatSession`] owns the ordered, append-only history for one
//! consultation. Dropping the session discards it.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use curalink_core::{ChatTurn, Clock, Sender, ValidationError};
use curalink_flows::{ChatWithDoctorInput, FlowSet};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::error::SessionError;

/// Produces the doctor's side of the conversation.
#[async_trait]
pub trait DoctorResponder: Send + Sync {
    fn name(&self) -> &str;

    /// Reply to `message`, given the turns that came before it.
    async fn reply(&self, history: &[ChatTurn], message: &str) -> Result<String, SessionError>;
}

/// Answers through the `chatWithDoctor` flow.
pub struct FlowResponder {
    flows: Arc<FlowSet>,
}

impl FlowResponder {
    pub fn new(flows: Arc<FlowSet>) -> Self {
        Self { flows }
    }
}

#[async_trait]
impl DoctorResponder for FlowResponder {
    fn name(&self) -> &str {
        "flow"
    }

    async fn reply(&self, history: &[ChatTurn], message: &str) -> Result<String, SessionError> {
        let input = ChatWithDoctorInput::new(message).with_history(history.to_vec());
        let output = self.flows.chat.run(input).await?;
        Ok(output.doctor_response)
    }
}

/// Canned follow-up questions used by [`SimulatedResponder`].
pub const CANNED_REPLIES: [&str; 4] = [
    "Understood. And how severe is the fatigue?",
    "Have you taken any medication for these symptoms?",
    "Are there any other symptoms I should be aware of, like a sore throat or body aches?",
    "Okay, please describe the cough in more detail.",
];

/// Pretends to be a doctor typing: waits 1.5 to 2.5 seconds on the clock and
/// answers with a canned question.
pub struct SimulatedResponder {
    clock: Arc<dyn Clock>,
    replies: Vec<String>,
    typing_ms: Range<u64>,
}

impl SimulatedResponder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            replies: CANNED_REPLIES.iter().map(|s| s.to_string()).collect(),
            typing_ms: 1500..2500,
        }
    }

    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        if !replies.is_empty() {
            self.replies = replies;
        }
        self
    }
}

#[async_trait]
impl DoctorResponder for SimulatedResponder {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn reply(&self, _history: &[ChatTurn], _message: &str) -> Result<String, SessionError> {
        let (delay, reply) = {
            let mut rng = rand::rng();
            let delay = Duration::from_millis(rng.random_range(self.typing_ms.clone()));
            let reply = self.replies.choose(&mut rng).cloned().unwrap_or_default();
            (delay, reply)
        };
        self.clock.sleep(delay).await;
        Ok(reply)
    }
}

/// One consultation's chat.
pub struct ChatSession {
    history: Vec<ChatTurn>,
    responder: Arc<dyn DoctorResponder>,
}

impl ChatSession {
    pub fn new(responder: Arc<dyn DoctorResponder>) -> Self {
        Self {
            history: Vec::new(),
            responder,
        }
    }

    /// Start with the doctor's greeting already in the history.
    pub fn with_greeting(responder: Arc<dyn DoctorResponder>, greeting: impl Into<String>) -> Self {
        let mut session = Self::new(responder);
        session.history.push(ChatTurn::doctor(greeting));
        session
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn responder_name(&self) -> &str {
        self.responder.name()
    }

    /// Send a patient message and wait for the doctor's reply.
    ///
    /// Blank messages are rejected and leave the history untouched. The
    /// patient turn is recorded before the responder is asked, so it stays
    /// in the history even if the reply fails.
    pub async fn send(&mut self, text: &str) -> Result<&ChatTurn, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::new("patientMessage", "must not be empty").into());
        }

        let prior = self.history.len();
        self.history.push(ChatTurn::patient(text));
        let reply = self.responder.reply(&self.history[..prior], text).await?;

        debug!(responder = self.responder.name(), turns = self.history.len() + 1, "Doctor replied");
        self.history.push(ChatTurn::doctor(reply));
        let last = self.history.len() - 1;
        Ok(&self.history[last])
    }
}
