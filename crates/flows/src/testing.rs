//! Scripted providers shared by the flow tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use curalink_core::{Message, Provider, ProviderError, ProviderRequest, ProviderResponse, Usage};

use crate::flow::{Flow, FlowSpec};
use crate::runner::{FlowRunner, FlowSettings};

/// One scripted provider outcome.
pub enum Reply {
    Text(String),
    Error(ProviderError),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }
}

/// Returns scripted replies in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Reply>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(mut replies: Vec<Reply>) -> Self {
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop();
        match reply {
            Some(Reply::Text(text)) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 40,
                    completion_tokens: 12,
                    total_tokens: 52,
                }),
                model: "scripted-model".into(),
            }),
            Some(Reply::Error(e)) => Err(e),
            None => panic!("ScriptedProvider exhausted after {} calls", self.calls()),
        }
    }
}

/// Never answers.
pub struct StalledProvider;

#[async_trait]
impl Provider for StalledProvider {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// Build a flow backed by a [`ScriptedProvider`].
pub fn scripted_flow<S: FlowSpec>(spec: S, replies: Vec<Reply>) -> (Flow<S>, Arc<ScriptedProvider>) {
    let provider = Arc::new(ScriptedProvider::new(replies));
    let runner = Arc::new(FlowRunner::new(provider.clone(), FlowSettings::default()));
    (Flow::new(spec, runner).unwrap(), provider)
}
