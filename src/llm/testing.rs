//! Scripted in-process LLM client for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ChatMessage, ChatOptions, LlmClient, LlmError, RawResponse};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok(RawResponse),
    Err(LlmError),
    /// Never answers; only a timeout or cancellation ends the call.
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Reply>,
    last: Option<Reply>,
    calls: Vec<Instant>,
    requests: Vec<(String, Vec<ChatMessage>, ChatOptions)>,
}

/// Plays back replies in order, repeating the final one once exhausted.
#[derive(Debug, Default)]
pub(crate) struct ScriptedLlm {
    script: Mutex<Script>,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(Script {
                replies: replies.into(),
                ..Script::default()
            }),
        }
    }

    /// Answers every call with a chat completion whose content is `content`.
    pub(crate) fn replying(content: &str) -> Self {
        Self::new(vec![Reply::Ok(completion(content))])
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }

    pub(crate) fn requests(&self) -> Vec<(String, Vec<ChatMessage>, ChatOptions)> {
        self.script.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<RawResponse, LlmError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Instant::now());
            script
                .requests
                .push((model.to_string(), messages.to_vec(), options));
            match script.replies.pop_front() {
                Some(reply) => {
                    script.last = Some(reply.clone());
                    reply
                }
                None => script.last.clone().unwrap_or(Reply::Hang),
            }
        };

        match reply {
            Reply::Ok(response) => Ok(response),
            Reply::Err(error) => Err(error),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// An OpenAI-style chat completion payload carrying `content`.
pub(crate) fn completion(content: &str) -> RawResponse {
    RawResponse::Json(serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}
