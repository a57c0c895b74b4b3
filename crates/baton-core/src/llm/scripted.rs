//! Deterministic backend that replays canned replies.
//!
//! Replies are consumed in call order across every role sharing the model,
//! which matches the one-node-at-a-time execution of a run.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ChatModel, ChatRequest, Fragment, FragmentStream};
use crate::error::WorkflowError;

/// One canned reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    /// Whole text, streamed word by word.
    Text(String),
    /// Exact fragments to stream.
    Fragments(Vec<Fragment>),
    /// Fail the call with a backend error.
    Error { error: String },
}

impl From<&str> for ScriptedReply {
    fn from(text: &str) -> Self {
        ScriptedReply::Text(text.to_string())
    }
}

impl From<String> for ScriptedReply {
    fn from(text: String) -> Self {
        ScriptedReply::Text(text)
    }
}

pub struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new<R: Into<ScriptedReply>>(replies: impl IntoIterator<Item = R>) -> Self {
        Self {
            name: "scripted".to_string(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Load replies from a YAML list (strings, fragment lists or `{error}`).
    pub fn from_yaml(yaml: &str) -> Result<Self, WorkflowError> {
        let replies: Vec<ScriptedReply> = serde_yaml::from_str(yaml)
            .map_err(|e| WorkflowError::Config(format!("Invalid replay script: {}", e)))?;
        Ok(Self::new(replies))
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

/// Split text into fragments that keep their trailing whitespace.
fn split_words(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch.is_whitespace() {
            fragments.push(Fragment::content(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        fragments.push(Fragment::content(current));
    }
    fragments
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ChatRequest) -> Result<FragmentStream, WorkflowError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let reply = self
            .replies
            .lock()
            .map_err(|_| WorkflowError::Backend("scripted model lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| {
                WorkflowError::Backend(format!("{}: no scripted reply left", self.name))
            })?;

        let fragments = match reply {
            ScriptedReply::Text(text) => split_words(&text),
            ScriptedReply::Fragments(fragments) => fragments,
            ScriptedReply::Error { error } => return Err(WorkflowError::Backend(error)),
        };
        Ok(Box::pin(tokio_stream::iter(fragments.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_preserves_text() {
        let fragments = split_words("Sure, here's the answer");
        assert_eq!(fragments.len(), 4);
        assert_eq!(fragments[0].content, "Sure, ");
        let joined: String = fragments.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(joined, "Sure, here's the answer");
    }

    #[tokio::test]
    async fn test_replies_in_order_then_exhausted() {
        let model = ScriptedModel::new(vec!["one", "two"]);
        assert_eq!(model.complete(ChatRequest::default()).await.unwrap(), "one");
        assert_eq!(model.complete(ChatRequest::default()).await.unwrap(), "two");
        assert!(matches!(
            model.complete(ChatRequest::default()).await,
            Err(WorkflowError::Backend(_))
        ));
        assert_eq!(model.requests().len(), 3);
    }

    #[test]
    fn test_from_yaml() {
        let model = ScriptedModel::from_yaml(
            "- plain text\n- - content: hand\n  - content: off_to_planner\n- error: boom\n",
        )
        .unwrap();
        assert_eq!(model.remaining(), 3);
    }
}
