//! Generation backends.
//!
//! Every control role and worker talks to a model through [`ChatModel`].
//! Which concrete model serves a role is decided by [`ModelRegistry`].

pub mod openai;
pub mod scripted;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};

use crate::error::WorkflowError;
use crate::models::{Message, ModelTier, Node};

pub use openai::OpenAiCompatModel;
pub use scripted::{ScriptedModel, ScriptedReply};

/// One streamed piece of generated output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

impl Fragment {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reasoning_content: None,
        }
    }

    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            reasoning_content: Some(reasoning.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
            && self.reasoning_content.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Ask the backend for a JSON object response.
    #[serde(default)]
    pub json_output: bool,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            json_output: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, WorkflowError>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    async fn stream(&self, request: ChatRequest) -> Result<FragmentStream, WorkflowError>;

    /// Accumulate the streamed content into one string.
    async fn complete(&self, request: ChatRequest) -> Result<String, WorkflowError> {
        let mut stream = self.stream(request).await?;
        let mut out = String::new();
        while let Some(fragment) = stream.next().await {
            out.push_str(&fragment?.content);
        }
        Ok(out)
    }
}

/// Resolves the model serving each role.
#[derive(Clone)]
pub struct ModelRegistry {
    tiers: HashMap<ModelTier, Arc<dyn ChatModel>>,
    fallback: Arc<dyn ChatModel>,
    role_tiers: HashMap<String, ModelTier>,
}

impl ModelRegistry {
    /// Every tier served by the same model.
    pub fn uniform(model: Arc<dyn ChatModel>) -> Self {
        Self {
            tiers: HashMap::new(),
            fallback: model,
            role_tiers: HashMap::new(),
        }
    }

    pub fn with_tier(mut self, tier: ModelTier, model: Arc<dyn ChatModel>) -> Self {
        self.tiers.insert(tier, model);
        self
    }

    /// Pin a role (node name) to a tier, overriding the default map.
    pub fn with_role_tier(mut self, role: impl Into<String>, tier: ModelTier) -> Self {
        self.role_tiers.insert(role.into(), tier);
        self
    }

    pub fn tier(&self, tier: ModelTier) -> Arc<dyn ChatModel> {
        self.tiers
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn tier_for(&self, node: Node, deep_thinking: bool) -> ModelTier {
        if let Some(tier) = self.role_tiers.get(node.as_str()) {
            return *tier;
        }
        match node {
            Node::Coordinator | Node::Supervisor => ModelTier::Basic,
            Node::Planner if deep_thinking => ModelTier::Reasoning,
            Node::Planner => ModelTier::Basic,
            Node::Worker(worker) => worker.default_tier(),
        }
    }

    pub fn for_node(&self, node: Node, deep_thinking: bool) -> Arc<dyn ChatModel> {
        self.tier(self.tier_for(node, deep_thinking))
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: HashMap<&str, &str> = self
            .tiers
            .iter()
            .map(|(tier, model)| (tier.as_str(), model.name()))
            .collect();
        f.debug_struct("ModelRegistry")
            .field("tiers", &tiers)
            .field("fallback", &self.fallback.name())
            .field("role_tiers", &self.role_tiers)
            .finish()
    }
}
