//! Internal execution trace emitted by the driver and its nodes.
//!
//! The trace is the only thing the event translator sees; nodes never talk
//! to the external event stream directly.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use crate::error::WorkflowError;
use crate::guard::RunGuard;
use crate::llm::{ChatModel, ChatRequest, Fragment};
use crate::models::Node;

#[derive(Debug, Clone)]
pub enum TraceEvent {
    NodeStart {
        node: Node,
        step: usize,
    },
    NodeEnd {
        node: Node,
        step: usize,
    },
    LlmStart {
        node: Node,
    },
    LlmFragment {
        node: Node,
        message_id: String,
        fragment: Fragment,
    },
    LlmEnd {
        node: Node,
    },
    ToolStart {
        node: Node,
        run_id: String,
        tool_name: String,
        input: Value,
    },
    ToolEnd {
        node: Node,
        run_id: String,
        tool_name: String,
        result: Value,
    },
}

/// Cheap, cloneable sender half of a run's trace.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    tx: Option<mpsc::UnboundedSender<TraceEvent>>,
}

impl Tracer {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TraceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A tracer that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: TraceEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is listening any more.
            let _ = tx.send(event);
        }
    }

    pub fn for_node(&self, node: Node) -> NodeTracer {
        NodeTracer {
            tracer: self.clone(),
            node,
        }
    }
}

/// Trace handle bound to the node currently executing.
#[derive(Debug, Clone)]
pub struct NodeTracer {
    tracer: Tracer,
    node: Node,
}

impl NodeTracer {
    /// Stream one backend call, tracing every fragment, and return the
    /// accumulated content. Start/end markers are always balanced.
    pub async fn generate(
        &self,
        model: &dyn ChatModel,
        request: ChatRequest,
        guard: &RunGuard,
    ) -> Result<String, WorkflowError> {
        guard.check()?;
        let message_id = uuid::Uuid::new_v4().to_string();
        self.tracer.emit(TraceEvent::LlmStart { node: self.node });

        let result = guard
            .run(async {
                let mut stream = model.stream(request).await?;
                let mut content = String::new();
                while let Some(fragment) = stream.next().await {
                    let fragment = fragment?;
                    if fragment.is_empty() {
                        continue;
                    }
                    content.push_str(&fragment.content);
                    self.tracer.emit(TraceEvent::LlmFragment {
                        node: self.node,
                        message_id: message_id.clone(),
                        fragment,
                    });
                }
                Ok(content)
            })
            .await;

        self.tracer.emit(TraceEvent::LlmEnd { node: self.node });
        if let Err(e) = &result {
            tracing::warn!("[{}] Generation failed: {}", self.node, e);
        }
        result
    }

    /// Run one tool call under the guard with start/result trace events.
    pub async fn tool<I, T, F>(
        &self,
        tool_name: &str,
        input: &I,
        guard: &RunGuard,
        fut: F,
    ) -> Result<T, WorkflowError>
    where
        I: Serialize + ?Sized,
        T: Serialize,
        F: Future<Output = Result<T, WorkflowError>>,
    {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.tracer.emit(TraceEvent::ToolStart {
            node: self.node,
            run_id: run_id.clone(),
            tool_name: tool_name.to_string(),
            input: serde_json::to_value(input).unwrap_or(Value::Null),
        });

        let result = guard.run(fut).await;
        let traced = match &result {
            Ok(value) => serde_json::to_value(value).unwrap_or(Value::Null),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        self.tracer.emit(TraceEvent::ToolEnd {
            node: self.node,
            run_id,
            tool_name: tool_name.to_string(),
            result: traced,
        });
        result
    }
}
