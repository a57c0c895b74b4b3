//! Baton Core: the control-flow engine for a coordinator, planner and
//! supervisor directing a fixed roster of specialised workers.
//!
//! This crate holds the workflow graph, the plan contract, the data-analysis
//! retry loop and the translation of a run's trace into a normalised event
//! stream. It has **no HTTP framework dependency** by default, so it can back:
//!
//! - HTTP servers (via `baton-server`)
//! - CLI tools (via `baton-cli`)
//! - embedded use in other async Rust programs
//!
//! # Feature Flags
//!
//! - `axum` — Enables `IntoResponse` impl on `WorkflowError` for use in axum handlers.

pub mod capabilities;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod graph;
pub mod guard;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod search;
pub mod service;
pub mod state;
pub mod tracer;

// Convenience re-exports
pub use config::BatonConfig;
pub use error::WorkflowError;
pub use events::{Delta, EventTranslator, WorkflowEvent};
pub use graph::{validate_plan, RunOutcome, Runtime, Termination};
pub use guard::RunGuard;
pub use models::{Message, MessageRole, Plan, PlanStep, Worker};
pub use service::{run_agent_workflow, EventStream, WorkflowService};
pub use state::{State, WorkflowOptions};
