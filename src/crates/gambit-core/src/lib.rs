//! Core engine for gambit: typed plans, validation, and the plan interpreter.
//!
//! This crate is the provider-agnostic heart of the system. It owns:
//!
//! - The plan data model ([`plan`]) - labelled steps with `llm`, `tool`,
//!   `if`, `goto` and `end` kinds.
//! - Plan validation ([`validate`]) - structural invariants reported as a
//!   full diagnostic list rather than a first-failure error.
//! - The per-execution variable environment ([`env`]) - a write-once
//!   name-to-string store with `{name}` template rendering.
//! - The condition grammar ([`condition`]) - a tiny side-effect-free
//!   expression language for `if` steps.
//! - The execution event model ([`events`]) - the closed set of lifecycle
//!   events observers receive.
//! - The interpreter ([`interpreter`]) - a single-threaded instruction
//!   pointer over the step list with bounded iteration and cancellation.
//!
//! The crate deliberately contains no LLM client and no tool
//! implementations. Those live behind the [`model::CompletionModel`] and
//! [`tool::ToolDispatcher`] traits; the `llm` and `tooling` crates provide
//! the concrete implementations.

pub mod condition;
pub mod env;
pub mod events;
pub mod interpreter;
pub mod model;
pub mod plan;
pub mod tool;
pub mod validate;

pub use env::Environment;
pub use events::ExecutionEvent;
pub use interpreter::{EventSink, Interpreter, Outcome};
pub use plan::{Plan, Step, ToolArgument, ITERATION_CEILING};
pub use validate::{IssueCode, PlanIssue, Severity};

/// Name of the system-provided variable seeded with the user's query.
pub const USER_QUERY_VAR: &str = "user_query";
