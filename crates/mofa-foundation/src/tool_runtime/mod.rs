//! Tool Execution Runtime: turns a `ToolSpec` plus a concrete `ToolExecutor`
//! into the full validate -> ... -> emit pipeline described in
//! SPEC_FULL.md §4.2.

pub mod error;
pub mod http;
pub mod idempotency;
pub mod pipeline;

pub use error::ToolRuntimeError;
pub use http::{HttpSessionManager, HttpToolExecutor};
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
pub use pipeline::{
    build_executor, Authorizer, BoxedToolFn, FunctionToolExecutor, PolicyEngine, RateLimiter,
    SpeechGenerator, ToolExecutor, ToolOutcome, ToolPipeline, ToolRegistry,
};
