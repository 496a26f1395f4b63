//! Graph-based Workflow Orchestration
//!
//! 提供基于有向图的工作流编排系统，支持：
//! - 多种节点类型（任务、条件、并行、聚合、循环）
//! - DAG 拓扑排序执行
//! - 并行执行与同步
//! - 状态管理与数据传递
//! - 错误处理与重试
//! - 检查点与恢复

mod recorder;
mod state;

pub mod collaborators;
pub mod condition;
pub mod engine;
pub mod spec;
pub mod spec_builder;
pub mod spec_validator;
pub mod template;

pub use state::*;

pub use collaborators::{
    AgentInvocationMeta, AgentInvoker, EchoLlmClient, InMemoryWorkflowResolver, LlmClient,
    NodeFactory, WorkflowResolver,
};
pub use engine::{Engine, EngineError, EngineObservers, NodeObserver, WorkflowObserver};
pub use spec::*;
pub use spec_builder::{EdgeSpecBuilder, NodeSpecBuilder, WorkflowBuilder as SpecWorkflowBuilder};
pub use spec_validator::{validate_workflow, Severity as SpecSeverity, ValidationIssue as SpecValidationIssue, ValidationReport};
