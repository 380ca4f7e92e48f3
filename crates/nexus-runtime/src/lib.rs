//! Nexus Runtime - the adaptive reasoning engine.
//!
//! This crate orchestrates everything above the infrastructure layer:
//!
//! - [`Conversation`] and [`Session`] with snapshot persistence via a
//!   [`SessionManager`]
//! - the generic FIFO [`QueueProcessor`] behind [`QueryQueue`] and
//!   [`StatusQueue`]
//! - the per-query [`ProgressTracker`] journal
//! - the reasoning components: [`ComplexityAnalyzer`], [`Planner`],
//!   [`Evaluator`], [`Synthesizer`]
//! - the three execution strategies and the [`AdaptiveReasoningLoop`]
//!   that escalates between them on insufficient quality
//! - the [`CommandControlAgent`] preprocessor for `/command` and
//!   `@resource` surfaces
//!
//! Every reasoning component has an explicit fallback on LLM failure;
//! no single parse error, tool failure, or server drop takes the
//! runtime down.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

mod command;
mod conversation;
mod error;
mod executor;
mod observer;
mod parsers;
mod queue;
mod reasoning;
mod reasoning_loop;
mod session;
mod session_manager;
mod strategies;
mod tracker;

pub use command::CommandControlAgent;
pub use conversation::Conversation;
pub use error::{RuntimeError, RuntimeResult};
pub use executor::{ExecutorConfig, ToolLoopExecutor};
pub use observer::{ExecutionObserver, NoopObserver};
pub use parsers::{ArgumentParser, CompositeParser, KeyValueParser, PositionalParser, PromptArgumentSchema};
pub use queue::{
    ItemProcessor, QueryItem, QueryQueue, QueueProcessor, StatusQueue, StatusSink, StatusUpdate,
};
pub use reasoning::analyzer::ComplexityAnalyzer;
pub use reasoning::config::ReasoningConfig;
pub use reasoning::evaluator::Evaluator;
pub use reasoning::metrics::{AggregateMetrics, ExecutionMetrics, MetricsCollector};
pub use reasoning::planner::{AttemptSummary, PlanContext, PlanMode, Planner};
pub use reasoning::synthesizer::{SubtaskResult, Synthesizer};
pub use reasoning::tuning::{ThresholdProfile, ThresholdTuner};
pub use reasoning::types::{
    ComplexityAnalysis, ComplexityLevel, EvaluationResult, PlanComplexity, ResearchPlan,
    StrategyKind, SubTask,
};
pub use reasoning_loop::AdaptiveReasoningLoop;
pub use session::{Agent, Session, SessionMetadata, SessionSnapshot};
pub use session_manager::{SessionDefaults, SessionManager};
pub use strategies::{
    DeepReasoningStrategy, DirectStrategy, ExecutionStrategy, LightPlanningStrategy,
};
pub use tracker::{Attempt, Insights, PlanStep, ProgressTracker, StepStatus, ToolExecution, TrackedPlan};
