//! funcbench Core Library
//!
//! Core library for the funcbench invocation harness. Provides the run
//! configuration, request input generation, the function client contract,
//! the gem5 simulator hook, and the invocation driver that sequences one
//! end-to-end benchmark run.

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod generator;
pub mod m5;
pub mod types;

// Re-export commonly used types
pub use client::FunctionClient;
pub use config::{GeneratorKind, RunConfig};
pub use driver::{Driver, RunPhase, RunSummary, WORK_ID_BASE};
pub use error::{ClientError, ConfigError, HookError, InvokerError, InvokerResult};
pub use generator::InputGenerator;
pub use m5::{codes, M5Ops, NoopHook, SimulatorHook};
pub use types::{FunctionName, Port, Reply, Request};
