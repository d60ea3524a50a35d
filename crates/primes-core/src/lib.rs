//! primes-core
//!
//! Concurrent prime finder: one task per candidate in [1, n], a bounded worker
//! pool, atomic aggregation with a checked invariant, and cooperative
//! cancellation.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, candidate, outcome, state, errors）
//! - **ports**: presentation layer との境界（ResultSink）
//! - **app**: RunController, ResultAggregator, builder
//! - **pool**: TaskPool（固定数の worker）
//! - **impls**: ResultSink の実装
//! - **primality**: trial division
//! - **config**: EngineConfig
//! - **observability**: PoolStats, CounterSnapshot

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod pool;
pub mod ports;
pub mod primality;

pub use app::{BuildError, RunController, RunControllerBuilder, RunHandle};
pub use config::EngineConfig;
pub use domain::{Baseline, ErrorKind, PrimesError, RunStatus, RunSummary};
pub use ports::{ResultSink, SinkEvent};
