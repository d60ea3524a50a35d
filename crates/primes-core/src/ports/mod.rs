//! Ports - 抽象化レイヤー
//!
//! core と外部（presentation layer）との境界。
//! core は結果を `ResultSink` 経由でしか外に出さない。

pub mod result_sink;

pub use self::result_sink::{NoopSink, ResultSink, SinkEvent};
