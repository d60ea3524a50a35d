//! Impls - ResultSink の実装
//!
//! # 含まれる実装
//! - **RecordingSink**: メモリに記録（テスト用）
//! - **ChannelSink**: tokio channel に流す（presentation layer 用）
//! - **TracingSink**: tracing でログ出力
//! - NoopSink は ports 側にある

pub mod channel_sink;
pub mod recording_sink;
pub mod tracing_sink;

pub use self::channel_sink::ChannelSink;
pub use self::recording_sink::RecordingSink;
pub use self::tracing_sink::TracingSink;
