//! Infrastructure Layer - 基础设施层
//!
//! 职责：提供底层基础设施支持
//!
//! 模块：
//! - atomic_cache: 原子状态（运行标志、帧统计）
//! - log_sink: 诊断日志输出端（文件 / 内存）
//! - stress_tests: 压力测试（仅测试构建）

pub mod atomic_cache;
pub mod log_sink;


pub use atomic_cache::{AtomicRunFlag, FrameStats};
pub use log_sink::{FileLogSink, LogLine, LogQueryResult, LogSink, MemoryLogSink};
