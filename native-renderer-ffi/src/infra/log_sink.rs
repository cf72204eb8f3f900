//! Diagnostic Log Sink
//!
//! 诊断日志的旁路输出，不属于功能契约：
//! - 写失败 / 文件不可用时静默丢弃，绝不影响调用方
//! - `FileLogSink`: 追加写本地文件，一行一条
//! - `MemoryLogSink`: 有界环形缓冲，按序号分页查询

use crate::ffi::logging::RustLogLevel;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 默认日志文件名（位于系统临时目录）
pub const DEFAULT_LOG_FILE_NAME: &str = "native_renderer.log";

/// 日志输出端
///
/// 可能从任意线程调用
pub trait LogSink: Send + Sync {
    fn append(&self, level: RustLogLevel, message: &str);
}

// ============================================================================
// FileLogSink
// ============================================================================

/// 追加写文件的日志输出端
///
/// 文件在第一条日志时才打开；打开失败后不再重试
pub struct FileLogSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
    disabled: AtomicBool,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
            disabled: AtomicBool::new(false),
        }
    }

    /// `<temp dir>/native_renderer.log`
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_LOG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Option<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .ok()
    }
}

impl LogSink for FileLogSink {
    fn append(&self, level: RustLogLevel, message: &str) {
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }

        let mut file = self.file.lock();
        if file.is_none() {
            match self.open() {
                Some(opened) => *file = Some(opened),
                None => {
                    self.disabled.store(true, Ordering::Relaxed);
                    return;
                }
            }
        }

        if let Some(f) = file.as_mut() {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            let _ = writeln!(f, "{} {} NR| {}", millis, level.as_str(), message);
        }
    }
}

// ============================================================================
// MemoryLogSink
// ============================================================================

/// 单条日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub seq: u64,
    pub level: RustLogLevel,
    pub text: String,
}

/// 分页查询结果
#[derive(Debug, Clone)]
pub struct LogQueryResult {
    pub lines: Vec<LogLine>,
    pub next_seq: u64,
    pub has_more: bool,
    pub truncated: bool, // true if older lines were discarded
}

struct MemoryLogState {
    lines: VecDeque<LogLine>,
    next_seq: u64,
}

/// 内存环形日志
pub struct MemoryLogSink {
    max_lines: usize,
    state: Mutex<MemoryLogState>,
}

impl MemoryLogSink {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            state: Mutex::new(MemoryLogState {
                lines: VecDeque::with_capacity(max_lines.clamp(1, 1000)),
                next_seq: 1,
            }),
        }
    }

    /// 查询 seq > after_seq 的日志，最多 limit 条
    pub fn query(&self, after_seq: u64, limit: usize) -> LogQueryResult {
        let state = self.state.lock();

        let oldest = state.lines.front().map(|l| l.seq).unwrap_or(state.next_seq);
        let truncated = after_seq + 1 < oldest;

        let mut matching = state.lines.iter().filter(|l| l.seq > after_seq);
        let lines: Vec<LogLine> = matching.by_ref().take(limit).cloned().collect();
        let has_more = matching.next().is_some();
        let next_seq = lines.last().map(|l| l.seq).unwrap_or(after_seq);

        LogQueryResult {
            lines,
            next_seq,
            has_more,
            truncated,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否有包含 `needle` 的日志
    pub fn contains(&self, needle: &str) -> bool {
        self.state.lock().lines.iter().any(|l| l.text.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, level: RustLogLevel, message: &str) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;

        if state.lines.len() >= self.max_lines {
            state.lines.pop_front();
        }
        state.lines.push_back(LogLine {
            seq,
            level,
            text: message.to_string(),
        });
    }
}
