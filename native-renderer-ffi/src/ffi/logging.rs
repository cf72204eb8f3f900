//! 日志桥接 FFI 模块
//!
//! 将 Rust 端的生命周期 / 请求日志转发到宿主，并可选落盘。
//!
//! # 架构
//! - 宿主通过全局回调接收日志消息（未设置时 fallback 到 eprintln!）
//! - 另有一个可注入的 `LogSink`（文件 / 内存），尽力而为，不能让任何操作失败
//!
//! # 使用方式
//! ```ignore
//! // 宿主设置回调
//! set_rust_log_callback(my_callback);
//! // 或者落盘到 %TEMP%/native_renderer.log
//! native_renderer_enable_file_log(std::ptr::null());
//!
//! // Rust 端记录日志
//! rust_log_info!("create(): tex_id={}", id);
//! rust_log_error!("[RenderLoop] render thread EXCEPTION: {}", msg);
//! ```

use crate::infra::log_sink::{FileLogSink, LogSink};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::ffi::{c_char, CStr, CString};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

// ============================================================================
// 日志级别定义
// ============================================================================

/// 日志级别（与宿主 LogLevel 对应）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RustLogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl RustLogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RustLogLevel::Debug => "DEBUG",
            RustLogLevel::Info => "INFO",
            RustLogLevel::Warn => "WARN",
            RustLogLevel::Error => "ERROR",
        }
    }
}

// ============================================================================
// 回调类型定义
// ============================================================================

/// 日志回调函数类型
///
/// # 线程安全
/// 回调会从渲染线程调用，宿主需要保证线程安全
pub type LogCallback = extern "C" fn(level: RustLogLevel, message: *const c_char);

// ============================================================================
// 全局状态
// ============================================================================

/// 全局日志回调（原子指针，线程安全）
static LOG_CALLBACK: AtomicPtr<()> = AtomicPtr::new(std::ptr::null_mut());

/// 诊断日志输出端（可选）
static LOG_SINK: RwLock<Option<Arc<dyn LogSink>>> = RwLock::new(None);

/// 默认文件日志（进程内共用一个文件句柄）
static DEFAULT_FILE_SINK: Lazy<Arc<FileLogSink>> =
    Lazy::new(|| Arc::new(FileLogSink::new(FileLogSink::default_path())));

// ============================================================================
// FFI 函数
// ============================================================================

/// 设置日志回调
#[no_mangle]
pub extern "C" fn set_rust_log_callback(callback: LogCallback) {
    LOG_CALLBACK.store(callback as *mut (), Ordering::SeqCst);
}

/// 清除日志回调
#[no_mangle]
pub extern "C" fn clear_rust_log_callback() {
    LOG_CALLBACK.store(std::ptr::null_mut(), Ordering::SeqCst);
}

/// 启用文件日志
///
/// - path 为 NULL：写到 `<temp dir>/native_renderer.log`
/// - path 非 UTF-8：返回 false
#[no_mangle]
pub extern "C" fn native_renderer_enable_file_log(path: *const c_char) -> bool {
    if path.is_null() {
        install_default_file_sink();
        return true;
    }

    let path = match unsafe { CStr::from_ptr(path) }.to_str() {
        Ok(p) if !p.is_empty() => p,
        _ => return false,
    };
    install_file_sink(Arc::new(FileLogSink::new(path)));
    true
}

/// 关闭文件日志（移除当前 sink）
#[no_mangle]
pub extern "C" fn native_renderer_disable_file_log() {
    remove_log_sink();
}

// ============================================================================
// Sink 管理
// ============================================================================

/// 安装诊断日志 sink，返回被替换的旧 sink
pub fn install_log_sink(sink: Arc<dyn LogSink>) -> Option<Arc<dyn LogSink>> {
    LOG_SINK.write().replace(sink)
}

/// 启用默认文件日志
pub fn install_default_file_sink() {
    install_file_sink(DEFAULT_FILE_SINK.clone());
}

fn install_file_sink(sink: Arc<FileLogSink>) {
    let path = sink.path().display().to_string();
    install_log_sink(sink);
    crate::rust_log_info!("[Logging] file log enabled: {}", path);
}

pub fn remove_log_sink() -> Option<Arc<dyn LogSink>> {
    LOG_SINK.write().take()
}

// ============================================================================
// 核心日志函数
// ============================================================================

/// 发送日志消息
///
/// 1. 回调已设置 → 发到宿主；否则 eprintln!
/// 2. sink 已安装 → 追加一行
///
/// 可以从任何线程调用
pub fn log_message(level: RustLogLevel, message: &str) {
    let callback = LOG_CALLBACK.load(Ordering::SeqCst);

    if !callback.is_null() {
        if let Ok(c_string) = CString::new(message) {
            let callback: LogCallback = unsafe { std::mem::transmute(callback) };
            callback(level, c_string.as_ptr());
        } else {
            // 字符串中包含 null 字符
            eprintln!("{}", message);
        }
    } else {
        eprintln!("{}", message);
    }

    // 先拷贝出 Arc 再写，不在读锁内做 I/O
    let sink = LOG_SINK.read().clone();
    if let Some(sink) = sink {
        sink.append(level, message);
    }
}

// ============================================================================
// 便捷宏
// ============================================================================

/// Debug 日志宏
#[macro_export]
macro_rules! rust_log_debug {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::RustLogLevel::Debug,
            &format!($($arg)*)
        )
    };
}

/// Info 日志宏
#[macro_export]
macro_rules! rust_log_info {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::RustLogLevel::Info,
            &format!($($arg)*)
        )
    };
}

/// Warn 日志宏
#[macro_export]
macro_rules! rust_log_warn {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::RustLogLevel::Warn,
            &format!($($arg)*)
        )
    };
}

/// Error 日志宏
#[macro_export]
macro_rules! rust_log_error {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::RustLogLevel::Error,
            &format!($($arg)*)
        )
    };
}

// ============================================================================
// 测试
// ============================================================================
