//! FFI 模块 - 提供 C ABI 兼容的 FFI 接口
//!
//! 本模块将 FFI 函数按功能拆分为多个子模块：
//! - logging: 日志桥接（宿主回调 + 文件日志）
//! - plugin: 插件句柄、方法调用、像素拉取

pub mod logging;
pub mod plugin;

// Re-export 所有 FFI 函数和类型，保持外部可见性
pub use logging::*;
pub use plugin::*;
