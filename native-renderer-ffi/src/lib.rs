//! Native Renderer FFI
//!
//! 在后台线程生成 BGRA 像素帧，以 pull 模式纹理的形式交给宿主 UI 合成，
//! 同时接收宿主周期性上传的实例数据（instances）叠加到画面上。
//!
//! 分层：
//! - domain: 像素帧（FrameBuffer）+ 实例数据（InstanceSet）
//! - render: 渲染配置 / 逐帧绘制 / 渲染线程生命周期
//! - app: 会话表 + 请求路由 + 纹理注册表接口
//! - ffi: C ABI（插件句柄、方法调用、像素拉取、日志桥接）
//! - infra: 原子状态、诊断日志 sink
//!
//! 数据流：
//!
//! ```text
//! Host (method call)
//!     ↓
//! RequestRouter → SessionTable → Renderer
//!                                   ↓ (render thread, pixel lock)
//!                               FrameBuffer → TextureRegistry::mark_frame_available
//!                                   ↑
//! Host compositor → PixelProvider::pull (pixel lock)
//! ```

/// 辅助宏：在 FFI 边界捕获 panic
macro_rules! catch_panic {
    ($default:expr, $body:expr) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $body)) {
            Ok(result) => result,
            Err(e) => {
                $crate::rust_log_error!(
                    "[native_renderer FFI] Caught panic: {}",
                    $crate::panic_message(&*e)
                );
                $default
            }
        }
    };
}

pub mod domain;
pub mod render;
pub mod app;
pub mod ffi;
pub mod infra;

// ============================================================================
// 全局常量
// ============================================================================

/// 单边最大像素数（create 参数校验上限）
pub const MAX_DIMENSION: i64 = 16384;

/// 默认帧间隔（毫秒，约 60Hz）
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

pub use app::{
    ArgValue, MethodArgs, MethodCall, MethodError, MethodResponse, PixelProvider, RequestRouter,
    SessionTable, TextureRegistry,
};
pub use domain::{FrameBuffer, InstanceRecord, InstanceSet, PixelBufferDescriptor};
pub use render::{RenderConfig, Renderer};

/// 从 panic payload 中取出可读消息
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown".to_string()
    }
}
