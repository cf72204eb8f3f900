//! FFI 类型定义
//!
//! C-compatible 类型，用于 Rust ↔ 宿主通信

use super::method::{MethodError, MethodResponse};
use crate::render::RenderConfig;
use std::ffi::c_void;

// ============================================================================
// 数据结构
// ============================================================================

/// 插件配置（C-compatible）
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginConfig {
    /// 帧间隔（毫秒），0 = 默认 16ms
    pub frame_interval_ms: u32,

    /// 是否写默认文件日志（`<temp dir>/native_renderer.log`）
    pub file_log: bool,
}

impl PluginConfig {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::new().with_frame_interval_ms(self.frame_interval_ms as u64)
    }
}

/// FFI 错误码
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    NullPointer = 1,
    NotFound = 2,
    BadArgs = 3,
    NotImplemented = 4,
    InvalidUtf8 = 5,
    InvalidJson = 6,
}

impl ErrorCode {
    /// 错误名（与 `MethodResponse` 中的 code 一致）
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::NullPointer => "null_pointer",
            ErrorCode::NotFound => "not_found",
            ErrorCode::BadArgs => "bad_args",
            ErrorCode::NotImplemented => "not_implemented",
            ErrorCode::InvalidUtf8 => "invalid_utf8",
            ErrorCode::InvalidJson => "invalid_json",
        }
    }
}

impl From<&MethodError> for ErrorCode {
    fn from(e: &MethodError) -> Self {
        match e {
            MethodError::NotFound(_) => ErrorCode::NotFound,
            MethodError::BadArgs(_) => ErrorCode::BadArgs,
            MethodError::Unimplemented(_) => ErrorCode::NotImplemented,
        }
    }
}

impl From<&MethodResponse> for ErrorCode {
    fn from(response: &MethodResponse) -> Self {
        match response {
            MethodResponse::Success { .. } => ErrorCode::Success,
            MethodResponse::NotImplemented { .. } => ErrorCode::NotImplemented,
            MethodResponse::Error { code, .. } => match code.as_str() {
                "not_found" => ErrorCode::NotFound,
                "null_pointer" => ErrorCode::NullPointer,
                "invalid_utf8" => ErrorCode::InvalidUtf8,
                "invalid_json" => ErrorCode::InvalidJson,
                _ => ErrorCode::BadArgs,
            },
        }
    }
}

/// PixelProvider 句柄（不透明指针，注册时交给宿主）
#[repr(C)]
pub struct PixelProviderHandle {
    _private: [u8; 0],
}

/// 注册纹理回调：返回宿主分配的纹理句柄
pub type RegisterTextureCallback =
    extern "C" fn(context: *mut c_void, provider: *const PixelProviderHandle) -> i64;

/// 注销纹理 / 标记新帧回调
pub type TextureIdCallback = extern "C" fn(context: *mut c_void, texture_id: i64);

/// 宿主纹理注册表回调表
///
/// # 线程安全
/// `mark_frame_available` 会从渲染线程调用
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TextureRegistrarCallbacks {
    pub context: *mut c_void,
    pub register_texture: Option<RegisterTextureCallback>,
    pub unregister_texture: Option<TextureIdCallback>,
    pub mark_frame_available: Option<TextureIdCallback>,
}
