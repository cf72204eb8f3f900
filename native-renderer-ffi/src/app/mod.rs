//! Application Layer
//!
//! 职责：会话编排 + 请求分发
//!
//! 核心原则：
//! - 无绘制逻辑，只做编排
//! - 管理渲染会话生命周期（create / start / stop / dispose）
//! - 对外只依赖 `TextureRegistry` 这一个宿主接口
//!
//! 核心概念：
//! - `RequestRouter`: 方法名 → 会话操作
//! - `SessionTable`: 纹理句柄 → Renderer
//! - `PixelProvider`: 宿主合成线程的 pull 入口
//!
//! 数据流：
//!
//! ```text
//! Host / FFI
//!     ↓ MethodCall
//! RequestRouter
//!     ↓
//! SessionTable ──register/unregister──→ TextureRegistry
//!     ↓
//! Renderer (render thread) ──mark_frame_available──→ TextureRegistry
//! ```

pub mod ffi;
pub mod method;
pub mod registry;
pub mod router;
pub mod session_table;

pub use ffi::{ErrorCode, PixelProviderHandle, PluginConfig, TextureRegistrarCallbacks};
pub use method::{ArgValue, MethodArgs, MethodCall, MethodError, MethodResponse};
pub use registry::{PixelProvider, TextureRegistry};
pub use router::RequestRouter;
pub use session_table::SessionTable;
