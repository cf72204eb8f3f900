//! Render Domain - 渲染领域
//!
//! 职责：在后台线程持续生成像素帧
//!
//! 架构：
//! - **config** - 渲染配置（帧间隔、颜色、图案尺寸）
//! - **painter** - 单帧绘制（纯函数，不持锁）
//! - **renderer** - 渲染线程生命周期（start / stop / set_instances）

pub mod config;
pub mod painter;
pub mod renderer;

pub use config::{Bgra, RenderConfig};
pub use painter::Painter;
pub use renderer::{DirtyCallback, Renderer};
