//! SessionTable - 渲染会话管理
//!
//! 职责：
//! - 纹理句柄 → 会话（Renderer + 注册记录）的映射
//! - 会话生命周期：create / dispose / 整表 teardown
//!
//! 句柄由外部注册表分配，进程内不复用。
//! 销毁任何会话前一定先 join 它的渲染线程，再注销句柄。

use super::method::MethodError;
use super::registry::{PixelProvider, TextureRegistry};
use crate::render::{RenderConfig, Renderer};
use std::collections::HashMap;
use std::sync::Arc;

/// 单个会话条目
struct SessionEntry {
    /// 渲染器（独占像素帧和实例数据）
    renderer: Renderer,
}

/// 会话表
pub struct SessionTable {
    /// 句柄 → 会话
    sessions: HashMap<i64, SessionEntry>,

    /// 宿主纹理注册表
    registry: Arc<dyn TextureRegistry>,

    /// 新会话使用的渲染配置
    config: RenderConfig,
}

impl SessionTable {
    pub fn new(registry: Arc<dyn TextureRegistry>, config: RenderConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            registry,
            config,
        }
    }

    /// 创建会话并注册纹理，返回句柄
    pub fn create(&mut self, width: usize, height: usize) -> i64 {
        let renderer = Renderer::new(width, height, self.config);
        let provider = PixelProvider::new(renderer.frame().clone());
        let texture_id = self.registry.register_texture(provider);

        if let Some(stale) = self.sessions.insert(texture_id, SessionEntry { renderer }) {
            // 注册表违反了句柄不复用的约定；旧会话在这里停止
            crate::rust_log_warn!(
                "[SessionTable] ⚠️ registry reused handle {}, replacing session",
                texture_id
            );
            stale.renderer.stop();
        }

        texture_id
    }

    /// 启动会话的渲染线程，新帧通知同一句柄
    pub fn start(&self, texture_id: i64) -> Result<(), MethodError> {
        let entry = self
            .sessions
            .get(&texture_id)
            .ok_or(MethodError::NotFound(texture_id))?;

        let registry = self.registry.clone();
        entry
            .renderer
            .start(Box::new(move || registry.mark_frame_available(texture_id)));
        Ok(())
    }

    /// 停止会话的渲染线程；句柄不存在返回 false
    pub fn stop(&self, texture_id: i64) -> bool {
        match self.sessions.get(&texture_id) {
            Some(entry) => {
                entry.renderer.stop();
                true
            }
            None => false,
        }
    }

    /// 停止渲染、注销句柄、移除条目；句柄不存在返回 false
    pub fn dispose(&mut self, texture_id: i64) -> bool {
        match self.sessions.remove(&texture_id) {
            Some(entry) => {
                entry.renderer.stop();
                self.registry.unregister_texture(texture_id);
                true
            }
            None => false,
        }
    }

    /// 替换会话的实例数据，返回 f32 个数
    pub fn upload_instances(&self, texture_id: i64, bytes: &[u8]) -> Result<usize, MethodError> {
        let entry = self
            .sessions
            .get(&texture_id)
            .ok_or(MethodError::NotFound(texture_id))?;
        Ok(entry.renderer.set_instances(bytes))
    }

    pub fn contains(&self, texture_id: i64) -> bool {
        self.sessions.contains_key(&texture_id)
    }

    pub fn renderer(&self, texture_id: i64) -> Option<&Renderer> {
        self.sessions.get(&texture_id).map(|entry| &entry.renderer)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 停止并注销全部会话
    pub fn teardown(&mut self) {
        if self.sessions.is_empty() {
            return;
        }

        crate::rust_log_info!("[SessionTable] teardown {} session(s)", self.sessions.len());
        for (texture_id, entry) in self.sessions.drain() {
            entry.renderer.stop();
            self.registry.unregister_texture(texture_id);
        }
    }
}

impl Drop for SessionTable {
    fn drop(&mut self) {
        self.teardown();
    }
}
