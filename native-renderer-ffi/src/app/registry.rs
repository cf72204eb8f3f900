//! TextureRegistry - 宿主纹理注册表（外部协作者接口）
//!
//! 核心只调用它，不实现它：
//! - 注册 pull 模式的像素提供者，换回不透明的整数句柄
//! - 注销句柄
//! - 标记某句柄有新帧（会从渲染线程调用，实现方必须线程安全）

use crate::domain::{FrameBuffer, PixelBufferDescriptor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 宿主纹理注册表
pub trait TextureRegistry: Send + Sync {
    /// 注册像素提供者，返回纹理句柄（进程内不复用）
    fn register_texture(&self, provider: PixelProvider) -> i64;

    /// 注销纹理句柄
    fn unregister_texture(&self, texture_id: i64);

    /// 通知宿主该句柄有新帧，宿主随后会重新调用 `PixelProvider::pull`
    fn mark_frame_available(&self, texture_id: i64);
}

/// Pull 适配器：宿主合成线程按需拉取当前像素
#[derive(Clone)]
pub struct PixelProvider {
    frame: Arc<FrameBuffer>,
    first_pull: Arc<AtomicBool>,
}

impl PixelProvider {
    pub fn new(frame: Arc<FrameBuffer>) -> Self {
        Self {
            frame,
            first_pull: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 持像素锁返回描述符指针（不拷贝像素）
    ///
    /// 宿主传入的期望尺寸被忽略：帧尺寸在会话内固定
    pub fn pull(&self, _width: usize, _height: usize) -> *const PixelBufferDescriptor {
        if self.first_pull.swap(false, Ordering::Relaxed) {
            crate::rust_log_info!(
                "[PixelProvider] pixel provider first call ({}x{})",
                self.frame.width(),
                self.frame.height()
            );
        }
        self.frame.descriptor_ptr()
    }

    pub fn frame(&self) -> &Arc<FrameBuffer> {
        &self.frame
    }
}

impl std::fmt::Debug for PixelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelProvider").field("frame", &self.frame).finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_returns_live_descriptor() {
        let frame = Arc::new(FrameBuffer::new(3, 2));
        let provider = PixelProvider::new(frame.clone());

        frame.with_lock(|pixels| pixels[4] = 200);
        let descriptor = unsafe { &*provider.pull(3, 2) };
        assert_eq!((descriptor.width, descriptor.height), (3, 2));
        let bytes = unsafe { std::slice::from_raw_parts(descriptor.buffer, 3 * 2 * 4) };
        assert_eq!(bytes[4], 200);

        // 第二次拉取返回同一个描述符
        assert_eq!(provider.pull(3, 2), frame.descriptor_ptr());
    }

    #[test]
    fn test_clones_share_frame() {
        let provider = PixelProvider::new(Arc::new(FrameBuffer::new(1, 1)));
        let clone = provider.clone();
        assert!(Arc::ptr_eq(provider.frame(), clone.frame()));
    }
}
