//! Renderer - 渲染线程生命周期
//!
//! 每个会话一个专用渲染线程：
//! - `start`: 幂等，已在运行时只记日志
//! - `stop`: 幂等，清除运行标记并 join 渲染线程后才返回
//! - `set_instances`: 整体替换实例数据
//!
//! 渲染循环（约 16ms 一帧，尽力而为）：
//! 拷贝实例快照 → 持像素锁绘制 → 释放锁 → 通知 dirty → 睡到本帧结束
//!
//! 渲染线程内的 panic 被捕获并记录，只结束本会话的循环。

use super::config::RenderConfig;
use super::painter::Painter;
use crate::domain::{FrameBuffer, InstanceSet};
use crate::infra::{AtomicRunFlag, FrameStats};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, Builder, JoinHandle};
use std::time::{Duration, Instant};

/// 新帧通知回调（在渲染线程上调用）
pub type DirtyCallback = Box<dyn Fn() + Send + 'static>;

/// 渲染器
pub struct Renderer {
    /// 像素帧（与宿主 PixelProvider 共享）
    frame: Arc<FrameBuffer>,

    /// 实例数据
    instances: Arc<InstanceSet>,

    /// 运行标记（渲染线程每帧轮询）
    running: Arc<AtomicRunFlag>,

    /// 帧统计
    stats: Arc<FrameStats>,

    /// 渲染线程句柄
    worker: Mutex<Option<JoinHandle<()>>>,

    config: RenderConfig,
}

impl Renderer {
    pub fn new(width: usize, height: usize, config: RenderConfig) -> Self {
        crate::rust_log_info!("[Renderer] created {}x{}", width, height);

        Self {
            frame: Arc::new(FrameBuffer::new(width, height)),
            instances: Arc::new(InstanceSet::new()),
            running: Arc::new(AtomicRunFlag::new()),
            stats: Arc::new(FrameStats::new()),
            worker: Mutex::new(None),
            config,
        }
    }

    /// 启动渲染线程
    ///
    /// 已在运行时为空操作；`notify` 每产出一帧调用一次
    pub fn start(&self, notify: DirtyCallback) {
        let mut worker = self.worker.lock();

        if self.running.start() {
            crate::rust_log_info!("[Renderer] already running");
            return;
        }

        // 上一个循环异常退出时线程句柄还在，先回收
        if let Some(stale) = worker.take() {
            let _ = stale.join();
        }

        let render_loop = RenderLoop {
            frame: self.frame.clone(),
            instances: self.instances.clone(),
            running: self.running.clone(),
            stats: self.stats.clone(),
            painter: Painter::new(self.config, self.frame.width(), self.frame.height()),
            interval: self.config.frame_interval,
            log_period: self.config.frame_log_period,
        };

        let spawned = Builder::new()
            .name(format!("NativeRenderer-{}x{}", self.frame.width(), self.frame.height()))
            .spawn(move || render_loop.run(notify));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                crate::rust_log_info!("[Renderer] start()");
            }
            Err(e) => {
                self.running.stop();
                crate::rust_log_error!("[Renderer] ❌ Failed to spawn render thread: {}", e);
            }
        }
    }

    /// 停止渲染线程并等待其退出
    ///
    /// 未运行时为空操作
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        let was_running = self.running.stop();

        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                crate::rust_log_error!("[Renderer] render thread terminated abnormally");
            }
        }

        if was_running {
            crate::rust_log_info!("[Renderer] stop()");
        }
    }

    /// 整体替换实例数据，返回 f32 个数
    pub fn set_instances(&self, bytes: &[u8]) -> usize {
        let floats = self.instances.replace_from_bytes(bytes);
        crate::rust_log_debug!(
            "[Renderer] setInstances bytes={} floats={}",
            bytes.len(),
            floats
        );
        floats
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.is_running()
    }

    pub fn frame(&self) -> &Arc<FrameBuffer> {
        &self.frame
    }

    pub fn instances(&self) -> &InstanceSet {
        &self.instances
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn size(&self) -> (usize, usize) {
        (self.frame.width(), self.frame.height())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 渲染线程持有的状态
struct RenderLoop {
    frame: Arc<FrameBuffer>,
    instances: Arc<InstanceSet>,
    running: Arc<AtomicRunFlag>,
    stats: Arc<FrameStats>,
    painter: Painter,
    interval: Duration,
    log_period: u32,
}

impl RenderLoop {
    fn run(self, notify: DirtyCallback) {
        crate::rust_log_info!("[RenderLoop] render thread ENTER");
        self.stats.loop_entered();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.render_frames(&notify)));
        if let Err(payload) = result {
            self.stats.record_fault();
            self.running.stop();
            crate::rust_log_error!(
                "[RenderLoop] ❌ render thread EXCEPTION: {}",
                crate::panic_message(&*payload)
            );
        }

        self.stats.loop_exited();
        crate::rust_log_info!("[RenderLoop] render thread EXIT");
    }

    fn render_frames(&self, notify: &DirtyCallback) {
        let mut frame_index: u32 = 0;

        while self.running.is_running() {
            let started = Instant::now();

            let instances = self.instances.snapshot();
            self.frame
                .with_lock(|pixels| self.painter.paint(pixels, frame_index, &instances));
            self.stats.record_frame(frame_index);

            if self.log_period > 0 && frame_index % self.log_period == 0 {
                crate::rust_log_debug!("[RenderLoop] render frame t={}", frame_index);
            }

            notify();
            frame_index = frame_index.wrapping_add(1);

            if let Some(rest) = self.interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceRecord, BYTES_PER_PIXEL};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config() -> RenderConfig {
        RenderConfig::new().with_frame_interval_ms(1)
    }

    fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn counting_callback() -> (Arc<AtomicUsize>, DirtyCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback: DirtyCallback = Box::new(move || {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });
        (count, callback)
    }

    fn pixel_at(pixels: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * width + x) * BYTES_PER_PIXEL;
        [pixels[idx], pixels[idx + 1], pixels[idx + 2], pixels[idx + 3]]
    }

    #[test]
    fn test_start_renders_and_notifies() {
        let renderer = Renderer::new(64, 64, fast_config());
        let (count, callback) = counting_callback();

        renderer.start(callback);
        assert!(renderer.is_running());
        assert!(wait_until(Duration::from_secs(2), || count.load(Ordering::Relaxed) >= 3));

        let pixels = renderer.frame().snapshot();
        let background = fast_config().background.to_bytes();
        assert!(pixels.chunks_exact(4).any(|px| px != background));

        renderer.stop();
        assert!(!renderer.is_running());
        assert_eq!(renderer.stats().active_loops(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let renderer = Renderer::new(32, 32, fast_config());
        let (first, callback) = counting_callback();
        let (second, callback2) = counting_callback();

        renderer.start(callback);
        renderer.start(callback2);
        assert!(wait_until(Duration::from_secs(2), || renderer.stats().frames() >= 2));

        assert_eq!(renderer.stats().active_loops(), 1);
        assert!(first.load(Ordering::Relaxed) >= 1);
        // 第二次 start 的回调不会被使用
        assert_eq!(second.load(Ordering::Relaxed), 0);

        renderer.stop();
    }

    #[test]
    fn test_stop_twice_and_without_start() {
        let renderer = Renderer::new(8, 8, fast_config());
        renderer.stop();

        let (_count, callback) = counting_callback();
        renderer.start(callback);
        renderer.stop();
        renderer.stop();
        assert!(!renderer.is_running());
        assert_eq!(renderer.stats().active_loops(), 0);
    }

    #[test]
    fn test_no_frames_after_stop() {
        let renderer = Renderer::new(16, 16, fast_config());
        let (count, callback) = counting_callback();
        renderer.start(callback);
        assert!(wait_until(Duration::from_secs(2), || count.load(Ordering::Relaxed) >= 1));
        renderer.stop();

        let after_stop = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
    }

    #[test]
    fn test_restart_after_stop() {
        let renderer = Renderer::new(16, 16, fast_config());
        let (_first, callback) = counting_callback();
        renderer.start(callback);
        renderer.stop();

        let (second, callback2) = counting_callback();
        renderer.start(callback2);
        assert!(wait_until(Duration::from_secs(2), || second.load(Ordering::Relaxed) >= 1));
        assert_eq!(renderer.stats().active_loops(), 1);
        renderer.stop();
    }

    #[test]
    fn test_fault_is_contained() {
        let renderer = Renderer::new(16, 16, fast_config());
        renderer.start(Box::new(|| panic!("notify exploded")));

        assert!(wait_until(Duration::from_secs(2), || renderer.stats().faults() == 1));
        assert!(wait_until(Duration::from_secs(2), || !renderer.is_running()));
        assert!(wait_until(Duration::from_secs(2), || renderer.stats().active_loops() == 0));

        // 出错后可以重新启动
        let (count, callback) = counting_callback();
        renderer.start(callback);
        assert!(wait_until(Duration::from_secs(2), || count.load(Ordering::Relaxed) >= 1));
        renderer.stop();
        assert_eq!(renderer.stats().faults(), 1);
    }

    #[test]
    fn test_instances_show_up_in_next_frames() {
        let renderer = Renderer::new(64, 64, fast_config());
        let (_count, callback) = counting_callback();
        renderer.start(callback);

        let bytes: Vec<u8> = bytemuck::cast_slice::<InstanceRecord, u8>(&[InstanceRecord::new(
            0.0, 0.0, 10.0, 10.0,
        )])
        .to_vec();
        assert_eq!(renderer.set_instances(&bytes), 8);

        let uploaded_at = renderer.stats().frames();
        assert!(wait_until(Duration::from_secs(2), || {
            renderer.stats().frames() >= uploaded_at + 2
        }));
        renderer.stop();

        let pixels = renderer.frame().snapshot();
        let background = fast_config().background.to_bytes();
        let corner = pixel_at(&pixels, 64, 0, 0);
        assert_ne!(corner, background);
        assert_eq!(corner, pixel_at(&pixels, 64, 9, 9));
        assert_eq!(corner[3], 255);
        assert_eq!(pixel_at(&pixels, 64, 10, 0), background);
        assert_eq!(pixel_at(&pixels, 64, 0, 10), background);
    }

    #[test]
    fn test_drop_stops_render_thread() {
        let stats;
        {
            let renderer = Renderer::new(8, 8, fast_config());
            let (_count, callback) = counting_callback();
            renderer.start(callback);
            assert!(wait_until(Duration::from_secs(2), || renderer.stats().frames() >= 1));
            stats = renderer.stats.clone();
        }
        assert_eq!(stats.active_loops(), 0);
    }
}
