//! Atomic Cache - 原子状态
//!
//! 职责：渲染线程与请求线程之间的无锁共享状态
//!
//! 用途：
//! - 运行标记（请求线程写，渲染线程每帧轮询）
//! - 帧统计（渲染线程写，请求线程 / 测试读取）

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// 渲染循环运行标记
///
/// 协作式取消：渲染线程每帧检查一次
#[derive(Debug, Default)]
pub struct AtomicRunFlag {
    running: AtomicBool,
}

impl AtomicRunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置为运行，返回之前的状态
    #[inline]
    pub fn start(&self) -> bool {
        self.running.swap(true, Ordering::AcqRel)
    }

    /// 置为停止，返回之前的状态
    #[inline]
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// 帧统计
#[derive(Debug, Default)]
pub struct FrameStats {
    /// 已产出的帧数
    frames: AtomicU64,
    /// 最近一帧的帧号
    last_frame: AtomicU32,
    /// 当前活跃的渲染循环数（正常只会是 0 或 1）
    active_loops: AtomicUsize,
    /// 渲染循环异常退出次数
    faults: AtomicU64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_frame(&self, frame_index: u32) {
        self.last_frame.store(frame_index, Ordering::Release);
        self.frames.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    #[inline]
    pub fn last_frame(&self) -> u32 {
        self.last_frame.load(Ordering::Acquire)
    }

    pub fn loop_entered(&self) {
        self.active_loops.fetch_add(1, Ordering::AcqRel);
    }

    pub fn loop_exited(&self) {
        self.active_loops.fetch_sub(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn active_loops(&self) -> usize {
        self.active_loops.load(Ordering::Acquire)
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Acquire)
    }
}
