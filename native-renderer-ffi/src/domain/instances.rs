//! InstanceSet - 宿主上传的实例数据
//!
//! 每条实例 8 个 f32：
//! - [0..4]: 保留字段，绘制不使用（向前兼容的填充）
//! - [4..8]: 目标矩形 x, y, width, height（像素坐标）
//!
//! 每次上传整体替换，不做增量合并。

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

/// 每条实例的 f32 个数
pub const FLOATS_PER_INSTANCE: usize = 8;

/// 单条实例记录（与上传的 f32 布局一致）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// 保留字段
    pub reserved: [f32; 4],
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 裁剪后的像素矩形（半开区间 [x0, x1) × [y0, y1)）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelRect {
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }
}

impl InstanceRecord {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            reserved: [0.0; 4],
            x,
            y,
            width,
            height,
        }
    }

    /// 裁剪到帧范围内；裁剪后为空返回 None
    ///
    /// 坐标按向零截断取整（NaN 视为 0）
    pub fn clamped_rect(&self, frame_width: usize, frame_height: usize) -> Option<PixelRect> {
        let x0 = (self.x as i64).max(0);
        let y0 = (self.y as i64).max(0);
        let x1 = ((self.x + self.width) as i64).min(frame_width as i64);
        let y1 = ((self.y + self.height) as i64).min(frame_height as i64);

        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some(PixelRect {
            x0: x0 as usize,
            y0: y0 as usize,
            x1: x1 as usize,
            y1: y1 as usize,
        })
    }

    /// 按 f32 序列读出记录，不足一条的尾部忽略
    pub fn from_floats(floats: &[f32]) -> &[InstanceRecord] {
        let whole = floats.len() / FLOATS_PER_INSTANCE * FLOATS_PER_INSTANCE;
        bytemuck::cast_slice(&floats[..whole])
    }
}

/// 实例集合（独立于像素锁的实例锁）
#[derive(Debug, Default)]
pub struct InstanceSet {
    floats: Mutex<Vec<f32>>,
}

impl InstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把字节按 f32 重新解释并整体替换
    ///
    /// 长度不是 4 的倍数时丢弃尾部字节；返回新的 f32 个数
    pub fn replace_from_bytes(&self, bytes: &[u8]) -> usize {
        let floats: Vec<f32> = bytes
            .chunks_exact(std::mem::size_of::<f32>())
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        let count = floats.len();

        *self.floats.lock() = floats;
        count
    }

    /// 拷贝当前实例快照（只在拷贝期间持有实例锁）
    pub fn snapshot(&self) -> Vec<f32> {
        self.floats.lock().clone()
    }

    pub fn float_count(&self) -> usize {
        self.floats.lock().len()
    }

    /// 完整实例条数（⌊N / 8⌋）
    pub fn instance_count(&self) -> usize {
        self.float_count() / FLOATS_PER_INSTANCE
    }
}
