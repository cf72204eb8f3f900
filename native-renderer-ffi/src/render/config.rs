//! 渲染配置：帧间隔、颜色和图案尺寸

use std::time::Duration;

/// BGRA 颜色（与像素内存布局一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bgra {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Bgra {
    pub const fn new(b: u8, g: u8, r: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r, a: 255 }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        [self.b, self.g, self.r, self.a]
    }
}

/// 渲染配置（不可变值对象）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// 帧间隔（尽力而为，不做漂移补偿）
    pub frame_interval: Duration,
    /// 背景色
    pub background: Bgra,
    /// 棋盘格亮格颜色
    pub checker: Bgra,
    /// 棋盘格边长（像素）
    pub tile_size: usize,
    /// 滚动条颜色
    pub bar: Bgra,
    /// 滚动条宽度（像素）
    pub bar_width: usize,
    /// 滚动条高度（像素）
    pub bar_height: usize,
    /// 滚动条每帧水平位移（像素）
    pub bar_velocity: usize,
    /// 每隔多少帧输出一次帧日志（0 = 不输出）
    pub frame_log_period: u32,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self {
            frame_interval: Duration::from_millis(crate::DEFAULT_FRAME_INTERVAL_MS),
            background: Bgra::opaque(28, 25, 20),
            checker: Bgra::opaque(46, 40, 40),
            tile_size: 32,
            bar: Bgra::opaque(240, 160, 80),
            bar_width: 200,
            bar_height: 8,
            bar_velocity: 8,
            frame_log_period: 60,
        }
    }

    /// 指定帧间隔（毫秒，0 = 默认）
    pub fn with_frame_interval_ms(mut self, millis: u64) -> Self {
        if millis > 0 {
            self.frame_interval = Duration::from_millis(millis);
        }
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}
