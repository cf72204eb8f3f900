//! Painter - 单帧绘制
//!
//! 绘制顺序：
//! 1. 背景色清屏
//! 2. 棋盘格（按 tile 坐标奇偶）
//! 3. 水平滚动条（匀速前进，按 width + bar_width 取模循环）
//! 4. 实例矩形（裁剪到帧范围，颜色由实例序号和帧号决定）
//!
//! 只操作传入的像素切片，加锁由调用方负责。

use super::config::{Bgra, RenderConfig};
use crate::domain::{InstanceRecord, PixelRect, BYTES_PER_PIXEL};

/// 单帧绘制器
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    config: RenderConfig,
    width: usize,
    height: usize,
}

impl Painter {
    pub fn new(config: RenderConfig, width: usize, height: usize) -> Self {
        Self {
            config,
            width,
            height,
        }
    }

    /// 绘制完整一帧
    pub fn paint(&self, pixels: &mut [u8], frame_index: u32, instances: &[f32]) {
        debug_assert_eq!(pixels.len(), self.width * self.height * BYTES_PER_PIXEL);

        self.clear(pixels);
        self.draw_checkerboard(pixels);
        self.draw_scroll_bar(pixels, frame_index);
        self.draw_instances(pixels, frame_index, instances);
    }

    pub fn clear(&self, pixels: &mut [u8]) {
        let color = self.config.background.to_bytes();
        for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&color);
        }
    }

    pub fn draw_checkerboard(&self, pixels: &mut [u8]) {
        let tile = self.config.tile_size;
        if tile == 0 {
            return;
        }

        let tiles_x = self.width.div_ceil(tile);
        let tiles_y = self.height.div_ceil(tile);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                if (tx ^ ty) & 1 == 0 {
                    continue;
                }
                let rect = PixelRect {
                    x0: tx * tile,
                    y0: ty * tile,
                    x1: ((tx + 1) * tile).min(self.width),
                    y1: ((ty + 1) * tile).min(self.height),
                };
                self.fill_rect(pixels, rect, self.config.checker);
            }
        }
    }

    /// 滚动条左边缘的 x 坐标
    pub fn bar_offset(&self, frame_index: u32) -> usize {
        let period = (self.width + self.config.bar_width) as u64;
        if period == 0 {
            return 0;
        }
        ((frame_index as u64 * self.config.bar_velocity as u64) % period) as usize
    }

    pub fn draw_scroll_bar(&self, pixels: &mut [u8], frame_index: u32) {
        let x0 = self.bar_offset(frame_index);
        let x1 = (x0 + self.config.bar_width).min(self.width);
        let y0 = self.height / 3;
        let y1 = (y0 + self.config.bar_height).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        self.fill_rect(pixels, PixelRect { x0, y0, x1, y1 }, self.config.bar);
    }

    pub fn draw_instances(&self, pixels: &mut [u8], frame_index: u32, instances: &[f32]) {
        for (index, record) in InstanceRecord::from_floats(instances).iter().enumerate() {
            if let Some(rect) = record.clamped_rect(self.width, self.height) {
                self.fill_rect(pixels, rect, Self::instance_color(index, frame_index));
            }
        }
    }

    /// 实例颜色：每个通道在 [80, 250) 内随序号和帧号变化
    pub fn instance_color(index: usize, frame_index: u32) -> Bgra {
        let i = index as u64;
        let t = frame_index as u64;
        let channel = |a: u64, b: u64| (80 + (i * a + t * b) % 170) as u8;
        Bgra::opaque(channel(17, 3), channel(31, 5), channel(47, 7))
    }

    fn fill_rect(&self, pixels: &mut [u8], rect: PixelRect, color: Bgra) {
        let color = color.to_bytes();
        for y in rect.y0..rect.y1 {
            let start = (y * self.width + rect.x0) * BYTES_PER_PIXEL;
            let end = (y * self.width + rect.x1) * BYTES_PER_PIXEL;
            for px in pixels[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&color);
            }
        }
    }
}
