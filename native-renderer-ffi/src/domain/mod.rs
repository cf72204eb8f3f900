//! Domain - 像素帧与实例数据
//!
//! 职责：持有渲染会话的两块共享状态
//!
//! 核心概念：
//! - `FrameBuffer`: 固定尺寸的 BGRA 像素帧 + 宿主拉取用的描述符，整体由像素锁保护
//! - `InstanceSet`: 宿主上传的实例数据（每 8 个 f32 一条记录），由独立的实例锁保护
//!
//! 两把锁互不嵌套：渲染线程先拷贝实例快照，再拿像素锁绘制。

pub mod frame;
pub mod instances;

pub use frame::{FrameBuffer, PixelBufferDescriptor, BYTES_PER_PIXEL};
pub use instances::{InstanceRecord, InstanceSet, PixelRect, FLOATS_PER_INSTANCE};
