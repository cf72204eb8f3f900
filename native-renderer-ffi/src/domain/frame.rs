//! FrameBuffer - 固定尺寸的 BGRA 像素帧
//!
//! 渲染线程（写）和宿主合成线程（读）共用同一把像素锁：
//! - 写：`with_lock` 内整帧重绘
//! - 读：`descriptor_ptr` 在锁内刷新描述符并返回其指针，不拷贝像素
//!
//! 尺寸在创建后不可变，像素 Vec 从不重新分配，
//! 因此描述符里的 buffer 指针在会话生命周期内稳定。

use parking_lot::Mutex;
use std::ffi::c_void;

/// 每像素字节数（B, G, R, A）
pub const BYTES_PER_PIXEL: usize = 4;

/// 宿主拉取的像素描述符（C 布局）
///
/// - buffer: 指向 width × height × 4 字节的 BGRA 数据
/// - release_callback: 宿主用完本帧后回调；存储归会话所有，这里是空操作
#[repr(C)]
#[derive(Debug)]
pub struct PixelBufferDescriptor {
    pub buffer: *const u8,
    pub width: usize,
    pub height: usize,
    pub release_callback: Option<extern "C" fn(release_context: *mut c_void)>,
    pub release_context: *mut c_void,
}

extern "C" fn release_noop(_release_context: *mut c_void) {}

/// 锁内数据：像素 + 描述符
struct FrameStorage {
    pixels: Vec<u8>,
    descriptor: PixelBufferDescriptor,
}

/// 像素帧
pub struct FrameBuffer {
    width: usize,
    height: usize,
    storage: Mutex<FrameStorage>,
}

// descriptor 中的裸指针只指向 storage.pixels 自己的堆内存，
// 所有访问都经过 storage 的互斥锁
unsafe impl Send for FrameBuffer {}
unsafe impl Sync for FrameBuffer {}

impl FrameBuffer {
    /// 分配全零的 BGRA 像素帧，并绑定描述符
    pub fn new(width: usize, height: usize) -> Self {
        let pixels = vec![0u8; width * height * BYTES_PER_PIXEL];
        let descriptor = PixelBufferDescriptor {
            buffer: pixels.as_ptr(),
            width,
            height,
            release_callback: Some(release_noop),
            release_context: std::ptr::null_mut(),
        };

        crate::rust_log_debug!("[FrameBuffer] created w={} h={}", width, height);

        Self {
            width,
            height,
            storage: Mutex::new(FrameStorage { pixels, descriptor }),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// 像素字节数（恒为 width × height × 4）
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.width * self.height * BYTES_PER_PIXEL
    }

    /// 持有像素锁执行 `f`
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut storage = self.storage.lock();
        f(storage.pixels.as_mut_slice())
    }

    /// 拉取描述符指针（宿主合成线程调用）
    ///
    /// 返回的指针在下一次加锁写入前有效
    pub fn descriptor_ptr(&self) -> *const PixelBufferDescriptor {
        let mut guard = self.storage.lock();
        let storage = &mut *guard;
        storage.descriptor.buffer = storage.pixels.as_ptr();
        &storage.descriptor as *const PixelBufferDescriptor
    }

    /// 拷贝当前像素（测试 / 调试用）
    pub fn snapshot(&self) -> Vec<u8> {
        self.with_lock(|pixels| pixels.to_vec())
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
