//! Plugin FFI - 插件句柄 + 方法调用 + 像素拉取
//!
//! 宿主通过 `TextureRegistrarCallbacks` 提供纹理注册表，
//! 插件把每个会话的 `PixelProvider` 以不透明指针交给宿主，
//! 宿主合成线程再用 `native_renderer_pull_pixels` 拉取像素。

use crate::app::ffi::{
    ErrorCode, PixelProviderHandle, PluginConfig, RegisterTextureCallback, TextureIdCallback,
    TextureRegistrarCallbacks,
};
use crate::app::{
    ArgValue, MethodArgs, MethodCall, MethodResponse, PixelProvider, RequestRouter,
    TextureRegistry,
};
use crate::domain::PixelBufferDescriptor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use std::sync::Arc;

// ============================================================================
// 宿主注册表适配
// ============================================================================

/// 通过 C 回调实现的纹理注册表
///
/// 注册给宿主的 provider 由这里持有，直到对应句柄注销
pub struct FfiTextureRegistry {
    context: *mut c_void,
    register: RegisterTextureCallback,
    unregister: TextureIdCallback,
    mark_frame_available: TextureIdCallback,
    providers: Mutex<HashMap<i64, Box<PixelProvider>>>,
}

// 宿主保证 context 和回调可以跨线程使用
unsafe impl Send for FfiTextureRegistry {}
unsafe impl Sync for FfiTextureRegistry {}

impl FfiTextureRegistry {
    /// 任一回调缺失返回 None
    pub fn new(callbacks: TextureRegistrarCallbacks) -> Option<Self> {
        Some(Self {
            context: callbacks.context,
            register: callbacks.register_texture?,
            unregister: callbacks.unregister_texture?,
            mark_frame_available: callbacks.mark_frame_available?,
            providers: Mutex::new(HashMap::new()),
        })
    }

    /// 当前由宿主持有的 provider 数
    pub fn provider_count(&self) -> usize {
        self.providers.lock().len()
    }
}

impl TextureRegistry for FfiTextureRegistry {
    fn register_texture(&self, provider: PixelProvider) -> i64 {
        let boxed = Box::new(provider);
        let handle = &*boxed as *const PixelProvider as *const PixelProviderHandle;
        let texture_id = (self.register)(self.context, handle);

        if self.providers.lock().insert(texture_id, boxed).is_some() {
            crate::rust_log_warn!("[Plugin] ⚠️ host reused texture id {}", texture_id);
        }
        texture_id
    }

    fn unregister_texture(&self, texture_id: i64) {
        // 宿主注销完成后才释放 provider
        (self.unregister)(self.context, texture_id);
        self.providers.lock().remove(&texture_id);
    }

    fn mark_frame_available(&self, texture_id: i64) {
        (self.mark_frame_available)(self.context, texture_id);
    }
}

// ============================================================================
// 插件句柄
// ============================================================================

/// 插件句柄（不透明指针）
#[repr(C)]
pub struct NativeRendererPluginHandle {
    _private: [u8; 0],
}

struct NativeRendererPlugin {
    router: Mutex<RequestRouter>,
}

impl NativeRendererPlugin {
    fn handle(&self, call: &MethodCall) -> MethodResponse {
        self.router.lock().handle(call)
    }
}

unsafe fn plugin_ref<'a>(
    handle: *mut NativeRendererPluginHandle,
) -> Option<&'a NativeRendererPlugin> {
    (handle as *const NativeRendererPlugin).as_ref()
}

/// 创建插件
///
/// 任一回调缺失返回 NULL
#[no_mangle]
pub extern "C" fn native_renderer_plugin_create(
    callbacks: TextureRegistrarCallbacks,
    config: PluginConfig,
) -> *mut NativeRendererPluginHandle {
    catch_panic!(ptr::null_mut(), {
        if config.file_log {
            super::logging::install_default_file_sink();
        }

        let registry = match FfiTextureRegistry::new(callbacks) {
            Some(registry) => registry,
            None => {
                crate::rust_log_error!("[Plugin] create failed: registrar callback missing");
                return ptr::null_mut();
            }
        };

        let render_config = config.render_config();
        let plugin = NativeRendererPlugin {
            router: Mutex::new(RequestRouter::new(Arc::new(registry), render_config)),
        };
        crate::rust_log_info!(
            "[Plugin] created (frame interval {:?})",
            render_config.frame_interval
        );
        Box::into_raw(Box::new(plugin)) as *mut NativeRendererPluginHandle
    })
}

/// 销毁插件：停止并注销全部会话
#[no_mangle]
pub extern "C" fn native_renderer_plugin_destroy(handle: *mut NativeRendererPluginHandle) {
    if handle.is_null() {
        return;
    }

    catch_panic!((), {
        let plugin = unsafe { Box::from_raw(handle as *mut NativeRendererPlugin) };
        plugin.router.lock().teardown();
        drop(plugin);
        crate::rust_log_info!("[Plugin] destroyed");
    })
}

// ============================================================================
// 方法调用
// ============================================================================

fn error_response(code: ErrorCode, message: impl Into<String>) -> MethodResponse {
    MethodResponse::Error {
        code: code.as_str().to_string(),
        message: message.into(),
    }
}

unsafe fn decode_call(
    method: *const c_char,
    args_json: *const c_char,
) -> Result<MethodCall, MethodResponse> {
    if method.is_null() {
        return Err(error_response(ErrorCode::NullPointer, "method is null"));
    }
    let method = CStr::from_ptr(method)
        .to_str()
        .map_err(|_| error_response(ErrorCode::InvalidUtf8, "method is not UTF-8"))?;

    let args = if args_json.is_null() {
        MethodArgs::new()
    } else {
        let json = CStr::from_ptr(args_json)
            .to_str()
            .map_err(|_| error_response(ErrorCode::InvalidUtf8, "args are not UTF-8"))?;
        if json.trim().is_empty() {
            MethodArgs::new()
        } else {
            serde_json::from_str(json)
                .map_err(|e| error_response(ErrorCode::InvalidJson, e.to_string()))?
        }
    };

    Ok(MethodCall {
        method: method.to_string(),
        args,
    })
}

fn into_c_string(response: &MethodResponse) -> *mut c_char {
    match CString::new(response.to_json()) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// 通用方法调用
///
/// - method: 方法名（UTF-8）
/// - args_json: JSON 对象形式的参数表（可为 NULL）
///
/// 返回 JSON 编码的 `MethodResponse`，需用 `native_renderer_free_string` 释放；
/// handle 为 NULL 时返回 NULL
#[no_mangle]
pub extern "C" fn native_renderer_method_call(
    handle: *mut NativeRendererPluginHandle,
    method: *const c_char,
    args_json: *const c_char,
) -> *mut c_char {
    catch_panic!(ptr::null_mut(), {
        let plugin = match unsafe { plugin_ref(handle) } {
            Some(plugin) => plugin,
            None => return ptr::null_mut(),
        };

        let response = match unsafe { decode_call(method, args_json) } {
            Ok(call) => plugin.handle(&call),
            Err(response) => {
                crate::rust_log_warn!("[Plugin] undecodable method call: {:?}", response);
                response
            }
        };
        into_c_string(&response)
    })
}

/// 释放 `native_renderer_method_call` 返回的字符串
#[no_mangle]
pub extern "C" fn native_renderer_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(s);
    }
}

// ============================================================================
// 类型化调用
// ============================================================================

fn call_with_id(
    handle: *mut NativeRendererPluginHandle,
    method: &str,
    texture_id: i64,
) -> ErrorCode {
    let plugin = match unsafe { plugin_ref(handle) } {
        Some(plugin) => plugin,
        None => return ErrorCode::NullPointer,
    };
    let response = plugin.handle(&MethodCall::new(method).arg("id", texture_id));
    ErrorCode::from(&response)
}

/// 创建渲染会话
///
/// 返回纹理句柄，失败返回 -1
#[no_mangle]
pub extern "C" fn native_renderer_create(
    handle: *mut NativeRendererPluginHandle,
    width: i64,
    height: i64,
) -> i64 {
    catch_panic!(-1, {
        let plugin = match unsafe { plugin_ref(handle) } {
            Some(plugin) => plugin,
            None => return -1,
        };

        let call = MethodCall::new("create").arg("w", width).arg("h", height);
        match plugin.handle(&call) {
            MethodResponse::Success {
                value: ArgValue::Int(texture_id),
            } => texture_id,
            _ => -1,
        }
    })
}

/// 启动渲染线程（已在运行时为空操作）
#[no_mangle]
pub extern "C" fn native_renderer_start(
    handle: *mut NativeRendererPluginHandle,
    texture_id: i64,
) -> ErrorCode {
    catch_panic!(ErrorCode::BadArgs, call_with_id(handle, "start", texture_id))
}

/// 停止渲染线程（未知句柄也返回 Success）
#[no_mangle]
pub extern "C" fn native_renderer_stop(
    handle: *mut NativeRendererPluginHandle,
    texture_id: i64,
) -> ErrorCode {
    catch_panic!(ErrorCode::BadArgs, call_with_id(handle, "stop", texture_id))
}

/// 销毁渲染会话（未知句柄也返回 Success）
#[no_mangle]
pub extern "C" fn native_renderer_dispose(
    handle: *mut NativeRendererPluginHandle,
    texture_id: i64,
) -> ErrorCode {
    catch_panic!(ErrorCode::BadArgs, call_with_id(handle, "dispose", texture_id))
}

/// 上传实例数据（小端 f32 序列，每 8 个一条实例）
///
/// data 为 NULL 且 len > 0 返回 NullPointer
#[no_mangle]
pub extern "C" fn native_renderer_upload_instances(
    handle: *mut NativeRendererPluginHandle,
    texture_id: i64,
    data: *const u8,
    len: usize,
) -> ErrorCode {
    catch_panic!(ErrorCode::BadArgs, {
        let plugin = match unsafe { plugin_ref(handle) } {
            Some(plugin) => plugin,
            None => return ErrorCode::NullPointer,
        };

        let bytes: &[u8] = if len == 0 {
            &[]
        } else if data.is_null() {
            return ErrorCode::NullPointer;
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }
        };

        let call = MethodCall::new("uploadInstances")
            .arg("id", texture_id)
            .arg("buf", bytes);
        ErrorCode::from(&plugin.handle(&call))
    })
}

// ============================================================================
// 像素拉取
// ============================================================================

/// 宿主合成线程拉取像素
///
/// 返回的描述符在下一次拉取或纹理注销前有效；provider 为 NULL 返回 NULL
#[no_mangle]
pub extern "C" fn native_renderer_pull_pixels(
    provider: *const PixelProviderHandle,
    width: usize,
    height: usize,
) -> *const PixelBufferDescriptor {
    catch_panic!(ptr::null(), {
        let provider = match unsafe { (provider as *const PixelProvider).as_ref() } {
            Some(provider) => provider,
            None => return ptr::null(),
        };
        provider.pull(width, height)
    })
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FrameBuffer, BYTES_PER_PIXEL};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    /// 模拟宿主注册表（通过 context 指针传入）
    #[derive(Default)]
    struct HostRegistrar {
        next_id: Mutex<i64>,
        providers: Mutex<HashMap<i64, usize>>,
        unregistered: Mutex<Vec<i64>>,
        dirty: AtomicU64,
    }

    impl HostRegistrar {
        fn provider(&self, texture_id: i64) -> *const PixelProviderHandle {
            self.providers
                .lock()
                .get(&texture_id)
                .map_or(ptr::null(), |p| *p as *const PixelProviderHandle)
        }
    }

    extern "C" fn host_register(context: *mut c_void, provider: *const PixelProviderHandle) -> i64 {
        let host = unsafe { &*(context as *const HostRegistrar) };
        let mut next_id = host.next_id.lock();
        *next_id += 1;
        host.providers.lock().insert(*next_id, provider as usize);
        *next_id
    }

    extern "C" fn host_unregister(context: *mut c_void, texture_id: i64) {
        let host = unsafe { &*(context as *const HostRegistrar) };
        host.providers.lock().remove(&texture_id);
        host.unregistered.lock().push(texture_id);
    }

    extern "C" fn host_mark_frame_available(context: *mut c_void, _texture_id: i64) {
        let host = unsafe { &*(context as *const HostRegistrar) };
        host.dirty.fetch_add(1, Ordering::SeqCst);
    }

    fn callbacks(host: &HostRegistrar) -> TextureRegistrarCallbacks {
        TextureRegistrarCallbacks {
            context: host as *const HostRegistrar as *mut c_void,
            register_texture: Some(host_register),
            unregister_texture: Some(host_unregister),
            mark_frame_available: Some(host_mark_frame_available),
        }
    }

    fn fast_config() -> PluginConfig {
        PluginConfig {
            frame_interval_ms: 1,
            file_log: false,
        }
    }

    fn call_json(
        handle: *mut NativeRendererPluginHandle,
        method: &str,
        args: &str,
    ) -> serde_json::Value {
        let method = CString::new(method).unwrap();
        let args = CString::new(args).unwrap();
        let raw = native_renderer_method_call(handle, method.as_ptr(), args.as_ptr());
        assert!(!raw.is_null());
        let json = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_string();
        native_renderer_free_string(raw);
        serde_json::from_str(&json).unwrap()
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

    #[test]
    fn test_create_requires_all_callbacks() {
        let host = HostRegistrar::default();
        let mut cbs = callbacks(&host);
        cbs.mark_frame_available = None;
        assert!(native_renderer_plugin_create(cbs, fast_config()).is_null());
    }

    #[test]
    fn test_method_call_lifecycle() {
        let host = HostRegistrar::default();
        let handle = native_renderer_plugin_create(callbacks(&host), fast_config());
        assert!(!handle.is_null());

        let created = call_json(handle, "create", r#"{"w":32,"h":16}"#);
        assert_eq!(created["status"], "success");
        let id = created["value"].as_i64().unwrap();
        assert_eq!(id, 1);

        // 宿主持有的 provider 指针可以直接拉取
        let provider = host.provider(id);
        let descriptor = unsafe { &*native_renderer_pull_pixels(provider, 32, 16) };
        assert_eq!((descriptor.width, descriptor.height), (32, 16));
        assert!(descriptor.release_callback.is_some());

        let started = call_json(handle, "start", &format!(r#"{{"id":{}}}"#, id));
        assert_eq!(started["status"], "success");
        assert!(wait_until(Duration::from_secs(2), || host.dirty.load(Ordering::SeqCst) >= 2));

        // JSON 数组形式的字节参数
        let uploaded = call_json(
            handle,
            "uploadInstances",
            &format!(r#"{{"id":{},"buf":[0,0,0,0,0,0,0,0]}}"#, id),
        );
        assert_eq!(uploaded["status"], "success");

        let disposed = call_json(handle, "dispose", &format!(r#"{{"id":{}}}"#, id));
        assert_eq!(disposed["status"], "success");
        assert_eq!(*host.unregistered.lock(), vec![id]);
        assert!(host.provider(id).is_null());

        let stopped = call_json(handle, "stop", &format!(r#"{{"id":{}}}"#, id));
        assert_eq!(stopped["status"], "success");

        native_renderer_plugin_destroy(handle);
    }

    #[test]
    fn test_method_call_errors() {
        let host = HostRegistrar::default();
        let handle = native_renderer_plugin_create(callbacks(&host), fast_config());

        let bad_json = call_json(handle, "create", "{not json");
        assert_eq!(bad_json["status"], "error");
        assert_eq!(bad_json["code"], "invalid_json");

        let unknown = call_json(handle, "resize", "{}");
        assert_eq!(unknown["status"], "not_implemented");
        assert_eq!(unknown["method"], "resize");

        let missing = call_json(handle, "start", r#"{"id":99}"#);
        assert_eq!(missing["code"], "not_found");

        let no_args = {
            let method = CString::new("create").unwrap();
            let raw = native_renderer_method_call(handle, method.as_ptr(), ptr::null());
            let json = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_string();
            native_renderer_free_string(raw);
            serde_json::from_str::<serde_json::Value>(&json).unwrap()
        };
        assert_eq!(no_args["code"], "bad_args");

        assert!(native_renderer_method_call(ptr::null_mut(), ptr::null(), ptr::null()).is_null());
        native_renderer_plugin_destroy(handle);
    }

    #[test]
    fn test_typed_calls() {
        let host = HostRegistrar::default();
        let handle = native_renderer_plugin_create(callbacks(&host), fast_config());

        assert_eq!(native_renderer_create(handle, 0, 10), -1);
        assert_eq!(native_renderer_start(handle, 5), ErrorCode::NotFound);
        assert_eq!(native_renderer_stop(handle, 5), ErrorCode::Success);
        assert_eq!(native_renderer_dispose(handle, 5), ErrorCode::Success);

        let id = native_renderer_create(handle, 20, 20);
        assert!(id > 0);
        assert_eq!(
            native_renderer_upload_instances(handle, id, ptr::null(), 8),
            ErrorCode::NullPointer
        );
        assert_eq!(
            native_renderer_upload_instances(handle, id, ptr::null(), 0),
            ErrorCode::Success
        );

        let odd = [0u8; 6];
        assert_eq!(
            native_renderer_upload_instances(handle, id, odd.as_ptr(), odd.len()),
            ErrorCode::BadArgs
        );

        // 一条实例：左上角 5×5 色块
        let floats: [f32; 8] = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 5.0];
        let bytes: &[u8] = bytemuck::cast_slice(&floats);
        assert_eq!(
            native_renderer_upload_instances(handle, id, bytes.as_ptr(), bytes.len()),
            ErrorCode::Success
        );

        assert_eq!(native_renderer_start(handle, id), ErrorCode::Success);
        assert!(wait_until(Duration::from_secs(2), || host.dirty.load(Ordering::SeqCst) >= 3));
        assert_eq!(native_renderer_stop(handle, id), ErrorCode::Success);

        let descriptor = unsafe { &*native_renderer_pull_pixels(host.provider(id), 20, 20) };
        let pixels = unsafe {
            std::slice::from_raw_parts(descriptor.buffer, 20 * 20 * BYTES_PER_PIXEL)
        };
        assert_eq!(pixels[0..4], pixels[(4 * 20 + 4) * 4..(4 * 20 + 4) * 4 + 4]);
        assert_eq!(pixels[3], 255);

        assert_eq!(native_renderer_dispose(handle, id), ErrorCode::Success);
        native_renderer_plugin_destroy(handle);
    }

    #[test]
    fn test_null_handles() {
        assert_eq!(native_renderer_create(ptr::null_mut(), 10, 10), -1);
        assert_eq!(native_renderer_start(ptr::null_mut(), 1), ErrorCode::NullPointer);
        assert_eq!(
            native_renderer_upload_instances(ptr::null_mut(), 1, ptr::null(), 0),
            ErrorCode::NullPointer
        );
        assert!(native_renderer_pull_pixels(ptr::null(), 1, 1).is_null());
        native_renderer_plugin_destroy(ptr::null_mut());
        native_renderer_free_string(ptr::null_mut());
    }

    #[test]
    fn test_destroy_unregisters_live_sessions() {
        let host = HostRegistrar::default();
        let handle = native_renderer_plugin_create(callbacks(&host), fast_config());

        let a = native_renderer_create(handle, 8, 8);
        let b = native_renderer_create(handle, 8, 8);
        assert_eq!(native_renderer_start(handle, a), ErrorCode::Success);
        assert_eq!(native_renderer_start(handle, b), ErrorCode::Success);

        native_renderer_plugin_destroy(handle);
        let mut unregistered = host.unregistered.lock().clone();
        unregistered.sort();
        assert_eq!(unregistered, vec![a, b]);
        assert!(host.providers.lock().is_empty());
    }

    #[test]
    fn test_registry_owns_provider_until_unregistered() {
        let host = HostRegistrar::default();
        let registry = FfiTextureRegistry::new(callbacks(&host)).unwrap();
        let frame = Arc::new(FrameBuffer::new(4, 4));

        let id = registry.register_texture(PixelProvider::new(frame.clone()));
        assert_eq!(registry.provider_count(), 1);
        assert_eq!(Arc::strong_count(&frame), 2);

        // 宿主拿到的指针指向注册表持有的 provider
        let descriptor = unsafe { &*native_renderer_pull_pixels(host.provider(id), 4, 4) };
        assert_eq!((descriptor.width, descriptor.height), (4, 4));

        registry.mark_frame_available(id);
        assert_eq!(host.dirty.load(Ordering::SeqCst), 1);

        registry.unregister_texture(id);
        assert_eq!(registry.provider_count(), 0);
        assert_eq!(Arc::strong_count(&frame), 1);
        assert_eq!(*host.unregistered.lock(), vec![id]);
    }
}
