//! RequestRouter - 方法调用分发
//!
//! | 方法 | 参数 | 错误 |
//! |---|---|---|
//! | create | w:int, h:int | bad_args（尺寸缺失或越界） |
//! | start | id:int | not_found |
//! | stop | id:int | 无（未知 id 静默成功） |
//! | dispose | id:int | 无（未知 id 静默成功） |
//! | uploadInstances | id:int, buf:bytes | not_found / bad_args |
//! | 其它 | - | not_implemented |
//!
//! 所有调用都在宿主线程上执行；唯一的阻塞点是 stop/dispose 的 join（不超过一帧）。

use super::method::{ArgValue, MethodArgs, MethodCall, MethodError, MethodResponse};
use super::registry::TextureRegistry;
use super::session_table::SessionTable;
use crate::render::RenderConfig;
use crate::MAX_DIMENSION;
use std::sync::Arc;

/// 请求路由
pub struct RequestRouter {
    sessions: SessionTable,
}

impl RequestRouter {
    pub fn new(registry: Arc<dyn TextureRegistry>, config: RenderConfig) -> Self {
        Self {
            sessions: SessionTable::new(registry, config),
        }
    }

    /// 处理一次方法调用
    pub fn handle(&mut self, call: &MethodCall) -> MethodResponse {
        crate::rust_log_info!("OnMethodCall: {}", call.method);

        let result = self.dispatch(call);
        if let Err(e) = &result {
            match e {
                MethodError::Unimplemented(_) => {
                    crate::rust_log_warn!("NotImplemented: {}", call.method)
                }
                _ => crate::rust_log_warn!("{}(): {} ({})", call.method, e.code(), e),
            }
        }
        MethodResponse::from(result)
    }

    fn dispatch(&mut self, call: &MethodCall) -> Result<ArgValue, MethodError> {
        match call.method.as_str() {
            "create" => self.create(&call.args),
            "start" => self.start(&call.args),
            "stop" => self.stop(&call.args),
            "dispose" => self.dispose(&call.args),
            "uploadInstances" => self.upload_instances(&call.args),
            other => Err(MethodError::Unimplemented(other.to_string())),
        }
    }

    fn create(&mut self, args: &MethodArgs) -> Result<ArgValue, MethodError> {
        let width = dimension(args, "w")?;
        let height = dimension(args, "h")?;

        let texture_id = self.sessions.create(width, height);
        crate::rust_log_info!("create(): w={} h={} tex_id={}", width, height, texture_id);
        Ok(ArgValue::Int(texture_id))
    }

    fn start(&mut self, args: &MethodArgs) -> Result<ArgValue, MethodError> {
        let texture_id = texture_id(args)?;
        self.sessions.start(texture_id)?;
        crate::rust_log_info!("start(): id={}", texture_id);
        Ok(ArgValue::Null)
    }

    fn stop(&mut self, args: &MethodArgs) -> Result<ArgValue, MethodError> {
        let texture_id = texture_id(args)?;
        let found = self.sessions.stop(texture_id);
        crate::rust_log_info!("stop(): id={} found={}", texture_id, found);
        Ok(ArgValue::Null)
    }

    fn dispose(&mut self, args: &MethodArgs) -> Result<ArgValue, MethodError> {
        let texture_id = texture_id(args)?;
        if self.sessions.dispose(texture_id) {
            crate::rust_log_info!("dispose(): id={}", texture_id);
        } else {
            crate::rust_log_info!("dispose(): id not found {}", texture_id);
        }
        Ok(ArgValue::Null)
    }

    fn upload_instances(&mut self, args: &MethodArgs) -> Result<ArgValue, MethodError> {
        let texture_id = texture_id(args)?;
        if !self.sessions.contains(texture_id) {
            return Err(MethodError::NotFound(texture_id));
        }

        let bytes = args
            .bytes("buf")
            .ok_or_else(|| MethodError::BadArgs("buf missing".to_string()))?;
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(MethodError::BadArgs(format!(
                "buf length {} is not a multiple of 4",
                bytes.len()
            )));
        }

        self.sessions.upload_instances(texture_id, bytes)?;
        crate::rust_log_info!("uploadInstances(): id={} bytes={}", texture_id, bytes.len());
        Ok(ArgValue::Null)
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// 停止并注销全部会话（插件销毁时调用）
    pub fn teardown(&mut self) {
        self.sessions.teardown();
    }
}

fn texture_id(args: &MethodArgs) -> Result<i64, MethodError> {
    args.int("id")
        .ok_or_else(|| MethodError::BadArgs("id missing".to_string()))
}

fn dimension(args: &MethodArgs, key: &str) -> Result<usize, MethodError> {
    match args.int(key) {
        Some(v) if (1..=MAX_DIMENSION).contains(&v) => Ok(v as usize),
        Some(v) => Err(MethodError::BadArgs(format!(
            "{} out of range: {} (1..={})",
            key, v, MAX_DIMENSION
        ))),
        None => Err(MethodError::BadArgs(format!("{} missing", key))),
    }
}
