//! 方法调用的数据类型
//!
//! - `MethodCall`: 方法名 + 键值参数表（由外部编解码层解出）
//! - `MethodResponse`: 成功值 / 具名错误 / 未实现
//! - `MethodError`: not_found / bad_args / not_implemented

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// 参数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(v: Vec<u8>) -> Self {
        ArgValue::Bytes(v)
    }
}

impl From<&[u8]> for ArgValue {
    fn from(v: &[u8]) -> Self {
        ArgValue::Bytes(v.to_vec())
    }
}

/// 参数表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodArgs(HashMap<String, ArgValue>);

impl MethodArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    /// 整数参数；缺失或类型不符返回 None
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(ArgValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// 字节参数；缺失或类型不符返回 None
    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        match self.0.get(key) {
            Some(ArgValue::Bytes(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 一次方法调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: MethodArgs,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: MethodArgs::new(),
        }
    }

    /// 追加一个参数（builder 风格）
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(key, value);
        self
    }
}

/// 方法错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    #[error("texture not found: {0}")]
    NotFound(i64),

    #[error("bad arguments: {0}")]
    BadArgs(String),

    #[error("method not implemented: {0}")]
    Unimplemented(String),
}

impl MethodError {
    /// 返回给调用方的错误名
    pub fn code(&self) -> &'static str {
        match self {
            MethodError::NotFound(_) => "not_found",
            MethodError::BadArgs(_) => "bad_args",
            MethodError::Unimplemented(_) => "not_implemented",
        }
    }
}

/// 方法返回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { value: ArgValue },
    Error { code: String, message: String },
    NotImplemented { method: String },
}

impl MethodResponse {
    pub fn success(value: impl Into<ArgValue>) -> Self {
        MethodResponse::Success {
            value: value.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success { .. })
    }

    /// 错误名（成功时为 None）
    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodResponse::Success { .. } => None,
            MethodResponse::Error { code, .. } => Some(code.as_str()),
            MethodResponse::NotImplemented { .. } => Some("not_implemented"),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","code":"bad_args","message":"encode failed: {}"}}"#,
                e
            )
        })
    }
}

impl From<Result<ArgValue, MethodError>> for MethodResponse {
    fn from(result: Result<ArgValue, MethodError>) -> Self {
        match result {
            Ok(value) => MethodResponse::Success { value },
            Err(MethodError::Unimplemented(method)) => MethodResponse::NotImplemented { method },
            Err(e) => MethodResponse::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}
