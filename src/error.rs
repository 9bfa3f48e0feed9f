// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 计数系统错误类型
//! Error types for the association and counting core

use thiserror::Error;

/// 计数库统一结果类型
pub type Result<T> = std::result::Result<T, CounterError>;

#[derive(Error, Debug)]
pub enum CounterError {
    /// 检测框不满足 x1<x2, y1<y2 (或超出画面范围),在关联前被丢弃
    #[error("malformed box [{x1}, {y1}, {x2}, {y2}]: {reason}")]
    MalformedBox {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        reason: &'static str,
    },

    /// DetectionSet 内部列长度不一致 (过滤逻辑正确时不可能出现)
    #[error("detection column `{column}` misaligned: expected {expected}, got {actual}")]
    Alignment {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// 外部协作者(检测器/跟踪器)返回了不合法的数据
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        reason: String,
    },

    /// 输入行无法解码 (例如非 UTF-8), 只影响这一行
    #[error("input line {line}: {reason}")]
    InvalidLine { line: u64, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CounterError {
    pub fn tracker<S: Into<String>>(reason: S) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: "tracker",
            reason: reason.into(),
        }
    }

    pub fn detector<S: Into<String>>(reason: S) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: "detector",
            reason: reason.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// 单帧失败,调用方可以跳过该帧继续
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedBox { .. }
                | Self::CollaboratorUnavailable { .. }
                | Self::InvalidLine { .. }
                | Self::Json(_)
        )
    }
}
