//! # 手势上传
//!
//! 具名序列录制完成后转发到远端手势分类服务。上传是尽力而为的：
//! 调用方只记录失败，不影响录制结果。

use crate::sequence::Sequence;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// 默认请求超时
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// 上传载荷 `{name, sequence, label}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GesturePayload {
    pub name: String,
    pub sequence: serde_json::Value,
    pub label: String,
}

impl GesturePayload {
    pub fn new(name: impl Into<String>, sequence: &Sequence, label: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            sequence: serde_json::to_value(sequence).context("序列化序列失败")?,
            label: label.into(),
        })
    }
}

/// 手势上传协作者
pub trait GestureSink: Send + Sync {
    fn upload(&self, payload: &GesturePayload) -> Result<()>;
}

/// HTTP POST 上传
pub struct HttpGestureSink {
    agent: ureq::Agent,
    url: String,
}

impl HttpGestureSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_UPLOAD_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl GestureSink for HttpGestureSink {
    fn upload(&self, payload: &GesturePayload) -> Result<()> {
        match self.agent.post(&self.url).send_json(payload) {
            Ok(response) => {
                debug!(name = %payload.name, status = response.status(), "Gesture uploaded");
                Ok(())
            },
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                bail!("上传失败，HTTP {}: {}", code, body)
            },
            Err(ureq::Error::Transport(transport)) => {
                Err(anyhow::Error::new(transport).context(format!("无法连接到 {}", self.url)))
            },
        }
    }
}

/// 只记录日志的上传端（未配置上传地址时使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogGestureSink;

impl GestureSink for LogGestureSink {
    fn upload(&self, payload: &GesturePayload) -> Result<()> {
        info!(name = %payload.name, label = %payload.label, "No upload endpoint configured, gesture kept locally");
        Ok(())
    }
}
