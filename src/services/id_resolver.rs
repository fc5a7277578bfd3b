//! 题目标识解析服务 - 业务能力层
//!
//! 按优先级顺序尝试多个解析策略，返回第一个命中的结果；
//! 全部失败时用合成计数器标识兜底，保证每次访问都有可用且唯一的 id。

use crate::infrastructure::JsExecutor;
use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

/// 结构化容器选择器，由窄到宽
const HEADER_SELECTORS: [&str; 3] = [
    "#modalID1 .cb-dialog-header h2",
    "#modalID1 .cb-dialog-header",
    "#modalID1 .question-detail-info",
];

/// 处于按下状态的查看按钮（其 id 属性内嵌题目标识）
const PRESSED_VIEW_BUTTON: &str = "button.view-question-button[aria-pressed='true']";

/// 题目标识解析服务
pub struct IdResolver {
    hex_pattern: Regex,
}

impl IdResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            hex_pattern: Regex::new(r"(?i)\b([a-f0-9]{8})\b")?,
        })
    }

    /// 解析当前题目的标识
    ///
    /// 策略链：
    /// 1. 结构化头部标签（由窄到宽的容器文本里扫 8 位十六进制 token）
    /// 2. 按下状态的查看按钮 id 属性
    /// 3. 合成标识 `unknown_{序号}`（最终兜底）
    pub async fn resolve(&self, executor: &JsExecutor, position: usize) -> String {
        match self.try_strategies(executor).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!("所有标识策略均未命中，使用合成标识");
                synthetic_id(position)
            }
            Err(e) => {
                warn!("标识解析出错 ({}), 使用合成标识", e);
                synthetic_id(position)
            }
        }
    }

    async fn try_strategies(&self, executor: &JsExecutor) -> Result<Option<String>> {
        for selector in HEADER_SELECTORS {
            if let Some(text) = executor.inner_text(selector).await? {
                if let Some(id) = self.find_hex_id(&text) {
                    debug!("标识命中 ({}): {}", selector, id);
                    return Ok(Some(id));
                }
            }
        }

        if let Some(button_id) = executor.attribute(PRESSED_VIEW_BUTTON, "id").await? {
            if let Some(id) = self.find_hex_id(&button_id) {
                debug!("标识命中 (查看按钮): {}", id);
                return Ok(Some(id));
            }
        }

        Ok(None)
    }

    /// 在文本中扫描 8 位十六进制标识（纯函数，便于测试）
    pub fn find_hex_id(&self, text: &str) -> Option<String> {
        self.hex_pattern
            .captures(text)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_lowercase())
    }
}

/// 合成计数器标识（1 起始的访问序号）
pub fn synthetic_id(position: usize) -> String {
    format!("unknown_{}", position)
}
