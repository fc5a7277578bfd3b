//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 等待就绪 / 元素截图"的能力

use crate::error::AppError;
use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / 就绪轮询 / 截图能力
/// - 不认识 Record / Figure
/// - 不处理业务流程
///
/// 受控页面没有渲染完成通知，就绪判断统一采用
/// "轮询结构标记 + 有界超时"，固定延迟只作为调用方的最后兜底。
pub struct JsExecutor {
    page: Page,
    poll_interval: Duration,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page, poll_interval_ms: u64) -> Self {
        Self {
            page,
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 检查选择器是否能匹配到元素
    pub async fn selector_exists(&self, selector: &str) -> Result<bool> {
        let js_code = format!(
            "(() => !!document.querySelector({}))()",
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }

    /// 轮询等待选择器出现，超时报会话错误
    pub async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Duration::from_millis(timeout_ms);
        let mut waited = Duration::ZERO;
        loop {
            if self.selector_exists(selector).await? {
                debug!("元素已出现: {}", selector);
                return Ok(());
            }
            if waited >= deadline {
                return Err(AppError::element_timeout(selector, timeout_ms).into());
            }
            sleep(self.poll_interval).await;
            waited += self.poll_interval;
        }
    }

    /// 轮询等待 JS 断言为真，超时报会话错误
    ///
    /// `predicate_js` 必须是一个求值为布尔的表达式。
    pub async fn wait_until(&self, predicate_js: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Duration::from_millis(timeout_ms);
        let mut waited = Duration::ZERO;
        loop {
            let ready: bool = self.eval_as(predicate_js.to_string()).await?;
            if ready {
                return Ok(());
            }
            if waited >= deadline {
                return Err(AppError::element_timeout(predicate_js, timeout_ms).into());
            }
            sleep(self.poll_interval).await;
            waited += self.poll_interval;
        }
    }

    /// 读取首个匹配元素的 innerText（无匹配返回 None）
    pub async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let js_code = format!(
            r#"(() => {{
                const el = document.querySelector({});
                return el ? (el.innerText || '') : null;
            }})()"#,
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }

    /// 读取首个匹配元素的属性值（无匹配或无属性返回 None）
    pub async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let js_code = format!(
            r#"(() => {{
                const el = document.querySelector({});
                return el ? el.getAttribute({}) : null;
            }})()"#,
            serde_json::to_string(selector)?,
            serde_json::to_string(name)?
        );
        self.eval_as(js_code).await
    }

    /// 点击首个匹配元素，返回是否命中
    pub async fn click(&self, selector: &str) -> Result<bool> {
        let js_code = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }

    /// 给 select 元素设值并触发 React 监听的事件
    pub async fn select_option(&self, selector: &str, value: &str) -> Result<bool> {
        let js_code = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.value = {};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            serde_json::to_string(selector)?,
            serde_json::to_string(value)?
        );
        self.eval_as(js_code).await
    }

    /// 截图首个匹配元素，返回 PNG 字节
    pub async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>> {
        let element = self.page.find_element(selector).await?;
        let bytes = element.screenshot(CaptureScreenshotFormat::Png).await?;
        Ok(bytes)
    }

    /// 固定静默等待（吸收异步渲染延迟的最后兜底）
    pub async fn settle(&self, ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }
}
