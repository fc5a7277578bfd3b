//! 文本扁平化服务 - 业务能力层
//!
//! 把内容子树渲染成数学可读的纯文本。替换在克隆节点上进行，
//! 不触碰原始 DOM：
//! - 已标记的图形元素 → 占位符字面量
//! - MathJax 容器 → alttext（缺失时 `[math]`）
//! - 数学图片 → alt 文本（缺失时 `[math]`）
//! - `svg[role=img]` → `[Figure: <label>]`（缺失时 `[figure]`）
//!
//! 替换预处理本身失败时，兜底为原始子树的 innerText 直读。

use crate::infrastructure::JsExecutor;
use anyhow::Result;
use tracing::warn;

/// 克隆节点并完成全部替换的 JS 函数体，供各变体共用
const FLATTEN_ONE_JS: &str = r#"
const flattenOne = (el) => {
    const clone = el.cloneNode(true);
    clone.querySelectorAll('[data-qfig]').forEach(n => {
        n.replaceWith(' ' + n.getAttribute('data-qfig') + ' ');
    });
    clone.querySelectorAll('mjx-container').forEach(mjx => {
        const alt = mjx.getAttribute('alttext') || '';
        mjx.replaceWith(alt ? ' ' + alt + ' ' : ' [math] ');
    });
    clone.querySelectorAll('img.math-img').forEach(img => {
        const alt = img.getAttribute('alt') || '';
        img.replaceWith(alt ? ' ' + alt + ' ' : ' [math] ');
    });
    clone.querySelectorAll('svg[role="img"]').forEach(svg => {
        const label = svg.getAttribute('aria-label') || '';
        svg.replaceWith(label ? ' [Figure: ' + label + '] ' : ' [figure] ');
    });
    return clone.textContent || '';
};
"#;

/// 文本扁平化服务
///
/// 职责：
/// - 只处理单个区域的文本读取
/// - 不认识 Record，不关心流程顺序
pub struct TextFlattener;

impl TextFlattener {
    pub fn new() -> Self {
        Self
    }

    /// 扁平化首个匹配元素（无匹配返回 None）
    pub async fn flatten(
        &self,
        executor: &JsExecutor,
        selector: &str,
    ) -> Result<Option<String>> {
        let js_code = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return null;
                {flatten}
                return flattenOne(el);
            }})()"#,
            sel = serde_json::to_string(selector)?,
            flatten = FLATTEN_ONE_JS,
        );

        match executor.eval_as::<Option<String>>(js_code).await {
            Ok(text) => Ok(text.map(|t| normalize_whitespace(&t))),
            Err(e) => {
                warn!("替换预处理失败，回退到 innerText 直读: {}", e);
                let fallback = executor.inner_text(selector).await?;
                Ok(fallback.map(|t| normalize_whitespace(&t)))
            }
        }
    }

    /// 扁平化所有匹配元素（如答案选项列表）
    pub async fn flatten_each(
        &self,
        executor: &JsExecutor,
        selector: &str,
    ) -> Result<Vec<String>> {
        let js_code = format!(
            r#"(() => {{
                {flatten}
                const out = [];
                document.querySelectorAll({sel}).forEach(el => out.push(flattenOne(el)));
                return out;
            }})()"#,
            sel = serde_json::to_string(selector)?,
            flatten = FLATTEN_ONE_JS,
        );

        let texts: Vec<String> = match executor.eval_as(js_code).await {
            Ok(texts) => texts,
            Err(e) => {
                warn!("替换预处理失败，回退到 innerText 直读: {}", e);
                let fallback_js = format!(
                    r#"(() => {{
                        const out = [];
                        document.querySelectorAll({sel})
                            .forEach(el => out.push(el.innerText || ''));
                        return out;
                    }})()"#,
                    sel = serde_json::to_string(selector)?,
                );
                executor.eval_as(fallback_js).await?
            }
        };
        Ok(normalize_each(&texts))
    }

    /// 扁平化最后一个匹配元素（如 rationale 区域的正文 div）
    pub async fn flatten_last(
        &self,
        executor: &JsExecutor,
        selector: &str,
    ) -> Result<Option<String>> {
        let js_code = format!(
            r#"(() => {{
                const all = document.querySelectorAll({sel});
                if (all.length === 0) return null;
                {flatten}
                return flattenOne(all[all.length - 1]);
            }})()"#,
            sel = serde_json::to_string(selector)?,
            flatten = FLATTEN_ONE_JS,
        );

        match executor.eval_as::<Option<String>>(js_code).await {
            Ok(text) => Ok(text.map(|t| normalize_whitespace(&t))),
            Err(e) => {
                warn!("替换预处理失败，回退到 innerText 直读: {}", e);
                let fallback = executor.inner_text(selector).await?;
                Ok(fallback.map(|t| normalize_whitespace(&t)))
            }
        }
    }
}

impl Default for TextFlattener {
    fn default() -> Self {
        Self::new()
    }
}

/// 连续空白压缩为单个空格，去除首尾空白
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 对列表中的每段文本做空白归一（替换路径与兜底路径共用）
fn normalize_each(texts: &[String]) -> Vec<String> {
    texts.iter().map(|t| normalize_whitespace(t)).collect()
}
