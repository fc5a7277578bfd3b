//! 图形分类与捕获服务 - 业务能力层
//!
//! 按固定规则顺序判定哪些可视元素值得截图（避免重复捕获），
//! 并给选中元素分配整题唯一的占位符。
//!
//! 判定与捕获是两个独立步骤：
//! 1. 扫描：JS 给候选元素打上扫描标记并返回纯元数据探针
//! 2. 分类：纯函数按规则顺序筛选（可对合成探针做单元测试）
//! 3. 捕获：对选中元素逐个截图，单个失败不影响其余元素

use crate::error::{AppError, ExtractionError};
use crate::infrastructure::JsExecutor;
use crate::models::FigureRef;
use crate::services::storage::Storage;
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const MODAL: &str = "#modalID1";

/// 题目内的文档区域，按固定顺序扫描
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Prompt,
    Question,
    Choices,
}

impl Region {
    /// 扫描顺序固定：prompt → question → choices
    pub const SCAN_ORDER: [Region; 3] = [Region::Prompt, Region::Question, Region::Choices];

    pub fn selector(self) -> String {
        match self {
            Region::Prompt => format!("{} .prompt", MODAL),
            Region::Question => format!("{} .question", MODAL),
            Region::Choices => format!("{} .answer-choices", MODAL),
        }
    }

    /// 扫描标记前缀，保证跨区域的扫描 id 不冲突
    fn scan_prefix(self) -> &'static str {
        match self {
            Region::Prompt => "p",
            Region::Question => "q",
            Region::Choices => "c",
        }
    }

    /// 普通 svg 的最小尺寸阈值：题干/问题区域较大，选项区域较小
    pub fn min_graphic_size(self) -> f64 {
        match self {
            Region::Prompt | Region::Question => 100.0,
            Region::Choices => 50.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Prompt => "prompt",
            Region::Question => "question",
            Region::Choices => "choices",
        }
    }
}

/// 图形类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    /// 显式 figure 容器
    Figure,
    /// 标记为 image 角色的图形（真正的图表，非 MathJax）
    Graph,
    /// 达到尺寸阈值的普通 svg
    Svg,
    /// 表格
    Table,
}

impl FigureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FigureKind::Figure => "figure",
            FigureKind::Graph => "graph",
            FigureKind::Svg => "svg",
            FigureKind::Table => "table",
        }
    }

    /// 无标签时的文本等价兜底标记
    pub fn fallback_marker(self) -> &'static str {
        match self {
            FigureKind::Figure | FigureKind::Svg => "[figure]",
            FigureKind::Graph => "[graph]",
            FigureKind::Table => "[table]",
        }
    }
}

/// 候选元素的纯元数据探针（由扫描 JS 返回）
#[derive(Debug, Clone, Deserialize)]
pub struct ElementProbe {
    pub scan_id: String,
    pub tag: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub in_math: bool,
    #[serde(default)]
    pub in_figure: bool,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// 分类结果：选中待捕获的元素
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub scan_id: String,
    pub kind: FigureKind,
    pub label: String,
}

/// 纯分类判定：按固定规则顺序筛选值得捕获的元素
///
/// 1. 显式 figure 容器 —— 始终捕获
/// 2. `svg[role=img]` 且不在 MathJax 容器内 —— 捕获
/// 3. 其余非 MathJax svg，尺寸达到区域阈值 —— 捕获
/// 4. 未嵌套在 figure 容器内的 table —— 捕获
pub fn classify(region: Region, probes: &[ElementProbe]) -> Vec<Selection> {
    let min_size = region.min_graphic_size();
    let mut picked = Vec::new();

    for p in probes {
        if p.tag == "figure" {
            picked.push(Selection {
                scan_id: p.scan_id.clone(),
                kind: FigureKind::Figure,
                label: p.label.clone(),
            });
        }
    }
    for p in probes {
        if p.tag == "svg" && p.role == "img" && !p.in_math {
            picked.push(Selection {
                scan_id: p.scan_id.clone(),
                kind: FigureKind::Graph,
                label: p.label.clone(),
            });
        }
    }
    for p in probes {
        if p.tag == "svg"
            && p.role != "img"
            && !p.in_math
            && p.width >= min_size
            && p.height >= min_size
        {
            picked.push(Selection {
                scan_id: p.scan_id.clone(),
                kind: FigureKind::Svg,
                label: p.label.clone(),
            });
        }
    }
    for p in probes {
        if p.tag == "table" && !p.in_figure {
            picked.push(Selection {
                scan_id: p.scan_id.clone(),
                kind: FigureKind::Table,
                label: p.label.clone(),
            });
        }
    }

    picked
}

/// 待捕获图形：已分配占位符，尚未截图
#[derive(Debug, Clone)]
pub struct PendingFigure {
    pub index: u32,
    pub placeholder: String,
    pub region: Region,
    pub kind: FigureKind,
    pub scan_id: String,
    pub text_content: String,
}

/// 图形分类服务
///
/// 职责：
/// - 只处理单个题目的图形判定与捕获
/// - 占位符计数器为整题范围（非按区域），每题扫描时归零
pub struct FigureClassifier;

impl FigureClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 扫描整题三个区域，返回带占位符的待捕获列表并在 DOM 上打标
    ///
    /// 单一计数器跨区域递增，保证同一文档结构下编号可复现。
    pub async fn scan(&self, executor: &JsExecutor) -> Result<Vec<PendingFigure>> {
        self.clear_stale_tags(executor).await?;

        let mut pending = Vec::new();
        let mut counter: u32 = 0;

        for region in Region::SCAN_ORDER {
            let probes = self.scan_region(executor, region).await?;
            if probes.is_empty() {
                continue;
            }
            debug!("区域 {} 候选元素: {}", region.name(), probes.len());

            for selection in classify(region, &probes) {
                counter += 1;
                let text_content = if selection.label.is_empty() {
                    selection.kind.fallback_marker().to_string()
                } else {
                    selection.label.clone()
                };
                pending.push(PendingFigure {
                    index: counter,
                    placeholder: format!("{{{{FIG_{}}}}}", counter),
                    region,
                    kind: selection.kind,
                    scan_id: selection.scan_id,
                    text_content,
                });
            }
        }

        if !pending.is_empty() {
            self.tag_placeholders(executor, &pending).await?;
        }
        Ok(pending)
    }

    /// 逐个截图选中元素并落盘
    ///
    /// 单个元素截图失败只记录警告，FigureRef 保留但无存储路径。
    pub async fn capture(
        &self,
        executor: &JsExecutor,
        storage: &Storage,
        question_id: &str,
        pending: &[PendingFigure],
    ) -> Vec<FigureRef> {
        let mut figures = Vec::with_capacity(pending.len());

        for fig in pending {
            let selector = format!("{} [data-qfig-scan=\"{}\"]", MODAL, fig.scan_id);
            let image_path = match executor.screenshot_element(&selector).await {
                Ok(bytes) => match storage.save_image(question_id, fig.index, &bytes).await {
                    Ok(path) => {
                        info!(
                            "    📸 已捕获 {} ({}): {}",
                            fig.kind.as_str(),
                            fig.region.name(),
                            path
                        );
                        Some(path)
                    }
                    Err(e) => {
                        warn!("    ⚠️ 截图落盘失败 ({}): {}", fig.placeholder, e);
                        None
                    }
                },
                Err(e) => {
                    let err = AppError::Extraction(ExtractionError::CaptureFailed {
                        placeholder: fig.placeholder.clone(),
                        source: e.into(),
                    });
                    warn!("    ⚠️ {}", err);
                    None
                }
            };

            figures.push(FigureRef {
                placeholder: fig.placeholder.clone(),
                index: fig.index,
                kind: fig.kind.as_str().to_string(),
                text_content: fig.text_content.clone(),
                image_path,
            });
        }

        figures
    }

    /// 清除上一题残留的扫描/占位标记，防止串题
    async fn clear_stale_tags(&self, executor: &JsExecutor) -> Result<()> {
        let js_code = format!(
            r#"(() => {{
                document.querySelectorAll('{modal} [data-qfig-scan], {modal} [data-qfig]')
                    .forEach(el => {{
                        el.removeAttribute('data-qfig-scan');
                        el.removeAttribute('data-qfig');
                    }});
                return true;
            }})()"#,
            modal = MODAL,
        );
        executor.eval(js_code).await?;
        Ok(())
    }

    /// 给单个区域的所有候选元素打扫描标记并返回元数据探针
    async fn scan_region(
        &self,
        executor: &JsExecutor,
        region: Region,
    ) -> Result<Vec<ElementProbe>> {
        let js_code = format!(
            r#"(() => {{
                const region = document.querySelector({sel});
                if (!region) return [];
                const probes = [];
                let seq = 0;
                const probe = (el, tag) => {{
                    const id = {prefix} + '-' + (++seq);
                    el.setAttribute('data-qfig-scan', id);
                    const rect = el.getBoundingClientRect();
                    let label = (el.getAttribute('aria-label') || '').trim();
                    if (!label && tag === 'figure') {{
                        const cap = el.querySelector('figcaption');
                        label = cap ? (cap.innerText || '').trim() : '';
                    }}
                    if (!label && tag === 'table') {{
                        const cap = el.querySelector('caption');
                        label = cap ? (cap.innerText || '').trim() : '';
                    }}
                    probes.push({{
                        scan_id: id,
                        tag: tag,
                        role: el.getAttribute('role') || '',
                        label: label,
                        in_math: !!el.closest('mjx-container'),
                        in_figure: !!(el.parentElement && el.parentElement.closest('figure')),
                        width: rect.width,
                        height: rect.height
                    }});
                }};
                region.querySelectorAll('figure').forEach(el => probe(el, 'figure'));
                region.querySelectorAll('svg').forEach(el => probe(el, 'svg'));
                region.querySelectorAll('table').forEach(el => probe(el, 'table'));
                return probes;
            }})()"#,
            sel = serde_json::to_string(&region.selector())?,
            prefix = serde_json::to_string(region.scan_prefix())?,
        );
        executor.eval_as(js_code).await
    }

    /// 把占位符写回选中元素的 data-qfig 属性（供扁平化替换）
    async fn tag_placeholders(
        &self,
        executor: &JsExecutor,
        pending: &[PendingFigure],
    ) -> Result<()> {
        let map: BTreeMap<&str, &str> = pending
            .iter()
            .map(|f| (f.scan_id.as_str(), f.placeholder.as_str()))
            .collect();
        let js_code = format!(
            r#"(() => {{
                const map = {map};
                let tagged = 0;
                for (const scan in map) {{
                    const el = document.querySelector(
                        '{modal} [data-qfig-scan="' + scan + '"]');
                    if (el) {{ el.setAttribute('data-qfig', map[scan]); tagged++; }}
                }}
                return tagged;
            }})()"#,
            map = serde_json::to_string(&map)?,
            modal = MODAL,
        );
        let tagged: usize = executor.eval_as(js_code).await?;
        if tagged != pending.len() {
            warn!("占位符打标不完整: {}/{}", tagged, pending.len());
        }
        Ok(())
    }
}

impl Default for FigureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(scan_id: &str, tag: &str) -> ElementProbe {
        ElementProbe {
            scan_id: scan_id.to_string(),
            tag: tag.to_string(),
            role: String::new(),
            label: String::new(),
            in_math: false,
            in_figure: false,
            width: 0.0,
            height: 0.0,
        }
    }

    #[test]
    fn figure_containers_always_captured() {
        let probes = vec![probe("p-1", "figure")];
        let picked = classify(Region::Prompt, &probes);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].kind, FigureKind::Figure);
    }

    #[test]
    fn mathjax_svg_excluded() {
        let mut graph = probe("p-1", "svg");
        graph.role = "img".to_string();
        let mut mjx = probe("p-2", "svg");
        mjx.role = "img".to_string();
        mjx.in_math = true;

        let picked = classify(Region::Prompt, &vec![graph, mjx]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].scan_id, "p-1");
        assert_eq!(picked[0].kind, FigureKind::Graph);
    }

    #[test]
    fn generic_svg_needs_region_threshold() {
        let mut small = probe("p-1", "svg");
        small.width = 80.0;
        small.height = 80.0;
        let mut large = probe("p-2", "svg");
        large.width = 120.0;
        large.height = 120.0;

        // prompt 区域阈值 100：只有大图入选
        let picked = classify(Region::Prompt, &[small.clone(), large.clone()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].scan_id, "p-2");

        // 选项区域阈值 50：两者都入选
        let picked = classify(Region::Choices, &[small, large]);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn image_role_svg_not_double_captured_by_size_rule() {
        let mut graph = probe("q-1", "svg");
        graph.role = "img".to_string();
        graph.width = 300.0;
        graph.height = 300.0;

        let picked = classify(Region::Question, &[graph]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].kind, FigureKind::Graph);
    }

    #[test]
    fn table_inside_figure_not_double_captured() {
        let fig = probe("p-1", "figure");
        let mut nested = probe("p-2", "table");
        nested.in_figure = true;
        let free = probe("p-3", "table");

        let picked = classify(Region::Prompt, &[fig, nested, free]);
        let kinds: Vec<_> = picked.iter().map(|s| (s.scan_id.as_str(), s.kind)).collect();
        assert_eq!(
            kinds,
            vec![("p-1", FigureKind::Figure), ("p-3", FigureKind::Table)]
        );
    }

    #[test]
    fn rule_order_is_deterministic() {
        let mut svg = probe("p-2", "svg");
        svg.role = "img".to_string();
        let probes = vec![probe("p-3", "table"), svg, probe("p-1", "figure")];
        let picked = classify(Region::Prompt, &probes);
        // figure 规则先于 svg 规则先于 table 规则
        let ids: Vec<_> = picked.iter().map(|s| s.scan_id.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "p-2", "p-3"]);
    }

    #[test]
    fn fallback_markers_by_kind() {
        assert_eq!(FigureKind::Graph.fallback_marker(), "[graph]");
        assert_eq!(FigureKind::Table.fallback_marker(), "[table]");
        assert_eq!(FigureKind::Figure.fallback_marker(), "[figure]");
    }
}
