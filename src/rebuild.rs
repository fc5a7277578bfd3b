//! 重建阶段：把批次文件中的占位符替换为目标格式
//!
//! 抓取阶段把图形以 `{{FIG_n}}` 占位符留在文本里；本模块按输出模式
//! 做纯文本投影，不触网、不回写原始批次文件。
//!
//! 三种输出模式：
//! - text：占位符 → 文本等价内容
//! - markdown：占位符 → `![alt](path)`
//! - html：占位符 → `<img src=... alt=... class="math-figure">`
//!
//! 截图缺失（image_path 为空）的图形在 text 模式不受影响；
//! markdown / html 模式仍然产出图像构造，只是目标路径为空，
//! 与批次文件里缺失的截图一一对应。

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{ErrorEntry, FigureRef, RebuiltEntry, RebuiltRecord, Record};
use serde_json::Value as JsonValue;
use tracing::warn;

/// 输出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Plain,
    Markdown,
    Html,
}

impl OutputMode {
    /// 解析模式名（大小写不敏感）
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(OutputMode::Plain),
            "markdown" | "md" => Ok(OutputMode::Markdown),
            "html" => Ok(OutputMode::Html),
            _ => Err(AppError::Config(ConfigError::UnknownMode {
                value: value.to_string(),
            })),
        }
    }

    /// 输出文件名后缀
    pub fn label(&self) -> &'static str {
        match self {
            OutputMode::Plain => "text",
            OutputMode::Markdown => "markdown",
            OutputMode::Html => "html",
        }
    }
}

/// 按模式渲染单个图形的替换文本
///
/// 截图缺失时 markdown / html 的目标路径为空字符串。
fn render_figure(figure: &FigureRef, mode: OutputMode) -> String {
    let path = figure.image_path.as_deref().unwrap_or("");
    match mode {
        OutputMode::Plain => figure.text_content.clone(),
        OutputMode::Markdown => {
            format!("![{}]({})", sanitize_alt(&figure.text_content), path)
        }
        OutputMode::Html => {
            format!(
                r#"<img src="{}" alt="{}" class="math-figure">"#,
                path,
                sanitize_alt(&figure.text_content)
            )
        }
    }
}

/// alt 文本不能携带双引号或换行，否则破坏外层语法
fn sanitize_alt(text: &str) -> String {
    text.replace('"', "'").replace('\n', " ")
}

/// 替换一段文本中的全部占位符
///
/// 按 figures 的存储顺序逐个替换；同一占位符的所有出现都被替换。
/// 没有对应图形的占位符原样保留（不猜测、不删除）。
pub fn substitute(text: &str, figures: &[FigureRef], mode: OutputMode) -> String {
    let mut result = text.to_string();
    for figure in figures {
        if figure.placeholder.is_empty() {
            continue;
        }
        result = result.replace(&figure.placeholder, &render_figure(figure, mode));
    }
    result
}

/// 重建单个条目
///
/// - 上游哨兵条目原样透传
/// - 结构不完整的条目转换为哨兵条目，不中断整批重建
pub fn rebuild_entry(value: &JsonValue, mode: OutputMode) -> RebuiltEntry {
    let question_id = value
        .get("question_id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    // 抓取阶段的哨兵条目：重建没有可替换的内容，原样透传
    if let Some(upstream) = value.get("error").and_then(|v| v.as_str()) {
        return RebuiltEntry::Error(ErrorEntry {
            question_id,
            error: upstream.to_string(),
        });
    }

    let record: Record = match serde_json::from_value(value.clone()) {
        Ok(record) => record,
        Err(e) => {
            let err = AppError::malformed_entry(&question_id, e.to_string());
            warn!("⚠️ {}", err);
            return RebuiltEntry::Error(ErrorEntry {
                question_id,
                error: err.to_string(),
            });
        }
    };

    RebuiltEntry::Record(Box::new(rebuild_record(&record, mode)))
}

fn rebuild_record(record: &Record, mode: OutputMode) -> RebuiltRecord {
    let figures = &record.figures;
    let mut figure_types: Vec<String> = figures.iter().map(|f| f.kind.clone()).collect();
    figure_types.sort();
    figure_types.dedup();

    RebuiltRecord {
        question_id: record.question_id.clone(),
        assessment: record.assessment.clone(),
        section: record.section.clone(),
        domain: record.domain.clone(),
        skill: record.skill.clone(),
        difficulty: record.difficulty,
        prompt: substitute(&record.prompt_text, figures, mode),
        question: substitute(&record.question_text, figures, mode),
        choices: record
            .answer_choices
            .iter()
            .map(|c| substitute(c, figures, mode))
            .collect(),
        correct_answer: record.correct_answer.clone(),
        rationale: substitute(&record.rationale, figures, mode),
        figure_count: figures.len(),
        figure_types,
    }
}

/// 重建整批条目
pub fn rebuild_all(values: &[JsonValue], mode: OutputMode) -> Vec<RebuiltEntry> {
    values.iter().map(|v| rebuild_entry(v, mode)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_figure() -> FigureRef {
        FigureRef {
            placeholder: "{{FIG_1}}".to_string(),
            index: 1,
            kind: "graph".to_string(),
            text_content: "line graph rising".to_string(),
            image_path: Some("images/q1_1.png".to_string()),
        }
    }

    #[test]
    fn plain_mode_uses_text_content() {
        let out = substitute("See graph {{FIG_1}}", &[graph_figure()], OutputMode::Plain);
        assert_eq!(out, "See graph line graph rising");
    }

    #[test]
    fn markdown_mode_renders_image_link() {
        let out = substitute(
            "See graph {{FIG_1}}",
            &[graph_figure()],
            OutputMode::Markdown,
        );
        assert_eq!(out, "See graph ![line graph rising](images/q1_1.png)");
    }

    #[test]
    fn html_mode_renders_img_tag() {
        let out = substitute("{{FIG_1}}", &[graph_figure()], OutputMode::Html);
        assert_eq!(
            out,
            r#"<img src="images/q1_1.png" alt="line graph rising" class="math-figure">"#
        );
    }

    #[test]
    fn missing_image_keeps_construct_with_empty_target() {
        let mut figure = graph_figure();
        figure.image_path = None;
        let figures = std::slice::from_ref(&figure);

        assert_eq!(
            substitute("{{FIG_1}}", figures, OutputMode::Plain),
            "line graph rising"
        );
        assert_eq!(
            substitute("{{FIG_1}}", figures, OutputMode::Markdown),
            "![line graph rising]()"
        );
        assert_eq!(
            substitute("{{FIG_1}}", figures, OutputMode::Html),
            r#"<img src="" alt="line graph rising" class="math-figure">"#
        );
    }

    #[test]
    fn replaces_every_occurrence_of_a_placeholder() {
        let out = substitute(
            "{{FIG_1}} and again {{FIG_1}}",
            &[graph_figure()],
            OutputMode::Plain,
        );
        assert_eq!(out, "line graph rising and again line graph rising");
    }

    #[test]
    fn unmatched_placeholder_left_untouched() {
        let out = substitute("{{FIG_2}} stays", &[graph_figure()], OutputMode::Plain);
        assert_eq!(out, "{{FIG_2}} stays");
    }

    #[test]
    fn alt_text_quotes_are_sanitized() {
        let mut figure = graph_figure();
        figure.text_content = "a \"quoted\" label".to_string();
        let out = substitute("{{FIG_1}}", &[figure], OutputMode::Html);
        assert!(out.contains("alt=\"a 'quoted' label\""));
    }

    #[test]
    fn substitution_is_idempotent() {
        let figures = [graph_figure()];
        let once = substitute("See graph {{FIG_1}}", &figures, OutputMode::Markdown);
        let twice = substitute(&once, &figures, OutputMode::Markdown);
        assert_eq!(once, twice);
    }

    #[test]
    fn upstream_sentinel_passes_through() {
        let value = json!({ "question_id": "deadbeef", "error": "modal unreadable" });
        let entry = rebuild_entry(&value, OutputMode::Plain);
        assert!(entry.is_error());
    }

    #[test]
    fn malformed_entry_becomes_sentinel() {
        let value = json!({ "question_id": "a1b2c3d4", "figures": "not-an-array" });
        let entry = rebuild_entry(&value, OutputMode::Plain);
        assert!(entry.is_error());
    }

    #[test]
    fn record_without_figures_rebuilds_unchanged() {
        let value = json!({
            "question_id": "a1b2c3d4",
            "prompt_text": "plain prompt",
            "question_text": "plain question",
        });
        let entry = rebuild_entry(&value, OutputMode::Markdown);
        match entry {
            RebuiltEntry::Record(r) => {
                assert_eq!(r.prompt, "plain prompt");
                assert_eq!(r.figure_count, 0);
                assert!(r.figure_types.is_empty());
            }
            RebuiltEntry::Error(_) => panic!("应当重建为完整条目"),
        }
    }

    #[test]
    fn figure_types_sorted_and_deduped() {
        let record = Record {
            question_id: "a1b2c3d4".to_string(),
            figures: vec![
                FigureRef {
                    placeholder: "{{FIG_1}}".to_string(),
                    index: 1,
                    kind: "table".to_string(),
                    text_content: "[table]".to_string(),
                    image_path: None,
                },
                FigureRef {
                    placeholder: "{{FIG_2}}".to_string(),
                    index: 2,
                    kind: "graph".to_string(),
                    text_content: "[graph]".to_string(),
                    image_path: None,
                },
                FigureRef {
                    placeholder: "{{FIG_3}}".to_string(),
                    index: 3,
                    kind: "graph".to_string(),
                    text_content: "[graph]".to_string(),
                    image_path: None,
                },
            ],
            has_figure: true,
            ..Default::default()
        };
        let rebuilt = rebuild_record(&record, OutputMode::Plain);
        assert_eq!(rebuilt.figure_count, 3);
        assert_eq!(rebuilt.figure_types, vec!["graph", "table"]);
    }

    #[test]
    fn mode_parse_accepts_aliases() {
        assert_eq!(OutputMode::parse("TEXT").unwrap(), OutputMode::Plain);
        assert_eq!(OutputMode::parse("md").unwrap(), OutputMode::Markdown);
        assert_eq!(OutputMode::parse(" html ").unwrap(), OutputMode::Html);
        assert!(OutputMode::parse("pdf").is_err());
    }

    #[test]
    fn mode_labels_match_output_filenames() {
        assert_eq!(OutputMode::Plain.label(), "text");
        assert_eq!(OutputMode::Markdown.label(), "markdown");
        assert_eq!(OutputMode::Html.label(), "html");
    }
}
