//! 单题提取流程 - 流程层
//!
//! 核心职责：把当前聚焦的题目模态框填充为一个 Record
//!
//! 字段填充顺序固定：
//! 元数据 → 题干 → 问题 → 选项 → 正确答案 → 解析 → 图形
//!
//! 失败策略：单个字段失败只降级该字段（warn 后用默认值），
//! 只有模态框容器整体不可读才上报整题失败。

use crate::error::{AppError, ExtractionError};
use crate::infrastructure::JsExecutor;
use crate::models::{FigureRef, Record};
use crate::services::figure_classifier::PendingFigure;
use crate::services::{FigureClassifier, Storage, TextFlattener};
use crate::workflow::record_ctx::RecordCtx;
use anyhow::Result;
use tracing::{debug, info, warn};

const MODAL_CONTENT: &str = "#modalID1 .cb-dialog-content";
const INFO_CELLS: &str = "#modalID1 .question-detail-info table tbody tr td";
const DIFFICULTY_FILLED: &str =
    "#modalID1 .question-detail-info .difficulty-table-icon .difficulty-indicator.filled";
const PROMPT_REGION: &str = "#modalID1 .prompt";
const QUESTION_REGION: &str = "#modalID1 .question";
const CHOICE_ITEMS: &str = "#modalID1 .answer-choices ul li";
const CORRECT_ANSWER_LABEL: &str = "#modalID1 .rationale p.cb-font-weight-bold";
const RATIONALE_BODY: &str = "#modalID1 .rationale div";

/// 分类元数据（信息表缺失时整组为空，不算失败）
#[derive(Debug, Default)]
struct Metadata {
    assessment: String,
    section: String,
    domain: String,
    skill: String,
    difficulty: u8,
}

/// 单题提取流程
///
/// - 编排一道题的完整字段提取
/// - 不持有任何资源（page）
/// - 只依赖业务能力（services）
pub struct RecordExtractor {
    flattener: TextFlattener,
    classifier: FigureClassifier,
    element_timeout_ms: u64,
    modal_settle_ms: u64,
}

impl RecordExtractor {
    pub fn new(element_timeout_ms: u64, modal_settle_ms: u64) -> Self {
        Self {
            flattener: TextFlattener::new(),
            classifier: FigureClassifier::new(),
            element_timeout_ms,
            modal_settle_ms,
        }
    }

    /// 提取当前聚焦的题目
    pub async fn extract(
        &self,
        executor: &JsExecutor,
        storage: &Storage,
        ctx: &RecordCtx,
    ) -> Result<Record> {
        // 整题门槛：模态框内容必须可读，否则上报 Navigator
        executor
            .wait_for_selector(MODAL_CONTENT, self.element_timeout_ms)
            .await
            .map_err(|e| {
                AppError::Extraction(ExtractionError::ModalUnreadable { source: e.into() })
            })?;
        executor.settle(self.modal_settle_ms).await;

        let mut record = Record {
            question_id: ctx.question_id.clone(),
            ..Default::default()
        };

        // ========== 1) 分类元数据 ==========
        match self.extract_metadata(executor).await {
            Ok(meta) => {
                record.assessment = meta.assessment;
                record.section = meta.section;
                record.domain = meta.domain;
                record.skill = meta.skill;
                record.difficulty = meta.difficulty;
            }
            Err(e) => warn!("{} 元数据提取失败: {}", ctx, e),
        }

        // ========== 2) 图形扫描（打标在文本提取之前，截图在之后） ==========
        let pending = match self.classifier.scan(executor).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("{} 图形扫描失败: {}", ctx, e);
                Vec::new()
            }
        };

        // ========== 3) 题干 ==========
        record.prompt_text = self.flatten_field(executor, PROMPT_REGION, ctx, "prompt").await;
        debug!(
            "{} 题干预览: {}",
            ctx,
            crate::utils::truncate_text(&record.prompt_text, 80)
        );

        // ========== 4) 问题 ==========
        record.question_text = self
            .flatten_field(executor, QUESTION_REGION, ctx, "question")
            .await;

        // ========== 5) 答案选项 ==========
        match self.flattener.flatten_each(executor, CHOICE_ITEMS).await {
            Ok(choices) => record.answer_choices = choices,
            Err(e) => warn!("{} 选项提取失败: {}", ctx, e),
        }

        // ========== 6) 正确答案 ==========
        match executor.inner_text(CORRECT_ANSWER_LABEL).await {
            Ok(Some(label)) => record.correct_answer = parse_correct_answer(&label),
            Ok(None) => debug!("{} 无正确答案标签", ctx),
            Err(e) => warn!("{} 正确答案提取失败: {}", ctx, e),
        }

        // ========== 7) 解析 ==========
        match self.flattener.flatten_last(executor, RATIONALE_BODY).await {
            Ok(Some(text)) => record.rationale = text,
            Ok(None) => debug!("{} 无解析区域", ctx),
            Err(e) => warn!("{} 解析提取失败: {}", ctx, e),
        }

        // ========== 8) 图形捕获 ==========
        record.figures = self
            .capture_figures(executor, storage, ctx, &pending)
            .await;
        record.has_figure = !record.figures.is_empty();

        info!(
            "{} ✓ 提取完成: {} / {} (图形: {})",
            ctx,
            record.domain,
            record.skill,
            record.figures.len()
        );
        Ok(record)
    }

    /// 信息表：前 4 格依次为考试类型、科目、领域、技能；难度为指示条数量
    async fn extract_metadata(&self, executor: &JsExecutor) -> Result<Metadata> {
        let js_code = format!(
            r#"(() => {{
                const texts = [];
                document.querySelectorAll({})
                    .forEach(c => texts.push((c.innerText || '').trim()));
                return texts;
            }})()"#,
            serde_json::to_string(INFO_CELLS)?
        );
        let cells: Vec<String> = executor.eval_as(js_code).await?;

        // 信息表缺失 → 全部字段为空/零，不算失败
        if cells.len() < 5 {
            return Ok(Metadata::default());
        }

        Ok(Metadata {
            assessment: cells[0].clone(),
            section: cells[1].clone(),
            domain: cells[2].clone(),
            skill: cells[3].clone(),
            difficulty: self.count_difficulty_bars(executor).await?,
        })
    }

    /// 点亮的难度指示条数量
    async fn count_difficulty_bars(&self, executor: &JsExecutor) -> Result<u8> {
        let js_code = format!(
            "(() => document.querySelectorAll({}).length)()",
            serde_json::to_string(DIFFICULTY_FILLED)?
        );
        let count: u32 = executor.eval_as(js_code).await?;
        Ok(clamp_difficulty(count))
    }

    async fn flatten_field(
        &self,
        executor: &JsExecutor,
        selector: &str,
        ctx: &RecordCtx,
        field: &str,
    ) -> String {
        match self.flattener.flatten(executor, selector).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("{} {}", ctx, AppError::region_missing(field));
                String::new()
            }
            Err(e) => {
                warn!("{} {} 提取失败: {}", ctx, field, e);
                String::new()
            }
        }
    }

    async fn capture_figures(
        &self,
        executor: &JsExecutor,
        storage: &Storage,
        ctx: &RecordCtx,
        pending: &[PendingFigure],
    ) -> Vec<FigureRef> {
        if pending.is_empty() {
            return Vec::new();
        }
        self.classifier
            .capture(executor, storage, &ctx.question_id, pending)
            .await
    }
}

/// 难度 = 点亮指示条数量，按指示条自身基数钳制在 [0, 3]
pub fn clamp_difficulty(count: u32) -> u8 {
    count.min(3) as u8
}

/// 解析 `"<前缀>: <字母>"` 形式的正确答案标签
///
/// 取最后一个分隔符后的 token；无分隔符时字段留空。
pub fn parse_correct_answer(label: &str) -> String {
    match label.rsplit_once(':') {
        Some((_, letter)) => letter.trim().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_token_after_last_separator() {
        assert_eq!(parse_correct_answer("Correct Answer: A"), "A");
        assert_eq!(parse_correct_answer("Answer: Choice: B"), "B");
    }

    #[test]
    fn missing_separator_yields_empty() {
        assert_eq!(parse_correct_answer("Correct Answer A"), "");
        assert_eq!(parse_correct_answer(""), "");
    }

    #[test]
    fn trims_whitespace_around_letter() {
        assert_eq!(parse_correct_answer("Correct Answer:  D \n"), "D");
    }

    #[test]
    fn difficulty_stays_within_indicator_range() {
        assert_eq!(clamp_difficulty(0), 0);
        assert_eq!(clamp_difficulty(2), 2);
        assert_eq!(clamp_difficulty(3), 3);
        assert_eq!(clamp_difficulty(7), 3);
    }
}
