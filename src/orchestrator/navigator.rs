//! 遍历状态机 - 编排层
//!
//! ## 职责
//!
//! 从筛选后的结果集出发，借助模态框的 "当前/下一题" 翻页能力，
//! 按顺序恰好访问每道题一次：
//!
//! ```text
//! Init → Filtering → ResultsReady → RecordOpen → Extracting → Advancing
//!     → {RecordOpen | Exhausted | LimitReached | Faulted}
//! ```
//!
//! - 数量上限在每轮循环开头检查，命中是正常结束（LimitReached），
//!   与翻不动页的 Exhausted 区分
//! - 跳过计数只翻页不提取，用于断点续抓
//! - 单题提取失败写入哨兵条目后继续前进；只有会话级故障才中止，
//!   且已积累的条目仍然返回

use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{Assessment, ErrorEntry, RecordEntry, Section};
use crate::services::{IdResolver, Storage};
use crate::workflow::{RecordCtx, RecordExtractor};
use anyhow::Result;
use tracing::{debug, error, info, warn};

const SELECT_ASSESSMENT: &str = r"select#apricot_select_\:r0\:";
const SELECT_SECTION: &str = r"select#apricot_select_\:r1\:";
const DOMAIN_CHECKBOXES: &str = "input[id^='checkbox-'][type='checkbox']";
const SEARCH_BUTTON: &str = "button.cb-btn.cb-btn-yellow";
const RESULTS_TABLE: &str = "table.cb-table-react";
const VIEW_BUTTON: &str = "button.view-question-button";
const MODAL_CONTENT: &str = "#modalID1 .cb-dialog-content";
const CLOSE_BUTTON: &str = "#modalID1 button[aria-label='Close']";
const NEXT_BUTTON_SCOPE: &str = "#modalID1 .footer div.cb-align-right button";

/// 遍历状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Init,
    Filtering,
    ResultsReady,
    RecordOpen,
    Extracting,
    Advancing,
    Exhausted,
    LimitReached,
    Faulted,
}

/// 遍历结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// 翻页能力耗尽（正常结束）
    Exhausted,
    /// 达到配置的数量上限（正常结束）
    LimitReached,
    /// 会话级故障（返回已积累的部分结果）
    Faulted(String),
}

/// 遍历报告
#[derive(Debug)]
pub struct TraversalReport {
    pub entries: Vec<RecordEntry>,
    pub outcome: NavOutcome,
}

/// 遍历状态机
pub struct Navigator {
    assessment: Assessment,
    section: Section,
    limit: Option<usize>,
    skip_count: usize,
    element_timeout_ms: u64,
    filter_settle_ms: u64,
    modal_settle_ms: u64,
    advance_settle_ms: u64,
    extractor: RecordExtractor,
    id_resolver: IdResolver,
    state: NavState,
}

impl Navigator {
    pub fn new(config: &Config, assessment: Assessment, section: Section) -> Result<Self> {
        Ok(Self {
            assessment,
            section,
            limit: config.record_limit(),
            skip_count: config.skip_count,
            element_timeout_ms: config.element_timeout_ms,
            filter_settle_ms: config.filter_settle_ms,
            modal_settle_ms: config.modal_settle_ms,
            advance_settle_ms: config.advance_settle_ms,
            extractor: RecordExtractor::new(config.element_timeout_ms, config.modal_settle_ms),
            id_resolver: IdResolver::new()?,
            state: NavState::Init,
        })
    }

    /// 执行完整遍历
    ///
    /// 会话级故障不向外传播：记录 Faulted 结果并返回部分条目。
    pub async fn run(&mut self, executor: &JsExecutor, storage: &Storage) -> TraversalReport {
        let mut entries = Vec::new();
        match self.traverse(executor, storage, &mut entries).await {
            Ok(outcome) => TraversalReport { entries, outcome },
            Err(e) => {
                self.set_state(NavState::Faulted);
                error!("❌ 会话故障，中止遍历: {:#}", e);
                TraversalReport {
                    entries,
                    outcome: NavOutcome::Faulted(format!("{:#}", e)),
                }
            }
        }
    }

    async fn traverse(
        &mut self,
        executor: &JsExecutor,
        storage: &Storage,
        entries: &mut Vec<RecordEntry>,
    ) -> Result<NavOutcome> {
        self.apply_filters(executor).await?;

        if !self.open_first_record(executor).await? {
            warn!("⚠️ 结果集为空，没有可打开的题目");
            self.set_state(NavState::Exhausted);
            return Ok(NavOutcome::Exhausted);
        }

        self.skip_ahead(executor).await?;

        let mut visited = 0usize;
        loop {
            // 上限在每轮循环开头检查
            if let Some(limit) = reached_limit(self.limit, visited) {
                info!("\n🛑 已达到数量上限 {}", limit);
                self.set_state(NavState::LimitReached);
                self.close_modal(executor).await;
                return Ok(NavOutcome::LimitReached);
            }

            visited += 1;
            let question_id = self.id_resolver.resolve(executor, visited).await;
            let ctx = RecordCtx::new(question_id.clone(), visited);
            info!("\n[{}] 🔍 处理题目: {}", visited, question_id);

            // 单题失败隔离：哨兵条目占位，遍历继续
            self.set_state(NavState::Extracting);
            match self.extractor.extract(executor, storage, &ctx).await {
                Ok(record) => entries.push(RecordEntry::Record(Box::new(record))),
                Err(e) => {
                    error!("{} ❌ 提取失败: {:#}", ctx, e);
                    entries.push(RecordEntry::Error(ErrorEntry {
                        question_id,
                        error: format!("{:#}", e),
                    }));
                }
            }

            self.set_state(NavState::Advancing);
            if self.has_next(executor).await? {
                self.click_next(executor).await?;
                self.set_state(NavState::RecordOpen);
            } else {
                info!("\n🏁 没有更多题目");
                self.set_state(NavState::Exhausted);
                self.close_modal(executor).await;
                return Ok(NavOutcome::Exhausted);
            }
        }
    }

    /// 设置筛选条件并提交查询
    async fn apply_filters(&mut self, executor: &JsExecutor) -> Result<()> {
        self.set_state(NavState::Filtering);
        info!(
            "🔍 设置筛选: {} / {}",
            self.assessment,
            self.section
        );

        executor
            .wait_for_selector(SELECT_ASSESSMENT, self.element_timeout_ms)
            .await?;
        executor
            .select_option(SELECT_ASSESSMENT, self.assessment.option_value())
            .await?;

        executor
            .wait_for_selector(SELECT_SECTION, self.element_timeout_ms)
            .await?;
        executor
            .select_option(SELECT_SECTION, self.section.option_value())
            .await?;
        executor.settle(400).await;

        let checked = self.check_all_domains(executor).await?;
        debug!("已勾选 {} 个领域复选框", checked);

        // 搜索按钮可能延迟启用，轮询直到可点击
        executor
            .wait_for_selector(SEARCH_BUTTON, self.element_timeout_ms)
            .await?;
        let enabled_js = format!(
            r#"(() => {{
                const b = document.querySelector({});
                return !!b && !b.disabled;
            }})()"#,
            serde_json::to_string(SEARCH_BUTTON)?
        );
        executor.wait_until(&enabled_js, 8_000).await?;

        executor.click(SEARCH_BUTTON).await?;
        info!("🔍 查询已提交...");
        executor.settle(self.filter_settle_ms).await;

        executor
            .wait_for_selector(RESULTS_TABLE, self.element_timeout_ms)
            .await?;
        executor.settle(self.modal_settle_ms).await;
        self.set_state(NavState::ResultsReady);
        Ok(())
    }

    /// 勾选所有领域复选框（不勾选则无法提交查询）
    async fn check_all_domains(&self, executor: &JsExecutor) -> Result<usize> {
        let js_code = format!(
            r#"(() => {{
                let checked = 0;
                document.querySelectorAll({}).forEach(box => {{
                    if (!box.checked) box.click();
                    checked++;
                }});
                return checked;
            }})()"#,
            serde_json::to_string(DOMAIN_CHECKBOXES)?
        );
        let count: usize = executor.eval_as(js_code).await?;
        Ok(count)
    }

    /// 打开第一道题的模态框，返回是否有结果可开
    async fn open_first_record(&mut self, executor: &JsExecutor) -> Result<bool> {
        info!("📖 打开第一道题...");
        if !executor.click(VIEW_BUTTON).await? {
            return Ok(false);
        }
        executor
            .wait_for_selector(MODAL_CONTENT, self.element_timeout_ms)
            .await?;
        executor.settle(self.modal_settle_ms).await;
        self.set_state(NavState::RecordOpen);
        Ok(true)
    }

    /// 只翻页不提取，跳过前 N 道题（断点续抓）
    async fn skip_ahead(&mut self, executor: &JsExecutor) -> Result<()> {
        if self.skip_count == 0 {
            return Ok(());
        }
        info!("⏩ 跳过前 {} 道题...", self.skip_count);
        for skipped in 0..self.skip_count {
            if self.has_next(executor).await? {
                self.click_next(executor).await?;
            } else {
                warn!(
                    "⚠️ 只有 {} 道题，无法跳过到第 {} 道",
                    skipped + 1,
                    self.skip_count + 1
                );
                break;
            }
        }
        Ok(())
    }

    /// Next 按钮存在且未禁用
    async fn has_next(&self, executor: &JsExecutor) -> Result<bool> {
        let js_code = format!(
            r#"(() => {{
                const btns = document.querySelectorAll({});
                for (const b of btns) {{
                    if ((b.textContent || '').includes('Next')) return !b.disabled;
                }}
                return false;
            }})()"#,
            serde_json::to_string(NEXT_BUTTON_SCOPE)?
        );
        executor.eval_as(js_code).await
    }

    /// 点击 Next 翻到下一题
    async fn click_next(&self, executor: &JsExecutor) -> Result<()> {
        let js_code = format!(
            r#"(() => {{
                const btns = document.querySelectorAll({});
                for (const b of btns) {{
                    if ((b.textContent || '').includes('Next') && !b.disabled) {{
                        b.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#,
            serde_json::to_string(NEXT_BUTTON_SCOPE)?
        );
        let clicked: bool = executor.eval_as(js_code).await?;
        if !clicked {
            warn!("⚠️ Next 按钮点击未命中");
        }
        executor.settle(self.advance_settle_ms).await;
        Ok(())
    }

    /// 收尾关闭模态框（失败不影响结果）
    async fn close_modal(&self, executor: &JsExecutor) {
        if let Err(e) = executor.click(CLOSE_BUTTON).await {
            debug!("关闭模态框失败: {}", e);
        }
        executor.settle(300).await;
    }

    fn set_state(&mut self, next: NavState) {
        debug!("状态: {:?} → {:?}", self.state, next);
        self.state = next;
    }
}

/// 上限判定：已提取 `visited` 个条目后是否该停（命中时返回上限值）
fn reached_limit(limit: Option<usize>, visited: usize) -> Option<usize> {
    limit.filter(|&l| visited >= l)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 按主循环的结构模拟一次遍历：上限判定在每轮开头，
    /// 翻页能力在提取之后耗尽。返回产出的条目数。
    fn simulate_traversal(limit: Option<usize>, total: usize) -> usize {
        // 空结果集由"打开首题"一步拦截，循环不会进入
        if total == 0 {
            return 0;
        }
        let mut visited = 0usize;
        loop {
            if reached_limit(limit, visited).is_some() {
                return visited;
            }
            visited += 1;
            if visited >= total {
                return visited;
            }
        }
    }

    #[test]
    fn no_limit_never_stops_early() {
        assert_eq!(reached_limit(None, 0), None);
        assert_eq!(reached_limit(None, 10_000), None);
    }

    #[test]
    fn limit_hits_at_exact_count() {
        assert_eq!(reached_limit(Some(3), 2), None);
        assert_eq!(reached_limit(Some(3), 3), Some(3));
        assert_eq!(reached_limit(Some(3), 4), Some(3));
    }

    #[test]
    fn emits_min_of_limit_and_total() {
        assert_eq!(simulate_traversal(Some(3), 10), 3);
        assert_eq!(simulate_traversal(Some(10), 4), 4);
        assert_eq!(simulate_traversal(Some(5), 5), 5);
        assert_eq!(simulate_traversal(None, 7), 7);
        assert_eq!(simulate_traversal(Some(3), 0), 0);
    }
}
