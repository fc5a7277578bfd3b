//! 应用程序编排器 - 编排层
//!
//! 职责：
//! - 组装各层组件（浏览器 → 执行器 → 遍历状态机）
//! - 持有浏览器资源的生命周期
//! - 汇总并打印最终统计

use crate::browser::launch_browser_and_page;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{Assessment, RecordEntry, Section};
use crate::orchestrator::navigator::{NavOutcome, Navigator, TraversalReport};
use crate::services::Storage;
use anyhow::Result;
use chromiumoxide::Browser;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// 应用程序
pub struct App {
    config: Config,
    assessment: Assessment,
    section: Section,
    // Browser 必须存活到遍历结束，否则 page 随之失效
    _browser: Browser,
    executor: JsExecutor,
}

impl App {
    /// 初始化：校验配置、启动浏览器、构建执行器
    ///
    /// 别名无法识别时在这里就报错退出，不浪费一次浏览器启动后的会话。
    pub async fn initialize(config: Config) -> Result<Self> {
        let assessment = Assessment::parse(&config.assessment)?;
        let section = Section::parse(&config.section)?;

        info!("{}", "=".repeat(60));
        info!("🚀 题库抓取启动");
        info!("   考试类型: {}", assessment);
        info!("   科目: {}", section);
        info!(
            "   数量上限: {}",
            config
                .record_limit()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "不限".to_string())
        );
        if config.skip_count > 0 {
            info!("   跳过前 {} 道题", config.skip_count);
        }
        info!("{}", "=".repeat(60));

        let (browser, page) = launch_browser_and_page(&config.target_url, config.headless).await?;
        let executor = JsExecutor::new(page, config.poll_interval_ms);

        Ok(Self {
            config,
            assessment,
            section,
            _browser: browser,
            executor,
        })
    }

    /// 执行完整抓取流程
    ///
    /// 即使遍历以故障结束，已积累的条目也会落盘。
    pub async fn run(&self) -> Result<()> {
        let storage = Storage::new(&self.config.output_dir, self.assessment, self.section);
        storage.ensure_dirs().await?;

        let mut navigator = Navigator::new(&self.config, self.assessment, self.section)?;
        let report = navigator.run(&self.executor, &storage).await;

        storage.save_batch(&report.entries).await?;
        self.print_summary(&report);

        Ok(())
    }

    fn print_summary(&self, report: &TraversalReport) {
        let total = report.entries.len();
        let errors = report.entries.iter().filter(|e| e.is_error()).count();
        let with_figures = report
            .entries
            .iter()
            .filter(|e| matches!(e, RecordEntry::Record(r) if r.has_figure))
            .count();

        info!("\n{}", "=".repeat(60));
        info!("📊 抓取完成");
        info!(
            "   完成时间: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("   总条目: {}", total);
        info!("   成功: {}", total - errors);
        info!("   失败: {}", errors);
        info!("   含图形: {}", with_figures);
        for (kind, count) in figure_type_distribution(&report.entries) {
            info!("   图形[{}]: {}", kind, count);
        }
        match &report.outcome {
            NavOutcome::Exhausted => info!("   结束方式: 遍历完毕"),
            NavOutcome::LimitReached => info!("   结束方式: 达到数量上限"),
            NavOutcome::Faulted(msg) => {
                warn!("   结束方式: 会话故障（部分结果已保存）");
                warn!("   故障原因: {}", msg);
            }
        }
        info!("{}", "=".repeat(60));
    }
}

/// 按图形类别统计全批次的数量分布
fn figure_type_distribution(entries: &[RecordEntry]) -> BTreeMap<String, usize> {
    let mut dist = BTreeMap::new();
    for entry in entries {
        if let RecordEntry::Record(record) = entry {
            for figure in &record.figures {
                *dist.entry(figure.kind.clone()).or_insert(0) += 1;
            }
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FigureRef, Record};

    fn record_with_kinds(kinds: &[&str]) -> RecordEntry {
        let figures = kinds
            .iter()
            .enumerate()
            .map(|(i, k)| FigureRef {
                placeholder: format!("{{{{FIG_{}}}}}", i + 1),
                index: (i + 1) as u32,
                kind: k.to_string(),
                text_content: String::new(),
                image_path: None,
            })
            .collect::<Vec<_>>();
        let has_figure = !figures.is_empty();
        RecordEntry::Record(Box::new(Record {
            figures,
            has_figure,
            ..Default::default()
        }))
    }

    #[test]
    fn distribution_counts_across_records() {
        let entries = vec![
            record_with_kinds(&["graph", "table"]),
            record_with_kinds(&["graph"]),
            record_with_kinds(&[]),
        ];
        let dist = figure_type_distribution(&entries);
        assert_eq!(dist.get("graph"), Some(&2));
        assert_eq!(dist.get("table"), Some(&1));
        assert_eq!(dist.len(), 2);
    }

    #[test]
    fn distribution_ignores_error_entries() {
        let entries = vec![RecordEntry::Error(crate::models::ErrorEntry {
            question_id: "unknown_1".to_string(),
            error: "boom".to_string(),
        })];
        assert!(figure_type_distribution(&entries).is_empty());
    }
}
