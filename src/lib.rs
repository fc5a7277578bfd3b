//! # SAT Bank Scraper
//!
//! 一个用于抓取题库网站题目的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() / 等待 / 截图能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Record
//! - `TextFlattener` - DOM 文本扁平化能力（数学标记 → 文本等价）
//! - `FigureClassifier` - 图形识别、打标与截图能力
//! - `IdResolver` - 题目标识解析能力（策略链 + 合成兜底）
//! - `Storage` - 输出目录与批次文件读写能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整提取流程
//! - `RecordCtx` - 上下文封装（question_id + 访问序号）
//! - `RecordExtractor` - 字段提取编排（元数据 → 文本 → 图形）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用程序入口，管理资源生命周期
//! - `orchestrator/navigator` - 结果集遍历状态机
//!
//! 独立的重建阶段（`rebuild`）把批次文件中的占位符投影为
//! text / markdown / html 三种输出格式，不依赖浏览器。
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod rebuild;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::launch_browser_and_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{Assessment, Record, RecordEntry, Section};
pub use orchestrator::{App, NavOutcome, Navigator, TraversalReport};
pub use rebuild::OutputMode;
pub use workflow::{RecordCtx, RecordExtractor};
