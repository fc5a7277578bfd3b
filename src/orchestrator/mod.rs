//! 编排层
//!
//! 负责把各层组件装配成完整的抓取流程：
//! - `App`：资源生命周期与最终统计
//! - `Navigator`：结果集遍历状态机

pub mod app;
pub mod navigator;

pub use app::App;
pub use navigator::{NavOutcome, NavState, Navigator, TraversalReport};
