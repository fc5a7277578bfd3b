//! 题目处理上下文
//!
//! 封装"我正在处理第几道题、它的标识是什么"这一信息

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 题目标识（策略链解析结果或合成标识）
    pub question_id: String,

    /// 访问序号（从 1 开始，仅用于日志显示）
    pub position: usize,
}

impl RecordCtx {
    pub fn new(question_id: String, position: usize) -> Self {
        Self {
            question_id,
            position,
        }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[题 {}] {}", self.position, self.question_id)
    }
}
