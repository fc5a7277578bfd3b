use serde::{Deserialize, Serialize};

/// 单个图形引用
///
/// 占位符以字面量形式嵌入在文本字段中，重建阶段按占位符做精确替换。
/// `image_path` 为空表示截图失败，但文本等价内容始终保留。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureRef {
    /// 占位符（如 `{{FIG_1}}`，题内唯一）
    pub placeholder: String,
    /// 序号（整题范围内单一计数器，从 1 开始，无间隔）
    #[serde(default)]
    pub index: u32,
    /// 图形类别（figure / graph / svg / table）
    #[serde(rename = "type")]
    pub kind: String,
    /// 文本等价内容（无标签时为括号兜底标记）
    pub text_content: String,
    /// 截图相对路径（截图失败时缺失）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// 一道完整抓取的题目
///
/// 所有字段带 `serde(default)`：降级提取产生的不完整数据仍可反序列化。
/// 题目一旦写入批次文件即视为不可变，重建阶段只读不改。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub question_id: String,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub skill: String,
    /// 难度（0-3，由站点的难度指示条数量决定）
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub answer_choices: Vec<String>,
    /// 正确答案字母（无法解析时为空）
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub figures: Vec<FigureRef>,
    /// 派生标志：figures 非空
    #[serde(default)]
    pub has_figure: bool,
}

/// 哨兵错误条目
///
/// 单题失败时写入批次文件的占位形状，保证批次连续。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub question_id: String,
    pub error: String,
}

/// 批次中的一个条目：完整题目或哨兵错误
///
/// untagged：哨兵先匹配（依赖其必填的 `error` 字段），完整题目兜底。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordEntry {
    Error(ErrorEntry),
    Record(Box<Record>),
}

impl RecordEntry {
    pub fn question_id(&self) -> &str {
        match self {
            RecordEntry::Error(e) => &e.question_id,
            RecordEntry::Record(r) => &r.question_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RecordEntry::Error(_))
    }
}

/// 重建输出题目
///
/// 文本字段是原始字段按模式替换占位符后的投影，非文本字段原样透传。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuiltRecord {
    pub question_id: String,
    pub assessment: String,
    pub section: String,
    pub domain: String,
    pub skill: String,
    pub difficulty: u8,
    pub prompt: String,
    pub question: String,
    pub choices: Vec<String>,
    pub correct_answer: String,
    pub rationale: String,
    /// 图形总数
    pub figure_count: usize,
    /// 出现过的图形类别（去重并排序，保证重复重建字节一致）
    pub figure_types: Vec<String>,
}

/// 重建输出批次中的一个条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RebuiltEntry {
    Error(ErrorEntry),
    Record(Box<RebuiltRecord>),
}

impl RebuiltEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, RebuiltEntry::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_without_figures_field_deserializes() {
        let raw = json!({
            "question_id": "a1b2c3d4",
            "prompt_text": "See graph",
        });
        let record: Record = serde_json::from_value(raw).unwrap();
        assert!(record.figures.is_empty());
        assert!(!record.has_figure);
        assert_eq!(record.difficulty, 0);
    }

    #[test]
    fn entry_untagged_roundtrip() {
        let entries = vec![
            RecordEntry::Record(Box::new(Record {
                question_id: "a1b2c3d4".to_string(),
                ..Default::default()
            })),
            RecordEntry::Error(ErrorEntry {
                question_id: "deadbeef".to_string(),
                error: "modal unreadable".to_string(),
            }),
        ];
        let text = serde_json::to_string(&entries).unwrap();
        let parsed: Vec<RecordEntry> = serde_json::from_str(&text).unwrap();
        assert!(!parsed[0].is_error());
        assert!(parsed[1].is_error());
        assert_eq!(parsed[1].question_id(), "deadbeef");
    }

    #[test]
    fn figure_kind_serializes_as_type() {
        let figure = FigureRef {
            placeholder: "{{FIG_1}}".to_string(),
            index: 1,
            kind: "graph".to_string(),
            text_content: "line graph rising".to_string(),
            image_path: Some("images/q1_1.png".to_string()),
        };
        let value = serde_json::to_value(&figure).unwrap();
        assert_eq!(value["type"], "graph");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn missing_image_path_is_omitted() {
        let figure = FigureRef {
            placeholder: "{{FIG_1}}".to_string(),
            index: 1,
            kind: "table".to_string(),
            text_content: "[table]".to_string(),
            image_path: None,
        };
        let value = serde_json::to_value(&figure).unwrap();
        assert!(value.get("image_path").is_none());
    }
}
