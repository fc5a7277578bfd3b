use crate::error::ConfigError;
use tracing::warn;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 考试类型（SAT / PSAT / PSAT89）
    pub assessment: String,
    /// 科目（RW / MATH）
    pub section: String,
    /// 题库搜索页 URL
    pub target_url: String,
    /// 输出根目录
    pub output_dir: String,
    /// 是否无头模式运行浏览器
    pub headless: bool,
    /// 最多抓取的题目数量（0 表示不限制）
    pub max_records: usize,
    /// 跳过前 N 道题（用于断点续抓）
    pub skip_count: usize,
    /// 等待元素出现的超时时间（毫秒）
    pub element_timeout_ms: u64,
    /// 就绪轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 模态框出现后的静默等待（毫秒）
    pub modal_settle_ms: u64,
    /// 翻页后的静默等待（毫秒）
    pub advance_settle_ms: u64,
    /// 提交筛选后的静默等待（毫秒）
    pub filter_settle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assessment: "SAT".to_string(),
            section: "MATH".to_string(),
            target_url: "https://satsuiteeducatorquestionbank.collegeboard.org/digital/search"
                .to_string(),
            output_dir: "output".to_string(),
            headless: false,
            max_records: 0,
            skip_count: 0,
            element_timeout_ms: 20_000,
            poll_interval_ms: 200,
            modal_settle_ms: 500,
            advance_settle_ms: 800,
            filter_settle_ms: 600,
        }
    }
}

/// 读取并解析环境变量，解析失败时警告并退回默认值
fn env_parse<T: std::str::FromStr>(name: &str, expected_type: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                let err = ConfigError::EnvVarParseFailed {
                    var_name: name.to_string(),
                    value: raw,
                    expected_type: expected_type.to_string(),
                };
                warn!("⚠️ {}，使用默认值", err);
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            assessment: std::env::var("ASSESSMENT").unwrap_or(default.assessment),
            section: std::env::var("SECTION").unwrap_or(default.section),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            headless: env_parse("HEADLESS", "bool", default.headless),
            max_records: env_parse("MAX_RECORDS", "usize", default.max_records),
            skip_count: env_parse("SKIP_COUNT", "usize", default.skip_count),
            element_timeout_ms: env_parse("ELEMENT_TIMEOUT_MS", "u64", default.element_timeout_ms),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", "u64", default.poll_interval_ms),
            modal_settle_ms: env_parse("MODAL_SETTLE_MS", "u64", default.modal_settle_ms),
            advance_settle_ms: env_parse("ADVANCE_SETTLE_MS", "u64", default.advance_settle_ms),
            filter_settle_ms: env_parse("FILTER_SETTLE_MS", "u64", default.filter_settle_ms),
        }
    }

    /// 记录数量上限（0 转换为 None，表示全部抓取）
    pub fn record_limit(&self) -> Option<usize> {
        if self.max_records == 0 {
            None
        } else {
            Some(self.max_records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_means_unbounded() {
        let config = Config::default();
        assert_eq!(config.record_limit(), None);

        let config = Config {
            max_records: 5,
            ..Config::default()
        };
        assert_eq!(config.record_limit(), Some(5));
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("QBANK_TEST_BAD_NUMBER", "not-a-number");
        let value: u64 = env_parse("QBANK_TEST_BAD_NUMBER", "u64", 42);
        assert_eq!(value, 42);
        std::env::remove_var("QBANK_TEST_BAD_NUMBER");
    }
}
