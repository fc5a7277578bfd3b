use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器会话错误（不可恢复，中止遍历）
    Session(SessionError),
    /// 单题提取错误（隔离为哨兵条目，不中止遍历）
    Extraction(ExtractionError),
    /// 存储错误
    Storage(StorageError),
    /// 重建错误
    Rebuild(RebuildError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "会话错误: {}", e),
            AppError::Extraction(e) => write!(f, "提取错误: {}", e),
            AppError::Storage(e) => write!(f, "存储错误: {}", e),
            AppError::Rebuild(e) => write!(f, "重建错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Session(e) => Some(e),
            AppError::Extraction(e) => Some(e),
            AppError::Storage(e) => Some(e),
            AppError::Rebuild(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器会话错误
#[derive(Debug)]
pub enum SessionError {
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 等待元素出现超时
    ElementTimeout { selector: String, timeout_ms: u64 },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
            SessionError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            SessionError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            SessionError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            SessionError::ElementTimeout {
                selector,
                timeout_ms,
            } => {
                write!(f, "等待元素 {} 超时 ({} ms)", selector, timeout_ms)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::LaunchFailed { source }
            | SessionError::PageCreationFailed { source }
            | SessionError::NavigationFailed { source, .. }
            | SessionError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            SessionError::ElementTimeout { .. } => None,
        }
    }
}

/// 单题提取错误
#[derive(Debug)]
pub enum ExtractionError {
    /// 模态框内容不可读（整题失败，上报 Navigator）
    ModalUnreadable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 预期区域缺失（字段级降级，非致命）
    RegionMissing { region: String },
    /// 图形截图失败（保留 FigureRef，路径为空）
    CaptureFailed {
        placeholder: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::ModalUnreadable { source } => {
                write!(f, "题目模态框内容不可读: {}", source)
            }
            ExtractionError::RegionMissing { region } => {
                write!(f, "预期区域缺失: {}", region)
            }
            ExtractionError::CaptureFailed {
                placeholder,
                source,
            } => {
                write!(f, "图形截图失败 ({}): {}", placeholder, source)
            }
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractionError::ModalUnreadable { source }
            | ExtractionError::CaptureFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            ExtractionError::RegionMissing { .. } => None,
        }
    }
}

/// 存储错误
#[derive(Debug)]
pub enum StorageError {
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            StorageError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            StorageError::JsonParseFailed { source } => {
                write!(f, "JSON解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::WriteFailed { source, .. }
            | StorageError::ReadFailed { source, .. }
            | StorageError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 重建错误
#[derive(Debug)]
pub enum RebuildError {
    /// 输入条目缺少预期结构
    MalformedEntry { question_id: String, detail: String },
}

impl fmt::Display for RebuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildError::MalformedEntry {
                question_id,
                detail,
            } => {
                write!(f, "条目结构不完整 ({}): {}", question_id, detail)
            }
        }
    }
}

impl std::error::Error for RebuildError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 未知的考试类型代码
    UnknownAssessment { value: String },
    /// 未知的科目代码
    UnknownSection { value: String },
    /// 未知的输出模式
    UnknownMode { value: String },
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownAssessment { value } => {
                write!(f, "未知的考试类型: {} (可选: SAT, PSAT, PSAT89)", value)
            }
            ConfigError::UnknownSection { value } => {
                write!(f, "未知的科目: {} (可选: RW, MATH)", value)
            }
            ConfigError::UnknownMode { value } => {
                write!(f, "未知的输出模式: {} (可选: text, markdown, html)", value)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Session(SessionError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(StorageError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建元素等待超时错误
    pub fn element_timeout(selector: impl Into<String>, timeout_ms: u64) -> Self {
        AppError::Session(SessionError::ElementTimeout {
            selector: selector.into(),
            timeout_ms,
        })
    }

    /// 创建区域缺失错误
    pub fn region_missing(region: impl Into<String>) -> Self {
        AppError::Extraction(ExtractionError::RegionMissing {
            region: region.into(),
        })
    }

    /// 创建文件写入错误
    pub fn storage_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建重建输入结构错误
    pub fn malformed_entry(question_id: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::Rebuild(RebuildError::MalformedEntry {
            question_id: question_id.into(),
            detail: detail.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
