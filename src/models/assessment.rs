//! 考试类型与科目的静态代码映射
//!
//! 站点筛选下拉框使用数字代码（如 SAT = "99"），此处用不可变的
//! 静态映射表做别名解析；未知代码在启动阶段直接报配置错误，
//! 不做静默兜底。

use crate::error::{AppError, AppResult, ConfigError};
use phf::phf_map;

/// 考试类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Assessment {
    Sat,
    /// PSAT/NMSQT & PSAT 10
    Psat10,
    /// PSAT 8/9
    Psat89,
}

/// 输入别名 → 考试类型
static ASSESSMENT_ALIASES: phf::Map<&'static str, Assessment> = phf_map! {
    "SAT" => Assessment::Sat,
    "PSAT" => Assessment::Psat10,
    "PSAT10" => Assessment::Psat10,
    "PSAT/NMSQT" => Assessment::Psat10,
    "PSAT89" => Assessment::Psat89,
    "PSAT8/9" => Assessment::Psat89,
    "PSAT9" => Assessment::Psat89,
};

impl Assessment {
    /// 从输入字符串解析（大小写不敏感），未知值报配置错误
    pub fn parse(s: &str) -> AppResult<Self> {
        ASSESSMENT_ALIASES
            .get(s.trim().to_uppercase().as_str())
            .copied()
            .ok_or_else(|| {
                AppError::Config(ConfigError::UnknownAssessment {
                    value: s.to_string(),
                })
            })
    }

    /// 站点下拉框的选项值
    pub fn option_value(self) -> &'static str {
        match self {
            Assessment::Sat => "99",
            Assessment::Psat10 => "100",
            Assessment::Psat89 => "102",
        }
    }

    /// 标准名称（与站点展示一致）
    pub fn name(self) -> &'static str {
        match self {
            Assessment::Sat => "SAT",
            Assessment::Psat10 => "PSAT/NMSQT & PSAT 10",
            Assessment::Psat89 => "PSAT 8/9",
        }
    }

    /// 用于输出目录的名称（去掉路径非法字符）
    pub fn dir_label(self) -> String {
        self.name()
            .replace('/', "_")
            .replace(' ', "_")
            .replace('&', "and")
    }
}

impl std::fmt::Display for Assessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 科目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Section {
    /// Reading and Writing
    ReadingWriting,
    Math,
}

/// 输入别名 → 科目
static SECTION_ALIASES: phf::Map<&'static str, Section> = phf_map! {
    "RW" => Section::ReadingWriting,
    "R" => Section::ReadingWriting,
    "READING" => Section::ReadingWriting,
    "READINGWRITING" => Section::ReadingWriting,
    "MATH" => Section::Math,
    "M" => Section::Math,
    "MATHEMATICS" => Section::Math,
};

impl Section {
    /// 从输入字符串解析（大小写不敏感），未知值报配置错误
    pub fn parse(s: &str) -> AppResult<Self> {
        SECTION_ALIASES
            .get(s.trim().to_uppercase().as_str())
            .copied()
            .ok_or_else(|| {
                AppError::Config(ConfigError::UnknownSection {
                    value: s.to_string(),
                })
            })
    }

    /// 站点下拉框的选项值
    pub fn option_value(self) -> &'static str {
        match self {
            Section::ReadingWriting => "1",
            Section::Math => "2",
        }
    }

    /// 用于输出目录的名称
    pub fn dir_label(self) -> &'static str {
        match self {
            Section::ReadingWriting => "RW",
            Section::Math => "MATH",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_assessment_aliases() {
        assert_eq!(Assessment::parse("SAT").unwrap(), Assessment::Sat);
        assert_eq!(Assessment::parse("sat").unwrap(), Assessment::Sat);
        assert_eq!(Assessment::parse("psat").unwrap(), Assessment::Psat10);
        assert_eq!(Assessment::parse("PSAT89").unwrap(), Assessment::Psat89);
    }

    #[test]
    fn unknown_assessment_is_config_error() {
        let err = Assessment::parse("ACT").unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::UnknownAssessment { .. })
        ));
    }

    #[test]
    fn option_values_match_site_codes() {
        assert_eq!(Assessment::Sat.option_value(), "99");
        assert_eq!(Assessment::Psat10.option_value(), "100");
        assert_eq!(Assessment::Psat89.option_value(), "102");
        assert_eq!(Section::ReadingWriting.option_value(), "1");
        assert_eq!(Section::Math.option_value(), "2");
    }

    #[test]
    fn dir_label_has_no_path_chars() {
        let label = Assessment::Psat10.dir_label();
        assert!(!label.contains('/'));
        assert!(!label.contains(' '));
        assert_eq!(label, "PSAT_NMSQT_and_PSAT_10");
    }

    #[test]
    fn parse_section_aliases() {
        assert_eq!(Section::parse("rw").unwrap(), Section::ReadingWriting);
        assert_eq!(Section::parse("Math").unwrap(), Section::Math);
        assert!(Section::parse("SCIENCE").is_err());
    }
}
