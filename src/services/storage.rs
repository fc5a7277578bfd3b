//! 存储服务 - 业务能力层
//!
//! 负责本次运行的输出目录、截图文件与批次 JSON 的读写。
//! 目录名由考试类型和科目派生；批次文件单写者、一次性落盘。

use crate::error::AppError;
use crate::models::{Assessment, RebuiltEntry, RecordEntry, Section};
use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// 原始批次文件名
const BATCH_FILE: &str = "questions.json";

/// 存储服务
pub struct Storage {
    base_dir: PathBuf,
    images_dir: PathBuf,
}

impl Storage {
    /// 根据考试类型与科目定位输出目录（不创建）
    pub fn new(output_root: &str, assessment: Assessment, section: Section) -> Self {
        let base_dir = PathBuf::from(output_root).join(format!(
            "{}_{}",
            assessment.dir_label(),
            section.dir_label()
        ));
        let images_dir = base_dir.join("images");
        Self {
            base_dir,
            images_dir,
        }
    }

    /// 创建输出目录（含 images 子目录）
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.images_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.images_dir.display()))?;
        info!("📁 输出目录: {}", self.base_dir.display());
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 保存单张截图，返回写入批次文件的相对路径
    pub async fn save_image(
        &self,
        question_id: &str,
        index: u32,
        bytes: &[u8],
    ) -> Result<String> {
        let filename = format!("{}_{}.png", question_id, index);
        let path = self.images_dir.join(&filename);
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::storage_write_failed(path.display().to_string(), e))?;
        Ok(format!("images/{}", filename))
    }

    /// 落盘原始批次文件
    pub async fn save_batch(&self, entries: &[RecordEntry]) -> Result<PathBuf> {
        let path = self.base_dir.join(BATCH_FILE);
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(&path, text)
            .await
            .map_err(|e| AppError::storage_write_failed(path.display().to_string(), e))?;
        info!("💾 已保存 {} 个条目到 {}", entries.len(), path.display());
        Ok(path)
    }

    /// 读取原始批次文件（重建输入，保留原始 JSON 形状）
    pub async fn load_batch(&self) -> Result<Vec<JsonValue>> {
        let path = self.base_dir.join(BATCH_FILE);
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("无法读取批次文件: {}", path.display()))?;
        let entries: Vec<JsonValue> = serde_json::from_str(&text)?;
        Ok(entries)
    }

    /// 落盘重建输出批次
    pub async fn save_rebuilt(&self, mode_label: &str, entries: &[RebuiltEntry]) -> Result<PathBuf> {
        let path = self.base_dir.join(format!("questions_{}.json", mode_label));
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(&path, text)
            .await
            .map_err(|e| AppError::storage_write_failed(path.display().to_string(), e))?;
        info!("💾 已保存 {} 个条目到 {}", entries.len(), path.display());
        Ok(path)
    }
}
