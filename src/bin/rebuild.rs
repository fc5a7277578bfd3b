//! 重建入口：把已抓取的批次文件投影为目标输出格式
//!
//! 用法: rebuild <考试类型> <科目> <模式>
//!
//! 模式: text / markdown / html
//! 输出写到批次文件同目录下的 questions_<模式>.json，原始批次只读。

use anyhow::{bail, Result};
use sat_bank_scraper::models::{Assessment, Section};
use sat_bank_scraper::rebuild::{rebuild_all, OutputMode};
use sat_bank_scraper::services::Storage;
use sat_bank_scraper::utils::logging;
use sat_bank_scraper::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        bail!("用法: rebuild <考试类型> <科目> <模式>  (模式: text / markdown / html)");
    }

    let assessment = Assessment::parse(&args[1])?;
    let section = Section::parse(&args[2])?;
    let mode = OutputMode::parse(&args[3])?;

    let config = Config::from_env();
    let storage = Storage::new(&config.output_dir, assessment, section);

    info!("{}", "=".repeat(60));
    info!("🔧 重建批次: {} / {} → {}", assessment, section, mode.label());
    info!("{}", "=".repeat(60));

    let values = storage.load_batch().await?;
    let entries = rebuild_all(&values, mode);
    let path = storage.save_rebuilt(mode.label(), &entries).await?;

    let errors = entries.iter().filter(|e| e.is_error()).count();
    info!("\n{}", "=".repeat(60));
    info!("📊 重建完成");
    info!("   总条目: {}", entries.len());
    info!("   成功: {}", entries.len() - errors);
    info!("   哨兵/失败: {}", errors);
    info!("   输出文件: {}", path.display());
    info!("{}", "=".repeat(60));

    Ok(())
}
