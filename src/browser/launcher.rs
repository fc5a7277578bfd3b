use crate::error::{AppError, SessionError};
use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动浏览器并导航到题库搜索页
///
/// 视口固定为 1280x900，保证截图尺寸可复现。
pub async fn launch_browser_and_page(url: &str, headless: bool) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器 (headless: {})...", headless);
    debug!("目标 URL: {}", url);

    let mut builder = BrowserConfig::builder().window_size(1280, 900).args(vec![
        "--disable-gpu",
        "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
        "--disable-dev-shm-usage", // 防止共享内存不足
    ]);
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        AppError::Session(SessionError::LaunchFailed { source: e.into() })
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AppError::Session(SessionError::LaunchFailed {
            source: Box::new(e),
        })
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        AppError::Session(SessionError::PageCreationFailed {
            source: Box::new(e),
        })
    })?;
    page.goto(url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", url, e);
        AppError::Session(SessionError::NavigationFailed {
            url: url.to_string(),
            source: Box::new(e),
        })
    })?;
    info!("✅ 已导航到: {}", url);

    Ok((browser, page))
}
