use std::sync::Arc;

use anyhow::{bail, Result};
use qpaper_builder::utils::logging;
use qpaper_builder::{
    BuilderSession, Config, ExamType, FileStore, PaperState, QuestionBankClient, SessionError,
};
use tracing::{error, info, warn};

/// 提交本机保存的试卷草稿
///
/// 用法：`qpaper-submit [be|mba]`，默认 be
#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load("qpaper.toml")?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config.faculty_email, &config.api_base_url);
    logging::init_log_file(&config.output_log_file)?;

    let exam_type = match std::env::args().nth(1).as_deref() {
        None | Some("be") => ExamType::BeMtech,
        Some("mba") => ExamType::Mba,
        Some(other) => bail!("未知的试卷类型: {}（可选 be / mba）", other),
    };

    let store = Arc::new(FileStore::new(&config.draft_dir));
    let api = Arc::new(QuestionBankClient::new(&config)?);
    let mut session = BuilderSession::mount(&config, exam_type, store, api).await?;

    if session.state() == PaperState::Empty {
        warn!("⚠️ 没有可提交的草稿");
        session.unmount().await;
        return Ok(());
    }

    print!("{}", session.preview().await);

    let log_file = config.output_log_file.clone();
    match session.submit().await {
        Ok(report) => {
            logging::append_log(&log_file, &format!("提交成功 {} 个单元", report.submitted))?;
            if let Some(e) = report.status_update_error {
                logging::append_log(&log_file, &format!("状态更新失败: {}", e))?;
            }
            if let Some(e) = report.draft_cleanup_error {
                logging::append_log(&log_file, &format!("草稿删除失败: {}", e))?;
            }
        }
        Err(SessionError::Invalid(violation)) => {
            for v in session.violations().await {
                warn!("  - {}", v);
            }
            logging::append_log(&log_file, &format!("校验未通过: {}", violation))?;
        }
        Err(e) => {
            error!("❌ {}", e);
            logging::append_log(&log_file, &format!("提交失败: {}", e))?;
        }
    }

    session.unmount().await;
    info!("🎉 程序执行完成");
    Ok(())
}
