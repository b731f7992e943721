mod audio;
mod config;
mod error;
mod net_link;
mod relay;
mod session;

use config::Config;
use session::Session;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置，校验失败直接退出
    let config = Config::new()?;
    log::info!(
        "{} {} starting, recorder endpoint {}",
        config.app_name,
        config.app_version,
        config.ws_url
    );

    // 先申请麦克风，失败则不建立连接，也不重试
    let stream = match audio::request_audio(&config.audio) {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("无法打开麦克风: {}", e);
            return Err(e.into());
        }
    };

    let mut session = Session::new(config)?;

    // 握手成功后才构建音频处理拓扑
    if let Err(e) = session.connect().await {
        log::error!("[{}] {}", session.id(), e);
        session.stop().await;
        return Err(e.into());
    }
    if let Err(e) = session.start(stream) {
        session.stop().await;
        return Err(e.into());
    }

    // 主循环：转发音频帧，直到 Ctrl+C 或采集结束
    session
        .run_until(async {
            if let Err(e) = signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            log::info!("Received Ctrl+C, shutting down...");
        })
        .await;

    session.stop().await;
    Ok(())
}
