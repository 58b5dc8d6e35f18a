/// NanoMetrics - 独立宿主
///
/// 加载配置，打开指标视图，把每次渲染结果输出到标准输出，Ctrl-C 时销毁视图

use common::models::DisplayRow;
use monitor::config::{MonitorConfig, ProviderKind};
use monitor::presentation::render;
use monitor::{provider, MetricsView, RenderSink};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let raw = MonitorConfig::load_raw()?;

    // 可以通过环境变量 RUST_LOG 设置日志级别，例如：
    // RUST_LOG=monitor=debug nanometrics
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&raw.log_level))
        )
        .init();

    info!("🚀 启动 NanoMetrics...");

    // 日志初始化之后再校验，回退告警才能输出
    let cfg = raw.normalized();
    info!("✅ 配置加载成功: interval={}ms, format={}", cfg.tick_interval_ms, cfg.render_format());

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let kind = cfg.provider_kind().unwrap_or(ProviderKind::Sysinfo);
    info!("🔧 初始化指标提供者: {:?}", kind);
    let metrics_provider = provider::create(kind);

    let format = cfg.render_format();
    let show_graph = cfg.show_graph;
    let sink: Arc<dyn RenderSink> = Arc::new(move |rows: &[DisplayRow]| {
        match render::render(rows, format, show_graph) {
            Ok(output) => {
                println!("== {} @ {} ==", hostname, chrono::Local::now().format("%H:%M:%S"));
                println!("{}", output);
            }
            Err(e) => error!("渲染失败: {}", e),
        }
    });

    let view = MetricsView::open(cfg, metrics_provider, sink).await;
    info!("🎯 指标视图已打开: {}", view.id());

    tokio::signal::ctrl_c().await?;
    info!("收到退出信号，销毁视图...");
    view.dispose().await;

    Ok(())
}
