/// 指标视图
///
/// 宿主通过生命周期钩子持有的显式实例：打开时组装采集链路并启动调度，
/// 销毁时停止调度。是否单例由宿主决定

use common::models::MetricSourceId;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::{LiveSettings, MonitorConfig, SettingsProvider};
use crate::metrics::{Aggregator, MetricSourceAdapter};
use crate::provider::MetricsProvider;
use crate::scheduler::{RenderSink, Scheduler, SchedulerState, SchedulerStats};

/// 指标视图
pub struct MetricsView {
    id: Uuid,
    settings: LiveSettings,
    scheduler: Scheduler,
}

impl MetricsView {
    /// 打开视图并开始轮询
    pub async fn open(
        config: MonitorConfig,
        provider: Arc<dyn MetricsProvider>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let id = Uuid::new_v4();
        let provider_type = provider.provider_type().to_string();
        let aggregator = Arc::new(Aggregator::new(
            MetricSourceAdapter::new(provider),
            config.source_timeout(),
        ));
        let settings = LiveSettings::new(config);

        info!(
            "📊 打开指标视图: id={}, provider={}, source_timeout={:?}",
            id,
            provider_type,
            aggregator.source_timeout()
        );
        let scheduler = Scheduler::new(aggregator, Arc::new(settings.clone()), sink);
        scheduler.start().await;

        Self {
            id,
            settings,
            scheduler,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 当前配置
    pub fn config(&self) -> MonitorConfig {
        self.settings.snapshot()
    }

    /// 启用或停用一个可选指标源，下一次 tick 生效
    pub fn set_source_enabled(&self, id: MetricSourceId, enabled: bool) {
        self.settings.update(|cfg| cfg.set_enabled(id, enabled));
        info!(
            "视图 {} 指标源 {} 已{}，当前启用 {} 个",
            self.id,
            id,
            if enabled { "启用" } else { "停用" },
            self.settings.enabled_sources().len()
        );
    }

    pub async fn state(&self) -> SchedulerState {
        self.scheduler.state().await
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// 销毁视图
    pub async fn dispose(self) {
        self.scheduler.stop().await;
        let stats = self.scheduler.stats();
        info!(
            "指标视图已销毁: id={}, ticks={}, rendered={}, skipped={}, discarded={}",
            self.id, stats.ticks, stats.rendered, stats.skipped_ticks, stats.discarded
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use common::models::{DisplayRow, ServiceInstance};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_toggle_source_between_ticks() {
        let provider = Arc::new(
            MockProvider::new()
                .with_service("redis", vec![ServiceInstance::running("redis-server", 60.0, 5.0)]),
        );
        let renders: Arc<std::sync::Mutex<Vec<Vec<DisplayRow>>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = renders.clone();
        let sink: Arc<dyn RenderSink> = Arc::new(move |rows: &[DisplayRow]| {
            captured.lock().unwrap().push(rows.to_vec());
        });
        let config = MonitorConfig {
            tick_interval_ms: 1000,
            enable_temperature: false,
            ..Default::default()
        };

        let view = MetricsView::open(config, provider, sink).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        view.set_source_enabled(MetricSourceId::Redis, true);
        assert!(view.config().enable_redis);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        view.dispose().await;

        let renders = renders.lock().unwrap();
        assert_eq!(renders.len(), 2);
        assert!(!renders[0].iter().any(|row| row.label.starts_with("Redis")));
        assert!(renders[1].iter().any(|row| row.label == "Redis #1"));
    }
}
