/// 调度器
///
/// 以固定间隔驱动 采集 → 映射 → 渲染 循环。
/// 两个状态：Idle / Collecting。上一次采集未结束时到达的 tick 被跳过，
/// 该次采集结束后立即补一次采集；任何时刻最多只有一次采集在进行

use common::models::{DisplayRow, MetricSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SettingsProvider;
use crate::metrics::Aggregator;
use crate::presentation::to_rows;

/// 渲染回调，由外部 UI 层实现
pub trait RenderSink: Send + Sync + 'static {
    /// 每次完成的 tick 调用一次
    fn on_snapshot_ready(&self, rows: &[DisplayRow]);
}

impl<F> RenderSink for F
where
    F: Fn(&[DisplayRow]) + Send + Sync + 'static,
{
    fn on_snapshot_ready(&self, rows: &[DisplayRow]) {
        self(rows)
    }
}

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Collecting,
}

/// 调度计数
#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    skipped_ticks: AtomicU64,
    rendered: AtomicU64,
    discarded: AtomicU64,
}

/// 调度统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// 到达的 tick 数
    pub ticks: u64,
    /// 因上一次采集未结束而跳过的 tick 数
    pub skipped_ticks: u64,
    /// 已渲染的快照数
    pub rendered: u64,
    /// 因视图销毁或采集任务异常而丢弃的结果数
    pub discarded: u64,
}

/// 采集任务交回调度循环的结果
type Outcome = Option<MetricSnapshot>;

/// 调度器
pub struct Scheduler {
    aggregator: Arc<Aggregator>,
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn RenderSink>,
    state: Arc<RwLock<SchedulerState>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        aggregator: Arc<Aggregator>,
        settings: Arc<dyn SettingsProvider>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        Self {
            aggregator,
            settings,
            sink,
            state: Arc::new(RwLock::new(SchedulerState::Idle)),
            counters: Arc::new(Counters::default()),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// 启动调度循环
    ///
    /// 已在运行或已停止时不做任何事，停止是终态
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("调度器已在运行");
            return;
        }
        if self.cancel.is_cancelled() {
            warn!("调度器已停止，不能再次启动");
            return;
        }

        let interval = self.settings.tick_interval();
        info!("⏱️ 启动调度器: interval={:?}", interval);

        let run = RunLoop {
            aggregator: self.aggregator.clone(),
            settings: self.settings.clone(),
            sink: self.sink.clone(),
            state: self.state.clone(),
            counters: self.counters.clone(),
            cancel: self.cancel.clone(),
            interval,
        };
        *task = Some(tokio::spawn(run.run()));
    }

    /// 停止调度循环
    ///
    /// 之后不再产生 tick；正在进行的采集允许完成，但结果被丢弃
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("调度循环异常退出: {}", e);
            }
            info!("调度器已停止");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 获取当前状态
    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.counters.ticks.load(Ordering::SeqCst),
            skipped_ticks: self.counters.skipped_ticks.load(Ordering::SeqCst),
            rendered: self.counters.rendered.load(Ordering::SeqCst),
            discarded: self.counters.discarded.load(Ordering::SeqCst),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// 调度循环
///
/// 状态只在此任务中修改，渲染回调也只在此任务中调用
struct RunLoop {
    aggregator: Arc<Aggregator>,
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn RenderSink>,
    state: Arc<RwLock<SchedulerState>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    interval: Duration,
}

impl RunLoop {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // 单生产者交接：采集任务把快照交回调度循环
        let (tx, mut rx) = mpsc::channel::<Outcome>(1);
        // 本次采集期间是否有 tick 被跳过
        let mut backlog = false;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("调度循环收到停止信号");
                    break;
                }

                Some(outcome) = rx.recv() => {
                    self.finish(outcome).await;
                    if std::mem::take(&mut backlog) && !self.cancel.is_cancelled() {
                        debug!("采集期间有 tick 被跳过，立即开始下一次采集");
                        self.begin(&tx).await;
                    }
                }

                _ = ticker.tick() => {
                    if self.tick(&tx).await {
                        backlog = true;
                    }
                }
            }
        }

        // 已送达但未处理的结果同样计为丢弃
        rx.close();
        while let Ok(_outcome) = rx.try_recv() {
            self.counters.discarded.fetch_add(1, Ordering::SeqCst);
            debug!("视图已销毁，丢弃已送达的采集结果");
        }

        *self.state.write().await = SchedulerState::Idle;
    }

    /// 处理一次 tick，返回是否因采集进行中而跳过
    async fn tick(&self, tx: &mpsc::Sender<Outcome>) -> bool {
        let tick = self.counters.ticks.fetch_add(1, Ordering::SeqCst) + 1;

        if *self.state.read().await == SchedulerState::Collecting {
            self.counters.skipped_ticks.fetch_add(1, Ordering::SeqCst);
            debug!("tick {} 跳过: 上一次采集仍在进行", tick);
            return true;
        }

        self.begin(tx).await;
        false
    }

    /// 开始一次采集，结果经 tx 交回调度循环
    async fn begin(&self, tx: &mpsc::Sender<Outcome>) {
        *self.state.write().await = SchedulerState::Collecting;

        let enabled = self.settings.enabled_sources();
        let aggregator = self.aggregator.clone();
        let counters = self.counters.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let collected = tokio::spawn(async move { aggregator.collect(&enabled).await }).await;
            let outcome = match collected {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    error!("采集任务异常: {}", e);
                    None
                }
            };
            if tx.send(outcome).await.is_err() {
                counters.discarded.fetch_add(1, Ordering::SeqCst);
                debug!("视图已销毁，丢弃采集结果");
            }
        });
    }

    async fn finish(&self, outcome: Outcome) {
        *self.state.write().await = SchedulerState::Idle;

        let Some(snapshot) = outcome else {
            self.counters.discarded.fetch_add(1, Ordering::SeqCst);
            return;
        };

        if self.cancel.is_cancelled() {
            self.counters.discarded.fetch_add(1, Ordering::SeqCst);
            debug!("视图已销毁，丢弃第 {} 次采集结果", snapshot.sequence());
            return;
        }

        let rows = to_rows(&snapshot);
        debug!("渲染第 {} 次采集: {} 行", snapshot.sequence(), rows.len());
        self.sink.on_snapshot_ready(&rows);
        self.counters.rendered.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::metrics::MetricSourceAdapter;
    use crate::provider::mock::keys;
    use crate::provider::{MetricsProvider, MockProvider};
    use async_trait::async_trait;
    use common::models::{
        BatteryStatus, GpuController, MetricSourceId, NetworkInterface, ServiceInstance,
        Severity, TemperatureReading,
    };
    use std::sync::atomic::AtomicUsize;

    /// 记录并发采集次数的提供者
    struct GatedProvider {
        inner: MockProvider,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl GatedProvider {
        fn new(delay: Duration) -> Self {
            Self {
                inner: MockProvider::new().with_cpu(10.0),
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsProvider for GatedProvider {
        async fn current_cpu_load(&self) -> common::Result<f64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.current_cpu_load().await
        }

        async fn memory_usage_percent(&self) -> common::Result<f64> {
            self.inner.memory_usage_percent().await
        }

        async fn per_core_load(&self) -> common::Result<Vec<f64>> {
            self.inner.per_core_load().await
        }

        async fn cpu_temperature(&self) -> common::Result<TemperatureReading> {
            self.inner.cpu_temperature().await
        }

        async fn service_instances(&self, name: &str) -> common::Result<Vec<ServiceInstance>> {
            self.inner.service_instances(name).await
        }

        async fn gpu_info(&self) -> common::Result<Vec<GpuController>> {
            self.inner.gpu_info().await
        }

        async fn battery_info(&self) -> common::Result<BatteryStatus> {
            self.inner.battery_info().await
        }

        async fn network_interfaces(&self) -> common::Result<Vec<NetworkInterface>> {
            self.inner.network_interfaces().await
        }

        fn provider_type(&self) -> &str {
            "gated"
        }
    }

    type Renders = Arc<std::sync::Mutex<Vec<Vec<DisplayRow>>>>;

    fn recording_sink() -> (Arc<dyn RenderSink>, Renders) {
        let renders: Renders = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = renders.clone();
        let sink = move |rows: &[DisplayRow]| {
            captured.lock().unwrap().push(rows.to_vec());
        };
        (Arc::new(sink), renders)
    }

    fn scheduler(
        provider: Arc<dyn MetricsProvider>,
        config: MonitorConfig,
        source_timeout: Duration,
    ) -> (Scheduler, Arc<Aggregator>, Renders) {
        let aggregator = Arc::new(Aggregator::new(
            MetricSourceAdapter::new(provider),
            source_timeout,
        ));
        let (sink, renders) = recording_sink();
        let scheduler = Scheduler::new(aggregator.clone(), Arc::new(config), sink);
        (scheduler, aggregator, renders)
    }

    fn config_with_interval(ms: i64) -> MonitorConfig {
        MonitorConfig {
            tick_interval_ms: ms,
            enable_temperature: false,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_once_per_tick() {
        let provider = Arc::new(MockProvider::new().with_cpu(82.3));
        let (scheduler, aggregator, renders) =
            scheduler(provider, config_with_interval(1000), Duration::from_millis(500));

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(3500)).await;
        scheduler.stop().await;

        let renders = renders.lock().unwrap();
        assert_eq!(renders.len(), 4);
        assert_eq!(aggregator.runs(), 4);
        assert_eq!(renders[0][0], DisplayRow::new("CPU", "82%", Severity::Critical));
        assert_eq!(scheduler.stats().skipped_ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_two_collections_in_flight() {
        let provider = Arc::new(GatedProvider::new(Duration::from_millis(250)));
        let (scheduler, aggregator, renders) = scheduler(
            provider.clone(),
            config_with_interval(100),
            Duration::from_secs(10),
        );

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(1999)).await;
        scheduler.stop().await;

        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(aggregator.runs(), 2000 / 250);
        assert!(scheduler.stats().skipped_ticks > 0);
        assert_eq!(renders.lock().unwrap().len() as u64, aggregator.runs() - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_collections_run_back_to_back() {
        let cases = [(300, 100, 3000), (200, 100, 2000), (100, 100, 1000)];
        for (delay_ms, interval_ms, total_ms) in cases {
            let provider = Arc::new(GatedProvider::new(Duration::from_millis(delay_ms)));
            let (scheduler, aggregator, _renders) = scheduler(
                provider.clone(),
                config_with_interval(interval_ms as i64),
                Duration::from_secs(10),
            );

            scheduler.start().await;
            tokio::time::sleep(Duration::from_millis(total_ms - 1)).await;
            scheduler.stop().await;

            assert_eq!(
                aggregator.runs(),
                total_ms / delay_ms,
                "delay={}ms interval={}ms",
                delay_ms,
                interval_ms
            );
            assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_collection_rendered_or_discarded() {
        let provider = Arc::new(GatedProvider::new(Duration::from_millis(100)));
        let (scheduler, aggregator, renders) = scheduler(
            provider,
            config_with_interval(100),
            Duration::from_secs(10),
        );

        scheduler.start().await;
        // 停止时刻与一次采集完成重合
        tokio::time::sleep(Duration::from_millis(1000)).await;
        scheduler.stop().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let stats = scheduler.stats();
        assert_eq!(stats.rendered, renders.lock().unwrap().len() as u64);
        assert_eq!(stats.rendered + stats.discarded, aggregator.runs());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop_and_in_flight_result_discarded() {
        let provider = Arc::new(GatedProvider::new(Duration::from_millis(1000)));
        let (scheduler, aggregator, renders) = scheduler(
            provider,
            config_with_interval(100),
            Duration::from_secs(10),
        );

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(scheduler.state().await, SchedulerState::Collecting);

        scheduler.stop().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(aggregator.runs(), 1);
        assert!(renders.lock().unwrap().is_empty());
        assert_eq!(scheduler.stats().discarded, 1);
        assert_eq!(scheduler.state().await, SchedulerState::Idle);
        assert!(scheduler.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_stop_is_ignored() {
        let provider = Arc::new(MockProvider::new());
        let (scheduler, aggregator, _renders) =
            scheduler(provider, config_with_interval(100), Duration::from_millis(50));

        scheduler.start().await;
        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;
        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(aggregator.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_services_render_as_not_available() {
        let provider = Arc::new(
            MockProvider::new()
                .with_delay("mysql", Duration::from_secs(60))
                .with_delay("redis", Duration::from_secs(60)),
        );
        let config = MonitorConfig {
            enable_mysql: true,
            enable_redis: true,
            ..config_with_interval(1000)
        };
        let (scheduler, _aggregator, renders) =
            scheduler(provider, config, Duration::from_millis(500));

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(800)).await;
        scheduler.stop().await;

        let renders = renders.lock().unwrap();
        assert_eq!(renders.len(), 1);
        let rows = &renders[0];
        assert!(rows.contains(&DisplayRow::new("MySQL", "N/A", Severity::Normal)));
        assert!(rows.contains(&DisplayRow::new("Redis", "N/A", Severity::Normal)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_on_temperature_turns_stale() {
        let provider = Arc::new(MockProvider::new().with_failure(keys::TEMPERATURE));
        let config = MonitorConfig {
            temperature_always_on: true,
            ..config_with_interval(1000)
        };
        let (scheduler, _aggregator, renders) =
            scheduler(provider, config, Duration::from_millis(500));

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.stop().await;

        let renders = renders.lock().unwrap();
        assert_eq!(renders.len(), 2);
        let temperature = |rows: &Vec<DisplayRow>| {
            rows.iter()
                .find(|row| row.label == MetricSourceId::Temperature.display_name())
                .cloned()
                .unwrap()
        };
        assert_eq!(temperature(&renders[0]).severity, Severity::Normal);
        assert_eq!(temperature(&renders[1]).severity, Severity::Warning);
        assert_eq!(temperature(&renders[1]).value_text, "N/A");
    }
}
