/// NanoMetrics - 采集核心
/// 
/// 周期性轮询系统与服务指标，聚合为快照并映射为展示行，
/// 渲染本身交给宿主 UI

pub mod config;
pub mod metrics;
pub mod presentation;
pub mod provider;
pub mod scheduler;
pub mod view;

pub use config::{LiveSettings, MonitorConfig, SettingsProvider};
pub use metrics::{Aggregator, MetricSourceAdapter};
pub use provider::MetricsProvider;
pub use scheduler::{RenderSink, Scheduler, SchedulerState, SchedulerStats};
pub use view::MetricsView;
