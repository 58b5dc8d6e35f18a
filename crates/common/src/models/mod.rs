/// 共享数据模型
/// 
/// 定义指标源、指标值、快照与展示行

pub mod display;
pub mod metric;
pub mod snapshot;
pub mod source;

pub use display::{DisplayRow, Severity};
pub use metric::{
    BatteryStatus, GpuController, InfoBlob, MetricValue, NetworkInterface, ServiceInstance,
    TemperatureReading, UnavailableReason,
};
pub use snapshot::MetricSnapshot;
pub use source::{EnabledSourceSet, MetricSourceId, SourceKind};

/// 常量定义
pub mod constants {
    /// 默认 tick 间隔（毫秒）
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3000;

    /// 告警阈值（百分比，含）
    pub const WARNING_THRESHOLD: f64 = 50.0;

    /// 严重阈值（百分比，含）
    pub const CRITICAL_THRESHOLD: f64 = 80.0;

    /// 不可用指标的展示文本
    pub const NOT_AVAILABLE: &str = "N/A";
}
