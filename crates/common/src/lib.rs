/// NanoMetrics - 公共库
/// 
/// 提供指标采集核心与宿主共享的类型、错误处理、工具函数等

pub mod errors;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::{
    DisplayRow, EnabledSourceSet, MetricSnapshot, MetricSourceId, MetricValue, ServiceInstance,
    Severity, UnavailableReason,
};
