/// 指标采集
/// 
/// 指标源适配器与并发聚合器

pub mod adapter;
pub mod aggregator;

pub use adapter::MetricSourceAdapter;
pub use aggregator::Aggregator;
