/// 指标提供者
///
/// 对外部系统指标库的抽象，所有调用均为异步且可能失败

pub mod mock;
pub mod system;

use async_trait::async_trait;
use common::models::{
    BatteryStatus, GpuController, NetworkInterface, ServiceInstance, TemperatureReading,
};
use common::Result;
use std::sync::Arc;

use crate::config::ProviderKind;

pub use self::mock::MockProvider;
pub use self::system::SysinfoProvider;

/// 指标提供者 Trait
#[async_trait]
pub trait MetricsProvider: Send + Sync + 'static {
    /// 当前 CPU 总负载（百分比）
    async fn current_cpu_load(&self) -> Result<f64>;

    /// 内存使用率（百分比）
    async fn memory_usage_percent(&self) -> Result<f64>;

    /// 每个核心的负载（百分比）
    async fn per_core_load(&self) -> Result<Vec<f64>>;

    /// CPU 温度
    async fn cpu_temperature(&self) -> Result<TemperatureReading>;

    /// 指定名称服务的进程实例
    async fn service_instances(&self, name: &str) -> Result<Vec<ServiceInstance>>;

    /// GPU 控制器信息
    async fn gpu_info(&self) -> Result<Vec<GpuController>>;

    /// 电池信息
    async fn battery_info(&self) -> Result<BatteryStatus>;

    /// 网络接口信息
    async fn network_interfaces(&self) -> Result<Vec<NetworkInterface>>;

    /// 提供者类型
    fn provider_type(&self) -> &str;
}

/// 按配置创建指标提供者
pub fn create(kind: ProviderKind) -> Arc<dyn MetricsProvider> {
    match kind {
        ProviderKind::Sysinfo => Arc::new(SysinfoProvider::new()),
        ProviderKind::Mock => Arc::new(MockProvider::demo()),
    }
}
