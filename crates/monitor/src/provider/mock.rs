/// 模拟指标提供者
///
/// 返回预设的读数，可为任意指标源配置延迟或失败，用于测试与演示模式

use async_trait::async_trait;
use common::models::{
    BatteryStatus, GpuController, NetworkInterface, ServiceInstance, TemperatureReading,
};
use common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::MetricsProvider;

/// 模拟提供者中的调用键
///
/// 服务类调用使用服务进程名，其余使用固定键
pub mod keys {
    pub const CPU: &str = "cpu";
    pub const MEMORY: &str = "memory";
    pub const CORE_LOADS: &str = "coreLoads";
    pub const TEMPERATURE: &str = "temperature";
    pub const GPU: &str = "gpu";
    pub const BATTERY: &str = "battery";
    pub const NETWORK: &str = "network";
}

/// 模拟指标提供者
#[derive(Clone)]
pub struct MockProvider {
    cpu: f64,
    memory: f64,
    core_loads: Vec<f64>,
    temperature: TemperatureReading,
    services: HashMap<String, Vec<ServiceInstance>>,
    gpus: Vec<GpuController>,
    battery: BatteryStatus,
    interfaces: Vec<NetworkInterface>,
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            cpu: 0.0,
            memory: 0.0,
            core_loads: Vec::new(),
            temperature: TemperatureReading::default(),
            services: HashMap::new(),
            gpus: Vec::new(),
            battery: BatteryStatus::default(),
            interfaces: Vec::new(),
            delays: HashMap::new(),
            failures: HashSet::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 演示用的固定读数
    pub fn demo() -> Self {
        Self::new()
            .with_cpu(37.4)
            .with_memory(63.2)
            .with_core_loads(vec![22.0, 48.6, 81.3, 12.9])
            .with_temperature(Some(41.0), Some(55.5))
            .with_service(
                "mysql",
                vec![
                    ServiceInstance::running("mysqld", 55.0, 10.0),
                    ServiceInstance::stopped("mysqld"),
                ],
            )
            .with_service("redis", vec![ServiceInstance::running("redis-server", 3.2, 1.4)])
            .with_service("docker", vec![ServiceInstance::running("dockerd", 12.0, 84.0)])
            .with_gpus(vec![GpuController {
                vendor: "Intel".to_string(),
                model: "device 0x46a6".to_string(),
                utilization_percent: Some(17.0),
            }])
            .with_battery(BatteryStatus {
                has_battery: true,
                percent: Some(87.0),
                is_charging: true,
            })
            .with_interfaces(vec![NetworkInterface {
                name: "eth0".to_string(),
                mac_address: Some("52:54:00:12:34:56".to_string()),
                received_bytes: 1_258_291,
                transmitted_bytes: 307_200,
            }])
    }

    pub fn with_cpu(mut self, cpu: f64) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn with_memory(mut self, memory: f64) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_core_loads(mut self, core_loads: Vec<f64>) -> Self {
        self.core_loads = core_loads;
        self
    }

    pub fn with_temperature(mut self, chipset: Option<f64>, main: Option<f64>) -> Self {
        self.temperature = TemperatureReading { chipset, main };
        self
    }

    pub fn with_service(mut self, name: &str, instances: Vec<ServiceInstance>) -> Self {
        self.services.insert(name.to_string(), instances);
        self
    }

    pub fn with_gpus(mut self, gpus: Vec<GpuController>) -> Self {
        self.gpus = gpus;
        self
    }

    pub fn with_battery(mut self, battery: BatteryStatus) -> Self {
        self.battery = battery;
        self
    }

    pub fn with_interfaces(mut self, interfaces: Vec<NetworkInterface>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// 为某个调用键设置延迟
    pub fn with_delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    /// 让某个调用键返回错误
    pub fn with_failure(mut self, key: &str) -> Self {
        self.failures.insert(key.to_string());
        self
    }

    /// 累计调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failures.contains(key) {
            return Err(Error::Provider(format!("模拟失败: {}", key)));
        }
        Ok(())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsProvider for MockProvider {
    async fn current_cpu_load(&self) -> Result<f64> {
        self.enter(keys::CPU).await?;
        Ok(self.cpu)
    }

    async fn memory_usage_percent(&self) -> Result<f64> {
        self.enter(keys::MEMORY).await?;
        Ok(self.memory)
    }

    async fn per_core_load(&self) -> Result<Vec<f64>> {
        self.enter(keys::CORE_LOADS).await?;
        Ok(self.core_loads.clone())
    }

    async fn cpu_temperature(&self) -> Result<TemperatureReading> {
        self.enter(keys::TEMPERATURE).await?;
        Ok(self.temperature)
    }

    async fn service_instances(&self, name: &str) -> Result<Vec<ServiceInstance>> {
        self.enter(name).await?;
        Ok(self.services.get(name).cloned().unwrap_or_default())
    }

    async fn gpu_info(&self) -> Result<Vec<GpuController>> {
        self.enter(keys::GPU).await?;
        Ok(self.gpus.clone())
    }

    async fn battery_info(&self) -> Result<BatteryStatus> {
        self.enter(keys::BATTERY).await?;
        Ok(self.battery.clone())
    }

    async fn network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        self.enter(keys::NETWORK).await?;
        Ok(self.interfaces.clone())
    }

    fn provider_type(&self) -> &str {
        "mock"
    }
}
