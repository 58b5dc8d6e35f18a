/// 指标源适配器
///
/// 每个指标源对应一次提供者调用，统一返回 MetricValue。
/// 提供者的任何错误或缺失数据都转换为 Unavailable，不向上传播

use common::models::{
    InfoBlob, MetricSourceId, MetricValue, ServiceInstance, TemperatureReading, UnavailableReason,
};
use common::utils::sanitize_percent;
use common::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::provider::MetricsProvider;

/// 指标源适配器
#[derive(Clone)]
pub struct MetricSourceAdapter {
    provider: Arc<dyn MetricsProvider>,
}

impl MetricSourceAdapter {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_type(&self) -> &str {
        self.provider.provider_type()
    }

    /// 采集单个指标源
    pub async fn fetch(&self, id: MetricSourceId) -> MetricValue {
        let value = match self.fetch_raw(id).await {
            Ok(value) => value,
            Err(e) => {
                warn!("指标源 {} 采集失败: {}", id, e);
                MetricValue::Unavailable(UnavailableReason::Failed(e.to_string()))
            }
        };
        debug!("指标源 {} 采集完成: unavailable={}", id, value.is_unavailable());
        value
    }

    async fn fetch_raw(&self, id: MetricSourceId) -> Result<MetricValue> {
        let value = match id {
            MetricSourceId::Cpu => percent_value(self.provider.current_cpu_load().await?),
            MetricSourceId::Memory => percent_value(self.provider.memory_usage_percent().await?),
            MetricSourceId::CoreLoads => {
                let loads = self.provider.per_core_load().await?;
                if loads.is_empty() {
                    no_data()
                } else {
                    MetricValue::CoreLoads(
                        loads
                            .into_iter()
                            .map(|load| sanitize_percent(load).unwrap_or(0.0))
                            .collect(),
                    )
                }
            }
            MetricSourceId::Temperature => {
                let raw = self.provider.cpu_temperature().await?;
                let reading = TemperatureReading {
                    chipset: raw.chipset.filter(|c| c.is_finite()),
                    main: raw.main.filter(|c| c.is_finite()),
                };
                if reading.chipset.is_none() && reading.main.is_none() {
                    no_data()
                } else {
                    MetricValue::Temperature(reading)
                }
            }
            MetricSourceId::Gpu => MetricValue::Info(InfoBlob::Gpu(self.provider.gpu_info().await?)),
            MetricSourceId::Battery => {
                let mut battery = self.provider.battery_info().await?;
                battery.percent = battery.percent.and_then(sanitize_percent);
                MetricValue::Info(InfoBlob::Battery(battery))
            }
            MetricSourceId::Network => {
                MetricValue::Info(InfoBlob::Network(self.provider.network_interfaces().await?))
            }
            service => match service.service_name() {
                Some(name) => self.fetch_service(name).await?,
                None => no_data(),
            },
        };
        Ok(value)
    }

    /// 具名服务的通用采集路径
    async fn fetch_service(&self, name: &str) -> Result<MetricValue> {
        let instances = self
            .provider
            .service_instances(name)
            .await?
            .into_iter()
            .map(|instance| ServiceInstance {
                cpu_percent: sanitize_percent(instance.cpu_percent).unwrap_or(0.0),
                mem_percent: sanitize_percent(instance.mem_percent).unwrap_or(0.0),
                ..instance
            })
            .collect();
        Ok(MetricValue::Services(instances))
    }
}

fn percent_value(raw: f64) -> MetricValue {
    sanitize_percent(raw)
        .map(MetricValue::Percent)
        .unwrap_or_else(no_data)
}

fn no_data() -> MetricValue {
    MetricValue::Unavailable(UnavailableReason::NoData)
}
