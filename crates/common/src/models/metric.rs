/// 指标值定义
///
/// 外部指标库返回的数据在边界处一次性校验，转换为显式的标签联合类型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 单个服务进程实例
///
/// 每次轮询重新创建，不跨 tick 保留
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub name: String,
    pub pid: Option<u32>,
    pub running: bool,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

impl ServiceInstance {
    pub fn running(name: impl Into<String>, cpu_percent: f64, mem_percent: f64) -> Self {
        Self {
            name: name.into(),
            pid: None,
            running: true,
            cpu_percent,
            mem_percent,
        }
    }

    pub fn stopped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pid: None,
            running: false,
            cpu_percent: 0.0,
            mem_percent: 0.0,
        }
    }
}

/// CPU 温度读数，各字段可能缺失
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TemperatureReading {
    pub chipset: Option<f64>,
    pub main: Option<f64>,
}

/// GPU 控制器信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GpuController {
    pub vendor: String,
    pub model: String,
    pub utilization_percent: Option<f64>,
}

/// 电池状态
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatus {
    pub has_battery: bool,
    pub percent: Option<f64>,
    pub is_charging: bool,
}

/// 网络接口信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub mac_address: Option<String>,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

/// 结构化信息（GPU / 电池 / 网络）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum InfoBlob {
    Gpu(Vec<GpuController>),
    Battery(BatteryStatus),
    Network(Vec<NetworkInterface>),
}

/// 不可用原因
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", content = "message", rename_all = "lowercase")]
pub enum UnavailableReason {
    /// 超过单源超时
    Timeout,
    /// 指标提供者报错
    Failed(String),
    /// 提供者返回了空数据或无效数据
    NoData,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Failed(message) => write!(f, "failed: {}", message),
            Self::NoData => write!(f, "no data"),
        }
    }
}

/// 指标值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum MetricValue {
    /// 百分比标量，0-100
    Percent(f64),
    /// 每个核心的负载百分比，按核心顺序
    CoreLoads(Vec<f64>),
    Temperature(TemperatureReading),
    Services(Vec<ServiceInstance>),
    Info(InfoBlob),
    Unavailable(UnavailableReason),
}

impl MetricValue {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// 超时占位值
    pub fn timeout() -> Self {
        Self::Unavailable(UnavailableReason::Timeout)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Unavailable(UnavailableReason::Failed(message.into()))
    }
}
