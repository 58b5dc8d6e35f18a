/// 指标源标识与启用集合

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// 指标源标识
///
/// 每个可轮询的指标或服务状态对应一个全局唯一、跨 tick 稳定的标识
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum MetricSourceId {
    Cpu,
    Memory,
    CoreLoads,
    Temperature,
    Gpu,
    Battery,
    Network,
    Mysql,
    Mongodb,
    Redis,
    Docker,
    Nginx,
    Apache,
    Elasticsearch,
    Rabbitmq,
    Kafka,
    Postgres,
    Oracle,
    Sqlserver,
}

/// 指标源类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// 标量或核心序列（CPU、内存、核心负载、温度）
    System,
    /// 结构化信息（GPU、电池、网络）
    Info,
    /// 具名服务进程
    Service,
}

impl MetricSourceId {
    /// 始终采集的指标源
    pub const ALWAYS_ON: [MetricSourceId; 3] = [Self::Cpu, Self::Memory, Self::CoreLoads];

    /// 全部指标源（按面板中的默认顺序）
    pub const ALL: [MetricSourceId; 19] = [
        Self::Cpu,
        Self::Memory,
        Self::CoreLoads,
        Self::Temperature,
        Self::Mysql,
        Self::Mongodb,
        Self::Redis,
        Self::Docker,
        Self::Nginx,
        Self::Apache,
        Self::Elasticsearch,
        Self::Rabbitmq,
        Self::Kafka,
        Self::Postgres,
        Self::Oracle,
        Self::Sqlserver,
        Self::Gpu,
        Self::Battery,
        Self::Network,
    ];

    /// 配置与序列化使用的键
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::CoreLoads => "coreLoads",
            Self::Temperature => "temperature",
            Self::Gpu => "gpu",
            Self::Battery => "battery",
            Self::Network => "network",
            Self::Mysql => "mysql",
            Self::Mongodb => "mongodb",
            Self::Redis => "redis",
            Self::Docker => "docker",
            Self::Nginx => "nginx",
            Self::Apache => "apache",
            Self::Elasticsearch => "elasticsearch",
            Self::Rabbitmq => "rabbitmq",
            Self::Kafka => "kafka",
            Self::Postgres => "postgres",
            Self::Oracle => "oracle",
            Self::Sqlserver => "sqlserver",
        }
    }

    /// 展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::CoreLoads => "Core Loads",
            Self::Temperature => "Temperature",
            Self::Gpu => "GPU",
            Self::Battery => "Battery",
            Self::Network => "Network",
            Self::Mysql => "MySQL",
            Self::Mongodb => "MongoDB",
            Self::Redis => "Redis",
            Self::Docker => "Docker",
            Self::Nginx => "Nginx",
            Self::Apache => "Apache",
            Self::Elasticsearch => "Elasticsearch",
            Self::Rabbitmq => "RabbitMQ",
            Self::Kafka => "Kafka",
            Self::Postgres => "Postgres",
            Self::Oracle => "OracleDB",
            Self::Sqlserver => "SqlServer",
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Cpu | Self::Memory | Self::CoreLoads | Self::Temperature => SourceKind::System,
            Self::Gpu | Self::Battery | Self::Network => SourceKind::Info,
            _ => SourceKind::Service,
        }
    }

    /// 服务类指标源对应的进程名，非服务源返回 None
    ///
    /// Apache 在大多数发行版中以 apache2 运行
    pub fn service_name(&self) -> Option<&'static str> {
        match self.kind() {
            SourceKind::Service => match self {
                Self::Apache => Some("apache2"),
                other => Some(other.as_str()),
            },
            _ => None,
        }
    }

    pub fn is_always_on(&self) -> bool {
        Self::ALWAYS_ON.contains(self)
    }
}

impl fmt::Display for MetricSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricSourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if key.eq_ignore_ascii_case("core_loads") {
            return Ok(Self::CoreLoads);
        }
        Self::ALL
            .iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(key))
            .copied()
            .ok_or_else(|| Error::ConfigInvalid(format!("未知的指标源: {}", s)))
    }
}

/// 启用的指标源集合
///
/// 由配置或 UI 选择提供，对采集核心只读。保持插入顺序，重复项被忽略
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnabledSourceSet {
    ids: Vec<MetricSourceId>,
    promoted: Vec<MetricSourceId>,
}

impl EnabledSourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个指标源，已存在时忽略
    pub fn insert(&mut self, id: MetricSourceId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// 将指标源提升为始终采集（目前只有温度支持）
    pub fn promote_always_on(&mut self, id: MetricSourceId) {
        if id == MetricSourceId::Temperature && !self.promoted.contains(&id) {
            self.insert(id);
            self.promoted.push(id);
        }
    }

    pub fn contains(&self, id: MetricSourceId) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = MetricSourceId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 本次运行中视为始终采集的指标源（内置 + 配置提升）
    pub fn always_on(&self) -> Vec<MetricSourceId> {
        let mut ids = MetricSourceId::ALWAYS_ON.to_vec();
        ids.extend(self.promoted.iter().copied());
        ids
    }

    /// 实际采集顺序：始终采集的源在前，其余按插入顺序
    pub fn collection_order(&self) -> Vec<MetricSourceId> {
        let mut order = MetricSourceId::ALWAYS_ON.to_vec();
        for id in &self.ids {
            if !order.contains(id) {
                order.push(*id);
            }
        }
        order
    }
}

impl FromIterator<MetricSourceId> for EnabledSourceSet {
    fn from_iter<T: IntoIterator<Item = MetricSourceId>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_id() {
        assert_eq!("mysql".parse::<MetricSourceId>().unwrap(), MetricSourceId::Mysql);
        assert_eq!("coreLoads".parse::<MetricSourceId>().unwrap(), MetricSourceId::CoreLoads);
        assert_eq!("core_loads".parse::<MetricSourceId>().unwrap(), MetricSourceId::CoreLoads);
        assert_eq!(" Redis ".parse::<MetricSourceId>().unwrap(), MetricSourceId::Redis);
        assert!("mssql".parse::<MetricSourceId>().is_err());
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = MetricSourceId::ALL.iter().map(|id| id.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), MetricSourceId::ALL.len());
    }

    #[test]
    fn test_service_name() {
        assert_eq!(MetricSourceId::Apache.service_name(), Some("apache2"));
        assert_eq!(MetricSourceId::Postgres.service_name(), Some("postgres"));
        assert_eq!(MetricSourceId::Gpu.service_name(), None);
        assert_eq!(MetricSourceId::Cpu.service_name(), None);
    }

    #[test]
    fn test_collection_order_puts_always_on_first() {
        let set: EnabledSourceSet = [
            MetricSourceId::Redis,
            MetricSourceId::Memory,
            MetricSourceId::Mysql,
            MetricSourceId::Redis,
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.collection_order(),
            vec![
                MetricSourceId::Cpu,
                MetricSourceId::Memory,
                MetricSourceId::CoreLoads,
                MetricSourceId::Redis,
                MetricSourceId::Mysql,
            ]
        );
    }

    #[test]
    fn test_only_temperature_can_be_promoted() {
        let mut set = EnabledSourceSet::new();
        set.promote_always_on(MetricSourceId::Mysql);
        set.promote_always_on(MetricSourceId::Temperature);

        assert!(!set.contains(MetricSourceId::Mysql));
        assert!(set.contains(MetricSourceId::Temperature));
        assert!(set.always_on().contains(&MetricSourceId::Temperature));
        assert!(!set.always_on().contains(&MetricSourceId::Mysql));
    }
}
