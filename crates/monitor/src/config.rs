/// 配置管理
///
/// 默认值 → 可选的 nanometrics.toml → NANOMETRICS_ 前缀的环境变量。
/// 无效配置不会致命，记录告警后回退到默认值

use common::models::constants::DEFAULT_TICK_INTERVAL_MS;
use common::models::{EnabledSourceSet, MetricSourceId};
use common::Error;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::warn;
use validator::Validate;

use crate::presentation::RenderFormat;

/// 配置文件默认名称（不含扩展名）
pub const DEFAULT_CONFIG_FILE: &str = "nanometrics";

/// 提供者类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Sysinfo,
    Mock,
}

/// 采集核心读取的配置契约
pub trait SettingsProvider: Send + Sync + 'static {
    /// 本次 tick 要采集的指标源
    fn enabled_sources(&self) -> EnabledSourceSet;

    /// tick 间隔
    fn tick_interval(&self) -> Duration;
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct MonitorConfig {
    #[validate(range(min = 1))]
    pub tick_interval_ms: i64,
    #[validate(range(min = 1))]
    pub source_timeout_ms: Option<i64>,
    pub show_graph: bool,
    pub enable_temperature: bool,
    pub temperature_always_on: bool,
    pub enable_gpu: bool,
    pub enable_battery: bool,
    pub enable_network: bool,
    pub enable_mysql: bool,
    pub enable_mongodb: bool,
    pub enable_redis: bool,
    pub enable_docker: bool,
    pub enable_nginx: bool,
    pub enable_apache: bool,
    pub enable_elasticsearch: bool,
    pub enable_rabbitmq: bool,
    pub enable_kafka: bool,
    pub enable_postgres: bool,
    pub enable_oracle: bool,
    pub enable_sqlserver: bool,
    /// 显式的有序启用列表，存在时覆盖 enable_* 开关
    pub sources: Option<Vec<String>>,
    pub render_format: String,
    pub provider: String,
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS as i64,
            source_timeout_ms: None,
            show_graph: false,
            enable_temperature: true,
            temperature_always_on: false,
            enable_gpu: false,
            enable_battery: false,
            enable_network: false,
            enable_mysql: false,
            enable_mongodb: false,
            enable_redis: false,
            enable_docker: false,
            enable_nginx: false,
            enable_apache: false,
            enable_elasticsearch: false,
            enable_rabbitmq: false,
            enable_kafka: false,
            enable_postgres: false,
            enable_oracle: false,
            enable_sqlserver: false,
            sources: None,
            render_format: "tree".to_string(),
            provider: "sysinfo".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    /// 从配置文件与环境变量加载配置
    ///
    /// 返回未校验的配置，调用方在日志初始化后调用 normalized
    pub fn load_raw() -> anyhow::Result<Self> {
        let path = std::env::var("NANOMETRICS_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("NANOMETRICS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sources"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// 校验并把无效项回退到默认值
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        if let Err(errors) = self.validate() {
            let fields = errors.field_errors();
            if fields.contains_key("tick_interval_ms") {
                report(Error::ConfigInvalid(format!(
                    "tick_interval_ms={} 必须为正数，使用默认值 {}",
                    self.tick_interval_ms, defaults.tick_interval_ms
                )));
                self.tick_interval_ms = defaults.tick_interval_ms;
            }
            if fields.contains_key("source_timeout_ms") {
                report(Error::ConfigInvalid(format!(
                    "source_timeout_ms={:?} 必须为正数，使用 tick 间隔",
                    self.source_timeout_ms
                )));
                self.source_timeout_ms = None;
            }
        }

        if let Err(e) = self.render_format.parse::<RenderFormat>() {
            report(e);
            self.render_format = defaults.render_format.clone();
        }

        if self.provider_kind().is_none() {
            report(Error::ConfigInvalid(format!("未知的提供者: {}", self.provider)));
            self.provider = defaults.provider;
        }

        if let Some(sources) = self.sources.take() {
            let valid: Vec<String> = sources
                .into_iter()
                .filter(|key| match key.parse::<MetricSourceId>() {
                    Ok(_) => true,
                    Err(e) => {
                        report(e);
                        false
                    }
                })
                .collect();
            self.sources = Some(valid);
        }

        self
    }

    /// 单源超时，未配置时等于一个 tick 周期
    pub fn source_timeout(&self) -> Duration {
        self.source_timeout_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or_else(|| SettingsProvider::tick_interval(self))
    }

    pub fn render_format(&self) -> RenderFormat {
        self.render_format.parse().unwrap_or_default()
    }

    pub fn provider_kind(&self) -> Option<ProviderKind> {
        match self.provider.trim().to_ascii_lowercase().as_str() {
            "sysinfo" => Some(ProviderKind::Sysinfo),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }

    /// 单个可选指标源的开关
    pub fn is_enabled(&self, id: MetricSourceId) -> bool {
        match id {
            MetricSourceId::Cpu | MetricSourceId::Memory | MetricSourceId::CoreLoads => true,
            MetricSourceId::Temperature => self.enable_temperature || self.temperature_always_on,
            MetricSourceId::Gpu => self.enable_gpu,
            MetricSourceId::Battery => self.enable_battery,
            MetricSourceId::Network => self.enable_network,
            MetricSourceId::Mysql => self.enable_mysql,
            MetricSourceId::Mongodb => self.enable_mongodb,
            MetricSourceId::Redis => self.enable_redis,
            MetricSourceId::Docker => self.enable_docker,
            MetricSourceId::Nginx => self.enable_nginx,
            MetricSourceId::Apache => self.enable_apache,
            MetricSourceId::Elasticsearch => self.enable_elasticsearch,
            MetricSourceId::Rabbitmq => self.enable_rabbitmq,
            MetricSourceId::Kafka => self.enable_kafka,
            MetricSourceId::Postgres => self.enable_postgres,
            MetricSourceId::Oracle => self.enable_oracle,
            MetricSourceId::Sqlserver => self.enable_sqlserver,
        }
    }

    /// 切换单个可选指标源（对应 UI 中的复选框）
    pub fn set_enabled(&mut self, id: MetricSourceId, enabled: bool) {
        if let Some(sources) = self.sources.as_mut() {
            let key = id.as_str();
            sources.retain(|existing| {
                existing
                    .parse::<MetricSourceId>()
                    .map(|parsed| parsed != id)
                    .unwrap_or(false)
            });
            if enabled {
                sources.push(key.to_string());
            }
        }

        let flag = match id {
            MetricSourceId::Cpu | MetricSourceId::Memory | MetricSourceId::CoreLoads => return,
            MetricSourceId::Temperature => &mut self.enable_temperature,
            MetricSourceId::Gpu => &mut self.enable_gpu,
            MetricSourceId::Battery => &mut self.enable_battery,
            MetricSourceId::Network => &mut self.enable_network,
            MetricSourceId::Mysql => &mut self.enable_mysql,
            MetricSourceId::Mongodb => &mut self.enable_mongodb,
            MetricSourceId::Redis => &mut self.enable_redis,
            MetricSourceId::Docker => &mut self.enable_docker,
            MetricSourceId::Nginx => &mut self.enable_nginx,
            MetricSourceId::Apache => &mut self.enable_apache,
            MetricSourceId::Elasticsearch => &mut self.enable_elasticsearch,
            MetricSourceId::Rabbitmq => &mut self.enable_rabbitmq,
            MetricSourceId::Kafka => &mut self.enable_kafka,
            MetricSourceId::Postgres => &mut self.enable_postgres,
            MetricSourceId::Oracle => &mut self.enable_oracle,
            MetricSourceId::Sqlserver => &mut self.enable_sqlserver,
        };
        *flag = enabled;
    }
}

impl SettingsProvider for MonitorConfig {
    fn enabled_sources(&self) -> EnabledSourceSet {
        let mut set: EnabledSourceSet = match &self.sources {
            Some(keys) => keys
                .iter()
                .filter_map(|key| key.parse::<MetricSourceId>().ok())
                .collect(),
            None => MetricSourceId::ALL
                .iter()
                .copied()
                .filter(|id| !id.is_always_on() && self.is_enabled(*id))
                .collect(),
        };
        if self.temperature_always_on {
            set.promote_always_on(MetricSourceId::Temperature);
        }
        set
    }

    fn tick_interval(&self) -> Duration {
        if self.tick_interval_ms > 0 {
            Duration::from_millis(self.tick_interval_ms as u64)
        } else {
            Duration::from_millis(DEFAULT_TICK_INTERVAL_MS)
        }
    }
}

/// 可在运行中修改的配置
///
/// 宿主在 UI 选择变化时更新，调度器在每次 tick 读取最新的启用集合
#[derive(Debug, Clone)]
pub struct LiveSettings {
    inner: Arc<RwLock<MonitorConfig>>,
}

impl LiveSettings {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// 当前配置的副本
    pub fn snapshot(&self) -> MonitorConfig {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 修改配置，修改结果会经过校验
    pub fn update(&self, f: impl FnOnce(&mut MonitorConfig)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = guard.clone();
        f(&mut next);
        *guard = next.normalized();
    }
}

impl SettingsProvider for LiveSettings {
    fn enabled_sources(&self) -> EnabledSourceSet {
        self.snapshot().enabled_sources()
    }

    fn tick_interval(&self) -> Duration {
        SettingsProvider::tick_interval(&self.snapshot())
    }
}

fn report(error: Error) {
    warn!("{}，已回退到默认值", error);
}
