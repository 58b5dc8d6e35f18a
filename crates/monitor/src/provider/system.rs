/// 基于 sysinfo 的指标提供者
///
/// CPU、内存、温度、进程与网络信息来自 sysinfo，
/// GPU 与电池信息在 Linux 上读取 sysfs

use async_trait::async_trait;
use common::models::{
    BatteryStatus, GpuController, NetworkInterface, ServiceInstance, TemperatureReading,
};
use common::utils::ratio_percent;
use common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{
    Components, Networks, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System,
    UpdateKind,
};
use tracing::debug;

use super::MetricsProvider;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";
const DRM_DIR: &str = "/sys/class/drm";

/// 共享的 sysinfo 状态
struct SystemState {
    system: System,
    last_cpu_refresh: Option<Instant>,
    last_process_refresh: Option<Instant>,
}

impl SystemState {
    /// 两次 CPU 刷新之间至少间隔 MINIMUM_CPU_UPDATE_INTERVAL，否则读数无意义
    fn refresh_cpu_if_stale(&mut self) {
        let stale = self
            .last_cpu_refresh
            .map(|at| at.elapsed() >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
            .unwrap_or(true);
        if stale {
            self.system.refresh_cpu_usage();
            self.last_cpu_refresh = Some(Instant::now());
        }
    }

    /// 同一窗口内的服务查询共用一次进程刷新，进程 CPU 以两次刷新间的差值计算
    fn refresh_processes_if_stale(&mut self) -> bool {
        let stale = self
            .last_process_refresh
            .map(|at| at.elapsed() >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
            .unwrap_or(true);
        if stale {
            self.system.refresh_memory();
            self.system.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::new()
                    .with_cpu()
                    .with_memory()
                    .with_cmd(UpdateKind::OnlyIfNotSet),
            );
            self.last_process_refresh = Some(Instant::now());
        }
        stale
    }
}

/// sysinfo 指标提供者
#[derive(Clone)]
pub struct SysinfoProvider {
    state: Arc<Mutex<SystemState>>,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        // 建立 CPU 基线，之后的刷新才有有效差值
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            state: Arc::new(Mutex::new(SystemState {
                system,
                last_cpu_refresh: Some(Instant::now()),
                last_process_refresh: None,
            })),
        }
    }

    /// 在阻塞线程池中访问 sysinfo 状态
    async fn with_state<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SystemState) -> Result<T> + Send + 'static,
    {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = state
                .lock()
                .map_err(|_| Error::Provider("sysinfo 状态锁已中毒".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Provider(format!("阻塞任务失败: {}", e)))?
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsProvider for SysinfoProvider {
    async fn current_cpu_load(&self) -> Result<f64> {
        self.with_state(|state| {
            state.refresh_cpu_if_stale();
            Ok(state.system.global_cpu_usage() as f64)
        })
        .await
    }

    async fn memory_usage_percent(&self) -> Result<f64> {
        self.with_state(|state| {
            state.system.refresh_memory();
            ratio_percent(state.system.used_memory(), state.system.total_memory())
                .ok_or_else(|| Error::Provider("总内存为 0".to_string()))
        })
        .await
    }

    async fn per_core_load(&self) -> Result<Vec<f64>> {
        self.with_state(|state| {
            state.refresh_cpu_if_stale();
            Ok(state
                .system
                .cpus()
                .iter()
                .map(|cpu| cpu.cpu_usage() as f64)
                .collect())
        })
        .await
    }

    async fn cpu_temperature(&self) -> Result<TemperatureReading> {
        tokio::task::spawn_blocking(|| {
            let components = Components::new_with_refreshed_list();
            let mut reading = TemperatureReading::default();

            for component in components.list() {
                let label = component.label().to_lowercase();
                let celsius = component.temperature() as f64;
                if !celsius.is_finite() || celsius <= 0.0 {
                    continue;
                }

                if reading.main.is_none()
                    && (label.contains("package") || label.contains("tctl") || label.contains("cpu"))
                {
                    reading.main = Some(celsius);
                } else if reading.chipset.is_none()
                    && (label.contains("pch") || label.contains("chipset") || label.contains("acpitz"))
                {
                    reading.chipset = Some(celsius);
                }
            }

            debug!("温度读数: main={:?}, chipset={:?}", reading.main, reading.chipset);
            Ok(reading)
        })
        .await
        .map_err(|e| Error::Provider(format!("阻塞任务失败: {}", e)))?
    }

    async fn service_instances(&self, name: &str) -> Result<Vec<ServiceInstance>> {
        let needle = name.to_lowercase();
        self.with_state(move |state| {
            if state.refresh_processes_if_stale() {
                debug!("进程列表已刷新: {} 个进程", state.system.processes().len());
            }

            let total_memory = state.system.total_memory();
            let cpu_count = state.system.cpus().len().max(1) as f64;

            let instances = state
                .system
                .processes()
                .values()
                .filter(|process| matches_service(process, &needle))
                .map(|process| ServiceInstance {
                    name: process.name().to_string_lossy().to_string(),
                    pid: Some(process.pid().as_u32()),
                    running: !matches!(
                        process.status(),
                        ProcessStatus::Zombie | ProcessStatus::Dead | ProcessStatus::Stop
                    ),
                    // sysinfo 的进程 CPU 以单核为 100%，换算为整机占比
                    cpu_percent: process.cpu_usage() as f64 / cpu_count,
                    mem_percent: ratio_percent(process.memory(), total_memory).unwrap_or(0.0),
                })
                .collect();

            Ok(instances)
        })
        .await
    }

    async fn gpu_info(&self) -> Result<Vec<GpuController>> {
        if !cfg!(target_os = "linux") {
            return Err(Error::SourceUnavailable("当前平台不支持 GPU 信息".to_string()));
        }

        let mut controllers = Vec::new();
        let mut entries = tokio::fs::read_dir(DRM_DIR).await?;
        while let Some(entry) = entries.next_entry().await? {
            let card_name = entry.file_name().to_string_lossy().to_string();
            if !card_name.starts_with("card") || card_name.contains('-') {
                continue;
            }

            let device_dir = entry.path().join("device");
            let Some(vendor_id) = read_trimmed(&device_dir.join("vendor")).await else {
                continue;
            };
            let device_id = read_trimmed(&device_dir.join("device"))
                .await
                .unwrap_or_else(|| "unknown".to_string());
            let utilization_percent = read_trimmed(&device_dir.join("gpu_busy_percent"))
                .await
                .and_then(|v| v.parse::<f64>().ok());

            controllers.push(GpuController {
                vendor: vendor_name(&vendor_id).to_string(),
                model: format!("device {}", device_id),
                utilization_percent,
            });
        }

        debug!("发现 {} 个 GPU 控制器", controllers.len());
        Ok(controllers)
    }

    async fn battery_info(&self) -> Result<BatteryStatus> {
        if !cfg!(target_os = "linux") {
            return Err(Error::SourceUnavailable("当前平台不支持电池信息".to_string()));
        }

        let Some(battery_dir) = find_battery_dir().await? else {
            return Ok(BatteryStatus::default());
        };

        let percent = read_trimmed(&battery_dir.join("capacity"))
            .await
            .and_then(|v| v.parse::<f64>().ok());
        let is_charging = read_trimmed(&battery_dir.join("status"))
            .await
            .map(|status| status.eq_ignore_ascii_case("charging"))
            .unwrap_or(false);

        Ok(BatteryStatus {
            has_battery: true,
            percent,
            is_charging,
        })
    }

    async fn network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        tokio::task::spawn_blocking(|| {
            let networks = Networks::new_with_refreshed_list();
            let mut interfaces: Vec<NetworkInterface> = networks
                .iter()
                .map(|(name, data)| {
                    let mac = data.mac_address();
                    NetworkInterface {
                        name: name.clone(),
                        mac_address: if mac.is_unspecified() {
                            None
                        } else {
                            Some(mac.to_string())
                        },
                        received_bytes: data.total_received(),
                        transmitted_bytes: data.total_transmitted(),
                    }
                })
                .collect();
            interfaces.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(interfaces)
        })
        .await
        .map_err(|e| Error::Provider(format!("阻塞任务失败: {}", e)))?
    }

    fn provider_type(&self) -> &str {
        "sysinfo"
    }
}

/// PCI 厂商 ID 转名称
/// 进程名或前几个命令行参数包含服务名
fn matches_service(process: &Process, needle: &str) -> bool {
    process.name().to_string_lossy().to_lowercase().contains(needle)
        || process
            .cmd()
            .iter()
            .take(4)
            .any(|arg| arg.to_string_lossy().to_lowercase().contains(needle))
}

fn vendor_name(vendor_id: &str) -> &'static str {
    match vendor_id.to_ascii_lowercase().as_str() {
        "0x8086" => "Intel",
        "0x10de" => "NVIDIA",
        "0x1002" => "AMD",
        _ => "Unknown",
    }
}

async fn read_trimmed(path: &Path) -> Option<String> {
    tokio::fs::read_to_string(path)
        .await
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

async fn find_battery_dir() -> Result<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(POWER_SUPPLY_DIR).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with("BAT") {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
