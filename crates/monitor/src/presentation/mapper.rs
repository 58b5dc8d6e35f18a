/// 展示映射
///
/// 快照到展示行的纯函数转换，与具体渲染面（树视图或 HTML 片段）无关

use common::models::constants::NOT_AVAILABLE;
use common::models::{
    BatteryStatus, DisplayRow, GpuController, InfoBlob, MetricSnapshot, MetricSourceId,
    MetricValue, NetworkInterface, ServiceInstance, Severity, TemperatureReading,
};
use common::utils::{format_bytes, format_celsius, format_percent};

/// 固定位置的指标源
const LEADING: [MetricSourceId; 4] = [
    MetricSourceId::Cpu,
    MetricSourceId::Memory,
    MetricSourceId::CoreLoads,
    MetricSourceId::Temperature,
];

/// 将快照转换为有序的展示行
///
/// 顺序：CPU、内存、核心负载、温度，之后按采集顺序输出服务与信息类指标源
pub fn to_rows(snapshot: &MetricSnapshot) -> Vec<DisplayRow> {
    let mut rows = Vec::new();

    for id in LEADING {
        if let Some(value) = snapshot.get(id) {
            push_rows(&mut rows, snapshot, id, value);
        }
    }

    for (id, value) in snapshot.entries() {
        if !LEADING.contains(&id) {
            push_rows(&mut rows, snapshot, id, value);
        }
    }

    rows
}

/// 服务实例的严重程度：CPU 与内存取较高者
pub fn service_severity(instance: &ServiceInstance) -> Severity {
    Severity::for_percent(instance.cpu_percent.max(instance.mem_percent))
}

fn push_rows(
    rows: &mut Vec<DisplayRow>,
    snapshot: &MetricSnapshot,
    id: MetricSourceId,
    value: &MetricValue,
) {
    let name = id.display_name();
    match value {
        MetricValue::Percent(percent) => rows.push(DisplayRow::new(
            name,
            format_percent(*percent),
            Severity::for_percent(*percent),
        )),
        MetricValue::CoreLoads(loads) => {
            let text = loads
                .iter()
                .map(|load| format_percent(*load))
                .collect::<Vec<_>>()
                .join(", ");
            rows.push(DisplayRow::normal(name, text));
        }
        MetricValue::Temperature(reading) => temperature_rows(rows, name, reading),
        MetricValue::Services(instances) => service_rows(rows, name, instances),
        MetricValue::Info(InfoBlob::Gpu(controllers)) => gpu_rows(rows, name, controllers),
        MetricValue::Info(InfoBlob::Battery(battery)) => {
            rows.push(DisplayRow::normal(name, battery_text(battery)))
        }
        MetricValue::Info(InfoBlob::Network(interfaces)) => {
            network_rows(rows, name, interfaces)
        }
        MetricValue::Unavailable(_) => {
            // 始终采集的源在首次 tick 之后仍不可用，视为数据陈旧
            let severity = if snapshot.is_always_on(id) && snapshot.sequence() > 1 {
                Severity::Warning
            } else {
                Severity::Normal
            };
            rows.push(DisplayRow::new(name, NOT_AVAILABLE, severity));
        }
    }
}

fn temperature_rows(rows: &mut Vec<DisplayRow>, name: &str, reading: &TemperatureReading) {
    let before = rows.len();
    if let Some(chipset) = reading.chipset {
        rows.push(DisplayRow::normal(
            format!("{} (Chipset)", name),
            format_celsius(chipset),
        ));
    }
    if let Some(main) = reading.main {
        rows.push(DisplayRow::normal(format!("{} (Main)", name), format_celsius(main)));
    }
    if rows.len() == before {
        rows.push(DisplayRow::normal(name, NOT_AVAILABLE));
    }
}

fn service_rows(rows: &mut Vec<DisplayRow>, name: &str, instances: &[ServiceInstance]) {
    let running = instances.iter().filter(|instance| instance.running);
    for (index, instance) in running.enumerate() {
        rows.push(DisplayRow::new(
            format!("{} #{}", name, index + 1),
            format!(
                "CPU {}, MEM {}",
                format_percent(instance.cpu_percent),
                format_percent(instance.mem_percent)
            ),
            service_severity(instance),
        ));
    }
}

fn gpu_rows(rows: &mut Vec<DisplayRow>, name: &str, controllers: &[GpuController]) {
    if controllers.is_empty() {
        rows.push(DisplayRow::normal(name, "none detected"));
        return;
    }
    for (index, controller) in controllers.iter().enumerate() {
        let mut text = format!("{} {}", controller.vendor, controller.model);
        if let Some(utilization) = controller.utilization_percent {
            text.push_str(&format!(", {}", format_percent(utilization)));
        }
        rows.push(DisplayRow::normal(format!("{} #{}", name, index + 1), text));
    }
}

fn battery_text(battery: &BatteryStatus) -> String {
    if !battery.has_battery {
        return "no battery".to_string();
    }
    let level = battery
        .percent
        .map(format_percent)
        .unwrap_or_else(|| "unknown".to_string());
    if battery.is_charging {
        format!("{} (charging)", level)
    } else {
        level
    }
}

fn network_rows(rows: &mut Vec<DisplayRow>, name: &str, interfaces: &[NetworkInterface]) {
    if interfaces.is_empty() {
        rows.push(DisplayRow::normal(name, "no interfaces"));
        return;
    }
    for interface in interfaces {
        rows.push(DisplayRow::normal(
            format!("{} {}", name, interface.name),
            format!(
                "rx {}, tx {}",
                format_bytes(interface.received_bytes),
                format_bytes(interface.transmitted_bytes)
            ),
        ));
    }
}
