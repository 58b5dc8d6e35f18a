/// 指标快照

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::metric::MetricValue;
use super::source::MetricSourceId;

/// 一次完整轮询的不可变结果
///
/// 条目保持采集顺序，但语义上以标识查找为准
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// 采集序号，从 1 开始
    sequence: u64,
    captured_at: DateTime<Utc>,
    entries: Vec<(MetricSourceId, MetricValue)>,
    always_on: Vec<MetricSourceId>,
}

impl MetricSnapshot {
    /// 创建快照，重复标识只保留第一次出现的值
    pub fn new(
        sequence: u64,
        captured_at: DateTime<Utc>,
        entries: impl IntoIterator<Item = (MetricSourceId, MetricValue)>,
        always_on: impl IntoIterator<Item = MetricSourceId>,
    ) -> Self {
        let mut deduped: Vec<(MetricSourceId, MetricValue)> = Vec::new();
        for (id, value) in entries {
            if !deduped.iter().any(|(existing, _)| *existing == id) {
                deduped.push((id, value));
            }
        }
        Self {
            sequence,
            captured_at,
            entries: deduped,
            always_on: always_on.into_iter().collect(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, id: MetricSourceId) -> Option<&MetricValue> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, id: MetricSourceId) -> bool {
        self.get(id).is_some()
    }

    /// 按采集顺序遍历条目
    pub fn entries(&self) -> impl Iterator<Item = (MetricSourceId, &MetricValue)> + '_ {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    /// 按采集顺序返回标识
    pub fn ids(&self) -> Vec<MetricSourceId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn is_always_on(&self, id: MetricSourceId) -> bool {
        self.always_on.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 不可用的指标源数量
    pub fn unavailable_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, value)| value.is_unavailable())
            .count()
    }
}
