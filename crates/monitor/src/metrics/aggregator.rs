/// 指标聚合器
///
/// 每次 tick 并发调用启用的指标源，等待全部结束后生成一个不可变快照

use common::models::{EnabledSourceSet, MetricSnapshot, MetricSourceId, MetricValue};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::adapter::MetricSourceAdapter;

/// 指标聚合器
pub struct Aggregator {
    adapter: MetricSourceAdapter,
    /// 单源超时
    source_timeout: Duration,
    /// 已开始的采集次数
    runs: AtomicU64,
}

impl Aggregator {
    pub fn new(adapter: MetricSourceAdapter, source_timeout: Duration) -> Self {
        Self {
            adapter,
            source_timeout,
            runs: AtomicU64::new(0),
        }
    }

    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    /// 已开始的采集次数
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// 采集一次快照
    ///
    /// 始终采集的源排在最前，其余按启用集合顺序；单个源失败或超时只影响自身
    pub async fn collect(&self, enabled: &EnabledSourceSet) -> MetricSnapshot {
        let sequence = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let order = enabled.collection_order();
        debug!("开始第 {} 次采集: {} 个指标源", sequence, order.len());

        let values = join_all(order.iter().map(|id| self.fetch_with_timeout(*id))).await;

        let snapshot = MetricSnapshot::new(
            sequence,
            chrono::Utc::now(),
            order.into_iter().zip(values),
            enabled.always_on(),
        );
        debug!(
            "第 {} 次采集完成: {} 个指标源, {} 个不可用",
            sequence,
            snapshot.len(),
            snapshot.unavailable_count()
        );
        snapshot
    }

    async fn fetch_with_timeout(&self, id: MetricSourceId) -> MetricValue {
        match tokio::time::timeout(self.source_timeout, self.adapter.fetch(id)).await {
            Ok(value) => value,
            Err(_) => {
                warn!("指标源 {} 超时 ({:?})", id, self.source_timeout);
                MetricValue::timeout()
            }
        }
    }
}
