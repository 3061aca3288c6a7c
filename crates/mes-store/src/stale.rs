//! 待重算工單追蹤

use mes_core::JobId;
use std::collections::BTreeMap;

/// 待重算工單追蹤器
///
/// 結構編輯已提交但需求重算失敗的工單會留在這裡，
/// 直到下一次重算成功。
#[derive(Debug, Default)]
pub struct StaleTracker {
    stale_jobs: BTreeMap<JobId, String>,
}

impl StaleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記工單需求過期，保留最後一次失敗原因
    pub fn mark_stale(&mut self, job_id: JobId, reason: impl Into<String>) {
        self.stale_jobs.insert(job_id, reason.into());
    }

    pub fn is_stale(&self, job_id: JobId) -> bool {
        self.stale_jobs.contains_key(&job_id)
    }

    pub fn reason(&self, job_id: JobId) -> Option<&str> {
        self.stale_jobs.get(&job_id).map(String::as_str)
    }

    /// 重算成功後清除
    pub fn clear(&mut self, job_id: JobId) -> bool {
        self.stale_jobs.remove(&job_id).is_some()
    }

    pub fn clear_all(&mut self) {
        self.stale_jobs.clear();
    }

    pub fn stale_jobs(&self) -> Vec<JobId> {
        self.stale_jobs.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.stale_jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stale_jobs.is_empty()
    }
}
