//! 引擎本體

use mes_core::{CompanyId, EngineConfig, ItemId, JobId, MesError, Result, UserId};
use mes_store::{StaleTracker, Store};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::functions::FunctionInvoker;

/// 呼叫者身分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub company_id: CompanyId,
    pub user_id: UserId,
}

impl RequestContext {
    pub fn new(company_id: CompanyId, user_id: UserId) -> Self {
        Self { company_id, user_id }
    }
}

/// 製程引擎
///
/// 所有服務方法都以 `&self` 呼叫，可在多執行緒間共享。
pub struct Engine<S: Store> {
    pub(crate) store: S,
    pub(crate) config: EngineConfig,
    pub(crate) invoker: Option<Arc<dyn FunctionInvoker>>,
    pub(crate) stale: Mutex<StaleTracker>,
    pub(crate) activations: Mutex<HashSet<ItemId>>,
}

fn poison_err<T>(_: PoisonError<T>) -> MesError {
    MesError::Storage("鎖已中毒".to_string())
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(poison_err)
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            invoker: None,
            stale: Mutex::new(StaleTracker::new()),
            activations: Mutex::new(HashSet::new()),
        }
    }

    /// 建構器模式：設置配置
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 建構器模式：設置背景函式呼叫端
    pub fn with_invoker(mut self, invoker: Arc<dyn FunctionInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 工單需求是否過期（上次重算失敗或被延後）
    pub fn is_stale(&self, job_id: JobId) -> Result<bool> {
        Ok(lock(&self.stale)?.is_stale(job_id))
    }

    pub fn stale_jobs(&self) -> Result<Vec<JobId>> {
        Ok(lock(&self.stale)?.stale_jobs())
    }

    pub(crate) fn mark_stale(&self, job_id: JobId, reason: impl Into<String>) {
        match lock(&self.stale) {
            Ok(mut tracker) => tracker.mark_stale(job_id, reason),
            Err(err) => tracing::warn!("無法標記工單 {} 為待重算: {}", job_id, err),
        }
    }

    pub(crate) fn clear_stale(&self, job_id: JobId) {
        if let Ok(mut tracker) = lock(&self.stale) {
            tracker.clear(job_id);
        }
    }
}
