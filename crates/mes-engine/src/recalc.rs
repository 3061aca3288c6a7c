//! 工單需求重算
//!
//! 結構編輯先提交，重算是第二階段：重算失敗不會撤銷編輯，
//! 而是以 [`Recalculation::Failed`] 回報並把工單標記為待重算。

use mes_calc::{JobSnapshot, RequirementScope, RequirementsCalculator};
use mes_core::{JobId, JobRequirements, MesError, MethodOwner, Result};
use mes_store::{Snapshot, Store};

use crate::engine::Engine;

/// 第二階段（需求重算）的結果
#[derive(Debug, Clone, PartialEq)]
pub enum Recalculation {
    /// 擁有者不是工單
    NotRequired,
    /// 配置關閉自動重算，工單已標記為待重算
    Deferred { job_id: JobId },
    Completed { job_id: JobId },
    /// 編輯已提交，但衍生需求未更新
    Failed { job_id: JobId, error: MesError },
}

impl Recalculation {
    pub fn is_failed(&self) -> bool {
        matches!(self, Recalculation::Failed { .. })
    }
}

/// 兩階段編輯的結果
#[derive(Debug, Clone, PartialEq)]
pub struct Edit<T> {
    pub value: T,
    pub recalculation: Recalculation,
}

impl<T> Edit<T> {
    pub fn new(value: T, recalculation: Recalculation) -> Self {
        Self { value, recalculation }
    }

    /// 重算失敗轉成 `RecalculationFailed`；編輯本身在此之前已提交
    pub fn into_result(self) -> Result<T> {
        match self.recalculation {
            Recalculation::Failed { job_id, error } => Err(MesError::RecalculationFailed {
                job_id,
                reason: error.to_string(),
            }),
            _ => Ok(self.value),
        }
    }
}

/// 批次重試的單筆結果
#[derive(Debug, Clone, PartialEq)]
pub struct StaleRetry {
    pub job_id: JobId,
    pub result: Result<()>,
}

fn job_snapshot(snapshot: &Snapshot, job_id: JobId) -> Result<JobSnapshot> {
    let job = snapshot.job(job_id)?;
    let nodes = snapshot
        .method_for(MethodOwner::Job(job_id))
        .map(|m| snapshot.nodes_of(m.id))
        .unwrap_or_default();

    Ok(JobSnapshot {
        job_id,
        quantity: job.quantity,
        nodes,
    })
}

fn store_requirements(snapshot: &mut Snapshot, job_id: JobId, requirements: JobRequirements) -> Result<()> {
    // 工單可能已在計算期間被刪除
    snapshot.job(job_id)?;
    snapshot.job_requirements.insert(job_id, requirements);
    Ok(())
}

impl<S: Store> Engine<S> {
    /// 由工單的完整製程樹重算物料需求、工序工時與相依
    ///
    /// 結果只取決於樹與工單數量，連續執行兩次得到相同的衍生資料。
    pub fn recalculate(&self, job_id: JobId) -> Result<JobRequirements> {
        self.recalculate_scoped(job_id, RequirementScope::Tree)
    }

    /// 較完整的重算：另外彙總各料件需求
    ///
    /// 工單轉為 Ready 時執行，也可隨時手動呼叫。
    pub fn recalculate_requirements(&self, job_id: JobId) -> Result<JobRequirements> {
        self.recalculate_scoped(job_id, RequirementScope::Full)
    }

    /// 已儲存的衍生需求
    pub fn requirements(&self, job_id: JobId) -> Result<Option<JobRequirements>> {
        self.store.read(|s| {
            s.job(job_id)?;
            Ok(s.job_requirements.get(&job_id).cloned())
        })
    }

    fn recalculate_scoped(&self, job_id: JobId, scope: RequirementScope) -> Result<JobRequirements> {
        tracing::info!("重算工單 {} 需求（{:?}）", job_id, scope);

        let result = self.compute_and_store(job_id, scope);
        match &result {
            Ok(requirements) => {
                self.clear_stale(job_id);
                tracing::info!(
                    "工單 {} 重算完成：物料 {} 筆，工序 {} 筆",
                    job_id,
                    requirements.materials.len(),
                    requirements.operations.len()
                );
            }
            Err(err) => {
                tracing::warn!("工單 {} 重算失敗: {}", job_id, err);
                self.mark_stale(job_id, err.to_string());
            }
        }
        result
    }

    fn compute_and_store(&self, job_id: JobId, scope: RequirementScope) -> Result<JobRequirements> {
        // Step 1: 讀取工單與製程樹
        let input = self.store.read(|s| job_snapshot(s, job_id))?;

        // Step 2: 計算
        let requirements = RequirementsCalculator::new(&self.config).calculate(input.quantity, input.nodes, scope)?;

        // Step 3: 整份替換
        let stored = requirements.clone();
        self.store
            .transaction(|s| store_requirements(s, job_id, stored))?;

        Ok(requirements)
    }

    /// 結構編輯提交後的第二階段
    pub(crate) fn after_edit(&self, owner: MethodOwner) -> Recalculation {
        let Some(job_id) = owner.job_id() else {
            return Recalculation::NotRequired;
        };

        if !self.config.recalculate_on_edit {
            self.mark_stale(job_id, "自動重算已關閉");
            return Recalculation::Deferred { job_id };
        }

        match self.recalculate(job_id) {
            Ok(_) => Recalculation::Completed { job_id },
            Err(error) => Recalculation::Failed { job_id, error },
        }
    }

    /// 重算所有待重算工單
    ///
    /// 計算平行執行，每張工單各自提交；單張失敗不影響其他工單。
    pub fn retry_stale(&self) -> Result<Vec<StaleRetry>> {
        let job_ids = self.stale_jobs()?;
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!("重試 {} 張待重算工單", job_ids.len());

        // Step 1: 讀取輸入；讀不到的工單直接記為失敗
        let mut outcomes = Vec::new();
        let mut inputs = Vec::new();
        self.store.read(|s| {
            for job_id in &job_ids {
                match job_snapshot(s, *job_id) {
                    Ok(input) => inputs.push(input),
                    Err(err) => outcomes.push(StaleRetry {
                        job_id: *job_id,
                        result: Err(err),
                    }),
                }
            }
            Ok(())
        })?;

        // Step 2: 平行計算
        let calculated = RequirementsCalculator::new(&self.config).calculate_many(inputs, RequirementScope::Full);

        // Step 3: 逐張提交
        for (job_id, result) in calculated {
            let result = result.and_then(|requirements| {
                self.store
                    .transaction(|s| store_requirements(s, job_id, requirements))
            });

            match &result {
                Ok(()) => self.clear_stale(job_id),
                Err(err) => self.mark_stale(job_id, err.to_string()),
            }
            outcomes.push(StaleRetry { job_id, result });
        }

        outcomes.sort_by_key(|o| o.job_id);
        Ok(outcomes)
    }
}
