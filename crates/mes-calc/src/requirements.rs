//! 工單需求計算器
//!
//! 由工單的完整製程樹重新推導衍生需求。結果只取決於樹與工單數量，
//! 同一棵樹算兩次得到相同結果，因此每次結構編輯後整份重算即可。

use mes_core::{
    EngineConfig, ItemId, JobId, JobRequirements, MaterialRequirement, MesError, MethodNode, OperationRequirement,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::dependencies::DependencyBuilder;
use crate::rollup::QuantityRollup;
use crate::tree::MethodTree;

/// 計算範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementScope {
    /// 物料用量、工序工時與相依
    Tree,
    /// 另外彙總各料件需求
    Full,
}

/// 單一工單的計算輸入
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub quantity: Decimal,
    pub nodes: Vec<MethodNode>,
}

/// 工單需求計算器
pub struct RequirementsCalculator<'a> {
    config: &'a EngineConfig,
}

impl<'a> RequirementsCalculator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// 主計算入口
    pub fn calculate(
        &self,
        job_quantity: Decimal,
        nodes: Vec<MethodNode>,
        scope: RequirementScope,
    ) -> mes_core::Result<JobRequirements> {
        tracing::debug!("開始需求計算：節點 {} 個，工單數量 {}", nodes.len(), job_quantity);

        // Step 1: 建樹並前序扁平化（同時檢查循環與深度）
        let tree = MethodTree::build(nodes)?;
        let flat = tree.flatten(self.config.max_depth)?;

        // Step 2: 用量累乘
        let rollup = QuantityRollup::from_flat(&flat);
        let mut requirements = JobRequirements::default();

        for entry in &flat {
            let node = &entry.node;
            let per_unit = rollup.total_quantity(node)?;

            let quantity = per_unit.checked_mul(job_quantity).ok_or_else(|| {
                MesError::QuantityOverflow(format!("節點 {} 用量 {} × 工單數量 {}", node.id, per_unit, job_quantity))
            })?;

            match node.item_id() {
                Some(item_id) => requirements.materials.push(MaterialRequirement {
                    node_id: node.id,
                    item_id,
                    quantity_per_unit: self.config.round_quantity(per_unit),
                    estimated_quantity: self.config.round_quantity(quantity),
                }),
                None => {
                    let hours = match node.operation() {
                        Some(operation) => operation.hours_for(quantity)?,
                        None => Decimal::ZERO,
                    };

                    requirements.operations.push(OperationRequirement {
                        node_id: node.id,
                        quantity: self.config.round_quantity(quantity),
                        estimated_hours: self.config.round_quantity(hours),
                    });
                }
            }
        }

        // Step 3: 工序相依
        requirements.dependencies = DependencyBuilder::new(&tree).build()?;

        // Step 4: 料件彙總
        if scope == RequirementScope::Full {
            requirements.item_demand = Self::aggregate_by_item(&requirements.materials)?;
        }

        tracing::debug!(
            "需求計算完成：物料 {} 筆，工序 {} 筆，相依 {} 筆",
            requirements.materials.len(),
            requirements.operations.len(),
            requirements.dependencies.len()
        );

        Ok(requirements)
    }

    /// 多張工單平行計算
    pub fn calculate_many(
        &self,
        jobs: Vec<JobSnapshot>,
        scope: RequirementScope,
    ) -> Vec<(JobId, mes_core::Result<JobRequirements>)> {
        jobs.into_par_iter()
            .map(|job| {
                let result = self.calculate(job.quantity, job.nodes, scope);
                (job.job_id, result)
            })
            .collect()
    }

    fn aggregate_by_item(materials: &[MaterialRequirement]) -> mes_core::Result<BTreeMap<ItemId, Decimal>> {
        let mut demand: BTreeMap<ItemId, Decimal> = BTreeMap::new();
        for material in materials {
            let total = demand.entry(material.item_id).or_insert(Decimal::ZERO);
            *total = total
                .checked_add(material.estimated_quantity)
                .ok_or_else(|| MesError::QuantityOverflow(format!("料件 {} 需求彙總", material.item_id)))?;
        }
        Ok(demand)
    }
}
