//! 工單與衍生需求模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::document::Lifecycle;
use crate::ids::{ItemId, JobId, NodeId};
use crate::status::JobStatus;

/// 工單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    /// 生產的料件
    pub item_id: ItemId,

    /// 生產數量（批量）
    pub quantity: Decimal,

    pub lifecycle: Lifecycle<JobStatus>,
}

impl Job {
    /// 創建新的工單（草稿狀態）
    pub fn new(item_id: ItemId, quantity: Decimal) -> Self {
        Self {
            id: JobId::new(),
            item_id,
            quantity,
            lifecycle: Lifecycle::new(JobStatus::Draft),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.lifecycle.status
    }
}

/// 物料需求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub node_id: NodeId,
    pub item_id: ItemId,

    /// 每一單位成品的累乘用量
    pub quantity_per_unit: Decimal,

    /// 預估用量 = 累乘用量 × 工單數量
    pub estimated_quantity: Decimal,
}

/// 工序需求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequirement {
    pub node_id: NodeId,

    /// 該工序需加工的數量
    pub quantity: Decimal,

    /// 預估工時
    pub estimated_hours: Decimal,
}

/// 工序相依關係：`operation_id` 必須排在 `depends_on` 之後
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationDependency {
    pub operation_id: NodeId,
    pub depends_on: NodeId,
}

/// 工單衍生需求（重算時整份取代）
///
/// 不記錄計算時間，讓同一棵樹重算兩次得到完全相等的結果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequirements {
    /// 依前序走訪順序
    pub materials: Vec<MaterialRequirement>,

    /// 依前序走訪順序
    pub operations: Vec<OperationRequirement>,

    pub dependencies: BTreeSet<OperationDependency>,

    /// 依料件彙總的需求（僅完整重算時填入）
    pub item_demand: BTreeMap<ItemId, Decimal>,
}

impl JobRequirements {
    pub fn material(&self, node_id: NodeId) -> Option<&MaterialRequirement> {
        self.materials.iter().find(|m| m.node_id == node_id)
    }

    pub fn operation(&self, node_id: NodeId) -> Option<&OperationRequirement> {
        self.operations.iter().find(|o| o.node_id == node_id)
    }

    /// 某工序的所有前置工序
    pub fn predecessors(&self, operation_id: NodeId) -> Vec<NodeId> {
        self.dependencies
            .iter()
            .filter(|d| d.operation_id == operation_id)
            .map(|d| d.depends_on)
            .collect()
    }

    pub fn depends_on(&self, operation_id: NodeId, depends_on: NodeId) -> bool {
        self.dependencies.contains(&OperationDependency {
            operation_id,
            depends_on,
        })
    }
}
