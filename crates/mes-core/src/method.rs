//! 製造方法模型（BOM / BOP 樹）
//!
//! 一棵製程樹以扁平列儲存：每個節點只記錄 `parent_id`，
//! 讀取時再以 ID 建立查找表，不在記憶體中維持指標式的樹。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ItemId, JobId, MakeMethodId, NodeId, QuoteLineId};

/// 節點類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// 物料（被消耗的料件）
    Material,
    /// 工序（製程步驟）
    Operation,
}

/// 擁有者類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerType {
    Item,
    QuoteLine,
    Job,
}

/// 製造方法的擁有者
///
/// 同一套樹演算法在三種情境中重用：料件的標準方法、報價明細的方法、工單的方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ownerType", content = "ownerId")]
pub enum MethodOwner {
    Item(ItemId),
    QuoteLine(QuoteLineId),
    Job(JobId),
}

impl MethodOwner {
    pub fn owner_type(&self) -> OwnerType {
        match self {
            MethodOwner::Item(_) => OwnerType::Item,
            MethodOwner::QuoteLine(_) => OwnerType::QuoteLine,
            MethodOwner::Job(_) => OwnerType::Job,
        }
    }

    /// 料件可保留多個歷史版本，其餘擁有者只有一份方法
    pub fn is_versioned(&self) -> bool {
        matches!(self, MethodOwner::Item(_))
    }

    pub fn job_id(&self) -> Option<JobId> {
        match self {
            MethodOwner::Job(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for MethodOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodOwner::Item(id) => write!(f, "Item({})", id),
            MethodOwner::QuoteLine(id) => write!(f, "QuoteLine({})", id),
            MethodOwner::Job(id) => write!(f, "Job({})", id),
        }
    }
}

/// 工序排程方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationSequencing {
    /// 前一步驟完成後才開始
    #[default]
    AfterPrevious,
    /// 與前一步驟同時進行
    WithPrevious,
}

/// 工序所需工具
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationTool {
    pub tool_id: String,
    pub quantity: Decimal,
}

/// 工序參數（如溫度、轉速）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParameter {
    pub key: String,
    pub value: String,
}

/// 工序明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDetail {
    pub description: String,

    /// 準備工時（每批一次）
    pub setup_hours: Decimal,

    /// 單位加工工時
    pub run_hours_per_unit: Decimal,

    pub sequencing: OperationSequencing,

    pub tools: Vec<OperationTool>,

    pub parameters: Vec<OperationParameter>,
}

impl OperationDetail {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            setup_hours: Decimal::ZERO,
            run_hours_per_unit: Decimal::ZERO,
            sequencing: OperationSequencing::AfterPrevious,
            tools: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// 建構器模式：設置工時
    pub fn with_hours(mut self, setup_hours: Decimal, run_hours_per_unit: Decimal) -> Self {
        self.setup_hours = setup_hours;
        self.run_hours_per_unit = run_hours_per_unit;
        self
    }

    /// 建構器模式：設置排程方式
    pub fn with_sequencing(mut self, sequencing: OperationSequencing) -> Self {
        self.sequencing = sequencing;
        self
    }

    /// 建構器模式：添加工具
    pub fn with_tool(mut self, tool_id: impl Into<String>, quantity: Decimal) -> Self {
        self.tools.push(OperationTool {
            tool_id: tool_id.into(),
            quantity,
        });
        self
    }

    /// 建構器模式：添加參數
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(OperationParameter {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// 依生產數量計算工時：準備工時 + 單位工時 × 數量
    ///
    /// 超出 `Decimal` 範圍時回傳 `QuantityOverflow`。
    pub fn hours_for(&self, quantity: Decimal) -> crate::Result<Decimal> {
        self.run_hours_per_unit
            .checked_mul(quantity)
            .and_then(|run| run.checked_add(self.setup_hours))
            .ok_or_else(|| {
                crate::MesError::QuantityOverflow(format!(
                    "工序「{}」工時：{} × {} + {}",
                    self.description, self.run_hours_per_unit, quantity, self.setup_hours
                ))
            })
    }
}

/// 節點內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeDetail {
    Material {
        item_id: ItemId,
        /// 於哪一道同層工序投料；None 表示該層第一道工序
        operation_id: Option<NodeId>,
    },
    Operation(OperationDetail),
}

/// 製程樹節點
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub id: NodeId,

    /// 父節點；None 表示根層
    pub parent_id: Option<NodeId>,

    /// 所屬製造方法
    pub make_method_id: MakeMethodId,

    /// 每一單位父件的用量（工序固定為 1）
    pub quantity_per_parent: Decimal,

    /// 同層排序
    pub order: i32,

    pub detail: NodeDetail,
}

impl MethodNode {
    pub fn kind(&self) -> NodeKind {
        match self.detail {
            NodeDetail::Material { .. } => NodeKind::Material,
            NodeDetail::Operation(_) => NodeKind::Operation,
        }
    }

    pub fn is_material(&self) -> bool {
        self.kind() == NodeKind::Material
    }

    pub fn is_operation(&self) -> bool {
        self.kind() == NodeKind::Operation
    }

    pub fn item_id(&self) -> Option<ItemId> {
        match &self.detail {
            NodeDetail::Material { item_id, .. } => Some(*item_id),
            NodeDetail::Operation(_) => None,
        }
    }

    /// 物料投料的工序
    pub fn operation_id(&self) -> Option<NodeId> {
        match &self.detail {
            NodeDetail::Material { operation_id, .. } => *operation_id,
            NodeDetail::Operation(_) => None,
        }
    }

    pub fn operation(&self) -> Option<&OperationDetail> {
        match &self.detail {
            NodeDetail::Operation(detail) => Some(detail),
            NodeDetail::Material { .. } => None,
        }
    }

    /// 同層排序鍵（order 相同時以 ID 決勝，保證結果可重現）
    pub fn sort_key(&self) -> (i32, NodeId) {
        (self.order, self.id)
    }
}

/// 新增節點的輸入
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub quantity_per_parent: Decimal,
    pub order: i32,
    pub detail: NodeDetail,
}

impl NewNode {
    /// 物料節點
    pub fn material(item_id: ItemId, quantity_per_parent: Decimal) -> Self {
        Self {
            quantity_per_parent,
            order: 0,
            detail: NodeDetail::Material {
                item_id,
                operation_id: None,
            },
        }
    }

    /// 工序節點
    pub fn operation(detail: OperationDetail) -> Self {
        Self {
            quantity_per_parent: Decimal::ONE,
            order: 0,
            detail: NodeDetail::Operation(detail),
        }
    }

    /// 建構器模式：設置排序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 建構器模式：設置投料工序（僅物料有效）
    pub fn consumed_at(mut self, operation: NodeId) -> Self {
        if let NodeDetail::Material { operation_id, .. } = &mut self.detail {
            *operation_id = Some(operation);
        }
        self
    }

    pub fn into_node(self, id: NodeId, make_method_id: MakeMethodId, parent_id: Option<NodeId>) -> MethodNode {
        MethodNode {
            id,
            parent_id,
            make_method_id,
            quantity_per_parent: self.quantity_per_parent,
            order: self.order,
            detail: self.detail,
        }
    }
}

/// 製造方法（樹的根容器）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeMethod {
    pub id: MakeMethodId,

    pub owner: MethodOwner,

    /// 版本號（僅料件有多版本）
    pub version: u32,

    /// 是否為目前生效版本
    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub activated_at: Option<DateTime<Utc>>,
}

impl MakeMethod {
    /// 創建新的製造方法
    pub fn new(owner: MethodOwner, version: u32) -> Self {
        Self {
            id: MakeMethodId::new(),
            owner,
            version,
            active: false,
            created_at: Utc::now(),
            activated_at: None,
        }
    }

    /// 曾經生效、後來被其他版本取代
    pub fn is_superseded(&self) -> bool {
        !self.active && self.activated_at.is_some()
    }
}

/// 扁平化後的樹節點（前序走訪結果）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTreeNode {
    pub node: MethodNode,

    /// 深度（根層 = 0）
    pub level: usize,

    /// 階層編號，例如 "2.1.3"
    pub position_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_material_node() {
        let item = ItemId::new();
        let method = MakeMethodId::new();
        let node = NewNode::material(item, Decimal::from(3))
            .with_order(2)
            .into_node(NodeId::new(), method, None);

        assert!(node.is_material());
        assert_eq!(node.item_id(), Some(item));
        assert_eq!(node.quantity_per_parent, Decimal::from(3));
        assert_eq!(node.order, 2);
        assert_eq!(node.operation_id(), None);
    }

    #[test]
    fn test_operation_node_quantity_is_one() {
        let node = NewNode::operation(OperationDetail::new("焊接"))
            .into_node(NodeId::new(), MakeMethodId::new(), None);

        assert!(node.is_operation());
        assert_eq!(node.quantity_per_parent, Decimal::ONE);
        assert_eq!(node.item_id(), None);
    }

    #[test]
    fn test_consumed_at_ignored_for_operations() {
        let op = NodeId::new();
        let node = NewNode::operation(OperationDetail::new("噴漆")).consumed_at(op);
        assert_eq!(node.detail, NodeDetail::Operation(OperationDetail::new("噴漆")));
    }

    #[test]
    fn test_operation_hours() {
        let detail = OperationDetail::new("車削")
            .with_hours(Decimal::from(2), Decimal::new(5, 1))
            .with_tool("LATHE-01", Decimal::from(1))
            .with_parameter("rpm", "1200");

        // 2 + 0.5 × 10 = 7
        assert_eq!(detail.hours_for(Decimal::from(10)).unwrap(), Decimal::from(7));
        assert_eq!(detail.tools.len(), 1);
        assert_eq!(detail.parameters[0].value, "1200");
    }

    #[test]
    fn test_operation_hours_overflow() {
        let detail = OperationDetail::new("車削").with_hours(Decimal::ONE, Decimal::MAX);
        assert!(matches!(
            detail.hours_for(Decimal::from(2)),
            Err(crate::MesError::QuantityOverflow(_))
        ));
    }

    #[test]
    fn test_superseded_version() {
        let mut method = MakeMethod::new(MethodOwner::Item(ItemId::new()), 1);
        assert!(!method.is_superseded());

        method.active = true;
        method.activated_at = Some(Utc::now());
        assert!(!method.is_superseded());

        method.active = false;
        assert!(method.is_superseded());
    }

    #[test]
    fn test_owner_type() {
        let owner = MethodOwner::Job(JobId::new());
        assert_eq!(owner.owner_type(), OwnerType::Job);
        assert!(!owner.is_versioned());
        assert!(MethodOwner::Item(ItemId::new()).is_versioned());
    }
}
