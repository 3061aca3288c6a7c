//! # MES Core
//!
//! 核心資料模型與類型定義：製程樹、製造方法、單據狀態

pub mod config;
pub mod document;
pub mod ids;
pub mod item;
pub mod job;
pub mod method;
pub mod sales;
pub mod status;

// Re-export 主要類型
pub use config::EngineConfig;
pub use document::{Document, Lifecycle, StatusDocument};
pub use ids::{
    CompanyId, DocumentId, ItemId, JobId, MakeMethodId, NodeId, QuoteId, QuoteLineId, SalesRfqId,
    SalesRfqLineId, UserId,
};
pub use item::{Item, Replenishment};
pub use job::{Job, JobRequirements, MaterialRequirement, OperationDependency, OperationRequirement};
pub use method::{
    FlatTreeNode, MakeMethod, MethodNode, MethodOwner, NewNode, NodeDetail, NodeKind, OperationDetail,
    OperationParameter, OperationSequencing, OperationTool, OwnerType,
};
pub use sales::{Quote, QuoteLine, SalesRfq, SalesRfqLine};
pub use status::{
    DocumentKind, DocumentStatus, JobStatus, NonConformanceStatus, PurchaseInvoiceStatus, PurchaseOrderStatus,
    QuoteStatus, SalesInvoiceStatus, SalesOrderStatus, SalesRfqStatus, TransitionEffects,
};

use rust_decimal::Decimal;

/// 製程引擎錯誤類型
///
/// 業務條件（驗證失敗、守衛拒絕）一律以錯誤值回傳，不會 panic；
/// 只有損壞的樹（循環、懸空父節點）屬於內部錯誤 `MalformedTree`。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MesError {
    #[error("無效的父節點 {parent_id}: {reason}")]
    InvalidParent { parent_id: NodeId, reason: String },

    #[error("無效的用量: {0}（不可小於 0）")]
    InvalidQuantity(Decimal),

    #[error("無效的投料工序 {operation_id}: {reason}")]
    InvalidOperationLink { operation_id: NodeId, reason: String },

    #[error("無效的{document}狀態: {value:?}")]
    InvalidStatus { document: DocumentKind, value: String },

    #[error("批次更新失敗（節點 {node_id}）: {reason}，所有更新均未套用")]
    PartialUpdateFailure { node_id: NodeId, reason: String },

    #[error("料件 {item_id} 已禁止生產，工單 {job_id} 無法轉為 Ready")]
    ManufacturingBlocked { job_id: JobId, item_id: ItemId },

    #[error("料件 {item_id} 的製造方法版本正被同時啟用")]
    ConcurrentActivation { item_id: ItemId },

    #[error("料件 {item_id} 沒有生效中的製造方法版本")]
    NoPriorActiveVersion { item_id: ItemId },

    #[error("料件 {item_id} 沒有生效中的製造方法")]
    NoActiveMethod { item_id: ItemId },

    #[error("工單 {job_id} 的編輯已寫入，但需求重算失敗: {reason}")]
    RecalculationFailed { job_id: JobId, reason: String },

    #[error("製程樹損壞: {0}")]
    MalformedTree(String),

    #[error("用量計算溢位: {0}")]
    QuantityOverflow(String),

    #[error("製造方法 {make_method_id} 已被新版本取代，不可再編輯")]
    SupersededVersion { make_method_id: MakeMethodId },

    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("背景函式 {function} 執行失敗: {message}")]
    FunctionFailed { function: String, message: String },

    #[error("儲存層錯誤: {0}")]
    Storage(String),
}

impl MesError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        MesError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// 呼叫端修正輸入即可重試
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MesError::InvalidParent { .. }
                | MesError::InvalidQuantity(_)
                | MesError::InvalidOperationLink { .. }
                | MesError::InvalidStatus { .. }
                | MesError::PartialUpdateFailure { .. }
        )
    }

    /// 前置條件不滿足，排除後可重試
    pub fn is_guard_rejection(&self) -> bool {
        matches!(
            self,
            MesError::ManufacturingBlocked { .. }
                | MesError::ConcurrentActivation { .. }
                | MesError::NoPriorActiveVersion { .. }
                | MesError::SupersededVersion { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MesError>;
