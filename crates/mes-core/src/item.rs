//! 料件模型

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// 補貨設定（反正規化旗標，供狀態機守衛讀取）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replenishment {
    /// 禁止生產
    pub manufacturing_blocked: bool,

    /// 禁止採購
    pub purchasing_blocked: bool,
}

/// 料件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    /// 料號
    pub part_number: String,

    pub replenishment: Replenishment,
}

impl Item {
    /// 創建新的料件
    pub fn new(part_number: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            part_number: part_number.into(),
            replenishment: Replenishment::default(),
        }
    }

    /// 建構器模式：設置禁止生產
    pub fn with_manufacturing_blocked(mut self, blocked: bool) -> Self {
        self.replenishment.manufacturing_blocked = blocked;
        self
    }

    /// 建構器模式：設置禁止採購
    pub fn with_purchasing_blocked(mut self, blocked: bool) -> Self {
        self.replenishment.purchasing_blocked = blocked;
        self
    }

    pub fn is_manufacturing_blocked(&self) -> bool {
        self.replenishment.manufacturing_blocked
    }
}
