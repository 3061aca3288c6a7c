//! 引擎配置模型

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 製程引擎參數配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 數量小數位數（累乘用量與預估用量四捨五入到此位數）
    pub quantity_scale: u32,

    /// 最大樹深度（超過視為損壞的樹，用於偵測循環）
    pub max_depth: usize,

    /// 結構編輯後是否自動重算工單需求
    ///
    /// - true: 新增/刪除節點、改數量後立即重算（預設）
    /// - false: 僅標記為待重算，由呼叫端另行觸發
    pub recalculate_on_edit: bool,

    /// 工單轉為 Ready 時是否呼叫排程函式
    pub schedule_on_ready: bool,
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            quantity_scale: 6,
            max_depth: 64,
            recalculate_on_edit: true,
            schedule_on_ready: true,
        }
    }

    /// 建構器模式：設置數量小數位數
    pub fn with_quantity_scale(mut self, scale: u32) -> Self {
        self.quantity_scale = scale;
        self
    }

    /// 建構器模式：設置最大樹深度
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// 建構器模式：設置是否編輯後自動重算
    pub fn with_recalculate_on_edit(mut self, enabled: bool) -> Self {
        self.recalculate_on_edit = enabled;
        self
    }

    /// 建構器模式：設置 Ready 時是否排程
    pub fn with_schedule_on_ready(mut self, enabled: bool) -> Self {
        self.schedule_on_ready = enabled;
        self
    }

    /// 依配置的小數位數四捨五入數量
    pub fn round_quantity(&self, quantity: Decimal) -> Decimal {
        quantity
            .round_dp_with_strategy(self.quantity_scale, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
