//! 詢價與報價模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::Lifecycle;
use crate::ids::{ItemId, MakeMethodId, QuoteId, QuoteLineId, SalesRfqId, SalesRfqLineId};
use crate::status::{QuoteStatus, SalesRfqStatus};

/// 詢價單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRfq {
    pub id: SalesRfqId,
    pub lifecycle: Lifecycle<SalesRfqStatus>,
}

impl SalesRfq {
    pub fn new() -> Self {
        Self {
            id: SalesRfqId::new(),
            lifecycle: Lifecycle::new(SalesRfqStatus::Draft),
        }
    }

    pub fn status(&self) -> SalesRfqStatus {
        self.lifecycle.status
    }
}

impl Default for SalesRfq {
    fn default() -> Self {
        Self::new()
    }
}

/// 詢價單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRfqLine {
    pub id: SalesRfqLineId,
    pub rfq_id: SalesRfqId,
    pub item_id: ItemId,
    pub quantity: Decimal,

    /// 參考的製造方法（轉報價時複製）
    pub make_method_id: Option<MakeMethodId>,

    pub order: i32,
}

impl SalesRfqLine {
    pub fn new(rfq_id: SalesRfqId, item_id: ItemId, quantity: Decimal) -> Self {
        Self {
            id: SalesRfqLineId::new(),
            rfq_id,
            item_id,
            quantity,
            make_method_id: None,
            order: 0,
        }
    }

    /// 建構器模式：設置參考的製造方法
    pub fn with_make_method(mut self, make_method_id: MakeMethodId) -> Self {
        self.make_method_id = Some(make_method_id);
        self
    }

    /// 建構器模式：設置排序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// 報價單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,

    /// 來源詢價單
    pub rfq_id: Option<SalesRfqId>,

    pub lifecycle: Lifecycle<QuoteStatus>,
}

impl Quote {
    pub fn new() -> Self {
        Self {
            id: QuoteId::new(),
            rfq_id: None,
            lifecycle: Lifecycle::new(QuoteStatus::Draft),
        }
    }

    /// 建構器模式：設置來源詢價單
    pub fn with_rfq(mut self, rfq_id: SalesRfqId) -> Self {
        self.rfq_id = Some(rfq_id);
        self
    }

    pub fn status(&self) -> QuoteStatus {
        self.lifecycle.status
    }
}

impl Default for Quote {
    fn default() -> Self {
        Self::new()
    }
}

/// 報價單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub id: QuoteLineId,
    pub quote_id: QuoteId,
    pub item_id: ItemId,
    pub quantity: Decimal,
    pub order: i32,
}

impl QuoteLine {
    pub fn new(quote_id: QuoteId, item_id: ItemId, quantity: Decimal) -> Self {
        Self {
            id: QuoteLineId::new(),
            quote_id,
            item_id,
            quantity,
            order: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfq_line_builder() {
        let rfq = SalesRfq::new();
        let method = MakeMethodId::new();
        let line = SalesRfqLine::new(rfq.id, ItemId::new(), Decimal::from(10))
            .with_make_method(method)
            .with_order(3);

        assert_eq!(line.rfq_id, rfq.id);
        assert_eq!(line.make_method_id, Some(method));
        assert_eq!(line.order, 3);
        assert_eq!(rfq.lifecycle.status, SalesRfqStatus::Draft);
    }

    #[test]
    fn test_quote_from_rfq() {
        let rfq = SalesRfq::new();
        let quote = Quote::new().with_rfq(rfq.id);
        assert_eq!(quote.rfq_id, Some(rfq.id));
        assert_eq!(quote.lifecycle.status, QuoteStatus::Draft);
    }
}
