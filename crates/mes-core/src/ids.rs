//! 識別碼型別
//!
//! 所有實體都以 UUID v4 為主鍵，各自包成獨立型別，避免誤把工單 ID 當成料件 ID 傳遞。

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// 產生新的隨機 ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// 製程樹節點 ID
    NodeId
);
define_id!(
    /// 製造方法（Make Method）ID
    MakeMethodId
);
define_id!(
    /// 料件 ID
    ItemId
);
define_id!(
    /// 工單 ID
    JobId
);
define_id!(
    /// 報價單 ID
    QuoteId
);
define_id!(
    /// 報價單明細 ID
    QuoteLineId
);
define_id!(
    /// 詢價單（Sales RFQ）ID
    SalesRfqId
);
define_id!(
    /// 詢價單明細 ID
    SalesRfqLineId
);
define_id!(
    /// 一般單據 ID（銷售訂單、採購訂單、發票、不合格品報告）
    DocumentId
);
define_id!(
    /// 使用者 ID
    UserId
);
define_id!(
    /// 公司（租戶）ID
    CompanyId
);
