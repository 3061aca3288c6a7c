//! 單據狀態列舉
//!
//! 每種單據的狀態清單就是對外的字串契約：路由層收到的狀態字串
//! 必須先通過 [`DocumentStatus::parse`]，不在清單內一律以 `InvalidStatus` 拒絕。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{MesError, Result};

/// 單據類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum DocumentKind {
    Job,
    Quote,
    SalesRfq,
    SalesOrder,
    PurchaseOrder,
    SalesInvoice,
    PurchaseInvoice,
    NonConformance,
}

/// 進入某狀態時一併套用的副作用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionEffects {
    /// 清空負責人
    pub clear_assignee: bool,
    /// 蓋上結案日
    pub stamp_close_date: bool,
    /// 蓋上完工日
    pub stamp_completed_date: bool,
}

impl TransitionEffects {
    pub const NONE: Self = Self {
        clear_assignee: false,
        stamp_close_date: false,
        stamp_completed_date: false,
    };

    pub const CLEAR_ASSIGNEE: Self = Self {
        clear_assignee: true,
        stamp_close_date: false,
        stamp_completed_date: false,
    };

    pub const CLOSE: Self = Self {
        clear_assignee: false,
        stamp_close_date: true,
        stamp_completed_date: false,
    };
}

/// 單據狀態的共同介面
pub trait DocumentStatus:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr + IntoEnumIterator + Into<&'static str> + 'static
{
    const KIND: DocumentKind;

    /// 進入此狀態時的副作用
    fn effects(self) -> TransitionEffects {
        TransitionEffects::NONE
    }

    /// 解析狀態字串；不在清單內回傳 `InvalidStatus`
    fn parse(raw: &str) -> Result<Self> {
        raw.parse().map_err(|_| MesError::InvalidStatus {
            document: Self::KIND,
            value: raw.to_string(),
        })
    }

    /// 全部合法狀態（依宣告順序）
    fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    fn as_str(self) -> &'static str {
        self.into()
    }
}

/// 工單狀態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum JobStatus {
    Draft,
    Ready,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    Paused,
    Done,
    Cancelled,
}

impl DocumentStatus for JobStatus {
    const KIND: DocumentKind = DocumentKind::Job;

    fn effects(self) -> TransitionEffects {
        match self {
            JobStatus::Cancelled => TransitionEffects::CLEAR_ASSIGNEE,
            JobStatus::Done => TransitionEffects {
                stamp_completed_date: true,
                ..TransitionEffects::NONE
            },
            _ => TransitionEffects::NONE,
        }
    }
}

/// 報價單狀態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum QuoteStatus {
    Draft,
    Sent,
    Ordered,
    Partial,
    Lost,
    Cancelled,
    Expired,
}

impl DocumentStatus for QuoteStatus {
    const KIND: DocumentKind = DocumentKind::Quote;

    fn effects(self) -> TransitionEffects {
        match self {
            QuoteStatus::Draft | QuoteStatus::Sent => TransitionEffects::CLEAR_ASSIGNEE,
            _ => TransitionEffects::NONE,
        }
    }
}

/// 詢價單狀態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum SalesRfqStatus {
    Draft,
    #[serde(rename = "Ready for Quote")]
    #[strum(serialize = "Ready for Quote")]
    ReadyForQuote,
    Quoted,
    Closed,
}

impl DocumentStatus for SalesRfqStatus {
    const KIND: DocumentKind = DocumentKind::SalesRfq;

    fn effects(self) -> TransitionEffects {
        match self {
            SalesRfqStatus::Closed => TransitionEffects::CLOSE,
            _ => TransitionEffects::NONE,
        }
    }
}

/// 銷售訂單狀態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum SalesOrderStatus {
    Draft,
    #[serde(rename = "Needs Approval")]
    #[strum(serialize = "Needs Approval")]
    NeedsApproval,
    Confirmed,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[serde(rename = "To Ship and Invoice")]
    #[strum(serialize = "To Ship and Invoice")]
    ToShipAndInvoice,
    #[serde(rename = "To Ship")]
    #[strum(serialize = "To Ship")]
    ToShip,
    #[serde(rename = "To Invoice")]
    #[strum(serialize = "To Invoice")]
    ToInvoice,
    Completed,
    Cancelled,
    Closed,
}

impl DocumentStatus for SalesOrderStatus {
    const KIND: DocumentKind = DocumentKind::SalesOrder;

    fn effects(self) -> TransitionEffects {
        match self {
            SalesOrderStatus::Closed => TransitionEffects::CLOSE,
            _ => TransitionEffects::NONE,
        }
    }
}

/// 採購訂單狀態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum PurchaseOrderStatus {
    Draft,
    #[serde(rename = "To Review")]
    #[strum(serialize = "To Review")]
    ToReview,
    Rejected,
    #[serde(rename = "To Receive")]
    #[strum(serialize = "To Receive")]
    ToReceive,
    #[serde(rename = "To Receive and Invoice")]
    #[strum(serialize = "To Receive and Invoice")]
    ToReceiveAndInvoice,
    #[serde(rename = "To Invoice")]
    #[strum(serialize = "To Invoice")]
    ToInvoice,
    Completed,
    Closed,
}

impl DocumentStatus for PurchaseOrderStatus {
    const KIND: DocumentKind = DocumentKind::PurchaseOrder;

    fn effects(self) -> TransitionEffects {
        match self {
            PurchaseOrderStatus::Closed => TransitionEffects::CLOSE,
            _ => TransitionEffects::NONE,
        }
    }
}

macro_rules! invoice_status {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
            IntoStaticStr,
        )]
        pub enum $name {
            Draft,
            Pending,
            Submitted,
            #[serde(rename = "Partially Paid")]
            #[strum(serialize = "Partially Paid")]
            PartiallyPaid,
            Paid,
            Voided,
            Overdue,
        }

        impl DocumentStatus for $name {
            const KIND: DocumentKind = $kind;
        }
    };
}

invoice_status!(
    /// 銷售發票狀態
    SalesInvoiceStatus,
    DocumentKind::SalesInvoice
);
invoice_status!(
    /// 採購發票狀態
    PurchaseInvoiceStatus,
    DocumentKind::PurchaseInvoice
);

/// 不合格品報告狀態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum NonConformanceStatus {
    Open,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    Closed,
}

impl DocumentStatus for NonConformanceStatus {
    const KIND: DocumentKind = DocumentKind::NonConformance;

    fn effects(self) -> TransitionEffects {
        match self {
            NonConformanceStatus::Closed => TransitionEffects {
                clear_assignee: true,
                stamp_close_date: true,
                stamp_completed_date: false,
            },
            _ => TransitionEffects::NONE,
        }
    }
}
