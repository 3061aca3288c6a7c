//! 單據生命週期

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DocumentId, UserId};
use crate::job::Job;
use crate::sales::{Quote, SalesRfq};
use crate::status::DocumentStatus;
use std::fmt;
use std::hash::Hash;

/// 單據的狀態與相關欄位
///
/// 狀態與副作用（清空負責人、蓋結案日）只能經由 [`Lifecycle::apply`] 一起寫入，
/// 不會出現「狀態已變、副作用未套用」的中間態。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle<S> {
    pub status: S,

    /// 負責人
    pub assignee: Option<UserId>,

    /// 結案日
    pub close_date: Option<NaiveDate>,

    /// 完工日
    pub completed_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub updated_by: Option<UserId>,
}

impl<S: DocumentStatus> Lifecycle<S> {
    pub fn new(status: S) -> Self {
        let now = Utc::now();
        Self {
            status,
            assignee: None,
            close_date: None,
            completed_date: None,
            created_at: now,
            updated_at: now,
            updated_by: None,
        }
    }

    /// 建構器模式：設置負責人
    pub fn with_assignee(mut self, assignee: UserId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// 套用狀態與其副作用
    pub fn apply(&mut self, status: S, at: DateTime<Utc>, by: Option<UserId>) {
        let effects = status.effects();

        self.status = status;
        if effects.clear_assignee {
            self.assignee = None;
        }
        if effects.stamp_close_date {
            self.close_date = Some(at.date_naive());
        }
        if effects.stamp_completed_date {
            self.completed_date = Some(at.date_naive());
        }
        self.updated_at = at;
        self.updated_by = by;
    }
}

/// 只有狀態欄位的一般單據（銷售訂單、採購訂單、發票、不合格品報告）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<S> {
    pub id: DocumentId,
    pub lifecycle: Lifecycle<S>,
}

impl<S: DocumentStatus> Document<S> {
    pub fn new(status: S) -> Self {
        Self {
            id: DocumentId::new(),
            lifecycle: Lifecycle::new(status),
        }
    }

    pub fn status(&self) -> S {
        self.lifecycle.status
    }
}

/// 具有狀態生命週期的單據
pub trait StatusDocument {
    type Status: DocumentStatus;
    type Id: Copy + Eq + Hash + fmt::Display;

    /// 錯誤訊息中使用的實體名稱
    const ENTITY: &'static str;

    fn id(&self) -> Self::Id;

    fn lifecycle(&self) -> &Lifecycle<Self::Status>;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle<Self::Status>;
}

impl<S: DocumentStatus> StatusDocument for Document<S> {
    type Status = S;
    type Id = DocumentId;

    const ENTITY: &'static str = "單據";

    fn id(&self) -> DocumentId {
        self.id
    }

    fn lifecycle(&self) -> &Lifecycle<S> {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle<S> {
        &mut self.lifecycle
    }
}

macro_rules! status_document {
    ($ty:ty, $status:ty, $id:ty, $entity:expr) => {
        impl StatusDocument for $ty {
            type Status = $status;
            type Id = $id;

            const ENTITY: &'static str = $entity;

            fn id(&self) -> $id {
                self.id
            }

            fn lifecycle(&self) -> &Lifecycle<$status> {
                &self.lifecycle
            }

            fn lifecycle_mut(&mut self) -> &mut Lifecycle<$status> {
                &mut self.lifecycle
            }
        }
    };
}

status_document!(Job, crate::status::JobStatus, crate::ids::JobId, "工單");
status_document!(Quote, crate::status::QuoteStatus, crate::ids::QuoteId, "報價單");
status_document!(SalesRfq, crate::status::SalesRfqStatus, crate::ids::SalesRfqId, "詢價單");
