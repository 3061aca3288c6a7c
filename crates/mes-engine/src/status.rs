//! 單據狀態轉換
//!
//! 流程：解析狀態字串（不在清單內為 `InvalidStatus`）→ 守衛 →
//! 狀態與副作用在同一個交易內寫入。被拒絕的轉換不會留下任何中間狀態。

use chrono::Utc;
use mes_core::{
    Document, DocumentStatus, Job, JobId, JobStatus, MesError, Quote, Result, SalesRfq, StatusDocument,
};
use mes_store::{DocumentTable, Snapshot, Store};
use serde_json::Value;

use crate::engine::{Engine, RequestContext};
use crate::functions::FunctionRequest;
use crate::recalc::Recalculation;

/// 狀態轉換的業務守衛
///
/// 預設不設限；需要讀取其他資料的檢查（例如料件是否禁止生產）在此實作。
pub trait TransitionGuard: StatusDocument {
    fn guard(&self, _status: Self::Status, _snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }
}

impl TransitionGuard for Job {
    fn guard(&self, status: JobStatus, snapshot: &Snapshot) -> Result<()> {
        if status != JobStatus::Ready {
            return Ok(());
        }

        let item = snapshot.item(self.item_id)?;
        if item.is_manufacturing_blocked() {
            return Err(MesError::ManufacturingBlocked {
                job_id: self.id,
                item_id: item.id,
            });
        }
        Ok(())
    }
}

impl TransitionGuard for Quote {}

impl TransitionGuard for SalesRfq {}

impl<S: DocumentStatus> TransitionGuard for Document<S> {}

/// 工單狀態轉換結果
#[derive(Debug, Clone, PartialEq)]
pub struct JobTransition {
    pub status: JobStatus,
    /// 轉為 Ready 後的需求重算
    pub recalculation: Recalculation,
    /// 排程函式的回應；未呼叫時為 None
    pub schedule: Option<Result<Value>>,
}

impl<S: Store> Engine<S> {
    /// 轉換單據狀態
    pub fn transition<D>(&self, id: D::Id, raw_status: &str, ctx: &RequestContext) -> Result<D::Status>
    where
        D: TransitionGuard,
        Snapshot: DocumentTable<D>,
    {
        let status = D::Status::parse(raw_status).map_err(|err| {
            tracing::warn!("拒絕狀態轉換 {} {}: {}", D::ENTITY, id, err);
            err
        })?;

        let previous = self.store.transaction(|s| {
            let document = s.document::<D>(id)?;
            let previous = document.lifecycle().status;
            document.guard(status, s)?;

            s.document_mut::<D>(id)?
                .lifecycle_mut()
                .apply(status, Utc::now(), Some(ctx.user_id));
            Ok(previous)
        })?;

        tracing::info!("{} {} 狀態：{} → {}", D::ENTITY, id, previous, status);
        Ok(status)
    }

    /// 轉換工單狀態
    ///
    /// 轉為 Ready 時先檢查料件是否禁止生產；提交後重算需求，
    /// 並依配置請排程函式重排。後兩步失敗不影響已提交的狀態。
    pub fn transition_job(&self, job_id: JobId, raw_status: &str, ctx: &RequestContext) -> Result<JobTransition> {
        let status = self.transition::<Job>(job_id, raw_status, ctx)?;

        if status != JobStatus::Ready {
            return Ok(JobTransition {
                status,
                recalculation: Recalculation::NotRequired,
                schedule: None,
            });
        }

        let recalculation = match self.recalculate_requirements(job_id) {
            Ok(_) => Recalculation::Completed { job_id },
            Err(error) => Recalculation::Failed { job_id, error },
        };

        Ok(JobTransition {
            status,
            recalculation,
            schedule: self.request_schedule(job_id, ctx),
        })
    }

    fn request_schedule(&self, job_id: JobId, ctx: &RequestContext) -> Option<Result<Value>> {
        if !self.config.schedule_on_ready || self.invoker.is_none() {
            return None;
        }

        let request = FunctionRequest::RecalculateSchedule {
            job_id,
            company_id: ctx.company_id,
            user_id: ctx.user_id,
        };
        let result = self.invoke_function(&request);

        if let Err(err) = &result {
            tracing::warn!("工單 {} 排程請求失敗: {}", job_id, err);
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FunctionInvoker, FunctionResponse};
    use mes_core::{
        CompanyId, DocumentId, Item, ItemId, NonConformanceStatus, PurchaseOrderStatus, QuoteStatus,
        SalesInvoiceStatus, SalesRfqStatus, UserId,
    };
    use mes_store::InMemoryStore;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct Fixture {
        engine: Engine<InMemoryStore>,
        ctx: RequestContext,
        job_id: JobId,
        item_id: ItemId,
    }

    fn fixture(blocked: bool) -> Fixture {
        let mut snapshot = Snapshot::new();
        let item = Item::new("DESK-001").with_manufacturing_blocked(blocked);
        let ctx = RequestContext::new(CompanyId::new(), UserId::new());
        let job = Job::new(item.id, Decimal::from(3));
        let (job_id, item_id) = (job.id, item.id);
        snapshot.items.insert(item.id, item);
        snapshot.insert_document(job);

        Fixture {
            engine: Engine::new(InMemoryStore::with_snapshot(snapshot)),
            ctx,
            job_id,
            item_id,
        }
    }

    fn job(f: &Fixture) -> Job {
        f.engine.store().read(|s| Ok(s.job(f.job_id)?.clone())).unwrap()
    }

    #[derive(Default)]
    struct RecordingInvoker {
        requests: Mutex<Vec<FunctionRequest>>,
        fail: bool,
    }

    impl FunctionInvoker for RecordingInvoker {
        fn invoke(&self, request: &FunctionRequest) -> Result<FunctionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Ok(FunctionResponse::Error { error: json!("排程器忙碌") })
            } else {
                Ok(FunctionResponse::Data { data: json!({ "ok": true }) })
            }
        }
    }

    #[test]
    fn test_ready_blocked_by_manufacturing_flag() {
        let f = fixture(true);

        let result = f.engine.transition_job(f.job_id, "Ready", &f.ctx);
        assert_eq!(
            result.unwrap_err(),
            MesError::ManufacturingBlocked {
                job_id: f.job_id,
                item_id: f.item_id,
            }
        );
        assert_eq!(job(&f).status(), JobStatus::Draft);
    }

    #[test]
    fn test_ready_recalculates_and_schedules() {
        let invoker = Arc::new(RecordingInvoker::default());
        let mut f = fixture(false);
        f.engine = f.engine.with_invoker(invoker.clone());

        let transition = f.engine.transition_job(f.job_id, "Ready", &f.ctx).unwrap();

        assert_eq!(transition.status, JobStatus::Ready);
        assert_eq!(transition.recalculation, Recalculation::Completed { job_id: f.job_id });
        assert_eq!(transition.schedule, Some(Ok(json!({ "ok": true }))));
        assert!(f.engine.requirements(f.job_id).unwrap().is_some());

        let requests = invoker.requests.lock().unwrap();
        assert_eq!(
            *requests,
            vec![FunctionRequest::RecalculateSchedule {
                job_id: f.job_id,
                company_id: f.ctx.company_id,
                user_id: f.ctx.user_id,
            }]
        );
    }

    #[test]
    fn test_schedule_failure_keeps_status() {
        let invoker = Arc::new(RecordingInvoker {
            fail: true,
            ..Default::default()
        });
        let mut f = fixture(false);
        f.engine = f.engine.with_invoker(invoker);

        let transition = f.engine.transition_job(f.job_id, "Ready", &f.ctx).unwrap();
        assert!(matches!(transition.schedule, Some(Err(MesError::FunctionFailed { .. }))));
        assert_eq!(job(&f).status(), JobStatus::Ready);
    }

    #[test]
    fn test_cancel_clears_assignee() {
        let f = fixture(false);
        f.engine
            .store()
            .transaction(|s| {
                s.job_mut(f.job_id)?.lifecycle.assignee = Some(UserId::new());
                Ok(())
            })
            .unwrap();

        let transition = f.engine.transition_job(f.job_id, "Cancelled", &f.ctx).unwrap();

        assert_eq!(transition.recalculation, Recalculation::NotRequired);
        let job = job(&f);
        assert_eq!(job.status(), JobStatus::Cancelled);
        assert_eq!(job.lifecycle.assignee, None);
        assert_eq!(job.lifecycle.updated_by, Some(f.ctx.user_id));
    }

    #[rstest]
    #[case("Started")]
    #[case("ready")]
    #[case("")]
    fn test_unknown_status_rejected(#[case] raw: &str) {
        let f = fixture(false);
        let result = f.engine.transition_job(f.job_id, raw, &f.ctx);
        assert!(matches!(result, Err(MesError::InvalidStatus { .. })));
        assert_eq!(job(&f).status(), JobStatus::Draft);
    }

    #[test]
    fn test_quote_sent_clears_assignee() {
        let f = fixture(false);
        let quote = Quote {
            lifecycle: mes_core::Lifecycle::new(QuoteStatus::Draft).with_assignee(UserId::new()),
            ..Quote::new()
        };
        let quote_id = quote.id;
        f.engine
            .store()
            .transaction(|s| {
                s.insert_document(quote);
                Ok(())
            })
            .unwrap();

        let status = f.engine.transition::<Quote>(quote_id, "Sent", &f.ctx).unwrap();
        assert_eq!(status, QuoteStatus::Sent);
        let assignee = f.engine.store().read(|s| Ok(s.quote(quote_id)?.lifecycle.assignee)).unwrap();
        assert_eq!(assignee, None);
    }

    #[test]
    fn test_rfq_and_order_statuses_with_spaces() {
        let f = fixture(false);
        let rfq = SalesRfq::new();
        let rfq_id = rfq.id;
        let order = Document::new(PurchaseOrderStatus::Draft);
        let order_id = order.id;
        f.engine
            .store()
            .transaction(|s| {
                s.insert_document(rfq);
                s.insert_document(order);
                Ok(())
            })
            .unwrap();

        assert_eq!(
            f.engine.transition::<SalesRfq>(rfq_id, "Ready for Quote", &f.ctx).unwrap(),
            SalesRfqStatus::ReadyForQuote
        );
        assert_eq!(
            f.engine
                .transition::<Document<PurchaseOrderStatus>>(order_id, "To Receive and Invoice", &f.ctx)
                .unwrap(),
            PurchaseOrderStatus::ToReceiveAndInvoice
        );
    }

    #[test]
    fn test_non_conformance_close() {
        let f = fixture(false);
        let mut report = Document::new(NonConformanceStatus::Open);
        report.lifecycle.assignee = Some(UserId::new());
        let report_id = report.id;
        f.engine
            .store()
            .transaction(|s| {
                s.insert_document(report);
                Ok(())
            })
            .unwrap();

        f.engine
            .transition::<Document<NonConformanceStatus>>(report_id, "Closed", &f.ctx)
            .unwrap();

        let lifecycle = f
            .engine
            .store()
            .read(|s| Ok(s.document::<Document<NonConformanceStatus>>(report_id)?.lifecycle.clone()))
            .unwrap();
        assert_eq!(lifecycle.status, NonConformanceStatus::Closed);
        assert_eq!(lifecycle.assignee, None);
        assert!(lifecycle.close_date.is_some());
    }

    #[test]
    fn test_missing_document() {
        let f = fixture(false);
        let result = f
            .engine
            .transition::<Document<SalesInvoiceStatus>>(DocumentId::new(), "Paid", &f.ctx);
        assert!(matches!(result, Err(MesError::NotFound { .. })));
    }
}
