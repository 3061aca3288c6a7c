//! 背景函式呼叫
//!
//! 跨模組的重型作業（過帳收貨、整張排程圖重算）交給行程外的函式執行。
//! 請求以名稱呼叫，內容為 `{ type, ...ids, companyId, userId }`，
//! 回應為 `{ data }` 或 `{ error }`。

use mes_core::{CompanyId, DocumentId, JobId, MesError, Result, UserId};
use mes_store::Store;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{Engine, RequestContext};

/// 背景函式請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FunctionRequest {
    /// 工單轉 Ready 後重排整張排程圖
    #[serde(rename_all = "camelCase")]
    RecalculateSchedule {
        job_id: JobId,
        company_id: CompanyId,
        user_id: UserId,
    },

    /// 收貨過帳（庫存、成本與採購單狀態由函式處理）
    #[serde(rename_all = "camelCase")]
    PostReceipt {
        receipt_id: DocumentId,
        company_id: CompanyId,
        user_id: UserId,
    },
}

impl FunctionRequest {
    /// 函式名稱
    pub fn name(&self) -> &'static str {
        match self {
            FunctionRequest::RecalculateSchedule { .. } => "scheduler",
            FunctionRequest::PostReceipt { .. } => "post-receipt",
        }
    }

    pub fn to_body(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| MesError::FunctionFailed {
            function: self.name().to_string(),
            message: e.to_string(),
        })
    }
}

/// 背景函式回應
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionResponse {
    Data { data: Value },
    Error { error: Value },
}

impl FunctionResponse {
    pub fn into_result(self, function: &str) -> Result<Value> {
        match self {
            FunctionResponse::Data { data } => Ok(data),
            FunctionResponse::Error { error } => Err(MesError::FunctionFailed {
                function: function.to_string(),
                message: match error {
                    Value::String(message) => message,
                    other => other.to_string(),
                },
            }),
        }
    }
}

/// 背景函式呼叫端
///
/// 引擎只把函式當黑盒子：送出請求、取回 `data` 或 `error`。
pub trait FunctionInvoker: Send + Sync {
    fn invoke(&self, request: &FunctionRequest) -> Result<FunctionResponse>;
}

impl<S: Store> Engine<S> {
    /// 以名稱呼叫背景函式，`{ error }` 轉為 `FunctionFailed`
    pub fn invoke_function(&self, request: &FunctionRequest) -> Result<Value> {
        let invoker = self.invoker.as_ref().ok_or_else(|| MesError::FunctionFailed {
            function: request.name().to_string(),
            message: "未設定函式呼叫端".to_string(),
        })?;

        tracing::debug!("呼叫背景函式 {}", request.name());
        invoker
            .invoke(request)
            .and_then(|response| response.into_result(request.name()))
    }

    /// 過帳收貨單
    pub fn post_receipt(&self, receipt_id: DocumentId, ctx: &RequestContext) -> Result<Value> {
        let request = FunctionRequest::PostReceipt {
            receipt_id,
            company_id: ctx.company_id,
            user_id: ctx.user_id,
        };

        let result = self.invoke_function(&request);
        match &result {
            Ok(_) => tracing::info!("收貨單 {} 已過帳", receipt_id),
            Err(err) => tracing::warn!("收貨單 {} 過帳失敗: {}", receipt_id, err),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mes_store::InMemoryStore;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct EchoInvoker {
        requests: Mutex<Vec<Value>>,
    }

    impl FunctionInvoker for EchoInvoker {
        fn invoke(&self, request: &FunctionRequest) -> Result<FunctionResponse> {
            let body = request.to_body()?;
            self.requests.lock().unwrap().push(body.clone());
            Ok(FunctionResponse::Data { data: body })
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let job_id = JobId::new();
        let company_id = CompanyId::new();
        let user_id = UserId::new();

        let request = FunctionRequest::RecalculateSchedule {
            job_id,
            company_id,
            user_id,
        };

        assert_eq!(
            request.to_body().unwrap(),
            json!({
                "type": "recalculateSchedule",
                "jobId": job_id.to_string(),
                "companyId": company_id.to_string(),
                "userId": user_id.to_string(),
            })
        );
        assert_eq!(request.name(), "scheduler");
    }

    #[test]
    fn test_post_receipt_wire_shape() {
        let receipt_id = DocumentId::new();
        let ctx = RequestContext::new(CompanyId::new(), UserId::new());
        let invoker = Arc::new(EchoInvoker {
            requests: Mutex::new(Vec::new()),
        });
        let engine = Engine::new(InMemoryStore::new()).with_invoker(invoker.clone());

        let data = engine.post_receipt(receipt_id, &ctx).unwrap();

        let expected = json!({
            "type": "postReceipt",
            "receiptId": receipt_id.to_string(),
            "companyId": ctx.company_id.to_string(),
            "userId": ctx.user_id.to_string(),
        });
        assert_eq!(data, expected);
        assert_eq!(*invoker.requests.lock().unwrap(), vec![expected]);
    }

    #[test]
    fn test_post_receipt_without_invoker() {
        let engine = Engine::new(InMemoryStore::new());
        let ctx = RequestContext::new(CompanyId::new(), UserId::new());

        let err = engine.post_receipt(DocumentId::new(), &ctx).unwrap_err();
        assert!(matches!(err, MesError::FunctionFailed { function, .. } if function == "post-receipt"));
    }

    #[test]
    fn test_response_data() {
        let response: FunctionResponse = serde_json::from_value(json!({ "data": { "scheduled": 3 } })).unwrap();
        assert_eq!(response.into_result("scheduler").unwrap(), json!({ "scheduled": 3 }));
    }

    #[test]
    fn test_response_error() {
        let response: FunctionResponse = serde_json::from_value(json!({ "error": "排程逾時" })).unwrap();
        let err = response.into_result("scheduler").unwrap_err();
        assert_eq!(
            err,
            MesError::FunctionFailed {
                function: "scheduler".to_string(),
                message: "排程逾時".to_string(),
            }
        );
    }
}
