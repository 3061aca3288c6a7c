//! # MES Engine
//!
//! 製程樹編輯、版本管理、需求重算與單據狀態服務

pub mod engine;
pub mod functions;
pub mod recalc;
pub mod status;
pub mod tree;
pub mod versioning;

pub use engine::{Engine, RequestContext};
pub use functions::{FunctionInvoker, FunctionRequest, FunctionResponse};
pub use recalc::{Edit, Recalculation, StaleRetry};
pub use status::{JobTransition, TransitionGuard};
pub use versioning::CopiedMethod;
