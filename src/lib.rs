//! # MES
//!
//! 製造方法引擎：製程樹、用量累乘與位置標籤、版本管理、工單需求重算、單據狀態
//!
//! ```no_run
//! use mes::{Engine, InMemoryStore, MethodOwner};
//!
//! let engine = Engine::new(InMemoryStore::new());
//! # let item_id = mes::ItemId::new();
//! let method_id = engine.create_make_method(MethodOwner::Item(item_id))?;
//! engine.activate_version(item_id, method_id, None)?;
//! # Ok::<(), mes::MesError>(())
//! ```

pub use mes_calc::{
    bill_of_materials, bill_of_process, labels_for_levels, position_labels, total_quantity, DependencyBuilder, MethodTree,
    PositionLabeler, QuantityRollup, RequirementScope, RequirementsCalculator,
};
pub use mes_core::*;
pub use mes_engine::{
    CopiedMethod, Edit, Engine, FunctionInvoker, FunctionRequest, FunctionResponse, JobTransition, Recalculation,
    RequestContext, StaleRetry, TransitionGuard,
};
pub use mes_store::{DocumentTable, InMemoryStore, Snapshot, StaleTracker, Store};

pub use rust_decimal::Decimal;
