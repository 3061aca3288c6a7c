//! # MES Calculation Engine
//!
//! 純計算模組：製程樹扁平化、用量累乘、階層編號、工單需求推導。
//! 不做任何 I/O，輸入都是已讀出的節點列。

pub mod dependencies;
pub mod labels;
pub mod requirements;
pub mod rollup;
pub mod tree;

// Re-export 主要類型
pub use dependencies::DependencyBuilder;
pub use labels::{labels_for_levels, position_labels, PositionLabeler};
pub use requirements::{JobSnapshot, RequirementScope, RequirementsCalculator};
pub use rollup::{total_quantity, QuantityRollup};
pub use tree::{bill_of_materials, bill_of_process, MethodTree};
