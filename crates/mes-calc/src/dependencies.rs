//! 工序相依關係
//!
//! 兩條規則：
//! 1. 同層工序依 `(order, id)` 分成步驟；`AfterPrevious` 開新步驟，`WithPrevious`
//!    併入前一步驟。每個步驟的工序都相依於前一步驟的所有工序。
//! 2. 子件（有下層工序的物料）在上層某道工序投料，該工序相依於子件最後一個步驟。

use mes_core::{MesError, MethodNode, NodeId, OperationDependency, OperationSequencing};
use std::collections::{BTreeSet, HashSet};

use crate::tree::MethodTree;

/// 工序相依計算器
pub struct DependencyBuilder<'a> {
    tree: &'a MethodTree,
}

impl<'a> DependencyBuilder<'a> {
    pub fn new(tree: &'a MethodTree) -> Self {
        Self { tree }
    }

    /// 計算整棵樹的工序相依
    pub fn build(&self) -> mes_core::Result<BTreeSet<OperationDependency>> {
        let mut dependencies = BTreeSet::new();

        let mut parents: Vec<Option<NodeId>> = vec![None];
        parents.extend(self.tree.nodes().filter(|n| n.is_material()).map(|n| Some(n.id)));

        // 規則 1：同層步驟
        for parent in &parents {
            let steps = self.steps(*parent);
            for pair in steps.windows(2) {
                for operation_id in &pair[1] {
                    for depends_on in &pair[0] {
                        dependencies.insert(OperationDependency {
                            operation_id: *operation_id,
                            depends_on: *depends_on,
                        });
                    }
                }
            }
        }

        // 規則 2：子件完成後才能投料
        for material in self.tree.nodes().filter(|n| n.is_material()) {
            self.validate_operation_link(material)?;

            let Some(final_step) = self.steps(Some(material.id)).pop() else {
                continue;
            };

            for consumer in self.consumers(material)? {
                for producer in &final_step {
                    dependencies.insert(OperationDependency {
                        operation_id: consumer,
                        depends_on: *producer,
                    });
                }
            }
        }

        tracing::debug!("工序相依: {} 筆", dependencies.len());

        Ok(dependencies)
    }

    /// 同層工序的步驟分組
    pub fn steps(&self, parent: Option<NodeId>) -> Vec<Vec<NodeId>> {
        let mut steps: Vec<Vec<NodeId>> = Vec::new();

        for operation in self.tree.sibling_operations(parent) {
            let sequencing = operation
                .operation()
                .map(|o| o.sequencing)
                .unwrap_or_default();

            if sequencing == OperationSequencing::WithPrevious {
                if let Some(step) = steps.last_mut() {
                    step.push(operation.id);
                    continue;
                }
            }
            steps.push(vec![operation.id]);
        }

        steps
    }

    /// 投料工序：明確指定者優先，否則為同層第一個步驟；
    /// 同層沒有工序時沿用父件的投料工序
    fn consumers(&self, material: &MethodNode) -> mes_core::Result<Vec<NodeId>> {
        let mut current = material;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(current.id) {
                return Err(MesError::MalformedTree(format!(
                    "節點 {} 的祖先鏈存在循環",
                    material.id
                )));
            }

            if let Some(operation_id) = current.operation_id() {
                return Ok(vec![operation_id]);
            }

            if let Some(first_step) = self.steps(current.parent_id).into_iter().next() {
                return Ok(first_step);
            }

            match current.parent_id.and_then(|p| self.tree.node(p)) {
                Some(parent) => current = parent,
                None => return Ok(Vec::new()),
            }
        }
    }

    /// 投料工序必須是同層的工序
    fn validate_operation_link(&self, material: &MethodNode) -> mes_core::Result<()> {
        let Some(operation_id) = material.operation_id() else {
            return Ok(());
        };

        match self.tree.node(operation_id) {
            Some(op) if op.is_operation() && op.parent_id == material.parent_id => Ok(()),
            _ => Err(MesError::MalformedTree(format!(
                "物料 {} 的投料工序 {} 不是同層工序",
                material.id, operation_id
            ))),
        }
    }
}
