//! 用量累乘

use mes_core::{FlatTreeNode, MesError, MethodNode, NodeId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 用量累乘計算器
///
/// 建立一次 `parent_id` 查找表，之後每個節點的祖先鏈都是 O(深度) 的查詢。
pub struct QuantityRollup<'a> {
    nodes: HashMap<NodeId, &'a MethodNode>,
}

impl<'a> QuantityRollup<'a> {
    pub fn new(nodes: impl IntoIterator<Item = &'a MethodNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    pub fn from_flat(flat_tree: &'a [FlatTreeNode]) -> Self {
        Self::new(flat_tree.iter().map(|f| &f.node))
    }

    /// 節點的絕對用量：自身用量 × 所有祖先用量
    ///
    /// 父節點不存在或祖先鏈出現循環時回傳 `MalformedTree`，
    /// 乘積超出 `Decimal` 範圍時回傳 `QuantityOverflow`。
    pub fn total_quantity(&self, node: &MethodNode) -> mes_core::Result<Decimal> {
        let mut total = node.quantity_per_parent;
        let mut current = node.parent_id;
        let mut steps = 0usize;

        while let Some(parent_id) = current {
            steps += 1;
            if steps > self.nodes.len() {
                return Err(MesError::MalformedTree(format!(
                    "節點 {} 的祖先鏈存在循環",
                    node.id
                )));
            }

            let parent = self.nodes.get(&parent_id).ok_or_else(|| {
                MesError::MalformedTree(format!("節點 {} 的父節點 {} 不存在", node.id, parent_id))
            })?;

            total = total.checked_mul(parent.quantity_per_parent).ok_or_else(|| {
                MesError::QuantityOverflow(format!("節點 {} 的累乘用量超出範圍", node.id))
            })?;
            current = parent.parent_id;
        }

        Ok(total)
    }

    pub fn total_quantity_of(&self, node_id: NodeId) -> mes_core::Result<Decimal> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or_else(|| MesError::not_found("節點", node_id))?;
        self.total_quantity(node)
    }
}

/// 計算單一節點在扁平樹中的絕對用量
pub fn total_quantity(node: &MethodNode, flat_tree: &[FlatTreeNode]) -> mes_core::Result<Decimal> {
    QuantityRollup::from_flat(flat_tree).total_quantity(node)
}
