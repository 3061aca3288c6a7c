//! 製程樹查找表
//!
//! 讀取一個製造方法的扁平節點列後建立 ID 索引（arena 風格），
//! 提供子節點查詢、子樹收集與前序扁平化。

use mes_core::{FlatTreeNode, MesError, MethodNode, NodeId};
use std::collections::{HashMap, HashSet};

use crate::labels::PositionLabeler;

/// 製程樹
#[derive(Debug, Clone)]
pub struct MethodTree {
    nodes: HashMap<NodeId, MethodNode>,

    /// 父節點 → 已排序的子節點（None 為根層）
    children: HashMap<Option<NodeId>, Vec<NodeId>>,
}

impl MethodTree {
    /// 由節點列建立樹
    ///
    /// 父節點不在同一份節點列中視為損壞的樹。
    pub fn build(nodes: impl IntoIterator<Item = MethodNode>) -> mes_core::Result<Self> {
        let nodes: HashMap<NodeId, MethodNode> = nodes.into_iter().map(|n| (n.id, n)).collect();

        let mut children: HashMap<Option<NodeId>, Vec<NodeId>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent_id) = node.parent_id {
                if !nodes.contains_key(&parent_id) {
                    return Err(MesError::MalformedTree(format!(
                        "節點 {} 的父節點 {} 不存在",
                        node.id, parent_id
                    )));
                }
            }
            children.entry(node.parent_id).or_default().push(node.id);
        }

        for siblings in children.values_mut() {
            siblings.sort_by_key(|id| nodes[id].sort_key());
        }

        Ok(Self { nodes, children })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&MethodNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MethodNode> {
        self.nodes.values()
    }

    /// 已排序的子節點
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        self.children(None)
    }

    /// 同層的工序（依排序）
    pub fn sibling_operations(&self, parent: Option<NodeId>) -> Vec<&MethodNode> {
        self.children(parent)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| n.is_operation())
            .collect()
    }

    /// 節點本身及其所有子孫（前序）
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(&current) || !visited.insert(current) {
                continue;
            }
            result.push(current);
            for child in self.children(Some(current)).iter().rev() {
                stack.push(*child);
            }
        }

        result
    }

    /// 前序扁平化，並指派階層編號
    ///
    /// 同層依 `(order, id)` 排序。有節點無法由根層走到（循環）或深度超過
    /// `max_depth` 時回傳 `MalformedTree`。
    pub fn flatten(&self, max_depth: usize) -> mes_core::Result<Vec<FlatTreeNode>> {
        let mut flat = Vec::with_capacity(self.nodes.len());
        let mut labeler = PositionLabeler::new();
        let mut stack: Vec<(NodeId, usize)> = self.roots().iter().rev().map(|id| (*id, 0)).collect();

        while let Some((id, level)) = stack.pop() {
            if level > max_depth {
                return Err(MesError::MalformedTree(format!(
                    "樹深度超過上限 {}（節點 {}）",
                    max_depth, id
                )));
            }

            for child in self.children(Some(id)).iter().rev() {
                stack.push((*child, level + 1));
            }

            flat.push(FlatTreeNode {
                node: self.nodes[&id].clone(),
                level,
                position_label: labeler.next(level),
            });
        }

        if flat.len() != self.nodes.len() {
            return Err(MesError::MalformedTree(format!(
                "有 {} 個節點無法由根層到達（可能存在循環）",
                self.nodes.len() - flat.len()
            )));
        }

        Ok(flat)
    }
}

/// 物料清單（BOM）投影
pub fn bill_of_materials(flat: &[FlatTreeNode]) -> Vec<&FlatTreeNode> {
    flat.iter().filter(|f| f.node.is_material()).collect()
}

/// 製程清單（BOP）投影
pub fn bill_of_process(flat: &[FlatTreeNode]) -> Vec<&FlatTreeNode> {
    flat.iter().filter(|f| f.node.is_operation()).collect()
}
