//! 製程樹編輯
//!
//! 每個編輯在單一交易內完成驗證與寫入；擁有者是工單時，
//! 提交後接著重算需求（見 [`crate::recalc`]）。

use chrono::Utc;
use mes_calc::MethodTree;
use mes_core::{
    FlatTreeNode, JobId, MakeMethod, MakeMethodId, MesError, MethodNode, MethodOwner, NewNode, NodeDetail, NodeId,
    Result,
};
use mes_store::{Snapshot, Store};
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::engine::Engine;
use crate::recalc::Edit;

/// 擁有者必須存在
pub(crate) fn ensure_owner(snapshot: &Snapshot, owner: MethodOwner) -> Result<()> {
    match owner {
        MethodOwner::Item(id) => snapshot.item(id).map(|_| ()),
        MethodOwner::Job(id) => snapshot.job(id).map(|_| ()),
        MethodOwner::QuoteLine(id) => snapshot.quote_line(id).map(|_| ()),
    }
}

/// 建立擁有者的製造方法
///
/// 料件每次建立新的未生效版本；報價明細與工單只有一份，已存在時沿用。
pub(crate) fn create_method_in(snapshot: &mut Snapshot, owner: MethodOwner) -> Result<MakeMethodId> {
    ensure_owner(snapshot, owner)?;

    if let MethodOwner::Item(item_id) = owner {
        let method = MakeMethod::new(owner, snapshot.next_version(item_id));
        let id = method.id;
        snapshot.make_methods.insert(id, method);
        return Ok(id);
    }

    if let Some(existing) = snapshot.method_for(owner) {
        return Ok(existing.id);
    }

    let method = MakeMethod::new(owner, 1);
    let id = method.id;
    snapshot.make_methods.insert(id, method);
    Ok(id)
}

/// 可編輯的製造方法，回傳其擁有者
///
/// 被新版本取代的料件版本保持原樣，只能複製成新版本後再修改。
fn editable_owner(snapshot: &Snapshot, make_method_id: MakeMethodId) -> Result<MethodOwner> {
    let method = snapshot.make_method(make_method_id)?;
    if method.is_superseded() {
        return Err(MesError::SupersededVersion { make_method_id });
    }
    Ok(method.owner)
}

fn validate_quantity(quantity: Decimal) -> Result<()> {
    if quantity < Decimal::ZERO {
        return Err(MesError::InvalidQuantity(quantity));
    }
    Ok(())
}

fn validate_parent(snapshot: &Snapshot, make_method_id: MakeMethodId, parent_id: NodeId) -> Result<()> {
    let reason = match snapshot.nodes.get(&parent_id) {
        None => "父節點不存在",
        Some(parent) if parent.make_method_id != make_method_id => "父節點屬於其他製造方法",
        Some(parent) if parent.is_operation() => "工序不可有子節點",
        Some(_) => return Ok(()),
    };

    Err(MesError::InvalidParent {
        parent_id,
        reason: reason.to_string(),
    })
}

fn validate_operation_link(
    snapshot: &Snapshot,
    make_method_id: MakeMethodId,
    parent_id: Option<NodeId>,
    operation_id: NodeId,
) -> Result<()> {
    let reason = match snapshot.nodes.get(&operation_id) {
        None => "工序不存在",
        Some(op) if !op.is_operation() => "投料節點不是工序",
        Some(op) if op.make_method_id != make_method_id || op.parent_id != parent_id => "投料工序不在同一層",
        Some(_) => return Ok(()),
    };

    Err(MesError::InvalidOperationLink {
        operation_id,
        reason: reason.to_string(),
    })
}

impl<S: Store> Engine<S> {
    /// 為擁有者建立製造方法
    pub fn create_make_method(&self, owner: MethodOwner) -> Result<MakeMethodId> {
        let id = self.store.transaction(|s| create_method_in(s, owner))?;
        tracing::info!("建立製造方法 {}（{}）", id, owner);
        Ok(id)
    }

    /// 新增節點
    ///
    /// `parent_id` 為 None 時為根節點。工序的用量固定為 1。
    pub fn add_node(
        &self,
        make_method_id: MakeMethodId,
        parent_id: Option<NodeId>,
        new_node: NewNode,
    ) -> Result<Edit<NodeId>> {
        let (node_id, owner) = self.store.transaction(|s| {
            let owner = editable_owner(s, make_method_id)?;

            validate_quantity(new_node.quantity_per_parent)?;
            if let Some(parent_id) = parent_id {
                validate_parent(s, make_method_id, parent_id)?;
            }

            let mut node = new_node.into_node(NodeId::new(), make_method_id, parent_id);
            match &node.detail {
                NodeDetail::Material {
                    operation_id: Some(operation_id),
                    ..
                } => validate_operation_link(s, make_method_id, parent_id, *operation_id)?,
                NodeDetail::Operation(_) => node.quantity_per_parent = Decimal::ONE,
                _ => {}
            }

            let node_id = node.id;
            s.insert_nodes([node]);
            Ok((node_id, owner))
        })?;

        tracing::debug!("新增節點 {} 到製造方法 {}", node_id, make_method_id);
        Ok(Edit::new(node_id, self.after_edit(owner)))
    }

    /// 刪除節點與其所有子孫
    ///
    /// 指向被刪除工序的物料改回預設投料（同層第一道工序）。
    pub fn remove_node(&self, node_id: NodeId) -> Result<Edit<Vec<NodeId>>> {
        let (removed, owner) = self.store.transaction(|s| {
            let make_method_id = s.node(node_id)?.make_method_id;
            let owner = editable_owner(s, make_method_id)?;

            let tree = MethodTree::build(s.nodes_of(make_method_id))?;
            let removed = tree.subtree(node_id);
            let removed_set: HashSet<NodeId> = removed.iter().copied().collect();

            for id in &removed {
                s.nodes.remove(id);
            }

            for node in s.nodes.values_mut().filter(|n| n.make_method_id == make_method_id) {
                if let NodeDetail::Material { operation_id, .. } = &mut node.detail {
                    if operation_id.is_some_and(|op| removed_set.contains(&op)) {
                        *operation_id = None;
                    }
                }
            }

            Ok((removed, owner))
        })?;

        tracing::info!("刪除節點 {}，連同子孫共 {} 個", node_id, removed.len());
        Ok(Edit::new(removed, self.after_edit(owner)))
    }

    /// 批次更新排序
    ///
    /// 任一筆不合法時整批都不套用。
    pub fn reorder(&self, make_method_id: MakeMethodId, updates: &[(NodeId, i32)]) -> Result<Edit<()>> {
        let owner = self.store.transaction(|s| {
            let owner = editable_owner(s, make_method_id)?;

            // Step 1: 全部驗證
            for (node_id, order) in updates {
                let reason = match s.nodes.get(node_id) {
                    None => Some("節點不存在"),
                    Some(node) if node.make_method_id != make_method_id => Some("節點屬於其他製造方法"),
                    Some(_) if *order < 0 => Some("排序不可為負數"),
                    Some(_) => None,
                };

                if let Some(reason) = reason {
                    return Err(MesError::PartialUpdateFailure {
                        node_id: *node_id,
                        reason: reason.to_string(),
                    });
                }
            }

            // Step 2: 全部寫入
            for (node_id, order) in updates {
                s.node_mut(*node_id)?.order = *order;
            }

            Ok(owner)
        })?;

        tracing::debug!("製造方法 {} 重新排序 {} 個節點", make_method_id, updates.len());
        Ok(Edit::new((), self.after_edit(owner)))
    }

    /// 修改物料用量
    pub fn update_quantity(&self, node_id: NodeId, quantity: Decimal) -> Result<Edit<()>> {
        let owner = self.store.transaction(|s| {
            validate_quantity(quantity)?;

            let node = s.node(node_id)?;
            if node.is_operation() {
                return Err(MesError::InvalidQuantity(quantity));
            }
            let owner = editable_owner(s, node.make_method_id)?;

            s.node_mut(node_id)?.quantity_per_parent = quantity;
            Ok(owner)
        })?;

        Ok(Edit::new((), self.after_edit(owner)))
    }

    /// 修改工單批量
    pub fn set_job_quantity(&self, job_id: JobId, quantity: Decimal) -> Result<Edit<()>> {
        self.store.transaction(|s| {
            validate_quantity(quantity)?;
            let job = s.job_mut(job_id)?;
            job.quantity = quantity;
            job.lifecycle.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!("工單 {} 批量改為 {}", job_id, quantity);
        Ok(Edit::new((), self.after_edit(MethodOwner::Job(job_id))))
    }

    /// 製造方法的所有節點
    pub fn nodes(&self, make_method_id: MakeMethodId) -> Result<Vec<MethodNode>> {
        self.store.read(|s| {
            s.make_method(make_method_id)?;
            Ok(s.nodes_of(make_method_id))
        })
    }

    /// 前序扁平化並加上位置標籤
    pub fn flatten(&self, make_method_id: MakeMethodId) -> Result<Vec<FlatTreeNode>> {
        let nodes = self.nodes(make_method_id)?;
        MethodTree::build(nodes)?.flatten(self.config.max_depth)
    }
}
