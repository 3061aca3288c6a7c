//! 製造方法版本管理
//!
//! 製程樹可以屬於料件（多版本，恰好一版生效）、報價明細或工單。
//! 複製在擁有者之間搬移整棵樹；詢價轉報價把每一行的樹一起帶過去。

use chrono::Utc;
use mes_core::{
    DocumentKind, ItemId, MakeMethod, MakeMethodId, MesError, MethodNode, MethodOwner, NodeDetail, NodeId, Quote, QuoteId,
    QuoteLine, Result, SalesRfq, SalesRfqId, SalesRfqStatus,
};
use mes_store::{Snapshot, Store};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::engine::{lock, Engine};
use crate::recalc::Edit;
use crate::tree::{create_method_in, ensure_owner};

/// 複製結果
#[derive(Debug, Clone, PartialEq)]
pub struct CopiedMethod {
    pub make_method_id: MakeMethodId,
    /// 新樹的根節點，順序同原樹
    pub roots: Vec<NodeId>,
    /// 原節點 → 新節點
    pub node_map: HashMap<NodeId, NodeId>,
}

/// 擁有者目前使用的製造方法
///
/// 料件取生效版本，沒有時為 `NoActiveMethod`。
pub(crate) fn resolve_source(snapshot: &Snapshot, owner: MethodOwner) -> Result<MakeMethodId> {
    match (owner, snapshot.method_for(owner)) {
        (_, Some(method)) => Ok(method.id),
        (MethodOwner::Item(item_id), None) => Err(MesError::NoActiveMethod { item_id }),
        (owner, None) => Err(MesError::not_found("製造方法", owner)),
    }
}

/// 深度複製一棵樹到目標擁有者
///
/// 節點 id 全部重新產生，`parent_id` 與投料工序依對照表改寫；
/// 用量、排序、料件與工序內容原樣保留。
pub(crate) fn copy_tree(snapshot: &mut Snapshot, source: MakeMethodId, target: MethodOwner) -> Result<CopiedMethod> {
    snapshot.make_method(source)?;
    let nodes = snapshot.nodes_of(source);

    // Step 1: 目標製造方法（料件開新版本，其他擁有者清空舊樹）
    let make_method_id = create_method_in(snapshot, target)?;
    if !target.is_versioned() {
        snapshot.clear_nodes(make_method_id);
    }

    // Step 2: 新舊 id 對照
    let node_map: HashMap<NodeId, NodeId> = nodes.iter().map(|n| (n.id, NodeId::new())).collect();
    let remap = |id: NodeId| {
        node_map
            .get(&id)
            .copied()
            .ok_or_else(|| MesError::MalformedTree(format!("製造方法 {} 的節點參照了樹外的節點 {}", source, id)))
    };

    // Step 3: 改寫參照
    let mut copies: Vec<MethodNode> = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let mut copy = node.clone();
        copy.id = remap(node.id)?;
        copy.make_method_id = make_method_id;
        copy.parent_id = node.parent_id.map(&remap).transpose()?;
        if let NodeDetail::Material { operation_id, .. } = &mut copy.detail {
            *operation_id = operation_id.map(&remap).transpose()?;
        }
        copies.push(copy);
    }

    let roots = copies.iter().filter(|n| n.parent_id.is_none()).map(|n| n.id).collect();
    snapshot.insert_nodes(copies);

    tracing::debug!("複製製造方法 {} → {}（{} 個節點）", source, make_method_id, node_map.len());

    Ok(CopiedMethod {
        make_method_id,
        roots,
        node_map,
    })
}

/// 同一料件同時只允許一個啟用流程
struct ActivationGuard<'a> {
    in_flight: &'a Mutex<HashSet<ItemId>>,
    item_id: ItemId,
}

impl<'a> ActivationGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<ItemId>>, item_id: ItemId) -> Result<Self> {
        if !lock(in_flight)?.insert(item_id) {
            return Err(MesError::ConcurrentActivation { item_id });
        }
        Ok(Self { in_flight, item_id })
    }
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = lock(self.in_flight) {
            in_flight.remove(&self.item_id);
        }
    }
}

impl<S: Store> Engine<S> {
    /// 複製製程樹
    ///
    /// 來源是料件時取其生效版本；目標是料件時建立新的未生效版本，
    /// 目標是報價明細或工單時取代原本的樹。目標是工單時接著重算。
    pub fn copy_method(&self, source: MethodOwner, target: MethodOwner) -> Result<Edit<CopiedMethod>> {
        tracing::info!("複製製程樹：{} → {}", source, target);

        let copied = self.store.transaction(|s| {
            ensure_owner(s, source)?;
            let source_method = resolve_source(s, source)?;
            copy_tree(s, source_method, target)
        })?;

        tracing::info!(
            "複製完成：製造方法 {}，{} 個節點",
            copied.make_method_id,
            copied.node_map.len()
        );
        Ok(Edit::new(copied, self.after_edit(target)))
    }

    /// 切換料件的生效版本
    ///
    /// `expected_active` 是呼叫端讀到的目前生效版本，與實際不符時視為同時啟用。
    /// 舊版本停用與新版本生效在同一個交易內完成。
    pub fn activate_version(
        &self,
        item_id: ItemId,
        version_id: MakeMethodId,
        expected_active: Option<MakeMethodId>,
    ) -> Result<()> {
        let _guard = ActivationGuard::acquire(&self.activations, item_id)?;

        let previous = self.store.transaction(|s| {
            s.item(item_id)?;
            let target = s.make_method(version_id)?;
            if target.owner != MethodOwner::Item(item_id) {
                return Err(MesError::not_found("製造方法", version_id));
            }

            let current = s.active_method(item_id).map(|m| m.id);
            match (expected_active, current) {
                (Some(_), None) => return Err(MesError::NoPriorActiveVersion { item_id }),
                (expected, current) if expected != current => {
                    return Err(MesError::ConcurrentActivation { item_id });
                }
                _ => {}
            }

            if current == Some(version_id) {
                return Ok(current);
            }

            let now = Utc::now();
            if let Some(current) = current {
                s.make_method_mut(current)?.active = false;
            }
            let target = s.make_method_mut(version_id)?;
            target.active = true;
            target.activated_at = Some(now);

            Ok(current)
        })?;

        match previous {
            Some(previous) if previous != version_id => {
                tracing::info!("料件 {} 生效版本：{} → {}", item_id, previous, version_id)
            }
            Some(_) => tracing::debug!("料件 {} 的版本 {} 已生效", item_id, version_id),
            None => tracing::info!("料件 {} 首次啟用版本 {}", item_id, version_id),
        }
        Ok(())
    }

    /// 料件的所有版本
    pub fn versions(&self, item_id: ItemId) -> Result<Vec<MakeMethod>> {
        self.store.read(|s| {
            s.item(item_id)?;
            Ok(s.methods_of(MethodOwner::Item(item_id)).into_iter().cloned().collect())
        })
    }

    /// 詢價單轉報價單
    ///
    /// 新報價單為 Draft 並連結詢價單；每一行詢價明細產生一行報價明細，
    /// 有製造方法的明細連同製程樹一起複製；詢價單轉為 Quoted。
    /// 只接受 Draft 或 Ready for Quote 的詢價單。任何一步失敗時什麼都不留下。
    pub fn convert_rfq_to_quote(&self, rfq_id: SalesRfqId) -> Result<QuoteId> {
        tracing::info!("詢價單 {} 轉報價單", rfq_id);

        let (quote_id, line_count) = self.store.transaction(|s| {
            let status = s.rfq(rfq_id)?.status();
            if !matches!(status, SalesRfqStatus::Draft | SalesRfqStatus::ReadyForQuote) {
                return Err(MesError::InvalidStatus {
                    document: DocumentKind::SalesRfq,
                    value: status.to_string(),
                });
            }

            let quote = Quote::new().with_rfq(rfq_id);
            let quote_id = quote.id;
            s.quotes.insert(quote_id, quote);

            let lines: Vec<_> = s.rfq_lines_of(rfq_id).into_iter().cloned().collect();
            for line in &lines {
                let mut quote_line = QuoteLine::new(quote_id, line.item_id, line.quantity);
                quote_line.order = line.order;
                let quote_line_id = quote_line.id;
                s.quote_lines.insert(quote_line_id, quote_line);

                if let Some(make_method_id) = line.make_method_id {
                    copy_tree(s, make_method_id, MethodOwner::QuoteLine(quote_line_id))?;
                }
            }

            let rfq = s.document_mut::<SalesRfq>(rfq_id)?;
            rfq.lifecycle.apply(SalesRfqStatus::Quoted, Utc::now(), None);

            Ok((quote_id, lines.len()))
        })?;

        tracing::info!("建立報價單 {}，明細 {} 行", quote_id, line_count);
        Ok(quote_id)
    }
}
