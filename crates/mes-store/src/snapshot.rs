//! 資料表快照

use mes_core::{
    Document, DocumentId, Item, ItemId, Job, JobId, JobRequirements, MakeMethod, MakeMethodId, MesError,
    MethodNode, MethodOwner, NodeId, NonConformanceStatus, PurchaseInvoiceStatus, PurchaseOrderStatus, Quote,
    QuoteId, QuoteLine, QuoteLineId, Result, SalesInvoiceStatus, SalesOrderStatus, SalesRfq, SalesRfqId,
    SalesRfqLine, SalesRfqLineId, StatusDocument,
};
use std::collections::HashMap;

/// 所有資料表
///
/// 交易在快照的複本上操作，成功後整份替換。
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub items: HashMap<ItemId, Item>,
    pub make_methods: HashMap<MakeMethodId, MakeMethod>,
    pub nodes: HashMap<NodeId, MethodNode>,
    pub jobs: HashMap<JobId, Job>,
    pub job_requirements: HashMap<JobId, JobRequirements>,
    pub rfqs: HashMap<SalesRfqId, SalesRfq>,
    pub rfq_lines: HashMap<SalesRfqLineId, SalesRfqLine>,
    pub quotes: HashMap<QuoteId, Quote>,
    pub quote_lines: HashMap<QuoteLineId, QuoteLine>,
    pub sales_orders: HashMap<DocumentId, Document<SalesOrderStatus>>,
    pub purchase_orders: HashMap<DocumentId, Document<PurchaseOrderStatus>>,
    pub sales_invoices: HashMap<DocumentId, Document<SalesInvoiceStatus>>,
    pub purchase_invoices: HashMap<DocumentId, Document<PurchaseInvoiceStatus>>,
    pub non_conformances: HashMap<DocumentId, Document<NonConformanceStatus>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or_else(|| MesError::not_found("料件", id))
    }

    pub fn make_method(&self, id: MakeMethodId) -> Result<&MakeMethod> {
        self.make_methods
            .get(&id)
            .ok_or_else(|| MesError::not_found("製造方法", id))
    }

    pub fn make_method_mut(&mut self, id: MakeMethodId) -> Result<&mut MakeMethod> {
        self.make_methods
            .get_mut(&id)
            .ok_or_else(|| MesError::not_found("製造方法", id))
    }

    pub fn node(&self, id: NodeId) -> Result<&MethodNode> {
        self.nodes.get(&id).ok_or_else(|| MesError::not_found("節點", id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut MethodNode> {
        self.nodes.get_mut(&id).ok_or_else(|| MesError::not_found("節點", id))
    }

    pub fn job(&self, id: JobId) -> Result<&Job> {
        self.jobs.get(&id).ok_or_else(|| MesError::not_found("工單", id))
    }

    pub fn job_mut(&mut self, id: JobId) -> Result<&mut Job> {
        self.jobs.get_mut(&id).ok_or_else(|| MesError::not_found("工單", id))
    }

    pub fn rfq(&self, id: SalesRfqId) -> Result<&SalesRfq> {
        self.rfqs.get(&id).ok_or_else(|| MesError::not_found("詢價單", id))
    }

    pub fn quote(&self, id: QuoteId) -> Result<&Quote> {
        self.quotes.get(&id).ok_or_else(|| MesError::not_found("報價單", id))
    }

    pub fn quote_line(&self, id: QuoteLineId) -> Result<&QuoteLine> {
        self.quote_lines
            .get(&id)
            .ok_or_else(|| MesError::not_found("報價明細", id))
    }

    /// 詢價單明細，依 `(order, id)` 排序
    pub fn rfq_lines_of(&self, rfq_id: SalesRfqId) -> Vec<&SalesRfqLine> {
        let mut lines: Vec<&SalesRfqLine> = self.rfq_lines.values().filter(|l| l.rfq_id == rfq_id).collect();
        lines.sort_by_key(|l| (l.order, l.id));
        lines
    }

    /// 報價單明細，依 `(order, id)` 排序
    pub fn quote_lines_of(&self, quote_id: QuoteId) -> Vec<&QuoteLine> {
        let mut lines: Vec<&QuoteLine> = self.quote_lines.values().filter(|l| l.quote_id == quote_id).collect();
        lines.sort_by_key(|l| (l.order, l.id));
        lines
    }

    /// 擁有者的所有製造方法，依版本排序
    pub fn methods_of(&self, owner: MethodOwner) -> Vec<&MakeMethod> {
        let mut methods: Vec<&MakeMethod> = self.make_methods.values().filter(|m| m.owner == owner).collect();
        methods.sort_by_key(|m| m.version);
        methods
    }

    /// 料件目前生效的版本
    pub fn active_method(&self, item_id: ItemId) -> Option<&MakeMethod> {
        self.make_methods
            .values()
            .find(|m| m.owner == MethodOwner::Item(item_id) && m.active)
    }

    /// 擁有者目前使用的製造方法
    ///
    /// 料件取生效版本；報價明細與工單各只有一份。
    pub fn method_for(&self, owner: MethodOwner) -> Option<&MakeMethod> {
        match owner {
            MethodOwner::Item(item_id) => self.active_method(item_id),
            _ => self.make_methods.values().find(|m| m.owner == owner),
        }
    }

    /// 料件的下一個版本號
    pub fn next_version(&self, item_id: ItemId) -> u32 {
        self.methods_of(MethodOwner::Item(item_id))
            .last()
            .map(|m| m.version + 1)
            .unwrap_or(1)
    }

    /// 製造方法的所有節點
    pub fn nodes_of(&self, make_method_id: MakeMethodId) -> Vec<MethodNode> {
        let mut nodes: Vec<MethodNode> = self
            .nodes
            .values()
            .filter(|n| n.make_method_id == make_method_id)
            .cloned()
            .collect();
        nodes.sort_by_key(|n| n.sort_key());
        nodes
    }

    /// 刪除製造方法的所有節點，回傳刪除數量
    pub fn clear_nodes(&mut self, make_method_id: MakeMethodId) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, n| n.make_method_id != make_method_id);
        before - self.nodes.len()
    }

    pub fn insert_nodes(&mut self, nodes: impl IntoIterator<Item = MethodNode>) {
        for node in nodes {
            self.nodes.insert(node.id, node);
        }
    }

    /// 依型別取得狀態單據
    pub fn document<D>(&self, id: D::Id) -> Result<&D>
    where
        D: StatusDocument,
        Self: DocumentTable<D>,
    {
        DocumentTable::<D>::table(self)
            .get(&id)
            .ok_or_else(|| MesError::not_found(D::ENTITY, id))
    }

    pub fn document_mut<D>(&mut self, id: D::Id) -> Result<&mut D>
    where
        D: StatusDocument,
        Self: DocumentTable<D>,
    {
        DocumentTable::<D>::table_mut(self)
            .get_mut(&id)
            .ok_or_else(|| MesError::not_found(D::ENTITY, id))
    }

    pub fn insert_document<D>(&mut self, document: D)
    where
        D: StatusDocument,
        Self: DocumentTable<D>,
    {
        DocumentTable::<D>::table_mut(self).insert(document.id(), document);
    }
}

/// 狀態單據所在的資料表
pub trait DocumentTable<D: StatusDocument> {
    fn table(&self) -> &HashMap<D::Id, D>;

    fn table_mut(&mut self) -> &mut HashMap<D::Id, D>;
}

macro_rules! document_table {
    ($doc:ty, $field:ident) => {
        impl DocumentTable<$doc> for Snapshot {
            fn table(&self) -> &HashMap<<$doc as StatusDocument>::Id, $doc> {
                &self.$field
            }

            fn table_mut(&mut self) -> &mut HashMap<<$doc as StatusDocument>::Id, $doc> {
                &mut self.$field
            }
        }
    };
}

document_table!(Job, jobs);
document_table!(Quote, quotes);
document_table!(SalesRfq, rfqs);
document_table!(Document<SalesOrderStatus>, sales_orders);
document_table!(Document<PurchaseOrderStatus>, purchase_orders);
document_table!(Document<SalesInvoiceStatus>, sales_invoices);
document_table!(Document<PurchaseInvoiceStatus>, purchase_invoices);
document_table!(Document<NonConformanceStatus>, non_conformances);
