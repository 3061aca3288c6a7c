//! 集成測試

use mes::*;
use rstest::rstest;

struct Shop {
    engine: Engine<InMemoryStore>,
    ctx: RequestContext,
}

impl Shop {
    fn new() -> Self {
        Self {
            engine: Engine::new(InMemoryStore::new()),
            ctx: RequestContext::new(CompanyId::new(), UserId::new()),
        }
    }

    fn item(&self, part_number: &str, blocked: bool) -> ItemId {
        let item = Item::new(part_number).with_manufacturing_blocked(blocked);
        let id = item.id;
        self.engine
            .store()
            .transaction(|s| {
                s.items.insert(item.id, item);
                Ok(())
            })
            .unwrap();
        id
    }

    fn job(&self, item_id: ItemId, quantity: i64) -> JobId {
        let job = Job::new(item_id, Decimal::from(quantity));
        let id = job.id;
        self.engine
            .store()
            .transaction(|s| {
                s.insert_document(job);
                Ok(())
            })
            .unwrap();
        id
    }

    fn add(&self, method: MakeMethodId, parent: Option<NodeId>, node: NewNode) -> NodeId {
        self.engine.add_node(method, parent, node).unwrap().into_result().unwrap()
    }

    /// 自行車製程：
    ///   Frame x1（焊接後於組裝投料）→ Tube x3
    ///   Wheel x2 → Spoke x32
    ///   組裝
    fn bike_method(&self, item_id: ItemId) -> MakeMethodId {
        let method = self.engine.create_make_method(MethodOwner::Item(item_id)).unwrap();

        let assemble = self.add(
            method,
            None,
            NewNode::operation(OperationDetail::new("組裝").with_hours(Decimal::ONE, Decimal::new(5, 1))).with_order(10),
        );
        let frame = self.add(
            method,
            None,
            NewNode::material(ItemId::new(), Decimal::ONE).with_order(1).consumed_at(assemble),
        );
        self.add(
            method,
            Some(frame),
            NewNode::operation(OperationDetail::new("焊接").with_hours(Decimal::from(2), Decimal::ONE)),
        );
        self.add(method, Some(frame), NewNode::material(ItemId::new(), Decimal::from(3)).with_order(1));
        let wheel = self.add(method, None, NewNode::material(ItemId::new(), Decimal::from(2)).with_order(2));
        self.add(method, Some(wheel), NewNode::material(ItemId::new(), Decimal::from(32)));

        method
    }
}

#[test]
fn test_recalculate_twice_yields_identical_state() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", false);
    let method = shop.bike_method(bike);
    shop.engine.activate_version(bike, method, None).unwrap();

    let job = shop.job(bike, 10);
    shop.engine
        .copy_method(MethodOwner::Item(bike), MethodOwner::Job(job))
        .unwrap()
        .into_result()
        .unwrap();

    let first = shop.engine.recalculate(job).unwrap();
    let stored_first = shop.engine.requirements(job).unwrap();
    let second = shop.engine.recalculate(job).unwrap();
    let stored_second = shop.engine.requirements(job).unwrap();

    assert_eq!(first, second);
    assert_eq!(stored_first, stored_second);
    assert_eq!(first.materials.len(), 4);
    assert_eq!(first.operations.len(), 2);
    assert_eq!(first.dependencies.len(), 1);
}

#[test]
fn test_two_level_rollup() {
    // root → A (2) → B (3)
    let method = MakeMethodId::new();
    let root = NewNode::material(ItemId::new(), Decimal::ONE).into_node(NodeId::new(), method, None);
    let a = NewNode::material(ItemId::new(), Decimal::from(2)).into_node(NodeId::new(), method, Some(root.id));
    let b = NewNode::material(ItemId::new(), Decimal::from(3)).into_node(NodeId::new(), method, Some(a.id));

    let flat = MethodTree::build(vec![root, a, b.clone()]).unwrap().flatten(16).unwrap();
    assert_eq!(total_quantity(&b, &flat).unwrap(), Decimal::from(6));
}

#[test]
fn test_four_level_rollup() {
    let method = MakeMethodId::new();
    let mut nodes: Vec<MethodNode> = Vec::new();
    for quantity in [1, 2, 3, 4] {
        let parent = nodes.last().map(|n| n.id);
        nodes.push(NewNode::material(ItemId::new(), Decimal::from(quantity)).into_node(NodeId::new(), method, parent));
    }

    let flat = MethodTree::build(nodes.clone()).unwrap().flatten(16).unwrap();
    assert_eq!(total_quantity(&nodes[3], &flat).unwrap(), Decimal::from(24));
}

#[rstest]
// C 與 A 同在第 1 層，B 的第 2 層計數被捨棄
#[case(&[0, 1, 2, 1], &["1", "1.1", "1.1.1", "1.2"])]
// C 回到第 0 層
#[case(&[0, 1, 2, 0], &["1", "1.1", "1.1.1", "2"])]
#[case(&[0, 1, 1, 2, 2, 0, 1], &["1", "1.1", "1.2", "1.2.1", "1.2.2", "2", "2.1"])]
fn test_position_labels(#[case] levels: &[usize], #[case] expected: &[&str]) {
    assert_eq!(labels_for_levels(levels.iter().copied()), expected);
}

#[test]
fn test_reorder_failure_leaves_orders_unchanged() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", false);
    let method = shop.engine.create_make_method(MethodOwner::Item(bike)).unwrap();
    let n1 = shop.add(method, None, NewNode::material(ItemId::new(), Decimal::ONE).with_order(10));
    let n2 = shop.add(method, None, NewNode::material(ItemId::new(), Decimal::ONE).with_order(20));
    let n3 = shop.add(method, None, NewNode::material(ItemId::new(), Decimal::ONE).with_order(30));

    let result = shop.engine.reorder(method, &[(n1, 1), (n2, 2), (n3, -5)]);
    assert!(matches!(result, Err(MesError::PartialUpdateFailure { node_id, .. }) if node_id == n3));

    let orders: Vec<(NodeId, i32)> = shop
        .engine
        .nodes(method)
        .unwrap()
        .iter()
        .map(|n| (n.id, n.order))
        .collect();
    assert_eq!(orders, vec![(n1, 10), (n2, 20), (n3, 30)]);
}

#[test]
fn test_single_active_version() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", false);
    let v1 = shop.bike_method(bike);
    shop.engine.activate_version(bike, v1, None).unwrap();

    let v2 = shop
        .engine
        .copy_method(MethodOwner::Item(bike), MethodOwner::Item(bike))
        .unwrap()
        .value
        .make_method_id;
    shop.engine.activate_version(bike, v2, Some(v1)).unwrap();

    let versions = shop.engine.versions(bike).unwrap();
    let active: Vec<MakeMethodId> = versions.iter().filter(|m| m.active).map(|m| m.id).collect();
    assert_eq!(active, vec![v2]);
    assert_eq!(versions.iter().map(|m| m.version).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_ready_rejected_when_manufacturing_blocked() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", true);
    let job = shop.job(bike, 5);

    let result = shop.engine.transition_job(job, "Ready", &shop.ctx);
    assert!(matches!(result, Err(MesError::ManufacturingBlocked { .. })));

    let status = shop.engine.store().read(|s| Ok(s.job(job)?.status())).unwrap();
    assert_eq!(status, JobStatus::Draft);
}

#[test]
fn test_cancel_clears_assignee_with_status() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", false);
    let job = shop.job(bike, 5);
    shop.engine.transition_job(job, "In Progress", &shop.ctx).unwrap();
    shop.engine
        .store()
        .transaction(|s| {
            s.job_mut(job)?.lifecycle.assignee = Some(UserId::new());
            Ok(())
        })
        .unwrap();

    shop.engine.transition_job(job, "Cancelled", &shop.ctx).unwrap();

    let lifecycle = shop.engine.store().read(|s| Ok(s.job(job)?.lifecycle.clone())).unwrap();
    assert_eq!(lifecycle.status, JobStatus::Cancelled);
    assert_eq!(lifecycle.assignee, None);
}

#[test]
fn test_rfq_conversion_rolls_back_when_second_line_fails() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", false);
    let method = shop.bike_method(bike);

    let rfq = SalesRfq::new();
    let rfq_id = rfq.id;
    let lines = vec![
        SalesRfqLine::new(rfq_id, bike, Decimal::from(5)).with_make_method(method).with_order(1),
        // 製造方法已不存在
        SalesRfqLine::new(rfq_id, bike, Decimal::from(5))
            .with_make_method(MakeMethodId::new())
            .with_order(2),
        SalesRfqLine::new(rfq_id, bike, Decimal::from(5)).with_make_method(method).with_order(3),
    ];
    shop.engine
        .store()
        .transaction(|s| {
            s.insert_document(rfq);
            for line in lines {
                s.rfq_lines.insert(line.id, line);
            }
            Ok(())
        })
        .unwrap();
    let before = shop.engine.store().read(|s| Ok((s.make_methods.len(), s.nodes.len()))).unwrap();

    assert!(shop.engine.convert_rfq_to_quote(rfq_id).is_err());

    let snapshot = shop.engine.store().snapshot().unwrap();
    assert!(snapshot.quotes.is_empty());
    assert!(snapshot.quote_lines.is_empty());
    assert_eq!((snapshot.make_methods.len(), snapshot.nodes.len()), before);
    assert_eq!(snapshot.rfq(rfq_id).unwrap().status(), SalesRfqStatus::Draft);
}

#[test]
fn test_quote_to_job_flow() {
    let shop = Shop::new();
    let bike = shop.item("BIKE-001", false);
    let method = shop.bike_method(bike);
    shop.engine.activate_version(bike, method, None).unwrap();

    let rfq = SalesRfq::new();
    let rfq_id = rfq.id;
    let line = SalesRfqLine::new(rfq_id, bike, Decimal::from(4)).with_make_method(method);
    shop.engine
        .store()
        .transaction(|s| {
            s.insert_document(rfq);
            s.rfq_lines.insert(line.id, line);
            Ok(())
        })
        .unwrap();

    let quote = shop.engine.convert_rfq_to_quote(rfq_id).unwrap();
    let quote_line = shop.engine.store().read(|s| Ok(s.quote_lines_of(quote)[0].id)).unwrap();

    let job = shop.job(bike, 4);
    shop.engine
        .copy_method(MethodOwner::QuoteLine(quote_line), MethodOwner::Job(job))
        .unwrap()
        .into_result()
        .unwrap();

    let transition = shop.engine.transition_job(job, "Ready", &shop.ctx).unwrap();
    assert_eq!(transition.recalculation, Recalculation::Completed { job_id: job });
    // 未設定函式呼叫端時不排程
    assert_eq!(transition.schedule, None);

    let requirements = shop.engine.requirements(job).unwrap().unwrap();
    // 輻條：32 × 2 × 4
    assert!(requirements.item_demand.values().any(|q| *q == Decimal::from(256)));
    // 組裝：1 + 0.5 × 4
    let hours: Vec<Decimal> = requirements.operations.iter().map(|o| o.estimated_hours).collect();
    assert!(hours.contains(&Decimal::from(3)));
}
