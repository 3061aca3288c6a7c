//! 詢價 → 報價 → 工單示例
//!
//! 執行：`RUST_LOG=debug cargo run --example quote_to_job`

use anyhow::Result;
use mes::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== 詢價轉工單示例 ===\n");

    let engine = Engine::new(InMemoryStore::new()).with_config(EngineConfig::new().with_quantity_scale(4));
    let ctx = RequestContext::new(CompanyId::new(), UserId::new());

    // 1. 料件與製造方法
    let bike = Item::new("BIKE-001");
    let bike_id = bike.id;
    engine.store().transaction(|s| {
        s.items.insert(bike.id, bike);
        Ok(())
    })?;

    let method = engine.create_make_method(MethodOwner::Item(bike_id))?;
    let assemble = engine
        .add_node(
            method,
            None,
            NewNode::operation(OperationDetail::new("組裝").with_hours(Decimal::ONE, Decimal::new(5, 1))).with_order(10),
        )?
        .value;
    let frame = engine
        .add_node(
            method,
            None,
            NewNode::material(ItemId::new(), Decimal::ONE)
                .with_order(1)
                .consumed_at(assemble),
        )?
        .value;
    engine.add_node(
        method,
        Some(frame),
        NewNode::operation(
            OperationDetail::new("焊接")
                .with_hours(Decimal::from(2), Decimal::ONE)
                .with_tool("TORCH-01", Decimal::ONE),
        ),
    )?;
    engine.add_node(method, Some(frame), NewNode::material(ItemId::new(), Decimal::from(3)))?;
    let wheel = engine
        .add_node(method, None, NewNode::material(ItemId::new(), Decimal::from(2)).with_order(2))?
        .value;
    engine.add_node(method, Some(wheel), NewNode::material(ItemId::new(), Decimal::from(32)))?;
    engine.activate_version(bike_id, method, None)?;

    println!("製程樹（版本 1）:");
    for entry in engine.flatten(method)? {
        let name = match entry.node.operation() {
            Some(op) => op.description.clone(),
            None => format!("物料 x{}", entry.node.quantity_per_parent),
        };
        println!("  {:<8} {}{}", entry.position_label, "  ".repeat(entry.level), name);
    }

    // 2. 詢價 → 報價
    let rfq = SalesRfq::new();
    let rfq_id = rfq.id;
    let line = SalesRfqLine::new(rfq_id, bike_id, Decimal::from(20)).with_make_method(method);
    engine.store().transaction(|s| {
        s.insert_document(rfq);
        s.rfq_lines.insert(line.id, line);
        Ok(())
    })?;

    let quote_id = engine.convert_rfq_to_quote(rfq_id)?;
    engine.transition::<Quote>(quote_id, "Sent", &ctx)?;
    let quote_line = engine.store().read(|s| {
        s.quote_lines_of(quote_id)
            .first()
            .map(|l| l.id)
            .ok_or_else(|| MesError::not_found("報價明細", quote_id))
    })?;
    println!("\n報價單 {} 已送出", quote_id);

    // 3. 報價 → 工單
    let job = Job::new(bike_id, Decimal::from(20));
    let job_id = job.id;
    engine.store().transaction(|s| {
        s.insert_document(job);
        Ok(())
    })?;
    engine
        .copy_method(MethodOwner::QuoteLine(quote_line), MethodOwner::Job(job_id))?
        .into_result()?;

    let transition = engine.transition_job(job_id, "Ready", &ctx)?;
    println!("工單 {} → {}", job_id, transition.status);

    if let Some(requirements) = engine.requirements(job_id)? {
        println!("\n物料需求:");
        for material in &requirements.materials {
            println!(
                "  - 料件: {}, 單位用量: {}, 預估用量: {}",
                material.item_id, material.quantity_per_unit, material.estimated_quantity
            );
        }
        println!("\n工序工時:");
        for operation in &requirements.operations {
            let predecessors = requirements.predecessors(operation.node_id);
            println!(
                "  - 工序: {}, 預估工時: {}, 前置工序: {}",
                operation.node_id,
                operation.estimated_hours,
                predecessors.len()
            );
        }
    }

    tracing::info!("示例完成");
    Ok(())
}
