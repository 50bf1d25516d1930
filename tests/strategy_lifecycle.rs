//! Strategy lifecycle through the public API: auto-connected assembly,
//! export/import, undoable deletion and periodic scheduling.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::json;

use common::{RecordingGateway, ScriptedMarket};
use tradeflow::{
    export_strategy, import_strategy, Capabilities, EngineConfig, FlowEngine, NodeCatalog,
    Scheduler, StrategyGraph, UndoManager,
};

fn engine_for(
    graph: StrategyGraph,
    market: Arc<ScriptedMarket>,
    gateway: Arc<RecordingGateway>,
) -> Arc<FlowEngine> {
    let (engine, _events) = FlowEngine::builder(Arc::new(RwLock::new(graph)))
        .capabilities(
            Capabilities::default()
                .with_market(market)
                .with_orders(gateway),
        )
        .config(EngineConfig {
            pacing_delay_ms: 0,
            gate_window_ms: 100,
        })
        .build();
    Arc::new(engine)
}

#[tokio::test]
async fn auto_connected_strategy_survives_export_import_and_runs() {
    // assemble in creation order, letting the heuristic do the wiring
    let mut graph = StrategyGraph::new(Arc::new(NodeCatalog::new()));
    let t = graph.add_node("trigger").unwrap();
    let _p = graph.add_node("price-check").unwrap();
    let c = graph.add_node("conditional").unwrap();
    let _o = graph.add_node("buy-order").unwrap();
    graph.set_param(c, "operator", json!("gt")).unwrap();
    graph.set_param(c, "value", json!(1.10)).unwrap();

    let document = export_strategy(&graph);
    let json_text = serde_json::to_string_pretty(&document).unwrap();
    let parsed = serde_json::from_str(&json_text).unwrap();

    let mut imported = StrategyGraph::new(Arc::new(NodeCatalog::new()));
    import_strategy(&mut imported, &parsed).unwrap();
    assert_eq!(imported.node_count(), 4);
    assert_eq!(
        imported.connections().len(),
        graph.connections().len(),
        "import changed the edge set"
    );

    let market = Arc::new(ScriptedMarket::new(1.15));
    let gateway = Arc::new(RecordingGateway::default());
    let engine = engine_for(imported, market, gateway.clone());

    engine.fire(t).await.unwrap();
    let placed = gateway.placed.lock();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].symbol, "EURUSD");
}

#[tokio::test]
async fn deleting_and_undoing_a_mid_chain_node_restores_the_strategy() {
    let market = Arc::new(ScriptedMarket::new(1.15));
    let gateway = Arc::new(RecordingGateway::default());

    let mut graph = StrategyGraph::new(Arc::new(NodeCatalog::new()));
    graph.auto_connect = false;
    let t = graph.add_node("trigger").unwrap();
    let p = graph.add_node("price-check").unwrap();
    let c = graph.add_node("conditional").unwrap();
    let o = graph.add_node("buy-order").unwrap();
    graph.connect(t, 0, p, 0);
    graph.connect(p, 0, c, 0);
    graph.connect(p, 1, c, 1);
    graph.connect(c, 0, o, 0);
    graph.set_param(c, "operator", json!("gt")).unwrap();
    graph.set_param(c, "value", json!(1.10)).unwrap();

    let engine = engine_for(graph, market, gateway.clone());
    let mut undo = UndoManager::new();

    {
        let mut g = engine.graph().write();
        undo.delete(&mut g, c).unwrap();
    }
    // with the conditional gone the chain is severed
    engine.fire(t).await.unwrap();
    assert!(gateway.placed.lock().is_empty());

    {
        let mut g = engine.graph().write();
        undo.undo(&mut g).unwrap();
    }
    engine.fire(t).await.unwrap();
    assert_eq!(gateway.placed.lock().len(), 1);
}

#[tokio::test]
async fn periodic_trigger_fires_until_stop_all() {
    let market = Arc::new(ScriptedMarket::new(1.15));
    let gateway = Arc::new(RecordingGateway::default());

    let mut graph = StrategyGraph::new(Arc::new(NodeCatalog::new()));
    graph.auto_connect = false;
    let t = graph.add_node("trigger").unwrap();
    let p = graph.add_node("price-check").unwrap();
    let o = graph.add_node("buy-order").unwrap();
    graph.connect(t, 0, p, 0);
    graph.connect(p, 0, o, 0);
    graph
        .set_param(t, "interval", json!(0.03))
        .unwrap();
    graph.set_param(t, "unit", json!("seconds")).unwrap();

    let engine = engine_for(graph, market, gateway.clone());
    let scheduler = Scheduler::new(engine.clone());

    scheduler.start(t).unwrap();
    assert!(scheduler.is_scheduled(t));
    tokio::time::sleep(Duration::from_millis(130)).await;
    scheduler.stop_all();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fired = gateway.placed.lock().len();
    assert!(fired >= 2, "expected repeated periodic fires, got {fired}");

    // stop-all disabled the manual trigger too
    engine.fire(t).await.unwrap();
    assert_eq!(gateway.placed.lock().len(), fired);
}

#[tokio::test]
async fn restarting_a_schedule_keeps_a_single_timer() {
    let market = Arc::new(ScriptedMarket::new(1.15));
    let gateway = Arc::new(RecordingGateway::default());

    let mut graph = StrategyGraph::new(Arc::new(NodeCatalog::new()));
    graph.auto_connect = false;
    let t = graph.add_node("trigger").unwrap();
    let o = graph.add_node("buy-order").unwrap();
    graph.connect(t, 0, o, 0);

    let engine = engine_for(graph, market, gateway.clone());
    let scheduler = Scheduler::new(engine);

    scheduler.start_with_period(t, Duration::from_millis(40));
    scheduler.start_with_period(t, Duration::from_millis(40));
    scheduler.start_with_period(t, Duration::from_millis(40));
    assert_eq!(scheduler.active_count(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.stop_all();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // one timer at 40ms over ~100ms lands 2-3 fires; stacked timers would
    // have tripled that
    let fired = gateway.placed.lock().len();
    assert!((1..=3).contains(&fired), "got {fired} fires");
}
