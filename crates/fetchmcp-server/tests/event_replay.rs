//! Event replay through the process-wide `AppState` wiring: events
//! appended to a session's stream are only replayed past the client's
//! last-seen id, in append order.

use fetchmcp_server::config::{DeploymentMode, LogFormat, ResourceStorageKind, ServiceConfig};
use fetchmcp_server::{protocol, AppState};
use fetchmcp_types::strategy::OptimizeFor;
use serde_json::json;

fn test_config() -> ServiceConfig {
    ServiceConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        deployment: DeploymentMode::Development,
        resource_storage: ResourceStorageKind::Memory,
        resource_root: None,
        resource_ttl_secs: 0,
        resource_max_bytes: u64::MAX,
        resource_max_items: usize::MAX,
        sweep_interval_secs: 3600,
        allowed_hosts: Vec::new(),
        allowed_origins: Vec::new(),
        metrics_auth_enabled: false,
        metrics_auth_key: None,
        enable_oauth: false,
        upstream_base_url: "https://upstream.invalid".to_string(),
        upstream_api_key: "key".to_string(),
        llm_provider: None,
        llm_api_key: None,
        optimize_for: OptimizeFor::Cost,
        debug: false,
        log_format: LogFormat::Text,
        session_idle_timeout_secs: 1800,
        ring_buffer_size: 64,
        per_host_concurrency: 4,
        strategy_registry_path: None,
    }
}

#[tokio::test]
async fn reconnect_with_last_event_id_replays_only_the_missed_events() {
    let state = AppState::build(test_config()).await.unwrap();
    let session = state.sessions.create();
    let stream_id = protocol::stream_id_for(&session.id);

    let e1 = state.events.store(&stream_id, json!({"n": 1})).await;
    let _e2 = state.events.store(&stream_id, json!({"n": 2})).await;
    let _e3 = state.events.store(&stream_id, json!({"n": 3})).await;

    let replayed = std::sync::Mutex::new(Vec::new());
    state
        .events
        .replay_after(&stream_id, Some(&e1), &|event| {
            replayed.lock().unwrap().push(event.message["n"].as_i64().unwrap());
        })
        .await;

    assert_eq!(replayed.into_inner().unwrap(), vec![2, 3]);
    state.shutdown();
}

#[tokio::test]
async fn replay_with_no_last_event_id_yields_the_full_stream_in_order() {
    let state = AppState::build(test_config()).await.unwrap();
    let session = state.sessions.create();
    let stream_id = protocol::stream_id_for(&session.id);

    state.events.store(&stream_id, json!({"n": 1})).await;
    state.events.store(&stream_id, json!({"n": 2})).await;

    let replayed = std::sync::Mutex::new(Vec::new());
    state
        .events
        .replay_after(&stream_id, None, &|event| {
            replayed.lock().unwrap().push(event.message["n"].as_i64().unwrap());
        })
        .await;

    assert_eq!(replayed.into_inner().unwrap(), vec![1, 2]);

    state.events.drop_stream(&stream_id).await;
    let replayed_after_drop = std::sync::Mutex::new(Vec::new());
    state
        .events
        .replay_after(&stream_id, None, &|event| {
            replayed_after_drop.lock().unwrap().push(event.message.clone());
        })
        .await;
    assert!(replayed_after_drop.into_inner().unwrap().is_empty());

    state.shutdown();
}

