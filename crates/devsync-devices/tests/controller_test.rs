//! Tests for the SyncController state machine.
//!
//! Uses in-process fake executors so timing is fully controlled: delayed
//! completion, forced failure, and hangs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;

use devsync_core::{DeviceValue, EventBus, HubEvent};
use devsync_devices::{
    ApplyPolicy, ConfigurationRegistry, DeviceError, DeviceIdentity, ExecutionError,
    ExecutionRequest, ExecutionResult, Executor, SyncController, SyncPhase,
};

/// Executor whose per-call behavior is driven by the target value: the
/// numeric value selects the completion delay in milliseconds.
struct DelayExecutor {
    invocations: Arc<AtomicUsize>,
    fail: bool,
}

impl DelayExecutor {
    fn new() -> Self {
        Self {
            invocations: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            invocations: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }
}

#[async_trait]
impl Executor for DelayExecutor {
    async fn run(&self, request: &ExecutionRequest, _timeout: Duration) -> ExecutionResult {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let delay = request.target.as_i64().unwrap_or(0) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if self.fail {
            ExecutionResult::failed(ExecutionError::ExitCode(1))
        } else {
            ExecutionResult::ok()
        }
    }
}

/// Executor that never completes, regardless of the timeout it is handed.
struct HangingExecutor;

#[async_trait]
impl Executor for HangingExecutor {
    async fn run(&self, _request: &ExecutionRequest, _timeout: Duration) -> ExecutionResult {
        std::future::pending().await
    }
}

/// Executor that records the config snapshot it was handed.
struct SnapshotExecutor {
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl Executor for SnapshotExecutor {
    async fn run(&self, request: &ExecutionRequest, _timeout: Duration) -> ExecutionResult {
        // Complete slowly enough for the test to race a config update in
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.seen.lock().await.push(request.config.args());
        ExecutionResult::ok()
    }
}

fn controller_with(executor: Arc<dyn Executor>, bus: &EventBus) -> SyncController {
    let device = Arc::new(devsync_devices::Device::new(
        DeviceIdentity::new("light-dimmer", "Light dimmer"),
        ConfigurationRegistry::new(),
        executor,
    ));
    SyncController::new(device, bus.clone())
}

#[tokio::test]
async fn test_successful_apply_emits_value_changed() {
    let bus = EventBus::new();
    let mut rx = bus.filter().sync_events();
    let controller = controller_with(Arc::new(DelayExecutor::new()), &bus);

    controller
        .request_value(DeviceValue::Integer(5))
        .await
        .unwrap();

    let (event, meta) = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        HubEvent::ValueChanged { value, .. } => assert_eq!(value, DeviceValue::Integer(5)),
        other => panic!("expected ValueChanged, got {:?}", other),
    }
    assert!(meta.correlation_id.is_some());
    assert_eq!(
        controller.current_value().await,
        Some(DeviceValue::Integer(5))
    );
    assert_eq!(controller.phase().await, SyncPhase::Idle);
}

#[tokio::test]
async fn test_failed_apply_emits_action_failed_and_keeps_value() {
    let bus = EventBus::new();
    let controller = controller_with(Arc::new(DelayExecutor::failing()), &bus);

    let mut rx = bus.filter().sync_events();
    controller
        .request_value(DeviceValue::Integer(5))
        .await
        .unwrap();

    let (event, _) = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        HubEvent::ActionFailed { error, .. } => {
            assert!(error.contains("status 1"), "unexpected error: {}", error)
        }
        other => panic!("expected ActionFailed, got {:?}", other),
    }
    assert_eq!(controller.current_value().await, None);
    assert_eq!(controller.phase().await, SyncPhase::Idle);
}

#[tokio::test]
async fn test_idempotent_request_still_runs_executor() {
    let bus = EventBus::new();
    let executor = Arc::new(DelayExecutor::new());
    let invocations = executor.invocations.clone();
    let controller = controller_with(executor, &bus);

    let mut rx = bus.filter().sync_events();
    controller
        .request_value(DeviceValue::Integer(0))
        .await
        .unwrap();
    let _ = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert_eq!(
        controller.current_value().await,
        Some(DeviceValue::Integer(0))
    );

    // Already acknowledged 0; requesting 0 again must not short-circuit
    controller
        .request_value(DeviceValue::Integer(0))
        .await
        .unwrap();
    let (event, _) = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, HubEvent::ValueChanged { .. }));
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_superseding_discards_slow_older_request() {
    let bus = EventBus::new();
    let mut rx = bus.filter().sync_events();
    let controller = controller_with(Arc::new(DelayExecutor::new()), &bus);

    // Target value doubles as the executor delay: A=300ms, B=10ms, so A
    // completes long after B despite being issued first
    controller
        .request_value(DeviceValue::Integer(300))
        .await
        .unwrap();
    controller
        .request_value(DeviceValue::Integer(10))
        .await
        .unwrap();

    let (event, _) = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        HubEvent::ValueChanged { value, .. } => assert_eq!(value, DeviceValue::Integer(10)),
        other => panic!("expected ValueChanged, got {:?}", other),
    }
    assert_eq!(
        controller.current_value().await,
        Some(DeviceValue::Integer(10))
    );

    // A's late completion must produce no further event and no overwrite
    assert!(timeout(Duration::from_millis(500), rx.recv()).await.is_err());
    assert_eq!(
        controller.current_value().await,
        Some(DeviceValue::Integer(10))
    );
}

#[tokio::test]
async fn test_single_flight_rejects_with_busy() {
    let bus = EventBus::new();
    let device = Arc::new(devsync_devices::Device::new(
        DeviceIdentity::new("light-dimmer", "Light dimmer"),
        ConfigurationRegistry::new(),
        Arc::new(DelayExecutor::new()),
    ));
    let controller =
        SyncController::new(device, bus.clone()).with_policy(ApplyPolicy::SingleFlight);

    let mut rx = bus.filter().sync_events();
    controller
        .request_value(DeviceValue::Integer(200))
        .await
        .unwrap();
    let err = controller
        .request_value(DeviceValue::Integer(10))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::Busy(_)));

    // Once the in-flight request completes the device accepts again
    let _ = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    controller
        .request_value(DeviceValue::Integer(10))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_hung_executor_times_out_back_to_idle() {
    let bus = EventBus::new();
    let device = Arc::new(devsync_devices::Device::new(
        DeviceIdentity::new("light-dimmer", "Light dimmer"),
        ConfigurationRegistry::new(),
        Arc::new(HangingExecutor),
    ));
    let controller =
        SyncController::new(device, bus.clone()).with_timeout(Duration::from_millis(100));

    let mut rx = bus.filter().sync_events();
    let started = std::time::Instant::now();
    controller
        .request_value(DeviceValue::Integer(5))
        .await
        .unwrap();

    let (event, _) = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        HubEvent::ActionFailed { error, .. } => {
            assert!(error.contains("timed out"), "unexpected error: {}", error)
        }
        other => panic!("expected ActionFailed, got {:?}", other),
    }
    // Timeout plus bounded overhead, not the executor's (infinite) runtime
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(controller.current_value().await, None);
    assert_eq!(controller.phase().await, SyncPhase::Idle);
}

#[tokio::test]
async fn test_config_snapshot_is_frozen_at_request_time() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut config = ConfigurationRegistry::new();
    config.declare("parameter", "script parameter", "12").unwrap();

    let device = Arc::new(devsync_devices::Device::new(
        DeviceIdentity::new("light-dimmer", "Light dimmer"),
        config,
        Arc::new(SnapshotExecutor { seen: seen.clone() }),
    ));
    let controller = SyncController::new(device, bus.clone());

    let mut rx = bus.filter().sync_events();
    controller
        .request_value(DeviceValue::Integer(5))
        .await
        .unwrap();
    // Update the field while the executor is still running
    controller.update_config("parameter", "99").await.unwrap();

    let _ = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    let snapshots = seen.lock().await;
    assert_eq!(snapshots.as_slice(), &[vec!["12".to_string()]]);
}

#[tokio::test]
async fn test_shutdown_discards_in_flight_result() {
    let bus = EventBus::new();
    let mut rx = bus.filter().sync_events();
    let controller = controller_with(Arc::new(DelayExecutor::new()), &bus);

    controller
        .request_value(DeviceValue::Integer(100))
        .await
        .unwrap();
    controller.shutdown().await;

    // The executor finishes on its own but its commit is stale
    assert!(timeout(Duration::from_millis(400), rx.recv()).await.is_err());
    assert_eq!(controller.current_value().await, None);

    let err = controller
        .request_value(DeviceValue::Integer(5))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::Detached(_)));
}

#[tokio::test]
async fn test_config_update_emits_config_changed() {
    let bus = EventBus::new();
    let mut config = ConfigurationRegistry::new();
    config.declare("parameter", "script parameter", "12").unwrap();
    let device = Arc::new(devsync_devices::Device::new(
        DeviceIdentity::new("light-dimmer", "Light dimmer"),
        config,
        Arc::new(DelayExecutor::new()),
    ));
    let controller = SyncController::new(device, bus.clone());

    let mut rx = bus.subscribe();
    controller.update_config("parameter", "42").await.unwrap();

    let (event, _) = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        HubEvent::ConfigChanged { field, .. } => assert_eq!(field, "parameter"),
        other => panic!("expected ConfigChanged, got {:?}", other),
    }
    assert_eq!(
        controller.config_value("parameter").await,
        Some(devsync_devices::FieldValue::String("42".to_string()))
    );
}
