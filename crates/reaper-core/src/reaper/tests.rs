use super::*;
use crate::cancel::cancel_pair;
use crate::clock::FrozenClock;
use crate::testing::{FakeState, ZONE_B, ZONE_C, created, registry};
use chrono::Duration as ChronoDuration;
use reaper_cloud::ResourceConfig;
use std::sync::atomic::Ordering;

const PROJECT: &str = "reaper-test-project";

fn scenario_state() -> Arc<FakeState> {
    FakeState::with_resources(&[
        ("test-resource-1", ZONE_B),
        ("test-resource-2", ZONE_B),
        ("another-resource-1", ZONE_B),
        ("another-resource-2", ZONE_B),
        ("test-resource-3", ZONE_C),
        ("test-skip", ZONE_C),
    ])
}

fn test_config() -> ResourceConfig {
    ResourceConfig::new(ResourceType::GceVm, "9 7 * * *")
        .with_zones([ZONE_B, ZONE_C])
        .with_name_filter("test")
        .with_skip_filter("skip")
}

fn another_config() -> ResourceConfig {
    ResourceConfig::new(ResourceType::GceVm, "1 * * * *")
        .with_zones([ZONE_B])
        .with_name_filter("another")
}

fn october_config() -> ResourceConfig {
    ResourceConfig::new(ResourceType::GceVm, "* * * 10 *")
        .with_zones([ZONE_B])
        .with_name_filter("another-resource-1")
}

fn scenario_config() -> ReaperConfig {
    ReaperConfig::new()
        .with_project_id(PROJECT)
        .with_uuid("reaper-1")
        .with_schedule("*/5 * * * *")
        .with_resource(test_config())
        .with_resource(another_config())
        .with_resource(october_config())
}

fn reaper(state: &Arc<FakeState>) -> (Reaper, Arc<FrozenClock>) {
    let clock = Arc::new(FrozenClock::new(created()));
    (Reaper::new(registry(state), clock.clone()), clock)
}

fn names(reaper: &Reaper) -> Vec<String> {
    let mut names: Vec<String> = reaper
        .watchlist()
        .iter()
        .map(|w| w.resource.name.clone())
        .collect();
    names.sort();
    names
}

fn ttl_of<'a>(reaper: &'a Reaper, name: &str) -> &'a str {
    reaper
        .watchlist()
        .iter()
        .find(|w| w.resource.name == name)
        .map(|w| w.ttl.as_str())
        .unwrap()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    let report = reaper.reconfigure(&scenario_config(), &never).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.watched, 5);
    assert_eq!(
        names(&reaper),
        vec![
            "another-resource-1",
            "another-resource-2",
            "test-resource-1",
            "test-resource-2",
            "test-resource-3",
        ]
    );
    assert_eq!(ttl_of(&reaper, "another-resource-1"), "* * * 10 *");

    reaper.freeze_time(created() + ChronoDuration::days(30));
    let report = reaper.sweep(created(), &never).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.deleted.len(), 4);
    assert_eq!(report.retained, 1);
    assert_eq!(names(&reaper), vec!["another-resource-1"]);
    assert_eq!(
        state.deleted(),
        vec![
            "another-resource-2",
            "test-resource-1",
            "test-resource-2",
            "test-resource-3",
        ]
    );
}

#[tokio::test]
async fn test_dedup_keeps_later_deadline_in_any_order() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);

    let config = ReaperConfig::new()
        .with_project_id(PROJECT)
        .with_resource(october_config())
        .with_resource(another_config());
    reaper.reconfigure(&config, &CancelSignal::never()).await.unwrap();

    assert_eq!(reaper.watchlist().len(), 2);
    assert_eq!(ttl_of(&reaper, "another-resource-1"), "* * * 10 *");
    assert_eq!(ttl_of(&reaper, "another-resource-2"), "1 * * * *");
}

#[tokio::test]
async fn test_reconfigure_is_a_full_rebuild() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();
    assert_eq!(reaper.watchlist().len(), 5);

    let narrowed = ReaperConfig::new().with_resource(another_config());
    reaper.reconfigure(&narrowed, &never).await.unwrap();
    assert_eq!(
        names(&reaper),
        vec!["another-resource-1", "another-resource-2"]
    );
}

#[tokio::test]
async fn test_partial_update() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();
    assert_eq!(reaper.state(), ReaperState::Unconfigured);

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();
    assert_eq!(reaper.state(), ReaperState::Configured);
    assert_eq!(reaper.project_id(), Some(PROJECT));
    assert_eq!(reaper.uuid(), Some("reaper-1"));
    assert_eq!(reaper.schedule().unwrap().expression(), "*/5 * * * *");

    reaper.reconfigure(&ReaperConfig::new(), &never).await.unwrap();
    assert_eq!(reaper.project_id(), Some(PROJECT));
    assert_eq!(reaper.uuid(), Some("reaper-1"));
    assert_eq!(reaper.schedule().unwrap().expression(), "*/5 * * * *");
    assert!(reaper.watchlist().is_empty());

    let update = ReaperConfig::new()
        .with_project_id("other-project")
        .with_schedule("0 * * * *");
    reaper.reconfigure(&update, &never).await.unwrap();
    assert_eq!(reaper.project_id(), Some("other-project"));
    assert_eq!(reaper.uuid(), Some("reaper-1"));
    assert_eq!(reaper.schedule().unwrap().expression(), "0 * * * *");
}

#[tokio::test]
async fn test_reconfigure_without_project_id_still_applies_identity() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    let config = ReaperConfig::new()
        .with_uuid("reaper-1")
        .with_schedule("*/5 * * * *")
        .with_resource(test_config())
        .with_resource(another_config());
    let report = reaper.reconfigure(&config, &never).await.unwrap();

    assert_eq!(report.watched, 0);
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, ReaperError::MissingProjectId)));
    assert_eq!(reaper.uuid(), Some("reaper-1"));
    assert_eq!(reaper.schedule().unwrap().expression(), "*/5 * * * *");
    assert_eq!(reaper.project_id(), None);
    assert_eq!(reaper.state(), ReaperState::Unconfigured);
    assert_eq!(state.auth_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.list_calls.load(Ordering::SeqCst), 0);

    // The project arrives later; identity set earlier is kept
    let report = reaper
        .reconfigure(&ReaperConfig::new().with_project_id(PROJECT).with_resource(test_config()), &never)
        .await
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.watched, 3);
    assert_eq!(reaper.uuid(), Some("reaper-1"));
    assert_eq!(reaper.state(), ReaperState::Configured);
}

#[tokio::test]
async fn test_sweep_without_project_id_is_not_fatal() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);

    let report = reaper
        .sweep(created() + ChronoDuration::days(30), &CancelSignal::never())
        .await
        .unwrap();
    assert!(report.is_success());
    assert!(report.deleted.is_empty());
    assert_eq!(report.retained, 0);
}

#[tokio::test]
async fn test_empty_fields_leave_identity_unchanged() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();

    let blank = ReaperConfig::new()
        .with_project_id("")
        .with_uuid("")
        .with_schedule("")
        .with_resource(another_config());
    let report = reaper.reconfigure(&blank, &never).await.unwrap();

    assert!(report.is_success());
    assert_eq!(reaper.project_id(), Some(PROJECT));
    assert_eq!(reaper.uuid(), Some("reaper-1"));
    assert_eq!(reaper.schedule().unwrap().expression(), "*/5 * * * *");
    assert_eq!(reaper.state(), ReaperState::Configured);
    assert_eq!(
        names(&reaper),
        vec!["another-resource-1", "another-resource-2"]
    );
}

#[tokio::test]
async fn test_sweep_prunes_eligible_and_keeps_failed_deletes() {
    let state = scenario_state();
    state.fail_delete("test-resource-2");
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();

    // 01:00: only the hourly TTL (00:01) has passed; the daily one is at 07:09
    let report = reaper
        .sweep(created() + ChronoDuration::hours(1), &never)
        .await
        .unwrap();
    assert_eq!(state.deleted(), vec!["another-resource-2"]);
    assert_eq!(report.retained, 4);

    let report = reaper
        .sweep(created() + ChronoDuration::hours(8), &never)
        .await
        .unwrap();
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subject, "us-east1-b/test-resource-2");
    assert!(matches!(
        report.failures[0].error,
        ReaperError::DeleteResource { ref name, .. } if name == "test-resource-2"
    ));
    assert_eq!(
        names(&reaper),
        vec!["another-resource-1", "test-resource-2"]
    );

    let event = report
        .deleted
        .iter()
        .find(|e| e.name == "test-resource-1")
        .unwrap();
    assert_eq!(event.deletion_time, created() + ChronoDuration::minutes(7 * 60 + 9));
    assert_eq!(event.deleted_at, created());
}

#[tokio::test]
async fn test_sweep_reports_unparseable_ttl_and_keeps_it() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    let config = ReaperConfig::new().with_project_id(PROJECT).with_resource(
        ResourceConfig::new(ResourceType::GceVm, "every day")
            .with_zones([ZONE_C])
            .with_name_filter("test-resource-3"),
    );
    reaper.reconfigure(&config, &never).await.unwrap();
    assert_eq!(names(&reaper), vec!["test-resource-3"]);

    let report = reaper
        .sweep(created() + ChronoDuration::days(365), &never)
        .await
        .unwrap();
    assert!(report.deleted.is_empty());
    assert!(matches!(report.failures[0].error, ReaperError::TtlParse { .. }));
    assert_eq!(names(&reaper), vec!["test-resource-3"]);
}

#[tokio::test]
async fn test_authentication_failure_skips_resource_type() {
    let state = scenario_state();
    state.fail_auth.store(true, Ordering::SeqCst);
    let (mut reaper, _clock) = reaper(&state);

    let report = reaper
        .reconfigure(&scenario_config(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(report.watched, 0);
    assert_eq!(report.failures.len(), 3);
    assert!(matches!(report.failures[0].error, ReaperError::Authentication { .. }));
    assert!(matches!(report.failures[1].error, ReaperError::ClientUnavailable(_)));
    assert_eq!(state.auth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_client_is_reported() {
    let clock = Arc::new(FrozenClock::new(created()));
    let mut reaper = Reaper::new(ClientRegistry::new(), clock);

    let report = reaper
        .reconfigure(&scenario_config(), &CancelSignal::never())
        .await
        .unwrap();

    assert!(matches!(report.failures[0].error, ReaperError::NoClient(ResourceType::GceVm)));
    assert!(reaper.watchlist().is_empty());
}

#[tokio::test]
async fn test_failing_query_does_not_block_other_configs() {
    let state = scenario_state();
    state.fail_zone(ZONE_C);
    let (mut reaper, _clock) = reaper(&state);

    let report = reaper
        .reconfigure(&scenario_config(), &CancelSignal::never())
        .await
        .unwrap();

    // The failing config contributes nothing, not even its us-east1-b matches
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, ReaperError::ListResources { .. }));
    assert_eq!(
        names(&reaper),
        vec!["another-resource-1", "another-resource-2"]
    );
}

#[tokio::test]
async fn test_invalid_schedule_closes_gate() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();
    assert!(reaper.schedule().is_some());

    let config = ReaperConfig::new().with_schedule("TestSchedule");
    let report = reaper.reconfigure(&config, &never).await.unwrap();

    assert!(matches!(report.failures[0].error, ReaperError::ScheduleParse { .. }));
    assert!(reaper.schedule().is_none());
    assert_eq!(reaper.state(), ReaperState::Unconfigured);
    assert!(!reaper.is_due(created() + ChronoDuration::days(1)));
    let outcome = reaper
        .run_on_schedule(created() + ChronoDuration::days(1), &never)
        .await
        .unwrap();
    assert!(outcome.is_none());
    assert!(state.deleted().is_empty());
}

#[tokio::test]
async fn test_tick_follows_schedule_gate() {
    let state = scenario_state();
    let (mut reaper, clock) = reaper(&state);
    let never = CancelSignal::never();

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();

    // Never ran before: the gate is open
    assert!(reaper.tick(&never).await.unwrap().is_some());
    assert_eq!(reaper.last_run(), Some(created()));

    clock.advance(ChronoDuration::minutes(4));
    assert!(reaper.tick(&never).await.unwrap().is_none());

    clock.advance(ChronoDuration::minutes(1));
    assert!(reaper.tick(&never).await.unwrap().is_none());

    clock.advance(ChronoDuration::seconds(1));
    let report = reaper.tick(&never).await.unwrap().unwrap();
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(
        reaper.last_run(),
        Some(created() + ChronoDuration::seconds(301))
    );
}

#[tokio::test]
async fn test_cancelled_before_start_keeps_previous_state() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);

    reaper
        .reconfigure(&scenario_config(), &CancelSignal::never())
        .await
        .unwrap();

    let (handle, signal) = cancel_pair();
    handle.cancel();

    let config = ReaperConfig::new()
        .with_project_id("other-project")
        .with_resource(another_config());
    let err = reaper.reconfigure(&config, &signal).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(reaper.project_id(), Some(PROJECT));
    assert_eq!(reaper.watchlist().len(), 5);

    let err = reaper
        .sweep(created() + ChronoDuration::days(30), &signal)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(reaper.watchlist().len(), 5);
    assert!(state.deleted().is_empty());
}

#[tokio::test]
async fn test_cancel_reaches_in_flight_call() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);

    reaper
        .reconfigure(&scenario_config(), &CancelSignal::never())
        .await
        .unwrap();
    state.hang.store(true, Ordering::SeqCst);

    let config = scenario_config();
    let (handle, signal) = cancel_pair();
    let (result, _) = tokio::join!(reaper.reconfigure(&config, &signal), async {
        tokio::task::yield_now().await;
        handle.cancel();
    });

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(reaper.watchlist().len(), 5);

    let (handle, signal) = cancel_pair();
    let (result, _) = tokio::join!(
        reaper.sweep(created() + ChronoDuration::days(30), &signal),
        async {
            tokio::task::yield_now().await;
            handle.cancel();
        }
    );

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(reaper.watchlist().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_call_timeout_is_reported() {
    let state = scenario_state();
    let clock = Arc::new(FrozenClock::new(created()));
    let mut reaper =
        Reaper::new(registry(&state), clock).with_call_timeout(Duration::from_secs(30));
    state.hang.store(true, Ordering::SeqCst);

    let config = ReaperConfig::new()
        .with_project_id(PROJECT)
        .with_resource(another_config());
    let report = reaper
        .reconfigure(&config, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        ReaperError::Timeout { after, .. } if after == Duration::from_secs(30)
    ));
    assert!(reaper.watchlist().is_empty());
}

#[tokio::test]
async fn test_deadline_rule_from_config() {
    let state = FakeState::with_resources(&[("midnight-vm", ZONE_B)]);
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    let config = ReaperConfig::new()
        .with_project_id(PROJECT)
        .with_deadline(DeadlineRule::AtOrAfter)
        .with_resource(
            ResourceConfig::new(ResourceType::GceVm, "0 0 * * *").with_zones([ZONE_B]),
        );
    reaper.reconfigure(&config, &never).await.unwrap();
    assert_eq!(reaper.deadline(), DeadlineRule::AtOrAfter);

    let report = reaper.sweep(created(), &never).await.unwrap();
    assert_eq!(report.deleted.len(), 1);
}

#[tokio::test]
async fn test_snapshot() {
    let state = scenario_state();
    let (mut reaper, clock) = reaper(&state);

    reaper
        .reconfigure(&scenario_config(), &CancelSignal::never())
        .await
        .unwrap();
    clock.advance(ChronoDuration::hours(1));

    let snapshot = reaper.snapshot();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot.uuid.as_deref(), Some("reaper-1"));
    assert_eq!(snapshot.schedule.as_deref(), Some("*/5 * * * *"));
    assert_eq!(snapshot.taken_at, created() + ChronoDuration::hours(1));

    let ready: Vec<&str> = snapshot
        .entries
        .iter()
        .filter(|e| e.ready)
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(ready, vec!["another-resource-2"]);
    assert!(snapshot.to_string().starts_with("Watchlist: another-resource-1 in us-east1-b, "));
}

#[tokio::test]
async fn test_freeze_time_only_affects_current_entries() {
    let state = scenario_state();
    let (mut reaper, _clock) = reaper(&state);
    let never = CancelSignal::never();

    reaper.reconfigure(&scenario_config(), &never).await.unwrap();
    reaper.freeze_time(created() + ChronoDuration::days(30));
    assert!(reaper.watchlist().iter().all(|w| w.frozen_at.is_some()));

    reaper.reconfigure(&ReaperConfig::new().with_resource(test_config()), &never).await.unwrap();
    assert!(reaper.watchlist().iter().all(|w| w.frozen_at.is_none()));
}
