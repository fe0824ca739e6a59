//! End-to-end session lifecycle against a scripted transport
//!
//! Runs on a paused clock, so hour-long refresh waits complete instantly
//! and call times can be asserted to the millisecond.

mod support;

use std::sync::Arc;

use futures::future::join_all;
use odp_session_domain::{
    Credentials, Endpoints, HttpMethod, SchedulerKind, SchedulerPhase, SessionData, SessionError,
};
use odp_session_infra::{Authenticator, FileTokenStore};
use serde_json::{json, Value};
use support::*;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_test::{assert_pending, assert_ready};

fn credentials() -> Credentials {
    Credentials::new("order-bot", "s3cret")
}

/// Call offsets match `expected` to within the 1 ms timer resolution.
fn assert_offsets(actual: &[u128], expected: &[u128]) {
    assert_eq!(actual.len(), expected.len(), "calls at {actual:?}, expected {expected:?}");
    for (got, want) in actual.iter().zip(expected) {
        assert!(got.abs_diff(*want) <= 1, "calls at {actual:?}, expected {expected:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn refresh_fires_five_minutes_before_expiry_and_merges() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), true, false)));
    h.transport.push(
        REFRESH,
        Step::ok(json!({
            "token": "t2",
            "rToken": "r-t2",
            "serverTime": 4_300_000,
            "expiresIn": 7_900_000
        })),
    );
    h.transport.fallback(REFRESH, Step::ok(json!({ "token": "t3" })));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();

    advance_ms(1).await;
    assert_eq!(h.auth.maintenance_status().refresh, Some(SchedulerPhase::FirstWait));
    assert_eq!(h.auth.maintenance_status().heartbeat, None);

    advance_ms(3_299_000).await;
    assert!(h.transport.calls_to(REFRESH).is_empty());

    advance_ms(1_500).await;
    let refreshes = h.transport.calls_to(REFRESH);
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].method, HttpMethod::Get);
    assert_eq!(refreshes[0].header("Authorization"), Some("JWT t1"));
    assert_eq!(refreshes[0].header("rToken"), Some("r-t1"));

    let session = h.auth.session();
    assert_eq!(h.auth.get_token().as_deref(), Some("t2"));
    assert_eq!(session.expires_in, Some(7_900_000));
    assert_eq!(session.session_id.as_deref(), Some("s1"));
    assert_eq!(session.username(), Some("order-bot"));
    assert_eq!(h.auth.maintenance_status().refresh, Some(SchedulerPhase::Recurring));

    advance_ms(3_300_000).await;
    let refreshes = h.transport.calls_to(REFRESH);
    assert_offsets(&h.transport.offsets(REFRESH, start), &[3_300_000, 6_600_000]);
    assert_eq!(refreshes[1].header("Authorization"), Some("JWT t2"));
    assert_eq!(refreshes[1].header("rToken"), Some("r-t2"));
    assert_eq!(h.auth.get_token().as_deref(), Some("t3"));
    assert_eq!(h.store.saves(), vec!["t1", "t2", "t3"]);
}

#[tokio::test(start_paused = true)]
async fn refresh_is_immediate_when_expiry_is_within_margin() {
    let h = Harness::new();
    let mut body = with_policy(session_body("t1"), true, false);
    body["expiresIn"] = json!(1_200_000);
    h.transport.push(LOGIN, Step::ok(body));
    h.transport.fallback(REFRESH, Step::ok(json!({ "token": "t2" })));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();
    advance_ms(10).await;

    assert_offsets(&h.transport.offsets(REFRESH, start), &[0]);
    assert_eq!(h.auth.get_token().as_deref(), Some("t2"));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_beats_immediately_then_every_interval_minus_one_second() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), false, true)));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();
    advance_ms(60_000).await;

    assert_offsets(&h.transport.offsets(HEARTBEAT, start), &[0, 29_000, 58_000]);
    for beat in h.transport.calls_to(HEARTBEAT) {
        assert_eq!(beat.method, HttpMethod::Put);
        assert_eq!(beat.header("Authorization"), Some("JWT t1"));
        assert_eq!(beat.request.body, Some(json!({ "uuid": "s1" })));
    }
    assert!(h.transport.calls_to(REFRESH).is_empty());
    assert_eq!(h.auth.maintenance_status().heartbeat, Some(SchedulerPhase::Recurring));
    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
}

#[tokio::test(start_paused = true)]
async fn close_window_policy_also_requires_heartbeat() {
    let h = Harness::new();
    let mut body = session_body("t1");
    body["rbacUserCloseWindowToLogout"] = json!(true);
    h.transport.push(LOGIN, Step::ok(body));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(10).await;

    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 1);
    assert!(h.auth.maintenance_status().is_live(SchedulerKind::Heartbeat));
}

#[tokio::test(start_paused = true)]
async fn no_policy_means_no_maintenance() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(session_body("t1")));

    let session = h.auth.login(credentials()).await.unwrap();
    advance_ms(10_000_000).await;

    assert_eq!(session.token(), Some("t1"));
    assert_eq!(h.transport.calls().len(), 1);
    assert!(h.auth.maintenance_status().is_idle());
    assert!(h.auth.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn refresh_401_relogs_in_and_adopts_new_policy() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), true, false)));
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t2"), false, true)));
    h.transport.push(REFRESH, Step::status(401));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();
    let first_epoch = h.auth.maintenance_status().epoch;
    advance_ms(3_300_500).await;

    let logins = h.transport.calls_to(LOGIN);
    assert_eq!(logins.len(), 2);
    assert_eq!(
        logins[1].request.body,
        Some(json!({ "username": "order-bot", "password": "s3cret" }))
    );
    assert_eq!(h.auth.get_token().as_deref(), Some("t2"));
    assert!(h.auth.is_authenticated());

    let status = h.auth.maintenance_status();
    assert!(status.epoch > first_epoch);
    assert_eq!(status.refresh, None);
    assert!(status.is_live(SchedulerKind::Heartbeat));
    assert_offsets(&h.transport.offsets(HEARTBEAT, start), &[3_300_000]);
    assert_eq!(h.transport.calls_to(REFRESH).len(), 1);
    assert_eq!(
        h.observer.events(),
        vec![Event::Established(Some("t1".into())), Event::Established(Some("t2".into()))]
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_server_error_keeps_cadence_without_merging() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), true, false)));
    h.transport.push(REFRESH, Step::Respond(500, json!({ "message": "unavailable" })));
    h.transport.fallback(REFRESH, Step::ok(json!({ "token": "t2" })));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();
    advance_ms(3_300_500).await;

    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
    assert_eq!(
        h.observer.events().last(),
        Some(&Event::MaintenanceFailure(SchedulerKind::Refresh))
    );
    assert_eq!(h.auth.maintenance_status().refresh, Some(SchedulerPhase::Recurring));

    advance_ms(3_300_000).await;
    assert_offsets(&h.transport.offsets(REFRESH, start), &[3_300_000, 6_600_000]);
    assert_eq!(h.transport.calls_to(REFRESH)[1].header("Authorization"), Some("JWT t1"));
    assert_eq!(h.auth.get_token().as_deref(), Some("t2"));
    assert_eq!(h.transport.calls_to(LOGIN).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_transport_failure_keeps_cadence() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), false, true)));
    h.transport.push(HEARTBEAT, Step::Fail("connection reset".into()));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();
    advance_ms(30_000).await;

    assert_offsets(&h.transport.offsets(HEARTBEAT, start), &[0, 29_000]);
    assert!(h.observer.events().contains(&Event::MaintenanceFailure(SchedulerKind::Heartbeat)));
    assert!(h.auth.is_authenticated());
    assert_eq!(h.transport.calls_to(LOGIN).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_401s_trigger_a_single_relogin() {
    let h = Harness::new();
    let mut body = with_policy(session_body("t1"), true, true);
    body["expiresIn"] = json!(1_200_000);
    let gate = Arc::new(Notify::new());
    h.transport.push(LOGIN, Step::ok(body));
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t2"), true, true)));
    h.transport.push(REFRESH, Step::Gated(gate.clone(), 401, Value::Null));
    h.transport.push(HEARTBEAT, Step::Gated(gate.clone(), 401, Value::Null));
    h.transport.fallback(REFRESH, Step::ok(json!({ "token": "t3" })));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let start = Instant::now();
    h.auth.login(credentials()).await.unwrap();
    advance_ms(10).await;
    assert_eq!(h.transport.calls_to(REFRESH).len(), 1);
    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 1);

    // both 401s land at 10 ms
    gate.notify_waiters();
    advance_ms(10).await;

    assert_eq!(h.transport.calls_to(LOGIN).len(), 2);
    assert_eq!(h.auth.get_token().as_deref(), Some("t2"));
    assert_eq!(h.observer.lost_count(), 0);
    let status = h.auth.maintenance_status();
    assert_eq!(status.refresh, Some(SchedulerPhase::FirstWait));
    assert_eq!(status.heartbeat, Some(SchedulerPhase::Recurring));
    assert_offsets(&h.transport.offsets(HEARTBEAT, start), &[0, 10]);

    advance_ms(3_300_000).await;
    assert_eq!(h.transport.calls_to(LOGIN).len(), 2);
    assert_offsets(&h.transport.offsets(REFRESH, start), &[0, 3_300_010]);
    let mut beats = vec![0];
    beats.extend((0..114).map(|n| 10 + 29_000 * n));
    assert_offsets(&h.transport.offsets(HEARTBEAT, start), &beats);
    assert_eq!(h.auth.get_token().as_deref(), Some("t3"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_all_further_calls() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), true, true)));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));
    h.transport.fallback(REFRESH, Step::ok(json!({ "token": "t2" })));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(1).await;
    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 1);

    h.auth.shutdown().await;
    assert!(h.auth.maintenance_status().is_idle());

    advance_ms(4_000_000).await;
    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 1);
    assert!(h.transport.calls_to(REFRESH).is_empty());
    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
    assert_eq!(h.auth.session().session_id.as_deref(), Some("s1"));
}

#[tokio::test(start_paused = true)]
async fn result_of_cancelled_refresh_is_discarded() {
    let h = Harness::new();
    let gate = Arc::new(Notify::new());
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), true, false)));
    h.transport.push(REFRESH, Step::Gated(gate.clone(), 200, json!({ "token": "late" })));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(3_300_500).await;
    assert_eq!(h.transport.calls_to(REFRESH).len(), 1);
    // reads never wait on an in-flight refresh
    assert_eq!(h.auth.token_supplier().current_token().as_deref(), Some("t1"));

    h.auth.shutdown().await;
    gate.notify_waiters();
    advance_ms(10).await;

    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
    assert_eq!(h.store.saves(), vec!["t1"]);
    assert_eq!(h.auth.maintenance_status().refresh, None);
}

#[tokio::test(start_paused = true)]
async fn rejected_login_leaves_state_untouched() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::Respond(401, json!({ "message": "Invalid credentials" })));

    let err = h.auth.login(credentials()).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Auth { status: 401, ref body } if body["message"] == "Invalid credentials"
    ));

    advance_ms(4_000_000).await;
    assert!(!h.auth.is_authenticated());
    assert_eq!(h.auth.session(), SessionData::default());
    assert!(h.auth.get_token().is_none());
    assert!(h.auth.maintenance_status().is_idle());
    assert_eq!(h.transport.calls().len(), 1);
    assert!(h.observer.events().is_empty());
    assert!(h.store.saves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_login_keeps_previous_session_running() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), false, true)));
    h.transport.push(LOGIN, Step::Fail("dns failure".into()));
    h.transport.push(LOGIN, Step::ok(json!({ "uuid": "s2" })));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(10).await;

    let err = h.auth.login(credentials()).await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
    let err = h.auth.login(credentials()).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidResponse(_)));

    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
    assert_eq!(h.auth.session().session_id.as_deref(), Some("s1"));
    advance_ms(29_000).await;
    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_relogin_reports_session_lost() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(with_policy(session_body("t1"), false, true)));
    h.transport.push(LOGIN, Step::status(500));
    h.transport.push(HEARTBEAT, Step::status(401));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(10).await;

    assert_eq!(h.observer.lost_count(), 1);
    assert!(!h.auth.is_authenticated());
    assert!(h.auth.maintenance_status().is_idle());
    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));

    advance_ms(120_000).await;
    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 1);
    assert_eq!(h.transport.calls_to(LOGIN).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_timing_field_skips_only_that_scheduler() {
    let h = Harness::new();
    let mut body = with_policy(session_body("t1"), true, true);
    body.as_object_mut().unwrap().remove("expiresIn");
    h.transport.push(LOGIN, Step::ok(body));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(10).await;

    let status = h.auth.maintenance_status();
    assert_eq!(status.refresh, None);
    assert!(status.is_live(SchedulerKind::Heartbeat));
    assert_eq!(h.transport.calls_to(HEARTBEAT).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unschedulable_token_duration_skips_refresh() {
    let h = Harness::new();
    let mut body = with_policy(session_body("t1"), true, true);
    body["rbacUserTokenDuration"] = json!(u64::MAX / 2);
    h.transport.push(LOGIN, Step::ok(body));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));
    h.transport.fallback(REFRESH, Step::ok(json!({ "token": "t2" })));

    h.auth.login(credentials()).await.unwrap();
    advance_ms(4_000_000).await;

    let status = h.auth.maintenance_status();
    assert_eq!(status.refresh, None);
    assert!(status.is_live(SchedulerKind::Heartbeat));
    assert!(h.transport.calls_to(REFRESH).is_empty());
    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
}

#[tokio::test(start_paused = true)]
async fn resume_reuses_accepted_stored_token() {
    let h = Harness::with_store(MemoryTokenStore::with_token("stored"));
    let mut checked = with_policy(session_body("unused"), false, true);
    checked.as_object_mut().unwrap().remove("token");
    h.transport.push(CHECK, Step::ok(checked));
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let session = h.auth.resume_or_login(credentials()).await.unwrap();
    advance_ms(10).await;

    assert_eq!(session.token(), Some("stored"));
    let checks = h.transport.calls_to(CHECK);
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].header("Authorization"), Some("JWT stored"));
    assert!(h.transport.calls_to(LOGIN).is_empty());
    assert_eq!(h.transport.calls_to(HEARTBEAT)[0].header("Authorization"), Some("JWT stored"));
    assert!(h.auth.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn resume_falls_back_to_login_when_stored_token_is_rejected() {
    let h = Harness::with_store(MemoryTokenStore::with_token("expired"));
    h.transport.push(CHECK, Step::status(401));
    h.transport.push(LOGIN, Step::ok(session_body("t1")));

    h.auth.resume_or_login(credentials()).await.unwrap();

    assert_eq!(h.transport.calls_to(CHECK).len(), 1);
    assert_eq!(h.transport.calls_to(LOGIN).len(), 1);
    assert_eq!(h.store.current().as_deref(), Some("t1"));
    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
}

#[tokio::test(start_paused = true)]
async fn rejected_stored_token_is_discarded_even_if_login_fails() {
    let h = Harness::with_store(MemoryTokenStore::with_token("expired"));
    h.transport.push(CHECK, Step::status(401));
    h.transport.push(LOGIN, Step::status(503));

    let err = h.auth.resume_or_login(credentials()).await.unwrap_err();

    assert!(matches!(err, SessionError::Auth { status: 503, .. }));
    assert_eq!(h.store.current(), None);
    assert!(h.store.saves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unreachable_check_keeps_stored_token() {
    let h = Harness::with_store(MemoryTokenStore::with_token("t0"));
    h.transport.push(CHECK, Step::Fail("connection refused".into()));
    h.transport.push(LOGIN, Step::Fail("connection refused".into()));

    assert!(h.auth.resume_or_login(credentials()).await.is_err());
    assert_eq!(h.store.current().as_deref(), Some("t0"));
}

#[tokio::test(start_paused = true)]
async fn resume_without_stored_token_logs_in() {
    let h = Harness::new();
    h.transport.push(LOGIN, Step::ok(session_body("t1")));

    h.auth.resume_or_login(credentials()).await.unwrap();

    assert!(h.transport.calls_to(CHECK).is_empty());
    assert_eq!(h.store.saves(), vec!["t1"]);
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("TOKEN");

    let transport = ScriptedTransport::new();
    transport.push(LOGIN, Step::ok(session_body("t1")));
    transport.push(CHECK, Step::ok(json!({ "uuid": "s1" })));

    let first = Authenticator::builder(Arc::new(transport.clone()), Endpoints::from_host(HOST))
        .token_store(Arc::new(FileTokenStore::new(&token_path)))
        .build();
    first.login(credentials()).await.unwrap();
    first.shutdown().await;
    assert_eq!(std::fs::read_to_string(&token_path).unwrap(), "t1");

    let second = Authenticator::builder(Arc::new(transport.clone()), Endpoints::from_host(HOST))
        .token_store(Arc::new(FileTokenStore::new(&token_path)))
        .build();
    second.resume_or_login(credentials()).await.unwrap();

    assert_eq!(second.get_token().as_deref(), Some("t1"));
    assert_eq!(transport.calls_to(LOGIN).len(), 1);
    assert_eq!(transport.calls_to(CHECK)[0].header("Authorization"), Some("JWT t1"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_logins_are_serialized() {
    let h = Harness::new();
    for token in ["t1", "t2", "t3"] {
        h.transport.push(LOGIN, Step::ok(with_policy(session_body(token), false, true)));
    }
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let results = join_all((0..3).map(|_| h.auth.login(credentials()))).await;
    assert!(results.iter().all(Result::is_ok));
    advance_ms(10).await;

    assert_eq!(h.transport.calls_to(LOGIN).len(), 3);
    assert_eq!(h.auth.get_token().as_deref(), Some("t3"));
    assert!(h.auth.maintenance_status().is_live(SchedulerKind::Heartbeat));
    let beats = h.transport.calls_to(HEARTBEAT);
    assert_eq!(beats.last().and_then(|b| b.header("Authorization")), Some("JWT t3"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_in_flight_login() {
    let h = Harness::new();
    let gate = Arc::new(Notify::new());
    h.transport.push(
        LOGIN,
        Step::Gated(gate.clone(), 200, with_policy(session_body("t1"), false, true)),
    );
    h.transport.fallback(HEARTBEAT, Step::ok(Value::Null));

    let auth = h.auth.clone();
    let login = tokio::spawn(async move { auth.login(credentials()).await });
    advance_ms(1).await;

    let mut shutdown = tokio_test::task::spawn(h.auth.shutdown());
    assert_pending!(shutdown.poll());

    gate.notify_waiters();
    login.await.unwrap().unwrap();
    assert_ready!(shutdown.poll());

    advance_ms(60_000).await;
    assert!(h.auth.maintenance_status().is_idle());
    assert!(h.transport.calls_to(HEARTBEAT).len() <= 1);
    assert_eq!(h.auth.get_token().as_deref(), Some("t1"));
}
