mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::racing::{Race, racing_state};
use common::{TestApp, actor_of, t0};
use fichaje::error::{AppError, ConflictError, StateError, ValidationError};
use fichaje::model::{AttendanceStatus, EventKind};
use fichaje::store::Store;

#[tokio::test]
async fn status_reflects_every_acknowledged_event() {
    let app = TestApp::new().await;
    let juanjo = app.employee("Juanjo", "6119").await;
    let client = app.client("Cliente A").await;
    let me = actor_of(&juanjo);
    let attendance = &app.state.attendance;

    attendance.clock_in(&me, juanjo.id, Some(client.id)).await.unwrap();
    assert_eq!(
        attendance.status(&me, juanjo.id).await.unwrap().status,
        AttendanceStatus::ClockedIn
    );

    app.clock.advance(Duration::minutes(90));
    attendance.pause(&me, juanjo.id).await.unwrap();
    let status = attendance.status(&me, juanjo.id).await.unwrap();
    assert_eq!(status.status, AttendanceStatus::OnBreak);
    assert_eq!(status.session_client_id, Some(client.id));

    app.clock.advance(Duration::minutes(15));
    attendance.resume(&me, juanjo.id).await.unwrap();
    app.clock.advance(Duration::minutes(30));
    let out = attendance.clock_out(&me, juanjo.id, None).await.unwrap();

    assert_eq!(out.client_id, client.id);
    assert_eq!(out.recorded_at, t0() + Duration::minutes(135));
    assert_eq!(
        attendance.status(&me, juanjo.id).await.unwrap().status,
        AttendanceStatus::ClockedOut
    );
}

#[tokio::test]
async fn invalid_transition_leaves_ledger_untouched() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let client = app.client("Cliente B").await;
    let me = actor_of(&ana);
    let attendance = &app.state.attendance;

    let err = attendance.clock_out(&me, ana.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::State(StateError::InvalidTransition {
            from: AttendanceStatus::ClockedOut,
            attempted: EventKind::Out
        })
    ));
    assert!(matches!(
        attendance.pause(&me, ana.id).await,
        Err(AppError::State(_))
    ));

    attendance.clock_in(&me, ana.id, Some(client.id)).await.unwrap();
    assert!(matches!(
        attendance.clock_in(&me, ana.id, Some(client.id)).await,
        Err(AppError::State(_))
    ));
    assert!(matches!(
        attendance.resume(&me, ana.id).await,
        Err(AppError::State(_))
    ));

    let events = app
        .store
        .events_for_employee(ana.id, t0() - Duration::hours(1), t0() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::In);
}

#[tokio::test]
async fn clock_in_needs_an_existing_client() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let me = actor_of(&ana);

    assert!(matches!(
        app.state.attendance.clock_in(&me, ana.id, None).await,
        Err(AppError::Validation(ValidationError::MissingClient))
    ));
    assert!(matches!(
        app.state.attendance.clock_in(&me, ana.id, Some(999)).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn clock_out_for_another_client_is_rejected() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let a = app.client("Cliente A").await;
    let b = app.client("Cliente B").await;
    let me = actor_of(&ana);

    app.state.attendance.clock_in(&me, ana.id, Some(a.id)).await.unwrap();
    let err = app
        .state
        .attendance
        .clock_out(&me, ana.id, Some(b.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::ClientMismatch { open, given }) if open == a.id && given == b.id
    ));

    app.state
        .attendance
        .clock_out(&me, ana.id, Some(a.id))
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_clock_ins_admit_exactly_one() {
    let (store, state, ana, client) = racing_state(Race::YieldAfterRead).await;
    let me = actor_of(&ana);

    // Both calls read the empty index before either appends.
    let (first, second) = tokio::join!(
        state.attendance.clock_in(&me, ana.id, Some(client.id)),
        state.attendance.clock_in(&me, ana.id, Some(client.id)),
    );

    let outcomes = [first, second];
    let ok = outcomes.iter().filter(|r| r.is_ok()).count();
    let rejected = outcomes
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(AppError::State(StateError::InvalidTransition {
                    from: AttendanceStatus::ClockedIn,
                    attempted: EventKind::In,
                }))
            )
        })
        .count();
    assert_eq!((ok, rejected), (1, 1));
    // The loser hit the compare-and-append, re-read and saw the winner.
    assert_eq!(store.conflicts(), 1);

    let events = store
        .events_for_employee(ana.id, t0() - Duration::hours(1), t0() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn double_clock_out_closes_the_session_once() {
    let (store, state, ana, client) = racing_state(Race::YieldAfterRead).await;
    let me = actor_of(&ana);
    let opened = state
        .attendance
        .clock_in(&me, ana.id, Some(client.id))
        .await
        .unwrap();

    // A kiosk tap and a phone tap landing together.
    let (first, second) = tokio::join!(
        state.attendance.clock_out(&me, ana.id, None),
        state.attendance.clock_out(&me, ana.id, Some(client.id)),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(AppError::State(StateError::InvalidTransition {
            from: AttendanceStatus::ClockedOut,
            attempted: EventKind::Out,
        }))
    )));
    assert_eq!(store.conflicts(), 1);

    let kinds: Vec<EventKind> = store
        .events_for_employee(ana.id, opened.recorded_at, opened.recorded_at + Duration::hours(1))
        .await
        .unwrap()
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![EventKind::In, EventKind::Out]);
}

#[tokio::test]
async fn repeated_conflicts_give_up_without_writing() {
    let (store, state, ana, client) = racing_state(Race::AlwaysLose).await;
    let me = actor_of(&ana);

    assert!(matches!(
        state.attendance.clock_in(&me, ana.id, Some(client.id)).await,
        Err(AppError::Conflict(ConflictError::ConcurrentModification))
    ));
    assert_eq!(store.conflicts(), 5);
    assert_eq!(
        state.attendance.status(&me, ana.id).await.unwrap().status,
        AttendanceStatus::ClockedOut
    );
}

#[tokio::test]
async fn ledger_never_holds_the_same_kind_twice_in_a_row() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let client = app.client("Cliente A").await;
    let me = actor_of(&ana);
    let attendance = &app.state.attendance;

    // A noisy user mashing buttons.
    for kind in [
        EventKind::In,
        EventKind::In,
        EventKind::Pause,
        EventKind::Pause,
        EventKind::Out,
        EventKind::Resume,
        EventKind::Out,
        EventKind::In,
        EventKind::Out,
    ] {
        app.clock.advance(Duration::minutes(5));
        let _ = match kind {
            EventKind::In => attendance.clock_in(&me, ana.id, Some(client.id)).await,
            EventKind::Out => attendance.clock_out(&me, ana.id, None).await,
            EventKind::Pause => attendance.pause(&me, ana.id).await,
            EventKind::Resume => attendance.resume(&me, ana.id).await,
        };
    }

    let events = app
        .store
        .events_for_employee(ana.id, t0(), t0() + Duration::hours(2))
        .await
        .unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::In,
            EventKind::Pause,
            EventKind::Out,
            EventKind::In,
            EventKind::Out
        ]
    );
    assert!(events.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
}

#[tokio::test]
async fn timestamps_never_go_backwards() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let client = app.client("Cliente A").await;
    let me = actor_of(&ana);

    let clock_in = app
        .state
        .attendance
        .clock_in(&me, ana.id, Some(client.id))
        .await
        .unwrap();
    app.clock.advance(Duration::minutes(-10));
    let pause = app.state.attendance.pause(&me, ana.id).await.unwrap();

    assert_eq!(pause.recorded_at, clock_in.recorded_at);
}

#[tokio::test]
async fn employees_cannot_clock_for_others_but_hr_can() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let luis = app.employee("Luis", "3333").await;
    let client = app.client("Cliente A").await;

    assert!(matches!(
        app.state
            .attendance
            .clock_in(&actor_of(&ana), luis.id, Some(client.id))
            .await,
        Err(AppError::Forbidden(_))
    ));

    let event = app
        .state
        .attendance
        .clock_in(&app.hr_actor(), luis.id, Some(client.id))
        .await
        .unwrap();
    assert_eq!(event.employee_id, luis.id);
}

#[tokio::test]
async fn deactivated_employees_cannot_clock() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let client = app.client("Cliente A").await;
    app.state
        .directory
        .deactivate(&app.hr_actor(), ana.id)
        .await
        .unwrap();

    assert!(matches!(
        app.state
            .attendance
            .clock_in(&app.hr_actor(), ana.id, Some(client.id))
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn history_is_bounded_and_ordered() {
    let app = TestApp::new().await;
    let ana = app.employee("Ana", "2222").await;
    let client = app.client("Cliente A").await;
    let me = actor_of(&ana);

    app.state.attendance.clock_in(&me, ana.id, Some(client.id)).await.unwrap();
    app.clock.advance(Duration::hours(3));
    app.state.attendance.clock_out(&me, ana.id, None).await.unwrap();

    let all = app
        .state
        .attendance
        .history(&me, ana.id, t0() - Duration::hours(1), t0() + Duration::hours(4))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].id < all[1].id);

    let first_only = app
        .state
        .attendance
        .history(&me, ana.id, t0() - Duration::hours(1), t0() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(first_only.len(), 1);

    assert!(matches!(
        app.state.attendance.history(&me, ana.id, t0(), t0()).await,
        Err(AppError::Validation(ValidationError::InvalidRange))
    ));
}
