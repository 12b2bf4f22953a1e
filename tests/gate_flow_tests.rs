//! Entry-gate admission flows through the server object.


use std::time::Duration;

use ox_arena_server::config::Config;
use ox_arena_server::protocol::{AckError, ServerMessage};
use test_helpers::{connect, create_test_server_with, join};

fn small_gate_config() -> Config {
    let mut config = Config::default();
    config.server.participant_limit = 5;
    config
}

#[tokio::test(start_paused = true)]
async fn admission_overflow_demotes_with_priority() {
    let server = create_test_server_with(small_gate_config());
    let mut host = connect(&server);
    join(&server, &host, "WAVE", "Host").await;

    server.handle_portal_open(&host.id).await.unwrap();

    // Six arrivals queue while the portal is open; the host already holds
    // one of the five participant slots.
    let mut arrivals = Vec::new();
    for i in 0..6 {
        let client = connect(&server);
        join(&server, &client, "WAVE", &format!("P{i}")).await;
        arrivals.push(client);
    }

    // A round cannot start over a waiting queue.
    assert_eq!(
        server.handle_quiz_start(&host.id).await.unwrap_err(),
        AckError::PlayersWaitingAdmission
    );

    server.handle_portal_start(&host.id).await.unwrap();
    assert_eq!(
        server.handle_portal_start(&host.id).await.unwrap_err(),
        AckError::AdmissionInProgress
    );
    host.drain();

    tokio::time::sleep(Duration::from_millis(5100)).await;

    let admitted = host.drain_filtered(|m| matches!(m, ServerMessage::PortalLobbyAdmitted(_)));
    match admitted.first().map(|m| m.as_ref()) {
        Some(ServerMessage::PortalLobbyAdmitted(payload)) => {
            assert_eq!(payload.admitted_count, 4);
            assert_eq!(payload.spectator_count, 2);
            assert_eq!(payload.priority_players, 2);
            assert_eq!(payload.participant_limit, 5);
        }
        other => panic!("expected portal:lobby-admitted, got {other:?}"),
    }

    // The first four arrivals are in, the overflow pair watches with
    // priority for the next round.
    let extras = server.handle_quiz_state(&host.id).await.unwrap();
    assert_eq!(extras["quiz"]["active"], false);
    let mut update = host.drain_filtered(|m| matches!(m, ServerMessage::RoomUpdate(_)));
    // Fall back to a fresh join snapshot if no update is queued.
    if update.is_empty() {
        let probe = connect(&server);
        join(&server, &probe, "WAVE", "Probe").await;
        let mut probe = probe;
        update = probe.drain_filtered(|m| matches!(m, ServerMessage::RoomUpdate(_)));
    }
    let snapshot = match update.last().map(|m| m.as_ref()) {
        Some(ServerMessage::RoomUpdate(snapshot)) => snapshot.clone(),
        other => panic!("expected room:update, got {other:?}"),
    };
    assert_eq!(snapshot.entry_gate.admitted_players, 5);
    assert_eq!(snapshot.entry_gate.spectator_players, 2);
    assert_eq!(snapshot.entry_gate.priority_players, 2);
    assert!(!snapshot.entry_gate.portal_open);
}

#[tokio::test(start_paused = true)]
async fn arrivals_during_active_quiz_are_spectators() {
    let server = create_test_server_with(small_gate_config());
    let host = connect(&server);
    join(&server, &host, "WATCH", "Host").await;

    // Auto-start carries the solo host into a round.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    tokio::time::sleep(Duration::from_millis(3300)).await;

    let mut late = connect(&server);
    join(&server, &late, "WATCH", "Late").await;
    let updates = late.drain_filtered(|m| matches!(m, ServerMessage::RoomUpdate(_)));
    let snapshot = match updates.first().map(|m| m.as_ref()) {
        Some(ServerMessage::RoomUpdate(snapshot)) => snapshot.clone(),
        other => panic!("expected room:update, got {other:?}"),
    };
    let late_row = snapshot
        .players
        .iter()
        .find(|p| p.id == late.id)
        .expect("late joiner missing from snapshot");
    assert!(late_row.spectator);
    assert!(!late_row.alive);
    assert!(!late_row.admitted);
}

#[tokio::test(start_paused = true)]
async fn lobby_open_requires_host_and_rejects_double_open() {
    let server = create_test_server_with(small_gate_config());
    let host = connect(&server);
    join(&server, &host, "OPEN", "Host").await;
    let guest = connect(&server);
    join(&server, &guest, "OPEN", "Guest").await;

    assert_eq!(
        server.handle_portal_open(&guest.id).await.unwrap_err(),
        AckError::HostOnly
    );
    server.handle_portal_open(&host.id).await.unwrap();
    assert_eq!(
        server.handle_portal_open(&host.id).await.unwrap_err(),
        AckError::LobbyAlreadyOpen
    );
    assert_eq!(
        server.handle_portal_start(&guest.id).await.unwrap_err(),
        AckError::HostOnly
    );
}
