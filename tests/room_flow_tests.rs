//! Room lifecycle flows: capacity, listing, moderation, and frame dispatch.


use ox_arena_server::config::Config;
use ox_arena_server::protocol::messages::{KickPlayerPayload, QuickJoinPayload};
use ox_arena_server::protocol::{AckError, ServerMessage};
use test_helpers::{connect, create_test_server, create_test_server_with, join};

#[tokio::test]
async fn join_rejections_carry_room_is_full() {
    let mut config = Config::default();
    config.server.room_capacity = 3;
    let server = create_test_server_with(config);

    for i in 0..3 {
        let client = connect(&server);
        join(&server, &client, "FULL", &format!("P{i}")).await;
    }
    let overflow = connect(&server);
    let err = server
        .handle_quick_join(
            &overflow.id,
            QuickJoinPayload {
                room_code: Some("FULL".into()),
                ..QuickJoinPayload::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, AckError::RoomFull);
    assert_eq!(err.as_str(), "room is full");
}

#[tokio::test]
async fn room_list_reports_summaries() {
    let server = create_test_server();
    let a = connect(&server);
    join(&server, &a, "LISTA", "A").await;
    let b = connect(&server);
    join(&server, &b, "LISTB", "B").await;

    let extras = server.handle_list_rooms(&a.id).await.unwrap();
    let rooms = extras["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 2);
    let codes: Vec<&str> = rooms.iter().map(|r| r["code"].as_str().unwrap()).collect();
    assert!(codes.contains(&"LISTA"));
    assert!(codes.contains(&"LISTB"));
    assert!(rooms.iter().all(|r| r["players"] == 1));
}

#[tokio::test]
async fn names_are_sanitized_on_join() {
    let server = create_test_server();
    let client = connect(&server);
    let extras = server
        .handle_quick_join(
            &client.id,
            QuickJoinPayload {
                name: Some("  spaced   out name that is way too long  ".into()),
                room_code: Some("NAMES".into()),
                ..QuickJoinPayload::default()
            },
        )
        .await
        .unwrap();
    let players = extras["room"]["players"].as_array().unwrap();
    let name = players[0]["name"].as_str().unwrap();
    assert!(name.chars().count() <= 16);
    assert!(!name.contains(' '));

    let anon = connect(&server);
    let extras = server
        .handle_quick_join(
            &anon.id,
            QuickJoinPayload {
                room_code: Some("NAMES".into()),
                ..QuickJoinPayload::default()
            },
        )
        .await
        .unwrap();
    let players = extras["room"]["players"].as_array().unwrap();
    assert!(players.iter().any(|p| p["name"] == "PLAYER"));
}

#[tokio::test]
async fn kicked_player_is_out_and_notified() {
    let server = create_test_server();
    let host = connect(&server);
    join(&server, &host, "BOOT", "Host").await;
    let mut victim = connect(&server);
    join(&server, &victim, "BOOT", "Victim").await;
    victim.drain();

    server
        .handle_kick_player(
            &host.id,
            KickPlayerPayload {
                target_id: Some(victim.id),
            },
        )
        .await
        .unwrap();

    let messages = victim.drain();
    assert!(messages
        .iter()
        .any(|m| matches!(m.as_ref(), ServerMessage::HostKicked { .. })));
    assert_eq!(
        server.handle_leave_room(&victim.id).await.unwrap_err(),
        AckError::NotInRoom
    );
}

#[tokio::test]
async fn full_frame_dispatch_round_trip() {
    let server = create_test_server();
    let mut client = connect(&server);
    client.drain();

    server
        .handle_frame(
            &client.id,
            r#"{"type":"room:create","data":{"code":"WIRE","name":"Dee"},"ack":1}"#,
        )
        .await;
    server
        .handle_frame(
            &client.id,
            r#"{"type":"chat:send","data":{"text":"over the wire"},"ack":2}"#,
        )
        .await;

    let messages = client.drain();
    let acks: Vec<_> = messages
        .iter()
        .filter_map(|m| match m.as_ref() {
            ServerMessage::Ack(ack) => Some(ack.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(acks.len(), 2);
    assert!(acks.iter().all(|a| a.ok));
    assert!(messages.iter().any(|m| matches!(
        m.as_ref(),
        ServerMessage::ChatMessage(entry) if entry.text == "over the wire"
    )));
}

#[tokio::test]
async fn rejoining_moves_the_player_between_rooms() {
    let server = create_test_server();
    let client = connect(&server);
    join(&server, &client, "FIRST", "Mover").await;
    join(&server, &client, "SECOND", "Mover").await;

    let extras = server.handle_list_rooms(&client.id).await.unwrap();
    let rooms = extras["rooms"].as_array().unwrap();
    // FIRST emptied and was destroyed; only SECOND remains.
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["code"], "SECOND");
}
