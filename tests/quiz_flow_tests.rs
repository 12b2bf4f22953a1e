//! End-to-end quiz rounds driven through the server object.


use std::time::Duration;

use ox_arena_server::config::Config;
use ox_arena_server::protocol::messages::{QuickJoinPayload, QuizConfigSetPayload, RawQuestion};
use ox_arena_server::protocol::{AckError, Answer, ServerMessage};
use test_helpers::{connect, create_test_server, create_test_server_with, join, walk_to};

fn owner_config() -> Config {
    Config {
        owner_key: Some("owner-key".into()),
        ..Config::default()
    }
}

fn question(text: &str, answer: &str) -> RawQuestion {
    RawQuestion {
        id: None,
        text: Some(text.to_string()),
        answer: Some(answer.to_string()),
    }
}

#[tokio::test(start_paused = true)]
async fn solo_player_auto_start_reaches_first_question() {
    // A single player in an auto-mode room sees the countdown, the round
    // start with the ten fallback questions, and question 1 - well inside
    // the twelve-second budget.
    let server = create_test_server();
    let mut player = connect(&server);
    join(&server, &player, "AUTO", "Solo").await;

    let countdowns = player.drain_filtered(|m| matches!(m, ServerMessage::QuizAutoCountdown(_)));
    assert_eq!(countdowns.len(), 1, "auto countdown not announced");

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let starts = player.drain_filtered(|m| matches!(m, ServerMessage::QuizStart(_)));
    match starts.first().map(|m| m.as_ref()) {
        Some(ServerMessage::QuizStart(payload)) => {
            assert_eq!(payload.total_questions, 10);
        }
        other => panic!("expected quiz:start, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(3300)).await;
    let questions = player.drain_filtered(|m| matches!(m, ServerMessage::QuizQuestion(_)));
    match questions.first().map(|m| m.as_ref()) {
        Some(ServerMessage::QuizQuestion(payload)) => {
            assert_eq!(payload.index, 1);
            assert_eq!(payload.total, 10);
        }
        other => panic!("expected quiz:question, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn lock_judging_scores_and_ends_with_winner() {
    // A stands in the O zone, B in the X zone; the answer is O. A survives
    // with score 1, B is eliminated, and the round ends with a winner.
    let server = create_test_server_with(owner_config());
    let mut host = connect(&server);
    server
        .handle_quick_join(
            &host.id,
            QuickJoinPayload {
                name: Some("Anna".into()),
                room_code: Some("JUDGE".into()),
                owner_key: Some("owner-key".into()),
                route_token: None,
            },
        )
        .await
        .unwrap();
    let mut other = connect(&server);
    join(&server, &other, "JUDGE", "Ben").await;

    // One question, long lock window so positioning can finish first.
    server
        .handle_quiz_config_set(
            &host.id,
            QuizConfigSetPayload {
                questions: vec![question("O wins this one", "O")],
                lock_seconds: Some(60.0),
                auto_mode: Some(false),
                auto_finish: None,
            },
        )
        .await
        .unwrap();

    server.handle_quiz_start(&host.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3300)).await;

    walk_to(&server, &host, -20.0, 0.0).await;
    walk_to(&server, &other, 20.0, 0.0).await;
    host.drain();
    other.drain();

    server.handle_quiz_force_lock(&host.id).await.unwrap();

    let results = host.drain_filtered(|m| matches!(m, ServerMessage::QuizResult(_)));
    match results.first().map(|m| m.as_ref()) {
        Some(ServerMessage::QuizResult(result)) => {
            assert_eq!(result.answer, Answer::O);
            assert_eq!(result.index, 1);
            assert_eq!(result.survivor_count, 1);
            assert_eq!(result.correct_player_ids, vec![host.id]);
            assert_eq!(result.eliminated_player_ids, vec![other.id]);
            assert_eq!(result.eliminated_players.len(), 1);
            assert_eq!(result.eliminated_players[0].choice, Some(Answer::X));
        }
        other => panic!("expected quiz:result, got {other:?}"),
    }

    let ends = host.drain_filtered(|m| matches!(m, ServerMessage::QuizEnd(_)));
    match ends.first().map(|m| m.as_ref()) {
        Some(ServerMessage::QuizEnd(end)) => {
            assert_eq!(end.reason, "winner");
            assert_eq!(end.survivor_count, 1);
            assert_eq!(end.winner_id, Some(host.id));
        }
        other => panic!("expected quiz:end, got {other:?}"),
    }

    // Scores: the state snapshot confirms A holds one point.
    let extras = server.handle_quiz_state(&host.id).await.unwrap();
    let leaderboard = extras["score"]["leaderboard"].as_array().unwrap();
    let anna = leaderboard
        .iter()
        .find(|e| e["name"] == "Anna")
        .expect("Anna missing from leaderboard");
    assert_eq!(anna["score"], 1);
}

#[tokio::test(start_paused = true)]
async fn host_leave_mid_question_transfers_host_and_collapse_ends_round() {
    let server = create_test_server();
    let mut host = connect(&server);
    join(&server, &host, "HANDOFF", "Hana").await;
    let mut second = connect(&server);
    join(&server, &second, "HANDOFF", "Iris").await;
    let mut third = connect(&server);
    join(&server, &third, "HANDOFF", "Jun").await;

    // Auto mode is on by default; ride the automatic start into a question.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    tokio::time::sleep(Duration::from_millis(3300)).await;
    second.drain();
    third.drain();

    // Host leaves mid-question: oldest remaining player takes over and the
    // quiz keeps going with two survivors.
    server.handle_leave_room(&host.id).await.unwrap();
    let updates = second.drain_filtered(|m| matches!(m, ServerMessage::RoomUpdate(_)));
    let snapshot = match updates.last().map(|m| m.as_ref()) {
        Some(ServerMessage::RoomUpdate(snapshot)) => snapshot.clone(),
        other => panic!("expected room:update, got {other:?}"),
    };
    assert_eq!(snapshot.host_id, Some(second.id));
    assert!(snapshot.quiz.active, "quiz should continue with two alive");
    assert!(second
        .drain_filtered(|m| matches!(m, ServerMessage::QuizEnd(_)))
        .is_empty());

    // The roster collapsing to one survivor finishes the round.
    server.handle_leave_room(&third.id).await.unwrap();
    let ends = second.drain_filtered(|m| matches!(m, ServerMessage::QuizEnd(_)));
    match ends.first().map(|m| m.as_ref()) {
        Some(ServerMessage::QuizEnd(end)) => {
            assert_eq!(end.reason, "player-left");
        }
        other => panic!("expected quiz:end, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn quiz_commands_enforce_phase_and_host_rules() {
    let server = create_test_server_with(owner_config());
    let mut host = connect(&server);
    server
        .handle_quick_join(
            &host.id,
            QuickJoinPayload {
                name: Some("Host".into()),
                room_code: Some("RULES".into()),
                owner_key: Some("owner-key".into()),
                route_token: None,
            },
        )
        .await
        .unwrap();
    let guest = connect(&server);
    join(&server, &guest, "RULES", "Guest").await;

    // Guests cannot drive the quiz.
    assert_eq!(
        server.handle_quiz_start(&guest.id).await.unwrap_err(),
        AckError::HostOnly
    );
    // Nothing to stop or lock before a round starts.
    assert_eq!(
        server.handle_quiz_stop(&host.id).await.unwrap_err(),
        AckError::QuizNotActive
    );
    assert_eq!(
        server.handle_quiz_force_lock(&host.id).await.unwrap_err(),
        AckError::QuizNotActive
    );

    server
        .handle_quiz_config_set(
            &host.id,
            QuizConfigSetPayload {
                questions: vec![question("first", "O"), question("second", "X")],
                lock_seconds: Some(60.0),
                auto_mode: Some(false),
                auto_finish: Some(false),
            },
        )
        .await
        .unwrap();
    server.handle_quiz_start(&host.id).await.unwrap();
    assert_eq!(
        server.handle_quiz_start(&host.id).await.unwrap_err(),
        AckError::QuizAlreadyActive
    );

    tokio::time::sleep(Duration::from_millis(3300)).await;
    // Question 1 is open.
    assert_eq!(
        server.handle_quiz_next(&host.id).await.unwrap_err(),
        AckError::QuestionAlreadyOpen
    );
    assert_eq!(
        server.handle_quiz_prev(&host.id).await.unwrap_err(),
        AckError::NoPreviousQuestion
    );

    // Lock it; with auto_finish off the round waits for the next question.
    server.handle_quiz_force_lock(&host.id).await.unwrap();
    server.handle_quiz_next(&host.id).await.unwrap();

    // Locking the final question completes the round on its own.
    server.handle_quiz_force_lock(&host.id).await.unwrap();
    assert_eq!(
        server.handle_quiz_next(&host.id).await.unwrap_err(),
        AckError::QuizNotActive
    );
    assert_eq!(
        server.handle_quiz_stop(&host.id).await.unwrap_err(),
        AckError::QuizNotActive
    );
    host.drain();
    let extras = server.handle_quiz_state(&host.id).await.unwrap();
    assert_eq!(extras["quiz"]["phase"], "ended");
}

#[tokio::test(start_paused = true)]
async fn invalid_question_config_is_rejected() {
    let server = create_test_server_with(owner_config());
    let host = connect(&server);
    server
        .handle_quick_join(
            &host.id,
            QuickJoinPayload {
                name: None,
                room_code: Some("BADCFG".into()),
                owner_key: Some("owner-key".into()),
                route_token: None,
            },
        )
        .await
        .unwrap();

    let err = server
        .handle_quiz_config_set(
            &host.id,
            QuizConfigSetPayload {
                questions: vec![question("no answer here", "maybe")],
                lock_seconds: None,
                auto_mode: None,
                auto_finish: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, AckError::InvalidQuestionConfig);
}

#[tokio::test(start_paused = true)]
async fn late_joiner_receives_quiz_snapshot() {
    let server = create_test_server();
    let host = connect(&server);
    join(&server, &host, "SNAP", "Early").await;

    // Ride auto-start into the first question.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    tokio::time::sleep(Duration::from_millis(3300)).await;

    let mut late = connect(&server);
    join(&server, &late, "SNAP", "Late").await;
    let messages = late.drain();
    let saw_start = messages
        .iter()
        .any(|m| matches!(m.as_ref(), ServerMessage::QuizStart(_)));
    let saw_question = messages
        .iter()
        .any(|m| matches!(m.as_ref(), ServerMessage::QuizQuestion(_)));
    let saw_score = messages
        .iter()
        .any(|m| matches!(m.as_ref(), ServerMessage::QuizScore(_)));
    assert!(saw_start, "late joiner missed quiz:start");
    assert!(saw_question, "late joiner missed quiz:question");
    assert!(saw_score, "late joiner missed quiz:score");

    // Mid-round arrivals are not alive participants.
    let extras = server.handle_quiz_state(&late.id).await.unwrap();
    assert_eq!(extras["quiz"]["phase"], "question");
    assert_eq!(extras["score"]["survivors"], 1);
}
