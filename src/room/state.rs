//! Room and player state.
//!
//! Rooms own players by id in insertion order, which makes host succession
//! deterministic: when the host leaves, the oldest remaining player takes
//! over. Cross-references between rooms and connections are always ids,
//! never pointers; per-receiver delta caches live on the connection side.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

use crate::movement::MovementNet;
use crate::protocol::errors::AckError;
use crate::protocol::types::{
    Answer, BillboardMedia, ChatEntry, ChoiceReason, PlayerId, PlayerPose, PlayerPublic,
    RoomSnapshot, RoomSummary,
};
use crate::quiz::QuizState;

use super::gate::EntryGate;

/// A connected player inside exactly one room.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub owner_token: bool,
    pub pose: PlayerPose,
    pub pose_updated_at: DateTime<Utc>,
    pub net: MovementNet,
    // Quiz attributes
    pub score: u32,
    pub alive: bool,
    pub last_choice: Option<Answer>,
    pub last_choice_reason: Option<ChoiceReason>,
    // Admission attributes
    pub admitted: bool,
    pub queued_for_admission: bool,
    pub spectator: bool,
    pub chat_muted: bool,
    pub priority_for_next_round: bool,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, owner_token: bool, now: Instant) -> Self {
        Self {
            id,
            name,
            owner_token,
            pose: PlayerPose::spawn(),
            pose_updated_at: Utc::now(),
            net: MovementNet::new(now),
            score: 0,
            alive: false,
            last_choice: None,
            last_choice_reason: None,
            admitted: false,
            queued_for_admission: false,
            spectator: false,
            chat_muted: false,
            priority_for_next_round: false,
            joined_at: Utc::now(),
        }
    }

    /// Counts toward the quiz participant pool.
    pub fn is_participant(&self) -> bool {
        self.admitted && !self.spectator
    }

    pub fn public(&self, host_id: Option<PlayerId>) -> PlayerPublic {
        PlayerPublic {
            id: self.id,
            name: self.name.clone(),
            host: host_id == Some(self.id),
            alive: self.alive,
            score: self.score,
            admitted: self.admitted,
            spectator: self.spectator,
            queued_for_admission: self.queued_for_admission,
            chat_muted: self.chat_muted,
        }
    }
}

/// A bounded collection of players sharing a code.
#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub host_id: Option<PlayerId>,
    pub persistent: bool,
    pub created_at: DateTime<Utc>,
    pub tick: u64,
    pub participant_limit: usize,
    pub room_capacity: usize,
    players: HashMap<PlayerId, Player>,
    join_order: Vec<PlayerId>,
    pub quiz: QuizState,
    pub gate: EntryGate,
    pub billboard: BillboardMedia,
    pub portal_target_url: Option<String>,
    pub chat_history: VecDeque<ChatEntry>,
    chat_history_cap: usize,
}

impl Room {
    pub fn new(
        code: String,
        persistent: bool,
        participant_limit: usize,
        room_capacity: usize,
        chat_history_cap: usize,
        lock_seconds: u32,
    ) -> Self {
        Self {
            code,
            host_id: None,
            persistent,
            created_at: Utc::now(),
            tick: 0,
            participant_limit,
            room_capacity,
            players: HashMap::new(),
            join_order: Vec::new(),
            quiz: QuizState::new(true, lock_seconds),
            gate: EntryGate::default(),
            billboard: BillboardMedia::default(),
            portal_target_url: None,
            chat_history: VecDeque::new(),
            chat_history_cap,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Players in join order (oldest first).
    pub fn players_ordered(&self) -> impl Iterator<Item = &Player> {
        self.join_order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.join_order.clone()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Add a player. The first joiner becomes host. Fails when the room is
    /// at capacity (participants + spectators + waiting).
    pub fn insert_player(&mut self, player: Player) -> Result<(), AckError> {
        if self.players.len() >= self.room_capacity {
            return Err(AckError::RoomFull);
        }
        let id = player.id;
        if self.players.insert(id, player).is_none() {
            self.join_order.push(id);
        }
        if self.host_id.is_none() {
            self.host_id = Some(id);
        }
        Ok(())
    }

    /// Remove a player, transferring host to the oldest remaining player
    /// when the host leaves. Returns the removed player and whether the host
    /// changed.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<(Player, bool)> {
        let removed = self.players.remove(id)?;
        self.join_order.retain(|other| other != id);
        let mut host_changed = false;
        if self.host_id == Some(*id) {
            self.host_id = self.join_order.first().copied();
            host_changed = true;
        }
        Some((removed, host_changed))
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        self.host_id == Some(*id)
    }

    // Derived admission counters. The gate stores only its own phase; the
    // roster is the single source of truth for membership classes.

    pub fn participant_count(&self) -> usize {
        self.players.values().filter(|p| p.is_participant()).count()
    }

    pub fn spectator_count(&self) -> usize {
        self.players.values().filter(|p| p.spectator).count()
    }

    pub fn waiting_count(&self) -> usize {
        self.players
            .values()
            .filter(|p| p.queued_for_admission)
            .count()
    }

    pub fn priority_count(&self) -> usize {
        self.players
            .values()
            .filter(|p| p.priority_for_next_round)
            .count()
    }

    /// Alive participants; the survivors of the current round.
    pub fn survivor_count(&self) -> usize {
        self.players
            .values()
            .filter(|p| p.alive && p.is_participant())
            .count()
    }

    /// Waiting queue in admission order: priority returners first, then by
    /// arrival.
    pub fn waiting_queue(&self) -> Vec<PlayerId> {
        let mut queue: Vec<PlayerId> = self
            .join_order
            .iter()
            .filter(|id| {
                self.players
                    .get(*id)
                    .is_some_and(|p| p.queued_for_admission)
            })
            .copied()
            .collect();
        queue.sort_by_key(|id| {
            let priority = self
                .players
                .get(id)
                .is_some_and(|p| p.priority_for_next_round);
            !priority
        });
        queue
    }

    pub fn push_chat(&mut self, entry: ChatEntry) {
        if self.chat_history.len() >= self.chat_history_cap {
            self.chat_history.pop_front();
        }
        self.chat_history.push_back(entry);
    }

    pub fn chat_tail(&self) -> Vec<ChatEntry> {
        self.chat_history.iter().cloned().collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            players: self.players.len(),
            capacity: self.room_capacity,
            persistent: self.persistent,
            quiz_active: self.quiz.active(),
            phase: self.quiz.phase,
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            host_id: self.host_id,
            persistent: self.persistent,
            created_at: self.created_at.timestamp_millis(),
            tick: self.tick,
            players: self
                .players_ordered()
                .map(|p| p.public(self.host_id))
                .collect(),
            quiz: self.quiz.public(),
            entry_gate: self.gate.public(self),
            billboard_media: self.billboard.clone(),
            portal_target_url: self.portal_target_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_room(capacity: usize) -> Room {
        Room::new("OX-TEST1".into(), false, 50, capacity, 32, 15)
    }

    fn join(room: &mut Room, name: &str) -> PlayerId {
        let id = Uuid::new_v4();
        let mut player = Player::new(id, name.into(), false, Instant::now());
        player.admitted = true;
        room.insert_player(player).unwrap();
        id
    }

    #[test]
    fn capacity_is_enforced() {
        let mut room = test_room(3);
        for i in 0..3 {
            join(&mut room, &format!("p{i}"));
        }
        let overflow = Player::new(Uuid::new_v4(), "late".into(), false, Instant::now());
        assert_eq!(room.insert_player(overflow), Err(AckError::RoomFull));
        assert_eq!(room.len(), 3);
    }

    #[test]
    fn first_joiner_is_host_and_succession_follows_join_order() {
        let mut room = test_room(10);
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");
        let c = join(&mut room, "c");
        assert_eq!(room.host_id, Some(a));

        let (_, host_changed) = room.remove_player(&a).unwrap();
        assert!(host_changed);
        assert_eq!(room.host_id, Some(b));

        // Removing a non-host leaves the host alone.
        let (_, host_changed) = room.remove_player(&c).unwrap();
        assert!(!host_changed);
        assert_eq!(room.host_id, Some(b));

        let (_, host_changed) = room.remove_player(&b).unwrap();
        assert!(host_changed);
        assert_eq!(room.host_id, None);
        assert!(room.is_empty());
    }

    #[test]
    fn chat_ring_is_bounded() {
        let mut room = Room::new("OX-CHAT1".into(), false, 50, 120, 4, 15);
        for i in 0..10 {
            room.push_chat(ChatEntry {
                from: Uuid::new_v4(),
                name: "p".into(),
                text: format!("msg {i}"),
                at: i,
            });
        }
        let tail = room.chat_tail();
        assert_eq!(tail.len(), 4);
        assert_eq!(tail[0].text, "msg 6");
        assert_eq!(tail[3].text, "msg 9");
    }

    #[test]
    fn waiting_queue_puts_priority_returners_first() {
        let mut room = test_room(10);
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");
        let c = join(&mut room, "c");
        for id in [a, b, c] {
            let p = room.player_mut(&id).unwrap();
            p.queued_for_admission = true;
            p.admitted = false;
        }
        room.player_mut(&c).unwrap().priority_for_next_round = true;
        assert_eq!(room.waiting_queue(), vec![c, a, b]);
    }

    #[test]
    fn snapshot_reflects_roster_in_join_order() {
        let mut room = test_room(10);
        let a = join(&mut room, "alice");
        let _b = join(&mut room, "bob");
        let snapshot = room.snapshot();
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].name, "alice");
        assert!(snapshot.players[0].host);
        assert_eq!(snapshot.host_id, Some(a));
        assert_eq!(snapshot.entry_gate.room_capacity, 10);
    }
}
