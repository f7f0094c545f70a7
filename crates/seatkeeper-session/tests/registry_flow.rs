//! Integration tests for the registry: lobby, rooms, and reconnection.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use seatkeeper_protocol::{Notice, PlayerId, RoomId};
use seatkeeper_room::{
    ConnectionState, Epoch, RUNNING_AWAY, RequestQueue, RoomConfig, RoomError, RuleEngine,
    SessionSetup,
};
use seatkeeper_session::{Registry, SessionConfig, SessionError};
use tokio::sync::mpsc;

// =========================================================================
// Test engines
// =========================================================================

struct Idle;

impl RuleEngine for Idle {
    type Session = ();

    fn start_session(_setup: &SessionSetup) -> Self::Session {}

    fn run_epoch(_session: &mut (), _requests: &RequestQueue) -> Epoch {
        thread::sleep(Duration::from_millis(1));
        Epoch::Continue
    }
}

/// Finishes when any player sends the `end` action.
struct EndOnRequest;

impl RuleEngine for EndOnRequest {
    type Session = ();

    fn start_session(_setup: &SessionSetup) -> Self::Session {}

    fn run_epoch(_session: &mut (), requests: &RequestQueue) -> Epoch {
        match requests.fetch() {
            Some(request) if request.ends_with(",end") => Epoch::Finished,
            Some(_) => Epoch::Continue,
            None => {
                thread::sleep(Duration::from_millis(1));
                Epoch::Continue
            }
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Notices = mpsc::UnboundedReceiver<Notice>;

fn registry<E: RuleEngine>() -> Registry<E> {
    Registry::new(SessionConfig {
        reconnect_grace_secs: 3600,
    })
}

fn connect<E: RuleEngine>(registry: &mut Registry<E>, id: i64) -> (String, Notices) {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = registry
        .connect(PlayerId(id), &format!("player{id}"), "liubei", tx)
        .unwrap();
    (token, rx)
}

fn drain(rx: &mut Notices) -> Vec<Notice> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn duel() -> RoomConfig {
    RoomConfig::with_capacity("duel", 2)
}

fn in_lobby<E: RuleEngine>(registry: &Registry<E>, id: i64) -> bool {
    registry.lobby().find_player(PlayerId(id)).is_some()
}

/// P1 creates a duel room and P2 joins it, which starts the game.
fn running_duel(registry: &mut Registry<Idle>) -> (RoomId, Notices, Notices) {
    let (_, mut rx1) = connect(registry, 1);
    let (_, mut rx2) = connect(registry, 2);
    let room_id = registry.create_room(PlayerId(1), duel()).unwrap();
    registry.join_room(PlayerId(2), room_id).unwrap();
    assert!(registry.room(room_id).unwrap().is_started());
    drain(&mut rx1);
    drain(&mut rx2);
    (room_id, rx1, rx2)
}

// =========================================================================
// Connecting
// =========================================================================

#[test]
fn test_connect_places_player_in_lobby() {
    let mut registry = registry::<Idle>();

    let (token, mut rx) = connect(&mut registry, 1);

    assert_eq!(token.len(), 32);
    assert_eq!(drain(&mut rx), vec![Notice::EnterLobby]);
    assert!(in_lobby(&registry, 1));
    let participant = registry.participant(PlayerId(1)).unwrap();
    assert_eq!(participant.room(), Some(RoomId::LOBBY));
    assert!(registry.session(PlayerId(1)).unwrap().is_connected());
}

#[test]
fn test_connect_rejects_non_positive_ids() {
    let mut registry = registry::<Idle>();
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = registry.connect(PlayerId(-2), "robot", "guanyu", tx);

    assert!(matches!(result, Err(SessionError::InvalidPlayerId(PlayerId(-2)))));
    assert_eq!(registry.lobby().player_count(), 0);
}

#[test]
fn test_connect_twice_rejected() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = registry.connect(PlayerId(1), "again", "liubei", tx);

    assert!(matches!(result, Err(SessionError::AlreadyConnected(PlayerId(1)))));
    assert_eq!(registry.lobby().player_count(), 1);
}

// =========================================================================
// Rooms
// =========================================================================

#[test]
fn test_create_room_moves_owner_out_of_lobby() {
    let mut registry = registry::<Idle>();
    let (_, mut rx1) = connect(&mut registry, 1);
    let (_, _rx2) = connect(&mut registry, 2);
    drain(&mut rx1);

    let first = registry.create_room(PlayerId(1), duel()).unwrap();
    let second = registry.create_room(PlayerId(2), duel()).unwrap();

    assert_eq!(first, RoomId(1));
    assert_eq!(second, RoomId(2));
    assert!(!in_lobby(&registry, 1));
    assert_eq!(registry.lobby().player_count(), 0);
    let room = registry.room(first).unwrap();
    assert_eq!(room.owner_id(), Some(PlayerId(1)));
    let notices = drain(&mut rx1);
    assert!(matches!(notices.first(), Some(Notice::EnterRoom { capacity: 2, .. })));
    assert_eq!(notices.last(), Some(&Notice::RoomOwner { id: PlayerId(1) }));

    let listing = registry.list_rooms();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].name, "duel");
}

#[test]
fn test_create_room_outside_lobby_rejected() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);
    registry
        .create_room(PlayerId(1), RoomConfig::with_capacity("big", 4))
        .unwrap();

    let result = registry.create_room(PlayerId(1), duel());

    assert!(matches!(result, Err(SessionError::NotInLobby(PlayerId(1)))));
    assert_eq!(registry.room_count(), 1);
}

#[test]
fn test_join_room_fills_and_starts() {
    let mut registry = registry::<Idle>();
    let (room_id, _rx1, _rx2) = running_duel(&mut registry);

    assert_eq!(registry.lobby().player_count(), 0);
    let room = registry.room(room_id).unwrap();
    assert_eq!(room.player_ids(), &[PlayerId(1), PlayerId(2)]);
    assert_eq!(
        registry.participant(PlayerId(2)).unwrap().room(),
        Some(room_id)
    );
}

#[test]
fn test_join_room_unknown_room_rejected() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);

    let result = registry.join_room(PlayerId(1), RoomId(42));

    assert!(matches!(result, Err(SessionError::RoomNotFound(RoomId(42)))));
    assert!(in_lobby(&registry, 1));
}

#[test]
fn test_leave_room_before_start_returns_to_lobby() {
    let mut registry = registry::<Idle>();
    let (_, mut rx1) = connect(&mut registry, 1);
    let (_, mut rx2) = connect(&mut registry, 2);
    let room_id = registry
        .create_room(PlayerId(1), RoomConfig::with_capacity("trio", 3))
        .unwrap();
    registry.join_room(PlayerId(2), room_id).unwrap();
    drain(&mut rx1);
    drain(&mut rx2);

    registry.leave_room(PlayerId(2)).unwrap();

    assert!(in_lobby(&registry, 2));
    assert_eq!(drain(&mut rx2), vec![Notice::EnterLobby]);
    assert_eq!(
        drain(&mut rx1),
        vec![Notice::RemovePlayer { id: PlayerId(2) }]
    );
    assert_eq!(registry.room(room_id).unwrap().player_ids(), &[PlayerId(1)]);
}

#[test]
fn test_leave_room_last_player_closes_room() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);
    let room_id = registry
        .create_room(PlayerId(1), RoomConfig::with_capacity("solo", 3))
        .unwrap();

    registry.leave_room(PlayerId(1)).unwrap();

    assert!(registry.room(room_id).is_none());
    assert!(in_lobby(&registry, 1));
}

#[test]
fn test_leave_room_during_game_leaves_stand_in() {
    let mut registry = registry::<Idle>();
    let (room_id, mut rx1, _rx2) = running_duel(&mut registry);
    let seat = registry.room(room_id).unwrap().find_player(PlayerId(1)).unwrap();

    registry.leave_room(PlayerId(1)).unwrap();

    let room = registry.room(room_id).unwrap();
    assert_eq!(room.player_count(), 2);
    assert_eq!(seat.state(), ConnectionState::DisconnectedRunning);
    let stand_in = registry.participant(PlayerId(1)).unwrap();
    assert!(!Arc::ptr_eq(&stand_in, &seat));
    assert_eq!(stand_in.room(), Some(RoomId::LOBBY));
    assert_eq!(drain(&mut rx1), vec![Notice::EnterLobby]);

    let rejoin = registry.join_room(PlayerId(1), room_id);
    assert!(matches!(
        rejoin,
        Err(SessionError::Room(RoomError::AlreadyStarted(_)))
    ));
    assert_eq!(drain(&mut rx1).last(), Some(&Notice::error(RUNNING_AWAY)));
}

#[test]
fn test_leave_room_everyone_gone_closes_room() {
    let mut registry = registry::<Idle>();
    let (room_id, _rx1, _rx2) = running_duel(&mut registry);

    registry.leave_room(PlayerId(1)).unwrap();
    registry.leave_room(PlayerId(2)).unwrap();

    assert!(registry.room(room_id).is_none());
    assert!(in_lobby(&registry, 1));
    assert!(in_lobby(&registry, 2));
    assert_eq!(registry.participant(PlayerId(1)).unwrap().room(), Some(RoomId::LOBBY));
}

// =========================================================================
// Observers, robots, chat, requests
// =========================================================================

#[test]
fn test_observe_room_and_leave_back_to_lobby() {
    let mut registry = registry::<Idle>();
    let (room_id, _rx1, _rx2) = running_duel(&mut registry);
    let (_, mut rx3) = connect(&mut registry, 3);
    drain(&mut rx3);

    registry.observe_room(PlayerId(3), room_id).unwrap();
    assert!(!in_lobby(&registry, 3));
    assert!(registry.room(room_id).unwrap().is_observer(PlayerId(3)));

    registry.leave_room(PlayerId(3)).unwrap();

    assert!(in_lobby(&registry, 3));
    let notices = drain(&mut rx3);
    assert!(matches!(notices.as_slice(), [Notice::Setup { .. }, Notice::EnterLobby]));
    let room = registry.room(room_id).unwrap();
    assert_eq!(room.fetch_request().as_deref(), Some("3,observe"));
    assert_eq!(room.fetch_request().as_deref(), Some("3,leave"));
}

#[test]
fn test_observe_room_closed_room_sends_observer_to_lobby() {
    let mut registry = registry::<Idle>();
    let (room_id, _rx1, _rx2) = running_duel(&mut registry);
    let (_, _rx3) = connect(&mut registry, 3);
    registry.observe_room(PlayerId(3), room_id).unwrap();

    registry.leave_room(PlayerId(1)).unwrap();
    registry.leave_room(PlayerId(2)).unwrap();

    assert!(registry.room(room_id).is_none());
    assert!(in_lobby(&registry, 3));
    assert_eq!(registry.participant(PlayerId(3)).unwrap().room(), Some(RoomId::LOBBY));
}

#[test]
fn test_observe_room_not_running_rejected() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);
    let (_, mut rx2) = connect(&mut registry, 2);
    let room_id = registry.create_room(PlayerId(1), duel()).unwrap();
    drain(&mut rx2);

    let result = registry.observe_room(PlayerId(2), room_id);

    assert!(matches!(result, Err(SessionError::Room(RoomError::NotStarted(_)))));
    assert!(in_lobby(&registry, 2));
    assert!(matches!(drain(&mut rx2).as_slice(), [Notice::ErrorMsg { .. }]));
}

#[test]
fn test_add_robot_owner_only() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);
    connect(&mut registry, 2);
    let room_id = registry
        .create_room(PlayerId(1), RoomConfig::with_capacity("trio", 3))
        .unwrap();
    registry.join_room(PlayerId(2), room_id).unwrap();

    let denied = registry.add_robot(PlayerId(2));
    let robot = registry.add_robot(PlayerId(1)).unwrap();

    assert!(matches!(denied, Err(SessionError::Room(RoomError::NotOwner(..)))));
    assert_eq!(robot, PlayerId(-2));
    assert!(registry.room(room_id).unwrap().is_started());
    assert!(registry.participant(robot).is_none(), "robots are not tracked");
}

#[test]
fn test_push_request_prefixes_sender() {
    let mut registry = registry::<Idle>();
    let (room_id, _rx1, _rx2) = running_duel(&mut registry);

    registry.push_request(PlayerId(2), "play,17").unwrap();

    let room = registry.room(room_id).unwrap();
    assert_eq!(room.fetch_request().as_deref(), Some("2,play,17"));
}

#[test]
fn test_push_request_from_lobby_rejected() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);

    let result = registry.push_request(PlayerId(1), "play");

    assert!(matches!(result, Err(SessionError::NotInRoom(PlayerId(1)))));
}

#[test]
fn test_chat_in_lobby_reaches_lobby() {
    let mut registry = registry::<Idle>();
    let (_, mut rx1) = connect(&mut registry, 1);
    let (_, mut rx2) = connect(&mut registry, 2);
    drain(&mut rx1);
    drain(&mut rx2);

    registry.chat(PlayerId(1), r#"{"type":2,"msg":"anyone?"}"#).unwrap();

    assert!(matches!(drain(&mut rx2).as_slice(), [Notice::Chat(body)] if body["sender"] == 1));
    assert_eq!(drain(&mut rx1).len(), 1);
}

// =========================================================================
// Disconnect and reconnect
// =========================================================================

#[test]
fn test_disconnect_in_lobby_then_reconnect() {
    let mut registry = registry::<Idle>();
    let (token, _rx) = connect(&mut registry, 1);

    registry.disconnect(PlayerId(1)).unwrap();
    assert!(!in_lobby(&registry, 1));
    assert!(registry.participant(PlayerId(1)).is_none());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let player = registry.reconnect(&token, tx).unwrap();

    assert_eq!(player, PlayerId(1));
    assert!(in_lobby(&registry, 1));
    assert_eq!(drain(&mut rx), vec![Notice::EnterLobby]);
    assert_eq!(
        registry.participant(PlayerId(1)).unwrap().screen_name(),
        "player1"
    );
}

#[test]
fn test_disconnect_during_game_then_reconnect_to_seat() {
    let mut registry = registry::<Idle>();
    let (token, _rx1) = connect(&mut registry, 1);
    connect(&mut registry, 2);
    let room_id = registry.create_room(PlayerId(1), duel()).unwrap();
    registry.join_room(PlayerId(2), room_id).unwrap();

    registry.disconnect(PlayerId(1)).unwrap();
    assert!(!in_lobby(&registry, 1));
    assert!(registry.room(room_id).is_some(), "P2 is still playing");

    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.reconnect(&token, tx).unwrap();

    let room = registry.room(room_id).unwrap();
    let seat = room.find_player(PlayerId(1)).unwrap();
    assert!(seat.is_online());
    assert!(Arc::ptr_eq(&seat, &registry.participant(PlayerId(1)).unwrap()));
    assert!(!in_lobby(&registry, 1));
    assert!(matches!(drain(&mut rx).first(), Some(Notice::EnterRoom { .. })));
    assert_eq!(room.fetch_request().as_deref(), Some("1,reconnect"));
}

#[test]
fn test_disconnect_unknown_player_rejected() {
    let mut registry = registry::<Idle>();
    assert!(matches!(
        registry.disconnect(PlayerId(5)),
        Err(SessionError::NotFound(PlayerId(5)))
    ));
}

#[test]
fn test_reconnect_invalid_token_rejected() {
    let mut registry = registry::<Idle>();
    connect(&mut registry, 1);
    registry.disconnect(PlayerId(1)).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = registry.reconnect("0123456789abcdef0123456789abcdef", tx);

    assert!(matches!(result, Err(SessionError::InvalidToken)));
}

#[test]
fn test_expired_sessions_are_cleaned_up() {
    let mut registry: Registry<Idle> = Registry::new(SessionConfig {
        reconnect_grace_secs: 0,
    });
    let (token, _rx) = connect(&mut registry, 1);
    registry.disconnect(PlayerId(1)).unwrap();
    thread::sleep(Duration::from_millis(2));

    assert_eq!(registry.expire_stale(), vec![PlayerId(1)]);
    assert_eq!(registry.cleanup_expired(), vec![PlayerId(1)]);

    assert!(registry.session(PlayerId(1)).is_none());
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(matches!(
        registry.reconnect(&token, tx),
        Err(SessionError::InvalidToken)
    ));
}

// =========================================================================
// Finished games
// =========================================================================

#[test]
fn test_finished_game_returns_players_and_retires_robots() {
    let mut registry = registry::<EndOnRequest>();
    let (_, mut rx1) = connect(&mut registry, 1);
    let room_id = registry.create_room(PlayerId(1), duel()).unwrap();
    let robot = registry.add_robot(PlayerId(1)).unwrap();
    assert!(registry.room(room_id).unwrap().is_started());
    drain(&mut rx1);

    registry.push_request(PlayerId(1), "end").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while registry.room(room_id).is_some() {
        assert!(Instant::now() < deadline, "game never finished");
        registry.process_events();
        thread::sleep(Duration::from_millis(2));
    }

    assert!(in_lobby(&registry, 1));
    assert!(registry.lobby().find_player(robot).is_none());
    assert_eq!(drain(&mut rx1), vec![Notice::EnterLobby]);
    assert_eq!(registry.participant(PlayerId(1)).unwrap().room(), Some(RoomId::LOBBY));
}
