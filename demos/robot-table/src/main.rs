use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use seatkeeper::Request;
use seatkeeper::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Game: high card
// ---------------------------------------------------------------------------

/// Each round every seat draws a card and the highest card wins. Robots
/// draw at once; everyone else draws on `"draw"` or when the turn runs
/// out, which is how seats of players who ran away keep playing.
struct HighCard;

struct Table {
    room_id: RoomId,
    seats: Vec<SeatInfo>,
    rounds: u64,
    round: u64,
    turn: Duration,
    round_started: Instant,
    cards: HashMap<PlayerId, u8>,
    wins: HashMap<PlayerId, u32>,
}

impl Table {
    fn draw(&mut self, player: PlayerId) {
        if self.cards.contains_key(&player) || !self.seats.iter().any(|s| s.id == player) {
            return;
        }
        let card = rand::rng().random_range(1..=13);
        tracing::info!(room_id = %self.room_id, round = self.round, %player, card, "card drawn");
        self.cards.insert(player, card);
    }

    fn finish_round(&mut self) {
        let winner = self
            .cards
            .iter()
            .max_by_key(|(_, card)| **card)
            .map(|(player, _)| *player);
        if let Some(winner) = winner {
            *self.wins.entry(winner).or_default() += 1;
            tracing::info!(room_id = %self.room_id, round = self.round, %winner, "round won");
        }
        self.cards.clear();
        self.round += 1;
        self.round_started = Instant::now();
    }
}

impl RuleEngine for HighCard {
    type Session = Table;

    fn start_session(setup: &SessionSetup) -> Table {
        let rounds = setup.settings["rounds"].as_u64().unwrap_or(3);
        let turn_ms = setup.settings["turn_ms"]
            .as_u64()
            .unwrap_or(u64::from(setup.timeout_secs) * 1000);
        Table {
            room_id: setup.room_id,
            seats: setup.seats.clone(),
            rounds,
            round: 0,
            turn: Duration::from_millis(turn_ms),
            round_started: Instant::now(),
            cards: HashMap::new(),
            wins: HashMap::new(),
        }
    }

    fn run_epoch(table: &mut Table, requests: &RequestQueue) -> Epoch {
        while let Some(raw) = requests.fetch() {
            match Request::parse(&raw) {
                Request::Action(action) => {
                    let Some((id, verb)) = action.split_once(',') else {
                        continue;
                    };
                    if let (Ok(id), "draw") = (id.parse::<i64>(), verb) {
                        table.draw(PlayerId(id));
                    }
                }
                Request::Observe(id) => tracing::info!(%id, "observer joined the table"),
                Request::Leave(id) => tracing::info!(%id, "observer left the table"),
                Request::Reconnect(id) => tracing::info!(%id, "player back at the table"),
            }
        }

        let timed_out = table.round_started.elapsed() >= table.turn;
        let pending: Vec<PlayerId> = table
            .seats
            .iter()
            .filter(|seat| seat.robot || timed_out)
            .map(|seat| seat.id)
            .collect();
        for player in pending {
            table.draw(player);
        }

        if table.cards.len() < table.seats.len() {
            std::thread::sleep(Duration::from_millis(5));
            return Epoch::Continue;
        }
        table.finish_round();
        if table.round < table.rounds {
            return Epoch::Continue;
        }

        tracing::info!(room_id = %table.room_id, wins = ?table.wins, "game over");
        Epoch::Finished
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn print_notices(name: &str, rx: &mut mpsc::UnboundedReceiver<Notice>) -> Result<(), SeatkeeperError> {
    let codec = JsonCodec;
    while let Ok(notice) = rx.try_recv() {
        let bytes = codec.encode(&notice)?;
        println!("{name} <- {}", String::from_utf8_lossy(&bytes));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    seatkeeper::init_tracing("robot_table", "info")?;

    let mut registry: Registry<HighCard> = Registry::new(SessionConfig::default());

    let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    registry.connect(PlayerId(1), "alice", "liubei", alice_tx)?;
    let bob_token = registry.connect(PlayerId(2), "bob", "zhangfei", bob_tx)?;

    let config = RoomConfig {
        settings: json!({ "rounds": 3, "turn_ms": 200 }),
        ..RoomConfig::with_capacity("high card", 3)
    };
    let room_id = registry.create_room(PlayerId(1), config)?;
    registry.join_room(PlayerId(2), room_id)?;
    registry.chat(PlayerId(1), r#"{"type":1,"msg":"one robot and we start"}"#)?;
    registry.add_robot(PlayerId(1))?;

    registry.push_request(PlayerId(1), "draw")?;

    // Bob drops out; his seat keeps drawing on timeout until he is back.
    registry.disconnect(PlayerId(2))?;
    print_notices("bob", &mut bob_rx)?;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    registry.reconnect(&bob_token, bob_tx)?;
    if registry.room(room_id).is_some() {
        registry.push_request(PlayerId(2), "draw")?;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    while registry.room(room_id).is_some() {
        ticker.tick().await;
        registry.process_events();
    }

    print_notices("alice", &mut alice_rx)?;
    print_notices("bob", &mut bob_rx)?;
    println!("rooms left: {}", registry.room_count());
    Ok(())
}
