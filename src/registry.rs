//! Live games keyed by an opaque id.
//!
//! The id map and each game have separate locks: the map lock is only held to
//! look up, insert or evict, so requests for different games never wait on each
//! other, while requests for the same game are serialized by that game's lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use uuid::Uuid;
use web_time::Instant;

use crate::config::RegistryConfig;
use crate::error::GameError;
use crate::game::{Game, LogObserver};
use crate::snapshot::GameSnapshot;
use crate::types::{DiskColor, GameStateView, Player, Position, Status};

pub type GameId = Uuid;

const DEFAULT_NAMES: [&str; 2] = ["Player1", "Player2"];

/// Parses a client-supplied id. Anything that is not a UUID cannot name a game.
pub fn parse_game_id(id: &str) -> Result<GameId, GameError> {
    Uuid::parse_str(id.trim()).map_err(|_| GameError::NotFound { id: id.to_string() })
}

struct GameEntry {
    game: Game,
    last_access: Instant,
}

type GameMap = HashMap<GameId, Arc<Mutex<GameEntry>>>;

pub struct GameRegistry {
    config: RegistryConfig,
    games: Mutex<GameMap>,
}

impl GameRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            games: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Starts a new game. `player1` plays Black and moves first.
    pub fn create_game(&self, player1: &str, player2: &str) -> Result<GameId, GameError> {
        let players = [
            Player::new(display_name(player1, 0), DiskColor::Black),
            Player::new(display_name(player2, 1), DiskColor::White),
        ];
        let mut game = Game::new(self.config.board_size, players)?;
        let id = Uuid::new_v4();
        game.add_observer(Box::new(LogObserver::new(id.to_string())));
        game.start()?;

        log::info!(
            "game {id} created: {} vs {}",
            game.players()[0].name,
            game.players()[1].name
        );
        self.insert(id, game)?;
        Ok(id)
    }

    /// Registers a game rebuilt from `snapshot` under a fresh id.
    pub fn restore(&self, snapshot: &GameSnapshot) -> Result<GameId, GameError> {
        let mut game = Game::from_snapshot(snapshot)?;
        let id = Uuid::new_v4();
        game.add_observer(Box::new(LogObserver::new(id.to_string())));

        log::info!("game {id} restored from snapshot ({})", game.status());
        self.insert(id, game)?;
        Ok(id)
    }

    pub fn snapshot(&self, id: &GameId) -> Result<GameSnapshot, GameError> {
        self.with_game(id, |game| Ok(game.snapshot()))
    }

    pub fn game_state(&self, id: &GameId) -> Result<GameStateView, GameError> {
        self.with_game(id, |game| Ok(game.to_view(&id.to_string())))
    }

    /// Plays `(row, col)` for the side to move, then applies any forced skip
    /// or end of game.
    pub fn make_move(&self, id: &GameId, row: i32, col: i32) -> Result<GameStateView, GameError> {
        let result = self.with_game(id, |game| {
            if game.status() != Status::InProgress {
                return Err(GameError::InactiveGame {
                    status: game.status(),
                });
            }
            let (Ok(r), Ok(c)) = (u8::try_from(row), u8::try_from(col)) else {
                return Err(GameError::InvalidMove { row, col });
            };

            game.play(Position::new(r, c))?;
            Ok(game.to_view(&id.to_string()))
        });

        if let Err(err) = &result {
            log::debug!("move ({row}, {col}) rejected for game {id}: {err}");
        }
        result
    }

    /// Drops a game. Returns whether it existed.
    pub fn remove(&self, id: &GameId) -> Result<bool, GameError> {
        let removed = self.lock_games()?.remove(id).is_some();
        if removed {
            log::info!("game {id} removed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, GameError> {
        Ok(self.lock_games()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, GameError> {
        Ok(self.len()? == 0)
    }

    /// Drops every game idle for longer than the configured TTL.
    pub fn evict_expired(&self) -> Result<usize, GameError> {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> Result<usize, GameError> {
        let mut games = self.lock_games()?;
        Ok(self.evict_expired_locked(&mut games, now))
    }

    fn insert(&self, id: GameId, game: Game) -> Result<(), GameError> {
        let now = Instant::now();
        let mut games = self.lock_games()?;

        self.evict_expired_locked(&mut games, now);
        if games.len() >= self.config.max_games {
            let victim = least_recently_used(&games).ok_or_else(|| {
                GameError::InternalFault(format!(
                    "registry is full ({} games) and every game is busy",
                    games.len()
                ))
            })?;
            games.remove(&victim);
            log::info!("game {victim} evicted to stay within {} games", self.config.max_games);
        }

        games.insert(
            id,
            Arc::new(Mutex::new(GameEntry {
                game,
                last_access: now,
            })),
        );
        Ok(())
    }

    fn with_game<T>(
        &self,
        id: &GameId,
        f: impl FnOnce(&mut Game) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let not_found = || GameError::NotFound { id: id.to_string() };
        let shared = self.lock_games()?.get(id).cloned().ok_or_else(not_found)?;

        let mut entry = shared
            .lock()
            .map_err(|_| GameError::InternalFault(format!("lock for game {id} is poisoned")))?;
        // The game may have been evicted while we waited. Eviction skips locked
        // entries, so this holds until the guard drops.
        let still_registered = self
            .lock_games()?
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, &shared));
        if !still_registered {
            return Err(not_found());
        }

        entry.last_access = Instant::now();
        f(&mut entry.game)
    }

    fn evict_expired_locked(&self, games: &mut GameMap, now: Instant) -> usize {
        let ttl = self.config.game_ttl();
        let before = games.len();

        games.retain(|id, entry| {
            let expired = match entry.try_lock() {
                Ok(entry) => now.saturating_duration_since(entry.last_access) >= ttl,
                Err(TryLockError::WouldBlock) => false,
                Err(TryLockError::Poisoned(_)) => true,
            };
            if expired {
                log::info!("game {id} expired");
            }
            !expired
        });

        before - games.len()
    }

    fn lock_games(&self) -> Result<MutexGuard<'_, GameMap>, GameError> {
        self.games
            .lock()
            .map_err(|_| GameError::InternalFault("game registry lock is poisoned".into()))
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

fn display_name(name: &str, index: usize) -> String {
    match name.trim() {
        "" => DEFAULT_NAMES[index].to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Idle games that are not currently locked, oldest first.
fn least_recently_used(games: &GameMap) -> Option<GameId> {
    games
        .iter()
        .filter_map(|(id, entry)| {
            let entry = entry.try_lock().ok()?;
            Some((entry.last_access, *id))
        })
        .min_by_key(|(last_access, _)| *last_access)
        .map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::game::tests::game_with;

    fn registry() -> GameRegistry {
        GameRegistry::default()
    }

    #[test]
    fn create_game_starts_a_standard_game() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();

        let state = registry.game_state(&id).unwrap();

        assert_eq!(state.game_id, id.to_string());
        assert_eq!(state.status, Status::InProgress);
        assert_eq!(state.current_player, "Alice");
        assert_eq!(state.current_player_color, DiskColor::Black);
        assert_eq!((state.black_score, state.white_score), (2, 2));
        assert_eq!(state.valid_moves.len(), 4);
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn blank_names_fall_back_to_defaults() {
        let registry = registry();
        let id = registry.create_game("  ", "").unwrap();

        let snapshot = registry.snapshot(&id).unwrap();

        assert_eq!(snapshot.players[0].name, "Player1");
        assert_eq!(snapshot.players[1].name, "Player2");
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let registry = registry();
        let id = Uuid::new_v4();

        assert!(matches!(
            registry.game_state(&id),
            Err(GameError::NotFound { .. })
        ));
        assert!(matches!(
            registry.make_move(&id, 2, 3),
            Err(GameError::NotFound { .. })
        ));
        assert!(matches!(
            parse_game_id("not-a-uuid"),
            Err(GameError::NotFound { .. })
        ));
        assert_eq!(parse_game_id(&id.to_string()), Ok(id));
    }

    #[test]
    fn make_move_returns_the_updated_state() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();

        let state = registry.make_move(&id, 2, 3).unwrap();

        assert_eq!(state.current_player, "Bob");
        assert_eq!(state.board[3][3].disk_color, Some(DiskColor::Black));
        assert_eq!((state.black_score, state.white_score), (4, 1));
    }

    #[test]
    fn illegal_and_out_of_range_moves_are_rejected() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();
        let before = registry.snapshot(&id).unwrap();

        for (row, col) in [(0, 0), (3, 3), (-1, 2), (2, -1), (8, 0), (0, 300)] {
            assert_eq!(
                registry.make_move(&id, row, col),
                Err(GameError::InvalidMove { row, col })
            );
        }
        assert_eq!(registry.snapshot(&id).unwrap(), before);
    }

    #[test]
    fn finished_games_reject_moves_without_mutation() {
        let registry = registry();
        let mut game = game_with(&[(0, 0, DiskColor::Black), (0, 1, DiskColor::White)], 0);
        game.play(Position::new(0, 2)).unwrap();
        let id = registry.restore(&game.snapshot()).unwrap();

        let err = registry.make_move(&id, -5, 99).unwrap_err();

        assert_eq!(err, GameError::InactiveGame { status: Status::Won });
        assert_eq!(registry.snapshot(&id).unwrap(), game.snapshot());
        assert_eq!(
            registry.game_state(&id).unwrap().winner.as_deref(),
            Some("Alice")
        );
    }

    #[test]
    fn stuck_player_is_skipped_through_the_registry() {
        let registry = registry();
        let game = game_with(
            &[
                (0, 0, DiskColor::Black),
                (0, 1, DiskColor::White),
                (5, 0, DiskColor::Black),
                (5, 1, DiskColor::White),
            ],
            0,
        );
        let id = registry.restore(&game.snapshot()).unwrap();

        let state = registry.make_move(&id, 0, 2).unwrap();

        assert_eq!(state.status, Status::InProgress);
        assert_eq!(state.current_player_color, DiskColor::Black);
        assert_eq!(state.valid_moves, vec![Position::new(5, 2)]);
    }

    #[test]
    fn idle_games_expire_after_the_ttl() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();
        let ttl = registry.config().game_ttl();

        assert_eq!(registry.evict_expired_at(Instant::now()).unwrap(), 0);
        let later = Instant::now() + ttl + Duration::from_secs(1);
        assert_eq!(registry.evict_expired_at(later).unwrap(), 1);

        assert!(matches!(
            registry.game_state(&id),
            Err(GameError::NotFound { .. })
        ));
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn full_registry_evicts_the_least_recently_used_game() {
        let registry = GameRegistry::new(RegistryConfig {
            max_games: 2,
            ..RegistryConfig::default()
        });
        let first = registry.create_game("a", "b").unwrap();
        thread::sleep(Duration::from_millis(5));
        let second = registry.create_game("c", "d").unwrap();
        thread::sleep(Duration::from_millis(5));
        registry.game_state(&first).unwrap();
        thread::sleep(Duration::from_millis(5));

        let third = registry.create_game("e", "f").unwrap();

        assert_eq!(registry.len().unwrap(), 2);
        assert!(registry.game_state(&first).is_ok());
        assert!(registry.game_state(&third).is_ok());
        assert!(matches!(
            registry.game_state(&second),
            Err(GameError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_drops_the_game() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();

        assert!(registry.remove(&id).unwrap());
        assert!(!registry.remove(&id).unwrap());
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn move_waiting_on_a_game_evicted_meanwhile_reports_not_found() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();
        let shared = registry.lock_games().unwrap().get(&id).cloned().unwrap();
        let guard = shared.lock().unwrap();

        let result = thread::scope(|scope| {
            let pending = scope.spawn(|| registry.make_move(&id, 2, 3));
            thread::sleep(Duration::from_millis(50));
            registry.lock_games().unwrap().remove(&id);
            drop(guard);
            pending.join().unwrap()
        });

        assert!(matches!(result, Err(GameError::NotFound { .. })));
        assert_eq!(shared.lock().unwrap().game.board().occupied_count(), 4);
    }

    #[test]
    fn concurrent_moves_on_one_game_are_serialized() {
        let registry = registry();
        let id = registry.create_game("Alice", "Bob").unwrap();

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.make_move(&id, 2, 3)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|err| *err == GameError::InvalidMove { row: 2, col: 3 })
        );
        let state = registry.game_state(&id).unwrap();
        assert_eq!(state.black_score + state.white_score, 5);
    }

    #[test]
    fn games_played_in_parallel_stay_independent() {
        let registry = registry();

        let ids: Vec<GameId> = thread::scope(|scope| {
            let handles: Vec<_> = (0..6)
                .map(|i| {
                    let registry = &registry;
                    scope.spawn(move || {
                        let id = registry.create_game(&format!("p{i}"), "q").unwrap();
                        for _ in 0..=i {
                            let state = registry.game_state(&id).unwrap();
                            if let Some(mv) = state.valid_moves.first() {
                                registry
                                    .make_move(&id, mv.row as i32, mv.col as i32)
                                    .unwrap();
                            }
                        }
                        id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (i, id) in ids.iter().enumerate() {
            let state = registry.game_state(id).unwrap();
            assert_eq!(state.black_score + state.white_score, 4 + i + 1);
        }
    }
}
