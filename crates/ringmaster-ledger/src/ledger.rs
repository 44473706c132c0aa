//! The score ledger: durable, additive point totals.

use std::collections::HashMap;

use ringmaster_core::PlayerId;

use crate::{LedgerError, MemoryStore, PlayerScore, ScoreStore};

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    /// 1-based position.
    pub position: usize,
    pub player: PlayerId,
    pub display_name: String,
    pub points: i64,
}

/// Per-participant totals for the whole event.
///
/// Records are kept in first-seen order; rankings sort stably on top of
/// that, so equal totals rank by who scored (or played) first. Every
/// mutation is saved immediately. A failed save is logged and the
/// in-memory change stands.
pub struct ScoreLedger {
    records: Vec<PlayerScore>,
    index: HashMap<PlayerId, usize>,
    store: Box<dyn ScoreStore>,
}

impl ScoreLedger {
    /// Loads existing records from `store` and writes through to it.
    ///
    /// # Errors
    /// Returns the store's error if the existing records can't be read.
    pub fn open(store: impl ScoreStore) -> Result<Self, LedgerError> {
        let records = store.load()?;
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.player(), i))
            .collect();
        tracing::info!(records = records.len(), "score ledger loaded");
        Ok(Self {
            records,
            index,
            store: Box::new(store),
        })
    }

    /// A ledger that persists nowhere.
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            store: Box::new(MemoryStore::new()),
        }
    }

    /// Adds `delta` (possibly negative) to the player's total and to their
    /// bucket for `minigame`, creating the record if needed.
    ///
    /// Returns the player's new total.
    pub fn add_score(&mut self, player: PlayerId, minigame: &str, delta: i64, reason: &str) -> i64 {
        let record = self.record_mut(player);
        record.apply(minigame, delta);
        let total = record.total_points();
        tracing::debug!(%player, minigame, delta, reason, total, "score added");
        self.persist();
        total
    }

    pub fn record_game_played(&mut self, player: PlayerId) {
        self.record_mut(player).bump_played();
        self.persist();
    }

    pub fn record_game_won(&mut self, player: PlayerId) {
        self.record_mut(player).bump_won();
        self.persist();
    }

    /// Updates the leaderboard name of an existing record. Unknown players
    /// are left alone: records only appear through scoring or playing.
    pub fn set_display_name(&mut self, player: PlayerId, name: &str) {
        let Some(&i) = self.index.get(&player) else {
            return;
        };
        if self.records[i].display_name() != name {
            self.records[i].rename(name.to_string());
            self.persist();
        }
    }

    pub fn get(&self, player: PlayerId) -> Option<&PlayerScore> {
        self.index.get(&player).map(|&i| &self.records[i])
    }

    pub fn total_points(&self, player: PlayerId) -> i64 {
        self.get(player).map_or(0, PlayerScore::total_points)
    }

    pub fn minigame_points(&self, player: PlayerId, minigame: &str) -> i64 {
        self.get(player)
            .and_then(|r| r.minigame_points(minigame))
            .unwrap_or(0)
    }

    /// Top `limit` players by total points.
    pub fn global_ranking(&self, limit: usize) -> Vec<RankEntry> {
        rank(
            self.records.iter().map(|r| (r, r.total_points())),
            limit,
        )
    }

    /// Top `limit` players by points in one minigame. Players who never
    /// scored there are left out.
    pub fn minigame_ranking(&self, minigame: &str, limit: usize) -> Vec<RankEntry> {
        rank(
            self.records
                .iter()
                .filter_map(|r| r.minigame_points(minigame).map(|p| (r, p))),
            limit,
        )
    }

    /// Administrative wipe of every record.
    pub fn wipe(&mut self) {
        let dropped = self.records.len();
        self.records.clear();
        self.index.clear();
        tracing::warn!(dropped, "score ledger wiped");
        self.persist();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_mut(&mut self, player: PlayerId) -> &mut PlayerScore {
        let records = &mut self.records;
        let i = *self.index.entry(player).or_insert_with(|| {
            records.push(PlayerScore::new(player));
            records.len() - 1
        });
        &mut self.records[i]
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.records) {
            tracing::error!(error = %e, "failed to save scores; keeping in-memory state");
        }
    }
}

/// Stable descending sort over first-seen order.
fn rank<'a>(rows: impl Iterator<Item = (&'a PlayerScore, i64)>, limit: usize) -> Vec<RankEntry> {
    let mut rows: Vec<_> = rows.collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (r, points))| RankEntry {
            position: i + 1,
            player: r.player(),
            display_name: r.display_name().to_string(),
            points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    /// A store whose saves always fail.
    struct BrokenStore;

    impl ScoreStore for BrokenStore {
        fn load(&self) -> Result<Vec<PlayerScore>, LedgerError> {
            Ok(Vec::new())
        }

        fn save(&mut self, _records: &[PlayerScore]) -> Result<(), LedgerError> {
            Err(LedgerError::Io {
                path: "/dev/full".into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn test_add_score_creates_record_lazily() {
        let mut ledger = ScoreLedger::in_memory();
        assert!(ledger.get(pid(1)).is_none());

        let total = ledger.add_score(pid(1), "Cadena", 10, "finish");

        assert_eq!(total, 10);
        let rec = ledger.get(pid(1)).unwrap();
        assert_eq!(rec.minigame_points("Cadena"), Some(10));
        assert_eq!(rec.games_played(), 0);
    }

    #[test]
    fn test_add_score_penalty_then_bonus_restores_bucket() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add_score(pid(1), "Cadena", 30, "checkpoint");
        ledger.add_score(pid(1), "Boats", 5, "finish");
        let before = ledger.minigame_points(pid(1), "Cadena");

        ledger.add_score(pid(1), "Cadena", -50, "penalty");
        assert_eq!(ledger.minigame_points(pid(1), "Cadena"), before - 50);
        ledger.add_score(pid(1), "Cadena", 50, "bonus");

        assert_eq!(ledger.minigame_points(pid(1), "Cadena"), before);
        // 30 + 5 - 50 + 50
        assert_eq!(ledger.total_points(pid(1)), 35);
    }

    #[test]
    fn test_negative_totals_are_allowed() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add_score(pid(1), "Cadena", -5, "penalty");
        assert_eq!(ledger.total_points(pid(1)), -5);
    }

    #[test]
    fn test_global_ranking_ties_keep_first_seen_order() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add_score(pid(3), "a", 10, "");
        ledger.add_score(pid(1), "a", 20, "");
        ledger.add_score(pid(2), "a", 10, "");

        let ranking = ledger.global_ranking(10);

        let order: Vec<_> = ranking.iter().map(|r| r.player).collect();
        assert_eq!(order, vec![pid(1), pid(3), pid(2)]);
        assert_eq!(ranking[0].position, 1);
        assert_eq!(ranking[2].position, 3);
    }

    #[test]
    fn test_global_ranking_respects_limit() {
        let mut ledger = ScoreLedger::in_memory();
        for i in 1..=5 {
            ledger.add_score(pid(i), "a", i as i64, "");
        }
        let top = ledger.global_ranking(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].player, pid(5));
    }

    #[test]
    fn test_minigame_ranking_only_includes_players_of_that_minigame() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add_score(pid(1), "Boats", 50, "");
        ledger.add_score(pid(2), "Cadena", 5, "");
        ledger.add_score(pid(3), "Cadena", 7, "");

        let ranking = ledger.minigame_ranking("Cadena", 10);

        let order: Vec<_> = ranking.iter().map(|r| (r.player, r.points)).collect();
        assert_eq!(order, vec![(pid(3), 7), (pid(2), 5)]);
    }

    #[test]
    fn test_played_and_won_counters_are_independent_of_points() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.record_game_played(pid(1));
        ledger.record_game_played(pid(1));
        ledger.record_game_won(pid(1));

        let rec = ledger.get(pid(1)).unwrap();
        assert_eq!(rec.games_played(), 2);
        assert_eq!(rec.games_won(), 1);
        assert_eq!(rec.total_points(), 0);
    }

    #[test]
    fn test_set_display_name_ignores_unknown_players() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.set_display_name(pid(1), "alex");
        assert!(ledger.is_empty());

        ledger.record_game_played(pid(1));
        ledger.set_display_name(pid(1), "alex");
        assert_eq!(ledger.get(pid(1)).unwrap().display_name(), "alex");
    }

    #[test]
    fn test_failed_save_keeps_in_memory_change() {
        let mut ledger = ScoreLedger::open(BrokenStore).unwrap();

        ledger.add_score(pid(1), "Cadena", 12, "finish");

        assert_eq!(ledger.total_points(pid(1)), 12);
    }

    #[test]
    fn test_wipe_clears_everything() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add_score(pid(1), "a", 1, "");
        ledger.wipe();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_points(pid(1)), 0);
    }
}
