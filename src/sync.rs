use crate::ledger::{
    ClientError,
    LedgerReader,
    RoundId,
};
use fuels::types::Address;

/// Mutable state of the round currently accepting entries.
///
/// Replaced wholesale on every refresh; never partially mutated. `players`
/// keeps submission order and may contain duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundState {
    pub current_round_id: RoundId,
    pub players: Vec<Address>,
}

/// One decided round and the address that won it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub round_id: RoundId,
    pub winner: Address,
}

/// Fetches the current round id and player list and swaps them in together.
pub struct RoundStateReader {
    state: Option<RoundState>,
}

impl RoundStateReader {
    pub fn new() -> Self {
        Self { state: None }
    }

    pub fn state(&self) -> Option<&RoundState> {
        self.state.as_ref()
    }

    pub fn current_round_id(&self) -> RoundId {
        self.state
            .as_ref()
            .map(|state| state.current_round_id)
            .unwrap_or(0)
    }

    /// Issues the two read queries and replaces the round state atomically.
    /// On any failure the previous state is retained unchanged.
    ///
    /// The ledger is append-only, so a round id lower than the one already
    /// seen can only mean a confused or misconfigured endpoint; it is
    /// rejected rather than applied.
    pub async fn refresh<L: LedgerReader>(
        &mut self,
        ledger: &L,
    ) -> Result<(), ClientError> {
        let current_round_id = ledger.current_round_id().await?;
        let players = ledger.active_players().await?;
        if let Some(previous) = &self.state
            && current_round_id < previous.current_round_id
        {
            return Err(ClientError::Rpc(format!(
                "ledger reported round {current_round_id} after already serving round {}",
                previous.current_round_id
            )));
        }
        self.state = Some(RoundState {
            current_round_id,
            players,
        });
        Ok(())
    }
}

impl Default for RoundStateReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Round ids whose winner is already decided, newest first. The in-progress
/// round is never part of the walk.
pub(crate) fn completed_rounds(
    current_round_id: RoundId,
) -> impl Iterator<Item = RoundId> {
    (1..current_round_id).rev()
}

/// Rebuilds the winner-per-round record by walking completed rounds backward,
/// one query at a time.
///
/// Every rebuild bumps a generation counter and results carrying a stale
/// generation are dropped, so a rebuild that has been superseded can never
/// interleave its entries with the newer run. Dropping an in-flight rebuild
/// future mid-walk is safe for the same reason: the next rebuild starts by
/// clearing whatever the abandoned one managed to append.
pub struct RoundHistory {
    entries: Vec<HistoryEntry>,
    generation: u64,
}

impl RoundHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            generation: 0,
        }
    }

    /// Entries in query order, i.e. strictly descending round id.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Discards the current sequence and hands out the generation token the
    /// new walk must present when appending.
    pub fn begin_rebuild(&mut self) -> u64 {
        self.generation += 1;
        self.entries.clear();
        self.generation
    }

    /// Appends one entry if `generation` is still current. Returns false for
    /// a stale generation, in which case the entry is discarded.
    pub fn record(&mut self, generation: u64, entry: HistoryEntry) -> bool {
        if generation != self.generation {
            tracing::debug!(
                round_id = entry.round_id,
                generation,
                current = self.generation,
                "dropping history entry from superseded rebuild"
            );
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Walks rounds `current_round_id − 1` down to `1`, strictly
    /// sequentially, appending one entry per successful query.
    ///
    /// A failed query is not retried: the walk aborts and the sequence stays
    /// populated up to the failure point.
    pub async fn rebuild<L: LedgerReader>(
        &mut self,
        ledger: &L,
        current_round_id: RoundId,
    ) -> Result<(), ClientError> {
        let generation = self.begin_rebuild();
        for round_id in completed_rounds(current_round_id) {
            let winner = match ledger.round_winner(round_id).await {
                Ok(winner) => winner,
                Err(err) => {
                    return Err(ClientError::StateSync {
                        round: round_id,
                        reason: err.to_string(),
                    });
                }
            };
            if !self.record(generation, HistoryEntry { round_id, winner }) {
                break;
            }
        }
        Ok(())
    }
}

impl Default for RoundHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::{
        collections::HashMap,
        sync::Mutex,
    };

    struct FakeReader {
        round_id: Mutex<RoundId>,
        players: Vec<Address>,
        winners: HashMap<RoundId, Address>,
        fail_players: bool,
    }

    impl FakeReader {
        fn with_round(round_id: RoundId) -> Self {
            Self {
                round_id: Mutex::new(round_id),
                players: Vec::new(),
                winners: HashMap::new(),
                fail_players: false,
            }
        }
    }

    impl LedgerReader for FakeReader {
        async fn current_round_id(&self) -> Result<RoundId, ClientError> {
            Ok(*self.round_id.lock().unwrap())
        }

        async fn active_players(&self) -> Result<Vec<Address>, ClientError> {
            if self.fail_players {
                return Err(ClientError::Rpc("players endpoint unreachable".into()));
            }
            Ok(self.players.clone())
        }

        async fn round_winner(&self, round_id: RoundId) -> Result<Address, ClientError> {
            self.winners.get(&round_id).copied().ok_or_else(|| {
                ClientError::Rpc(format!("no winner recorded for round {round_id}"))
            })
        }
    }

    fn addr(tag: u8) -> Address {
        Address::new([tag; 32])
    }

    #[tokio::test]
    async fn refresh__replaces_both_fields_together() {
        let mut reader = FakeReader::with_round(4);
        reader.players = vec![addr(1), addr(2), addr(1)];
        let mut round_state = RoundStateReader::new();

        round_state.refresh(&reader).await.unwrap();

        let state = round_state.state().unwrap();
        assert_eq!(state.current_round_id, 4);
        assert_eq!(state.players, vec![addr(1), addr(2), addr(1)]);
    }

    #[tokio::test]
    async fn refresh__keeps_previous_state_on_transport_failure() {
        let mut reader = FakeReader::with_round(4);
        reader.players = vec![addr(1)];
        let mut round_state = RoundStateReader::new();
        round_state.refresh(&reader).await.unwrap();

        reader.fail_players = true;
        *reader.round_id.lock().unwrap() = 5;
        let err = round_state.refresh(&reader).await.unwrap_err();

        assert!(matches!(err, ClientError::Rpc(_)));
        assert_eq!(round_state.current_round_id(), 4);
        assert_eq!(round_state.state().unwrap().players, vec![addr(1)]);
    }

    #[tokio::test]
    async fn refresh__rejects_a_regressing_round_id() {
        let reader = FakeReader::with_round(7);
        let mut round_state = RoundStateReader::new();
        round_state.refresh(&reader).await.unwrap();

        *reader.round_id.lock().unwrap() = 3;
        let err = round_state.refresh(&reader).await.unwrap_err();

        assert!(matches!(err, ClientError::Rpc(_)));
        assert_eq!(round_state.current_round_id(), 7);
    }

    #[tokio::test]
    async fn rebuild__walks_completed_rounds_descending() {
        let mut reader = FakeReader::with_round(3);
        reader.winners.insert(2, addr(0xAA));
        reader.winners.insert(1, addr(0xBB));
        let mut history = RoundHistory::new();

        history.rebuild(&reader, 3).await.unwrap();

        assert_eq!(
            history.entries(),
            &[
                HistoryEntry {
                    round_id: 2,
                    winner: addr(0xAA)
                },
                HistoryEntry {
                    round_id: 1,
                    winner: addr(0xBB)
                },
            ]
        );
    }

    #[tokio::test]
    async fn rebuild__skips_the_undecided_round_entirely() {
        let reader = FakeReader::with_round(1);
        let mut history = RoundHistory::new();

        history.rebuild(&reader, 1).await.unwrap();

        assert!(history.entries().is_empty());
    }

    #[tokio::test]
    async fn rebuild__aborts_at_first_failure_keeping_partial_sequence() {
        let mut reader = FakeReader::with_round(4);
        reader.winners.insert(3, addr(3));
        // Round 2 has no recorded winner, so the walk dies there.
        reader.winners.insert(1, addr(1));
        let mut history = RoundHistory::new();

        let err = history.rebuild(&reader, 4).await.unwrap_err();

        assert!(matches!(err, ClientError::StateSync { round: 2, .. }));
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.entries()[0].round_id, 3);
    }

    #[tokio::test]
    async fn rebuild__discards_results_from_a_superseded_generation() {
        let mut history = RoundHistory::new();
        let first = history.begin_rebuild();
        assert!(history.record(
            first,
            HistoryEntry {
                round_id: 9,
                winner: addr(9)
            }
        ));

        // A second rebuild starts while the first is still in flight.
        let second = history.begin_rebuild();
        assert!(!history.record(
            first,
            HistoryEntry {
                round_id: 8,
                winner: addr(8)
            }
        ));
        assert!(history.record(
            second,
            HistoryEntry {
                round_id: 9,
                winner: addr(7)
            }
        ));

        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.entries()[0].winner, addr(7));
    }

    proptest! {
        #[test]
        fn completed_rounds__is_the_descending_run_with_no_gaps(
            current in 0u64..500
        ) {
            let rounds: Vec<RoundId> = completed_rounds(current).collect();
            let expected: Vec<RoundId> = (1..current).rev().collect();
            prop_assert_eq!(&rounds, &expected);
            for pair in rounds.windows(2) {
                prop_assert_eq!(pair[0], pair[1] + 1);
            }
            prop_assert!(!rounds.contains(&current));
        }
    }
}
