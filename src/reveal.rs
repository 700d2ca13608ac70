//! Staged disclosure of a computed leaderboard.
//!
//! The timeline is `Shuffling -> AwaitingReveal -> RevealingThird ->
//! RevealingSecond -> RevealingChampion`, with the third and second place
//! stages skipped for short lists. While shuffling, cosmetic decoy rows are
//! published; they are drawn at random and never reflect the real ranking.
//!
//! Each sequence runs as one tokio task. Starting a new sequence or calling
//! [`RevealSequencer::cancel`] aborts that task and bumps a generation
//! counter, and every state write checks the generation first, so a timer
//! from an old sequence can never land in a new one.

use crate::errors::{AppError, AppResult};
use crate::models::{EmployeeRecord, RankingEntry, RevealTimings};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;
const DECOY_MIN_SCORE: f64 = -5.0;
const DECOY_MAX_SCORE: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevealPhase {
    #[default]
    Idle,
    Shuffling,
    AwaitingReveal,
    RevealingThird,
    RevealingSecond,
    RevealingChampion,
}

impl RevealPhase {
    /// 0 nothing, 1 third place, 2 second place, 3 champion and the rest.
    pub fn revealed_depth(self) -> u8 {
        match self {
            Self::RevealingThird => 1,
            Self::RevealingSecond => 2,
            Self::RevealingChampion => 3,
            Self::Idle | Self::Shuffling | Self::AwaitingReveal => 0,
        }
    }

    pub fn celebration(self) -> Option<Celebration> {
        match self {
            Self::RevealingThird | Self::RevealingSecond => Some(Celebration::Standard),
            Self::RevealingChampion => Some(Celebration::Grand),
            Self::Idle | Self::Shuffling | Self::AwaitingReveal => None,
        }
    }
}

/// Next stage for a ranking of `len` entries, `None` once terminal.
pub fn next_phase(phase: RevealPhase, len: usize) -> Option<RevealPhase> {
    match phase {
        RevealPhase::Idle => (len > 0).then_some(RevealPhase::Shuffling),
        RevealPhase::Shuffling => Some(RevealPhase::AwaitingReveal),
        RevealPhase::AwaitingReveal if len >= 3 => Some(RevealPhase::RevealingThird),
        RevealPhase::AwaitingReveal => Some(RevealPhase::RevealingChampion),
        RevealPhase::RevealingThird if len >= 2 => Some(RevealPhase::RevealingSecond),
        RevealPhase::RevealingThird => Some(RevealPhase::RevealingChampion),
        RevealPhase::RevealingSecond => Some(RevealPhase::RevealingChampion),
        RevealPhase::RevealingChampion => None,
    }
}

/// How long to hold `phase` before moving on.
fn hold_for(phase: RevealPhase, timings: &RevealTimings) -> Duration {
    let millis = match phase {
        RevealPhase::AwaitingReveal => timings.pause_before_reveal_ms,
        RevealPhase::RevealingThird => timings.pause_after_third_ms,
        RevealPhase::RevealingSecond => timings.pause_after_second_ms,
        RevealPhase::Idle | RevealPhase::Shuffling | RevealPhase::RevealingChampion => 0,
    };
    Duration::from_millis(millis)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Celebration {
    Standard,
    Grand,
}

impl Celebration {
    pub fn duration_ms(self, timings: &RevealTimings) -> u64 {
        match self {
            Self::Standard => timings.standard_celebration_ms,
            Self::Grand => timings.grand_celebration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoyRow {
    pub record: EmployeeRecord,
    pub progress_value: f64,
    pub decoy: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealSnapshot {
    pub sequence_id: Option<String>,
    pub phase: RevealPhase,
    pub revealed_depth: u8,
    pub shuffling: bool,
    pub entries: Vec<RankingEntry>,
    pub decoys: Vec<DecoyRow>,
}

impl RevealSnapshot {
    pub fn is_rank_visible(&self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        match index {
            _ if self.revealed_depth >= 3 => true,
            2 => self.revealed_depth >= 1,
            1 => self.revealed_depth >= 2,
            _ => false,
        }
    }

    pub fn visible_entries(&self) -> Vec<&RankingEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_rank_visible(*index))
            .map(|(_, entry)| entry)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RevealEvent {
    #[serde(rename_all = "camelCase")]
    Phase {
        sequence_id: Option<String>,
        phase: RevealPhase,
        revealed_depth: u8,
    },
    #[serde(rename_all = "camelCase")]
    Decoys {
        sequence_id: String,
        tick: u32,
        rows: Vec<DecoyRow>,
    },
    #[serde(rename_all = "camelCase")]
    Celebration {
        sequence_id: String,
        kind: Celebration,
        duration_ms: u64,
    },
}

#[derive(Default)]
struct SequencerState {
    generation: u64,
    snapshot: RevealSnapshot,
    task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct RevealSequencer {
    state: Arc<Mutex<SequencerState>>,
    events: broadcast::Sender<RevealEvent>,
}

impl Default for RevealSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl RevealSequencer {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SequencerState::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RevealEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> AppResult<RevealSnapshot> {
        Ok(self.lock_state()?.snapshot.clone())
    }

    /// Replaces whatever sequence is running with a new one for `entries`.
    /// `pool` supplies the records decoy rows are drawn from. An empty
    /// ranking leaves the sequencer idle. Must run inside a Tokio runtime.
    pub fn start(
        &self,
        entries: Vec<RankingEntry>,
        pool: Vec<EmployeeRecord>,
        timings: RevealTimings,
    ) -> AppResult<RevealSnapshot> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| AppError::Internal("reveal sequencer needs a tokio runtime".to_string()))?;

        let mut state = self.lock_state()?;
        let generation = self.invalidate(&mut state);

        if entries.is_empty() {
            state.snapshot = RevealSnapshot::default();
            self.emit_phase(&state.snapshot);
            return Ok(state.snapshot.clone());
        }

        let sequence_id = Uuid::new_v4().to_string();
        let len = entries.len();
        state.snapshot = RevealSnapshot {
            sequence_id: Some(sequence_id.clone()),
            phase: RevealPhase::Shuffling,
            revealed_depth: 0,
            shuffling: true,
            entries,
            decoys: Vec::new(),
        };
        self.emit_phase(&state.snapshot);
        tracing::debug!(sequence_id = %sequence_id, entries = len, "reveal sequence started");

        let sequencer = self.clone();
        state.task = Some(runtime.spawn(async move {
            sequencer.run_timeline(generation, sequence_id, len, pool, timings).await;
        }));

        Ok(state.snapshot.clone())
    }

    /// Stops the running sequence, if any, and returns to idle.
    pub fn cancel(&self) -> AppResult<RevealSnapshot> {
        let mut state = self.lock_state()?;
        let had_sequence = state.snapshot.sequence_id.is_some();
        self.invalidate(&mut state);
        state.snapshot = RevealSnapshot::default();
        if had_sequence {
            self.emit_phase(&state.snapshot);
            tracing::debug!("reveal sequence canceled");
        }
        Ok(state.snapshot.clone())
    }

    async fn run_timeline(
        self,
        generation: u64,
        sequence_id: String,
        len: usize,
        pool: Vec<EmployeeRecord>,
        timings: RevealTimings,
    ) {
        let tick = Duration::from_millis(timings.shuffle_tick_ms);
        let rows = len.min(timings.decoy_rows);
        for tick_index in 1..=timings.shuffle_ticks {
            tokio::time::sleep(tick).await;
            let decoys = decoy_rows(&pool, rows);
            if !self.publish_decoys(generation, &sequence_id, tick_index, decoys) {
                return;
            }
        }

        let mut phase = RevealPhase::Shuffling;
        while let Some(next) = next_phase(phase, len) {
            let hold = hold_for(phase, &timings);
            if !hold.is_zero() {
                tokio::time::sleep(hold).await;
            }
            if !self.enter_phase(generation, &sequence_id, next, &timings) {
                return;
            }
            phase = next;
        }
        tracing::debug!(sequence_id = %sequence_id, "reveal sequence finished");
    }

    fn publish_decoys(&self, generation: u64, sequence_id: &str, tick: u32, rows: Vec<DecoyRow>) -> bool {
        let Ok(mut state) = self.lock_state() else {
            return false;
        };
        if state.generation != generation {
            return false;
        }
        state.snapshot.decoys = rows.clone();
        let _ = self.events.send(RevealEvent::Decoys {
            sequence_id: sequence_id.to_string(),
            tick,
            rows,
        });
        true
    }

    fn enter_phase(&self, generation: u64, sequence_id: &str, phase: RevealPhase, timings: &RevealTimings) -> bool {
        let Ok(mut state) = self.lock_state() else {
            return false;
        };
        if state.generation != generation {
            return false;
        }

        state.snapshot.phase = phase;
        state.snapshot.revealed_depth = phase.revealed_depth();
        state.snapshot.shuffling = false;
        state.snapshot.decoys.clear();
        self.emit_phase(&state.snapshot);

        if let Some(kind) = phase.celebration() {
            let _ = self.events.send(RevealEvent::Celebration {
                sequence_id: sequence_id.to_string(),
                kind,
                duration_ms: kind.duration_ms(timings),
            });
        }
        true
    }

    fn invalidate(&self, state: &mut SequencerState) -> u64 {
        state.generation = state.generation.wrapping_add(1);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation
    }

    fn emit_phase(&self, snapshot: &RevealSnapshot) {
        let _ = self.events.send(RevealEvent::Phase {
            sequence_id: snapshot.sequence_id.clone(),
            phase: snapshot.phase,
            revealed_depth: snapshot.revealed_depth,
        });
    }

    fn lock_state(&self) -> AppResult<MutexGuard<'_, SequencerState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("reveal state mutex poisoned".to_string()))
    }
}

fn decoy_rows(pool: &[EmployeeRecord], count: usize) -> Vec<DecoyRow> {
    if pool.is_empty() {
        return Vec::new();
    }
    let mut rng = rand::rng();
    (0..count)
        .map(|_| DecoyRow {
            record: pool[rng.random_range(0..pool.len())].clone(),
            progress_value: rng.random_range(DECOY_MIN_SCORE..DECOY_MAX_SCORE),
            decoy: true,
        })
        .collect()
}
