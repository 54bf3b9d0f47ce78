use super::{
    clock::{RoundLatch, SessionClock},
    difficulty::{self, Difficulty},
    generator::{StimulusGenerator, DEFAULT_RETRY_CAP},
    scorer::{Outcome, Round},
};
use crate::util::mean;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Tunables for one local challenge session
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeSettings {
    pub session_limit: Duration,
    pub round_limit: Duration,
    pub total_rounds: usize,
    pub settle_delay: Duration,
    pub retry_cap: usize,
    pub difficulty_table: Vec<Difficulty>,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            session_limit: Duration::from_secs(240),
            round_limit: Duration::from_secs(30),
            total_rounds: 8,
            settle_delay: Duration::from_millis(400),
            retry_cap: DEFAULT_RETRY_CAP,
            difficulty_table: difficulty::default_table(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Instructions,
    Playing,
    Complete,
}

/// Outcome of one round, appended once and never touched again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round_index: usize,
    pub correct: u32,
    pub incorrect: u32,
    pub net_score: i64,
    pub elapsed_seconds: f64,
    pub completed_before_timeout: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub rounds_played: usize,
    pub rounds_cleared: usize,
    pub total_net_score: i64,
    pub mean_round_secs: Option<f64>,
}

/// Drives rounds from instructions to completion. Owns both countdowns and
/// the active round; nothing else mutates them.
#[derive(Debug)]
pub struct ChallengeSession {
    settings: ChallengeSettings,
    generator: StimulusGenerator,
    rng: StdRng,
    phase: Phase,
    clock: SessionClock,
    round: Option<Round>,
    latch: RoundLatch,
    settle_remaining: Option<Duration>,
    results: Vec<RoundResult>,
    torn_down: bool,
}

impl ChallengeSession {
    pub fn new(settings: ChallengeSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    pub fn with_rng(settings: ChallengeSettings, rng: StdRng) -> Self {
        let generator = StimulusGenerator::new(settings.retry_cap);
        let clock = SessionClock::new(settings.session_limit, settings.round_limit);
        Self {
            settings,
            generator,
            rng,
            phase: Phase::Instructions,
            clock,
            round: None,
            latch: RoundLatch::default(),
            settle_remaining: None,
            results: Vec::new(),
            torn_down: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &ChallengeSettings {
        &self.settings
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn results(&self) -> &[RoundResult] {
        &self.results
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Playing && !self.torn_down
    }

    pub fn completion_pending(&self) -> bool {
        self.settle_remaining.is_some()
    }

    pub fn total_net_score(&self) -> i64 {
        self.results.iter().map(|r| r.net_score).sum()
    }

    pub fn summary(&self) -> SessionSummary {
        let secs: Vec<f64> = self.results.iter().map(|r| r.elapsed_seconds).collect();
        SessionSummary {
            rounds_played: self.results.len(),
            rounds_cleared: self
                .results
                .iter()
                .filter(|r| r.completed_before_timeout)
                .count(),
            total_net_score: self.total_net_score(),
            mean_round_secs: mean(&secs),
        }
    }

    /// Leave the instructions and enter round 1
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Instructions || self.torn_down {
            return false;
        }
        self.clock = SessionClock::new(self.settings.session_limit, self.settings.round_limit);
        self.results.clear();
        self.phase = Phase::Playing;
        info!(
            total_rounds = self.settings.total_rounds,
            session_secs = self.settings.session_limit.as_secs(),
            "challenge session started"
        );
        self.enter_round(1);
        true
    }

    pub fn select(&mut self, stimulus_id: u32) -> Option<Outcome> {
        if !self.is_active() || self.settle_remaining.is_some() {
            return None;
        }
        let round = self.round.as_mut()?;
        let outcome = round.select(stimulus_id)?;

        if outcome == Outcome::Correct && round.is_cleared() {
            if self.settings.settle_delay.is_zero() {
                self.end_round(true);
            } else {
                self.settle_remaining = Some(self.settings.settle_delay);
            }
        }
        Some(outcome)
    }

    /// Advance both countdowns. Session expiry wins over everything, then a
    /// due completion, then round expiry.
    pub fn on_tick(&mut self, dt: Duration) {
        if !self.is_active() {
            return;
        }
        self.clock.advance(dt);

        if self.clock.session().is_expired() {
            let cleared = self.round.as_ref().is_some_and(Round::is_cleared);
            self.end_round(cleared);
            return;
        }

        if let Some(remaining) = self.settle_remaining {
            let remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() {
                self.end_round(true);
                return;
            }
            self.settle_remaining = Some(remaining);
        }

        // A round whose stimuli were all consumed before expiry counts as
        // completed even if the settle delay had not run out yet.
        if self.clock.round().is_expired() {
            let cleared = self.round.as_ref().is_some_and(Round::is_cleared);
            self.end_round(cleared);
        }
    }

    /// Close the active round. Returns false if the round was already closed.
    pub fn end_round(&mut self, completed: bool) -> bool {
        if !self.is_active() || !self.latch.try_close() {
            return false;
        }
        self.record_round(completed);

        let index = self.round.as_ref().map_or(0, |r| r.index);
        if self.clock.session().is_expired() || index >= self.settings.total_rounds {
            self.finish();
        } else {
            self.enter_round(index + 1);
        }
        true
    }

    /// Candidate-invoked stop: record the round as it stands and finish
    pub fn submit_early(&mut self) -> bool {
        if !self.is_active() || !self.latch.try_close() {
            return false;
        }
        let cleared = self.round.as_ref().is_some_and(Round::is_cleared);
        self.record_round(cleared);
        info!("challenge submitted early");
        self.finish();
        true
    }

    /// Screen teardown: timers stop and the latch is voided
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.settle_remaining = None;
        self.latch.try_close();
    }

    fn enter_round(&mut self, index: usize) {
        let level = difficulty::level_for_round(&self.settings.difficulty_table, index);
        let set = self.generator.generate(&level, index, &mut self.rng);
        if set.duplicates_tolerated > 0 {
            debug!(
                round = index,
                duplicates = set.duplicates_tolerated,
                "round starts with duplicate values"
            );
        }

        self.round = Some(Round::new(index, set.stimuli, self.settings.round_limit));
        self.clock.reset_round(self.settings.round_limit);
        self.latch.reset();
        self.settle_remaining = None;
        debug!(round = index, items = level.item_count, "round started");
    }

    fn record_round(&mut self, completed: bool) {
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let sel = round.selection();
        let result = RoundResult {
            round_index: round.index,
            correct: sel.correct_count,
            incorrect: sel.incorrect_count,
            net_score: i64::from(sel.correct_count) - i64::from(sel.incorrect_count),
            elapsed_seconds: self.clock.round().elapsed().as_secs_f64(),
            completed_before_timeout: completed,
        };
        info!(
            round = result.round_index,
            correct = result.correct,
            incorrect = result.incorrect,
            completed,
            "round closed"
        );
        self.results.push(result);
        self.settle_remaining = None;
    }

    fn finish(&mut self) {
        self.phase = Phase::Complete;
        info!(
            rounds = self.results.len(),
            net_score = self.total_net_score(),
            "challenge session complete"
        );
    }
}
