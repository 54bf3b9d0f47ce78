use super::generator::Stimulus;
use std::time::Duration;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// Per-round tallies, reset whenever a round starts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub next_expected_rank: usize,
}

/// The active round: its stimuli, which of them are consumed, and the tallies
#[derive(Debug, Clone)]
pub struct Round {
    pub index: usize,
    pub time_limit: Duration,
    stimuli: Vec<Stimulus>,
    consumed: Vec<bool>,
    selection: SelectionState,
}

impl Round {
    pub fn new(index: usize, stimuli: Vec<Stimulus>, time_limit: Duration) -> Self {
        let consumed = vec![false; stimuli.len()];
        Self {
            index,
            time_limit,
            stimuli,
            consumed,
            selection: SelectionState::default(),
        }
    }

    pub fn stimuli(&self) -> &[Stimulus] {
        &self.stimuli
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn is_consumed(&self, id: u32) -> bool {
        self.position_of(id).is_some_and(|pos| self.consumed[pos])
    }

    /// All stimuli consumed; further selections are no-ops
    pub fn is_cleared(&self) -> bool {
        self.consumed.iter().all(|c| *c)
    }

    /// Position of the lowest remaining value; the earliest generated wins ties
    pub fn expected_next(&self) -> Option<usize> {
        self.stimuli
            .iter()
            .enumerate()
            .filter(|(pos, _)| !self.consumed[*pos])
            .min_by_key(|(pos, s)| (s.target_value, *pos))
            .map(|(pos, _)| pos)
    }

    /// Score a pick. `None` means the pick had no effect: unknown id, already
    /// consumed, or the round is already cleared.
    pub fn select(&mut self, id: u32) -> Option<Outcome> {
        if self.is_cleared() {
            return None;
        }
        let pos = self.position_of(id)?;
        if self.consumed[pos] {
            return None;
        }

        if self.expected_next() == Some(pos) {
            self.consumed[pos] = true;
            self.selection.correct_count += 1;
            self.selection.next_expected_rank += 1;
            Some(Outcome::Correct)
        } else {
            self.selection.incorrect_count += 1;
            Some(Outcome::Incorrect)
        }
    }

    fn position_of(&self, id: u32) -> Option<usize> {
        self.stimuli.iter().position(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{
        difficulty::Operator,
        generator::Expression,
        layout::{self, LayoutSlot},
    };

    fn stimulus(id: u32, value: i64) -> Stimulus {
        let expression = Expression {
            lhs: value,
            operator: Operator::Add,
            rhs: 0,
        };
        Stimulus {
            id,
            display_expression: expression.display(),
            target_value: value,
            expression,
            slot: layout::slot_for(1, id as usize),
        }
    }

    fn round(values: &[i64]) -> Round {
        let stimuli = values
            .iter()
            .enumerate()
            .map(|(i, v)| stimulus(i as u32, *v))
            .collect();
        Round::new(1, stimuli, Duration::from_secs(30))
    }

    #[test]
    fn test_ascending_picks_clear_the_round() {
        let mut r = round(&[7, 3, 12]);
        assert_eq!(r.select(1), Some(Outcome::Correct));
        assert_eq!(r.select(0), Some(Outcome::Correct));
        assert!(!r.is_cleared());
        assert_eq!(r.select(2), Some(Outcome::Correct));
        assert!(r.is_cleared());

        let sel = r.selection();
        assert_eq!(sel.correct_count, 3);
        assert_eq!(sel.incorrect_count, 0);
        assert_eq!(sel.next_expected_rank, 3);
    }

    #[test]
    fn test_second_lowest_first_is_one_silent_miss() {
        let mut r = round(&[7, 3, 12]);
        let before: Vec<Stimulus> = r.stimuli().to_vec();

        assert_eq!(r.select(0), Some(Outcome::Incorrect));

        assert_eq!(r.selection().incorrect_count, 1);
        assert_eq!(r.selection().correct_count, 0);
        assert_eq!(r.stimuli(), before.as_slice());
        assert!(!r.is_consumed(0));
        assert!(!r.is_consumed(1));
        assert_eq!(r.expected_next(), Some(1));
    }

    #[test]
    fn test_ties_go_to_first_generated() {
        let mut r = round(&[5, 2, 2]);
        assert_eq!(r.select(2), Some(Outcome::Incorrect));
        assert_eq!(r.select(1), Some(Outcome::Correct));
        assert_eq!(r.select(2), Some(Outcome::Correct));
        assert_eq!(r.select(0), Some(Outcome::Correct));
        assert!(r.is_cleared());
    }

    #[test]
    fn test_consumed_and_unknown_picks_are_noops() {
        let mut r = round(&[1, 2]);
        assert_eq!(r.select(0), Some(Outcome::Correct));
        assert_eq!(r.select(0), None);
        assert_eq!(r.select(99), None);
        assert_eq!(r.selection().incorrect_count, 0);
    }

    #[test]
    fn test_cleared_round_ignores_picks() {
        let mut r = round(&[1]);
        assert_eq!(r.select(0), Some(Outcome::Correct));
        assert_eq!(r.select(0), None);
        assert_eq!(r.selection().correct_count, 1);
    }

    #[test]
    fn test_slot_is_carried_on_stimulus() {
        let r = round(&[4, 5]);
        assert_eq!(r.stimuli()[0].slot, LayoutSlot { row: 1, col: 1 });
    }
}
