use super::{
    difficulty::{Difficulty, Operator, MAX_OPERAND_LIMIT},
    layout::{self, LayoutSlot},
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_RETRY_CAP: usize = 50;

/// `lhs op rhs`, kept alongside the rendered string so it can be re-evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    pub lhs: i64,
    pub operator: Operator,
    pub rhs: i64,
}

impl Expression {
    pub fn evaluate(&self) -> Option<i64> {
        self.operator.apply(self.lhs, self.rhs)
    }

    pub fn display(&self) -> String {
        format!("{} {} {}", self.lhs, self.operator, self.rhs)
    }
}

/// A scorable item the candidate has to place in ascending order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub id: u32,
    pub display_expression: String,
    pub target_value: i64,
    pub expression: Expression,
    pub slot: LayoutSlot,
}

/// Output of one generation pass
#[derive(Debug, Clone)]
pub struct StimulusSet {
    pub stimuli: Vec<Stimulus>,
    /// Items that kept a duplicate value after the retry cap ran out
    pub duplicates_tolerated: usize,
}

#[derive(Debug, Clone)]
pub struct StimulusGenerator {
    retry_cap: usize,
}

impl Default for StimulusGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_CAP)
    }
}

impl StimulusGenerator {
    pub fn new(retry_cap: usize) -> Self {
        Self {
            retry_cap: retry_cap.max(1),
        }
    }

    /// Produce the stimuli for a round. Never fails: a duplicate value that
    /// survives the retry cap is accepted.
    pub fn generate<R: Rng>(
        &self,
        difficulty: &Difficulty,
        round_index: usize,
        rng: &mut R,
    ) -> StimulusSet {
        let operators: &[Operator] = if difficulty.allowed_operators.is_empty() {
            &[Operator::Add]
        } else {
            &difficulty.allowed_operators
        };

        // Clamped so every drawn expression evaluates
        let max_operand = difficulty.max_operand.min(MAX_OPERAND_LIMIT);
        let mut stimuli: Vec<Stimulus> = Vec::with_capacity(difficulty.item_count);
        let mut duplicates_tolerated = 0;

        for position in 0..difficulty.item_count {
            let mut attempts = 0;
            let (expression, value) = loop {
                let operator = *operators.choose(rng).unwrap_or(&Operator::Add);
                let candidate = draw_expression(operator, max_operand, rng);
                let Some(value) = candidate.evaluate() else {
                    debug!(round_index, expression = %candidate.display(), "redrawing expression");
                    continue;
                };
                attempts += 1;

                let taken = stimuli.iter().any(|s| s.target_value == value);
                if !taken {
                    break (candidate, value);
                }
                if attempts >= self.retry_cap {
                    debug!(round_index, value, attempts, "accepting duplicate stimulus value");
                    duplicates_tolerated += 1;
                    break (candidate, value);
                }
            };

            stimuli.push(Stimulus {
                id: position as u32,
                display_expression: expression.display(),
                target_value: value,
                expression,
                slot: layout::slot_for(round_index, position),
            });
        }

        StimulusSet {
            stimuli,
            duplicates_tolerated,
        }
    }
}

/// Inclusive range that is never empty
fn bounded(low: i64, high: i64) -> (i64, i64) {
    (low, high.max(low))
}

fn draw_expression<R: Rng>(operator: Operator, max_operand: i64, rng: &mut R) -> Expression {
    match operator {
        Operator::Add => {
            let (lo, hi) = bounded(1, max_operand);
            Expression {
                lhs: rng.gen_range(lo..=hi),
                operator,
                rhs: rng.gen_range(lo..=hi),
            }
        }
        Operator::Subtract => {
            let (lo, hi) = bounded(2, max_operand);
            let minuend = rng.gen_range(lo..=hi);
            Expression {
                lhs: minuend,
                operator,
                rhs: rng.gen_range(0..=minuend),
            }
        }
        Operator::Multiply => {
            let (lo_a, hi_a) = bounded(1, max_operand.min(12));
            let (lo_b, hi_b) = bounded(1, max_operand.min(9));
            Expression {
                lhs: rng.gen_range(lo_a..=hi_a),
                operator,
                rhs: rng.gen_range(lo_b..=hi_b),
            }
        }
        Operator::Divide => {
            let (lo_d, hi_d) = bounded(2, max_operand.min(10));
            let (lo_q, hi_q) = bounded(1, max_operand.min(12));
            let divisor = rng.gen_range(lo_d..=hi_d);
            let quotient = rng.gen_range(lo_q..=hi_q);
            Expression {
                lhs: divisor * quotient,
                operator,
                rhs: divisor,
            }
        }
    }
}
