use serde::{Deserialize, Serialize};
use std::fmt;

/// Arithmetic operator a stimulus can be built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-", alias = "−")]
    Subtract,
    #[serde(rename = "*", alias = "×")]
    Multiply,
    #[serde(rename = "/", alias = "÷")]
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "−",
            Operator::Multiply => "×",
            Operator::Divide => "÷",
        }
    }

    /// Evaluate `lhs op rhs`. Division only succeeds when it is exact.
    pub fn apply(&self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            Operator::Add => lhs.checked_add(rhs),
            Operator::Subtract => lhs.checked_sub(rhs),
            Operator::Multiply => lhs.checked_mul(rhs),
            Operator::Divide => {
                if rhs == 0 || lhs % rhs != 0 {
                    None
                } else {
                    Some(lhs / rhs)
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Largest operand a level may ask for. Sums and products of operands in
/// range stay far from `i64` overflow.
pub const MAX_OPERAND_LIMIT: i64 = 1_000_000;

/// One level of the difficulty table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub item_count: usize,
    pub allowed_operators: Vec<Operator>,
    pub max_operand: i64,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            item_count: 3,
            allowed_operators: vec![Operator::Add],
            max_operand: 10,
        }
    }
}

impl Difficulty {
    pub fn new(item_count: usize, allowed_operators: &[Operator], max_operand: i64) -> Self {
        Self {
            item_count,
            allowed_operators: allowed_operators.to_vec(),
            max_operand,
        }
    }
}

/// Levels ordered from easiest to hardest
pub fn default_table() -> Vec<Difficulty> {
    use Operator::*;
    vec![
        Difficulty::new(3, &[Add], 10),
        Difficulty::new(4, &[Add, Subtract], 15),
        Difficulty::new(4, &[Add, Subtract], 20),
        Difficulty::new(5, &[Add, Subtract, Multiply], 20),
        Difficulty::new(5, &[Add, Subtract, Multiply, Divide], 30),
        Difficulty::new(6, &[Add, Subtract, Multiply, Divide], 50),
    ]
}

/// Look up the level for a 1-based round index. Rounds past the end of the
/// table stay on the last level; an empty table yields the default level.
pub fn level_for_round(table: &[Difficulty], round_index: usize) -> Difficulty {
    if table.is_empty() {
        return Difficulty::default();
    }
    let idx = round_index.saturating_sub(1).min(table.len() - 1);
    table[idx].clone()
}
