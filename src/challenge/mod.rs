pub mod clock;
pub mod difficulty;
pub mod generator;
pub mod layout;
pub mod scorer;
pub mod session;

pub use clock::{Countdown, RoundLatch, SessionClock};
pub use difficulty::{Difficulty, Operator};
pub use generator::{Expression, Stimulus, StimulusGenerator, StimulusSet};
pub use layout::LayoutSlot;
pub use scorer::{Outcome, Round, SelectionState};
pub use session::{ChallengeSession, ChallengeSettings, Phase, RoundResult, SessionSummary};
