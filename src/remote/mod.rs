pub mod authority;
pub mod protocol;
pub mod session;
pub mod worker;

pub use authority::{HttpAuthority, PuzzleAuthority, RemoteError};
pub use protocol::{Dimensions, Grid, Position, ResultsPayload, ScoreRecord};
pub use session::{
    Action, ActionKind, CallOutcome, MoveCounters, PendingCall, RemoteSession, RemoteSettings,
    RemoteStatus,
};
pub use worker::RemoteWorker;
