use super::{
    authority::{PuzzleAuthority, RemoteError},
    protocol::{
        Dimensions, FlipResponse, Grid, Position, RotateResponse, SelectResponse, StartResponse,
        SubmitResponse,
    },
};
use crate::challenge::clock::Countdown;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for the grid challenge
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub dimensions: Dimensions,
    pub countdown: Duration,
    pub animation_tick: Duration,
    pub animation_buffer: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            dimensions: Dimensions { rows: 6, cols: 6 },
            countdown: Duration::from_secs(180),
            animation_tick: Duration::from_millis(150),
            animation_buffer: Duration::from_millis(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Idle,
    Starting,
    Playing,
    Animating,
    Won,
    Lost,
    /// Start failed; there is nothing to render or act on
    Unavailable,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Won | RemoteStatus::Lost)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MoveCounters {
    pub moves: u32,
    pub rotations: u32,
    pub flips: u32,
}

/// Candidate actions that need the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Select(Position),
    Rotate,
    Flip,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Start,
    Select,
    Rotate,
    Flip,
    Submit,
}

/// Identifies one outstanding call against one session lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
enum Request {
    Start(Dimensions),
    Select(Position),
    Rotate(Position),
    Flip(Position),
    Submit,
}

/// A validated call waiting to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    ticket: Ticket,
    session_id: String,
    request: Request,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Started(StartResponse),
    Selected(Position, SelectResponse),
    Rotated(RotateResponse),
    Flipped(FlipResponse),
    Submitted(SubmitResponse),
}

#[derive(Debug)]
pub struct CallOutcome {
    ticket: Ticket,
    kind: ActionKind,
    result: Result<CallResult, RemoteError>,
}

impl CallOutcome {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn result(&self) -> &Result<CallResult, RemoteError> {
        &self.result
    }
}

impl PendingCall {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn kind(&self) -> ActionKind {
        match self.request {
            Request::Start(_) => ActionKind::Start,
            Request::Select(_) => ActionKind::Select,
            Request::Rotate(_) => ActionKind::Rotate,
            Request::Flip(_) => ActionKind::Flip,
            Request::Submit => ActionKind::Submit,
        }
    }

    /// Perform the network call. Blocking; run it off the UI thread.
    pub fn execute(self, authority: &dyn PuzzleAuthority) -> CallOutcome {
        let kind = self.kind();
        let id = self.session_id.as_str();
        let result = match self.request {
            Request::Start(dims) => authority.start(dims).and_then(|resp| {
                if resp.session_id.trim().is_empty() {
                    Err(RemoteError::MissingSession)
                } else {
                    Ok(CallResult::Started(resp))
                }
            }),
            Request::Select(cell) => authority
                .select(id, cell)
                .map(|r| CallResult::Selected(cell, r)),
            Request::Rotate(cell) => authority.rotate(id, cell).map(CallResult::Rotated),
            Request::Flip(cell) => authority.flip(id, cell).map(CallResult::Flipped),
            Request::Submit => authority.submit(id).map(CallResult::Submitted),
        };
        CallOutcome {
            ticket: self.ticket,
            kind,
            result,
        }
    }
}

/// Client-side cache of a session owned by the puzzle authority. Every
/// response overwrites the cached fields; nothing is computed locally.
#[derive(Debug)]
pub struct RemoteSession {
    settings: RemoteSettings,
    status: RemoteStatus,
    session_id: Option<String>,
    grid: Grid,
    start: Option<Position>,
    end: Option<Position>,
    selected: Option<Position>,
    counters: MoveCounters,
    submit_attempts: u32,
    remote_status: Option<String>,
    countdown: Countdown,
    path: Vec<Position>,
    animation_elapsed: Duration,
    generation: u64,
    next_seq: u64,
    pending: Option<Ticket>,
    last_error: Option<String>,
    torn_down: bool,
}

impl RemoteSession {
    pub fn new(settings: RemoteSettings) -> Self {
        let countdown = Countdown::new(settings.countdown);
        Self {
            settings,
            status: RemoteStatus::Idle,
            session_id: None,
            grid: Grid::new(),
            start: None,
            end: None,
            selected: None,
            counters: MoveCounters::default(),
            submit_attempts: 0,
            remote_status: None,
            countdown,
            path: Vec::new(),
            animation_elapsed: Duration::ZERO,
            generation: 0,
            next_seq: 0,
            pending: None,
            last_error: None,
            torn_down: false,
        }
    }

    pub fn status(&self) -> RemoteStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn endpoints(&self) -> (Option<Position>, Option<Position>) {
        (self.start, self.end)
    }

    pub fn selected(&self) -> Option<Position> {
        self.selected
    }

    pub fn counters(&self) -> MoveCounters {
        self.counters
    }

    pub fn submit_attempts(&self) -> u32 {
        self.submit_attempts
    }

    pub fn remote_status(&self) -> Option<&str> {
        self.remote_status.as_deref()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn path(&self) -> &[Position] {
        &self.path
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn accepts_input(&self) -> bool {
        !self.torn_down && self.status == RemoteStatus::Playing && self.pending.is_none()
    }

    /// Waypoints of the accepted path shown so far, one per animation tick
    pub fn revealed_path(&self) -> &[Position] {
        let tick = self.settings.animation_tick.as_nanos().max(1);
        let shown = (self.animation_elapsed.as_nanos() / tick) as usize;
        &self.path[..shown.min(self.path.len())]
    }

    /// Time from acceptance to the win transition
    pub fn animation_length(&self) -> Duration {
        let waypoints = u32::try_from(self.path.len()).unwrap_or(u32::MAX);
        self.settings
            .animation_tick
            .saturating_mul(waypoints)
            .saturating_add(self.settings.animation_buffer)
    }

    /// Validate an action and reserve the call slot for it. Returns `None`
    /// when the action is not allowed right now.
    pub fn request(&mut self, action: Action) -> Option<PendingCall> {
        if self.torn_down || self.pending.is_some() {
            return None;
        }

        let request = match action {
            Action::Start => {
                if !matches!(self.status, RemoteStatus::Idle | RemoteStatus::Unavailable) {
                    return None;
                }
                Request::Start(self.settings.dimensions)
            }
            Action::Select(cell) => {
                if !self.accepts_input() || !self.in_bounds(cell) {
                    return None;
                }
                Request::Select(cell)
            }
            Action::Rotate => {
                if !self.accepts_input() {
                    return None;
                }
                Request::Rotate(self.selected?)
            }
            Action::Flip => {
                if !self.accepts_input() {
                    return None;
                }
                Request::Flip(self.selected?)
            }
            Action::Submit => {
                if !self.accepts_input() {
                    return None;
                }
                Request::Submit
            }
        };

        let session_id = match request {
            Request::Start(_) => String::new(),
            _ => self.session_id.clone()?,
        };

        if matches!(request, Request::Start(_)) {
            self.status = RemoteStatus::Starting;
        }

        let ticket = Ticket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending = Some(ticket);

        Some(PendingCall {
            ticket,
            session_id,
            request,
        })
    }

    /// Apply a response. Returns false when the outcome belongs to a torn
    /// down session or a call that is no longer outstanding.
    pub fn resolve(&mut self, outcome: CallOutcome) -> bool {
        if self.torn_down
            || outcome.ticket.generation != self.generation
            || self.pending != Some(outcome.ticket)
        {
            debug!(action = %outcome.kind, "discarding stale remote response");
            return false;
        }
        self.pending = None;

        if self.status.is_terminal() {
            debug!(action = %outcome.kind, "ignoring response after terminal state");
            return false;
        }

        match outcome.result {
            Err(err) => {
                warn!(action = %outcome.kind, error = %err, "remote call failed");
                self.last_error = Some(err.to_string());
                if outcome.kind == ActionKind::Start {
                    self.status = RemoteStatus::Unavailable;
                }
            }
            Ok(result) => {
                self.last_error = None;
                self.apply(result);
            }
        }
        true
    }

    pub fn on_tick(&mut self, dt: Duration) {
        if self.torn_down {
            return;
        }
        match self.status {
            RemoteStatus::Playing => {
                self.countdown.advance(dt);
                if self.countdown.is_expired() {
                    info!(session_id = ?self.session_id, "grid challenge ran out of time");
                    self.status = RemoteStatus::Lost;
                }
            }
            RemoteStatus::Animating => {
                self.animation_elapsed = self.animation_elapsed.saturating_add(dt);
                if self.animation_elapsed >= self.animation_length() {
                    info!(session_id = ?self.session_id, "grid challenge solved");
                    self.status = RemoteStatus::Won;
                }
            }
            _ => {}
        }
    }

    /// Leaving the screen: stop the clock and orphan any call in flight
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.generation += 1;
        self.pending = None;
    }

    fn in_bounds(&self, cell: Position) -> bool {
        self.grid
            .get(cell.row)
            .is_some_and(|row| cell.col < row.len())
    }

    fn apply(&mut self, result: CallResult) {
        match result {
            CallResult::Started(resp) => {
                info!(session_id = %resp.session_id, "grid session started");
                self.session_id = Some(resp.session_id);
                self.grid = resp.grid;
                self.start = resp.start;
                self.end = resp.end;
                self.remote_status = resp.status;
                self.selected = None;
                self.counters = MoveCounters::default();
                self.submit_attempts = 0;
                self.countdown = Countdown::new(self.settings.countdown);
                self.status = RemoteStatus::Playing;
            }
            CallResult::Selected(cell, resp) => {
                self.selected = Some(cell);
                self.counters.moves = resp.moves.unwrap_or(self.counters.moves + 1);
            }
            CallResult::Rotated(resp) => {
                self.grid = resp.grid;
                self.counters.rotations = resp.rotations.unwrap_or(self.counters.rotations + 1);
            }
            CallResult::Flipped(resp) => {
                self.grid = resp.grid;
                self.counters.flips = resp.flips.unwrap_or(self.counters.flips + 1);
            }
            CallResult::Submitted(resp) => {
                if resp.valid {
                    info!(waypoints = resp.path.len(), "submission accepted");
                    self.remote_status = resp.status;
                    self.path = resp.path;
                    self.animation_elapsed = Duration::ZERO;
                    self.status = RemoteStatus::Animating;
                } else {
                    self.submit_attempts += 1;
                    debug!(attempts = self.submit_attempts, "submission rejected");
                }
            }
        }
    }
}
