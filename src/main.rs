pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use reckon::{
    app_dirs::AppDirs,
    challenge::{ChallengeSession, Phase},
    checks::{self, CheckInputs, CheckResult},
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    remote::{
        Action, CallOutcome, HttpAuthority, PendingCall, Position, RemoteSession, RemoteStatus,
        RemoteWorker, ResultsPayload,
    },
    results::{self, ReportOutcome, ResultsReporter},
    runtime::{CrosstermEventSource, EngineEvent, FixedTicker, Runner},
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};

const TICK_RATE_MS: u64 = 100;

/// timed reasoning challenges in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A proctored assessment front end: a local ordering challenge over timed rounds, followed by a grid puzzle played against a remote puzzle service."
)]
pub struct Cli {
    /// config file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// number of rounds in the ordering challenge
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// overall session length in seconds
    #[clap(short = 's', long)]
    session_secs: Option<u64>,

    /// time limit of each round in seconds
    #[clap(long)]
    round_secs: Option<u64>,

    /// base url of the puzzle service
    #[clap(short = 'u', long)]
    base_url: Option<String>,

    /// grid puzzle rows
    #[clap(long)]
    grid_rows: Option<usize>,

    /// grid puzzle columns
    #[clap(long)]
    grid_cols: Option<usize>,

    /// seed for stimulus generation, for reproducible sessions
    #[clap(long)]
    seed: Option<u64>,

    /// log filter directive written to the log file, e.g. reckon=debug
    #[clap(long)]
    log_level: Option<String>,

    /// upload results stored locally by earlier runs, then exit
    #[clap(long)]
    resend_pending: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(rounds) = self.rounds {
            config.total_rounds = rounds;
        }
        if let Some(secs) = self.session_secs {
            config.session_secs = secs;
        }
        if let Some(secs) = self.round_secs {
            config.round_secs = secs;
        }
        if let Some(url) = &self.base_url {
            config.remote_base_url = url.clone();
        }
        if let Some(rows) = self.grid_rows {
            config.grid_rows = rows;
        }
        if let Some(cols) = self.grid_cols {
            config.grid_cols = cols;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Checks,
    Bubbles,
    Grid,
    Report,
}

/// Side effects the event loop has to carry out after a key press
#[derive(Debug)]
pub enum Command {
    None,
    Quit,
    RunChecks,
    Remote(PendingCall),
    Report,
}

impl From<Option<PendingCall>> for Command {
    fn from(call: Option<PendingCall>) -> Self {
        call.map_or(Command::None, Command::Remote)
    }
}

#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub state: AppState,
    pub checks: Vec<CheckResult>,
    pub challenge: ChallengeSession,
    pub grid: RemoteSession,
    pub cursor: Position,
    pub focus_losses: u32,
    pub report: Option<ReportOutcome>,
}

impl App {
    pub fn new(config: Config, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            challenge: ChallengeSession::with_rng(config.challenge_settings(), rng),
            grid: RemoteSession::new(config.remote_settings()),
            config,
            state: AppState::Checks,
            checks: Vec::new(),
            cursor: Position::new(0, 0),
            focus_losses: 0,
            report: None,
        }
    }

    pub fn on_tick(&mut self, dt: Duration) {
        match self.state {
            AppState::Bubbles => self.challenge.on_tick(dt),
            AppState::Grid => self.grid.on_tick(dt),
            AppState::Checks | AppState::Report => {}
        }
    }

    pub fn on_remote(&mut self, outcome: CallOutcome) {
        let kind = outcome.kind();
        if !self.grid.resolve(outcome) {
            debug!(%kind, "discarded remote response");
        }
    }

    /// Timers keep running; the candidate is only told it was noticed
    pub fn on_focus_lost(&mut self) {
        self.focus_losses += 1;
        warn!(count = self.focus_losses, "assessment window lost focus");
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Command {
        if key.kind != KeyEventKind::Press {
            return Command::None;
        }
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Command::Quit;
        }

        match self.state {
            AppState::Checks => match key.code {
                KeyCode::Char('c') => Command::RunChecks,
                KeyCode::Enter if checks::all_passed(&self.checks) => {
                    info!("pre-checks passed, showing instructions");
                    self.state = AppState::Bubbles;
                    Command::None
                }
                _ => Command::None,
            },
            AppState::Bubbles => self.on_bubbles_key(key.code),
            AppState::Grid => self.on_grid_key(key.code),
            AppState::Report => Command::None,
        }
    }

    fn on_bubbles_key(&mut self, code: KeyCode) -> Command {
        match (self.challenge.phase(), code) {
            (Phase::Instructions, KeyCode::Enter) => {
                self.challenge.start();
            }
            (Phase::Playing, KeyCode::Char(c @ '1'..='9')) => {
                let board_key = c as u8 - b'0';
                if let Some(id) = self.stimulus_at_key(board_key) {
                    self.challenge.select(id);
                }
            }
            (Phase::Playing, KeyCode::Char('s')) => {
                self.challenge.submit_early();
            }
            (Phase::Complete, KeyCode::Char('n')) => {
                self.challenge.teardown();
                self.state = AppState::Grid;
                return self.grid.request(Action::Start).into();
            }
            _ => {}
        }
        Command::None
    }

    fn on_grid_key(&mut self, code: KeyCode) -> Command {
        match self.grid.status() {
            RemoteStatus::Idle | RemoteStatus::Unavailable => match code {
                KeyCode::Enter => self.grid.request(Action::Start).into(),
                _ => Command::None,
            },
            RemoteStatus::Playing => match code {
                KeyCode::Up => {
                    self.move_cursor(-1, 0);
                    Command::None
                }
                KeyCode::Down => {
                    self.move_cursor(1, 0);
                    Command::None
                }
                KeyCode::Left => {
                    self.move_cursor(0, -1);
                    Command::None
                }
                KeyCode::Right => {
                    self.move_cursor(0, 1);
                    Command::None
                }
                KeyCode::Enter => self.grid.request(Action::Select(self.cursor)).into(),
                KeyCode::Char('r') => self.grid.request(Action::Rotate).into(),
                KeyCode::Char('f') => self.grid.request(Action::Flip).into(),
                KeyCode::Char('s') => self.grid.request(Action::Submit).into(),
                _ => Command::None,
            },
            RemoteStatus::Won | RemoteStatus::Lost => match code {
                KeyCode::Char('n') => {
                    self.state = AppState::Report;
                    Command::Report
                }
                _ => Command::None,
            },
            RemoteStatus::Starting | RemoteStatus::Animating => Command::None,
        }
    }

    /// Board keys read like a phone keypad: 1 is top-left, 9 bottom-right
    pub fn stimulus_at_key(&self, board_key: u8) -> Option<u32> {
        let index = board_key.checked_sub(1)?;
        let (row, col) = (index / 3, index % 3);
        let round = self.challenge.round()?;
        round
            .stimuli()
            .iter()
            .find(|s| s.slot.row == row && s.slot.col == col && !round.is_consumed(s.id))
            .map(|s| s.id)
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let grid = self.grid.grid();
        if grid.is_empty() {
            return;
        }
        let row = self
            .cursor
            .row
            .saturating_add_signed(d_row)
            .min(grid.len() - 1);
        let cols = grid[row].len().max(1);
        let col = self.cursor.col.saturating_add_signed(d_col).min(cols - 1);
        self.cursor = Position::new(row, col);
    }

    pub fn results_payload(&self) -> ResultsPayload {
        let mut scores = results::score_records(results::BUBBLES_GAME, self.challenge.results());
        scores.extend(results::grid_record(&self.grid));
        ResultsPayload { scores }
    }
}

fn gather_checks(config: &Config) -> Vec<CheckResult> {
    let db = AppDirs::results_db_path();
    checks::run_checks(&CheckInputs {
        stdin_is_tty: stdin().is_tty(),
        terminal_size: crossterm::terminal::size().ok(),
        results_db: &db,
        base_url: &config.remote_base_url,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&AppDirs::log_path(), cli.log_level.as_deref()) {
        eprintln!("reckon: logging disabled: {err}");
    }

    let store = cli
        .config
        .as_ref()
        .map_or_else(FileConfigStore::new, FileConfigStore::with_path);
    let config = cli.apply(store.load());
    if let Err(err) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, err).exit();
    }

    let authority = HttpAuthority::new(config.remote_base_url.clone(), config.request_timeout())?;

    if cli.resend_pending {
        let sent = ResultsReporter::with_default_store(&authority).resend_pending()?;
        println!("resent {sent} stored result payload(s)");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, cli.seed);
    let res = start_tui(&mut terminal, &mut app, authority);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    authority: HttpAuthority,
) -> Result<(), Box<dyn Error>> {
    let events = CrosstermEventSource::new();
    let remote_tx = events.sender();
    let worker = RemoteWorker::spawn(authority.clone(), move |outcome| {
        remote_tx.send(EngineEvent::Remote(outcome)).is_ok()
    });
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    app.checks = gather_checks(&app.config);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(app, f))?;

        let event = runner.step();
        let now = Instant::now();
        app.on_tick(now.duration_since(last_tick));
        last_tick = now;

        let command = match event {
            EngineEvent::Key(key) => app.on_key(key),
            EngineEvent::Remote(outcome) => {
                app.on_remote(outcome);
                Command::None
            }
            EngineEvent::FocusLost => {
                app.on_focus_lost();
                Command::None
            }
            EngineEvent::FocusGained | EngineEvent::Resize | EngineEvent::Tick => Command::None,
        };

        match command {
            Command::None => {}
            Command::Quit => break,
            Command::RunChecks => app.checks = gather_checks(&app.config),
            Command::Remote(call) => {
                let kind = call.kind();
                if !worker.dispatch(call) {
                    error!(%kind, "remote worker is gone, call dropped");
                }
            }
            Command::Report => {
                terminal.draw(|f| ui(app, f))?;
                let payload = app.results_payload();
                app.report = Some(ResultsReporter::with_default_store(&authority).report(&payload));
            }
        }
    }

    app.challenge.teardown();
    app.grid.teardown();
    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use reckon::remote::{
        protocol::{
            FlipResponse, ResultsAck, RotateResponse, SelectResponse, StartResponse,
            SubmitResponse,
        },
        ActionKind, Dimensions, PuzzleAuthority, RemoteError,
    };
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn passing_checks() -> Vec<CheckResult> {
        vec![CheckResult {
            name: "terminal",
            passed: true,
            detail: String::new(),
        }]
    }

    fn quick_config() -> Config {
        Config {
            total_rounds: 2,
            settle_delay_ms: 0,
            ..Config::default()
        }
    }

    struct ScriptedAuthority;

    impl PuzzleAuthority for ScriptedAuthority {
        fn start(&self, _d: Dimensions) -> Result<StartResponse, RemoteError> {
            Ok(StartResponse {
                session_id: "s-1".into(),
                grid: vec![vec![json!("L"), json!("T")], vec![json!("I"), json!("L")]],
                start: Some(Position::new(0, 0)),
                end: Some(Position::new(1, 1)),
                status: Some("active".into()),
            })
        }
        fn select(&self, _id: &str, _c: Position) -> Result<SelectResponse, RemoteError> {
            Ok(SelectResponse { moves: Some(1) })
        }
        fn rotate(&self, _id: &str, _c: Position) -> Result<RotateResponse, RemoteError> {
            Err(RemoteError::Transport("down".into()))
        }
        fn flip(&self, _id: &str, _c: Position) -> Result<FlipResponse, RemoteError> {
            Err(RemoteError::Transport("down".into()))
        }
        fn submit(&self, _id: &str) -> Result<SubmitResponse, RemoteError> {
            Ok(SubmitResponse {
                valid: true,
                status: Some("solved".into()),
                path: vec![Position::new(0, 0), Position::new(1, 1)],
            })
        }
        fn post_results(&self, _p: &ResultsPayload) -> Result<ResultsAck, RemoteError> {
            Err(RemoteError::Transport("down".into()))
        }
    }

    fn run(app: &mut App, command: Command) {
        if let Command::Remote(call) = command {
            app.on_remote(call.execute(&ScriptedAuthority));
        }
    }

    /// Press the board keys of the current round in ascending value order
    fn clear_round(app: &mut App) {
        let mut stimuli = app.challenge.round().unwrap().stimuli().to_vec();
        stimuli.sort_by_key(|s| (s.target_value, s.id));
        for s in stimuli {
            let board_key = s.slot.row * 3 + s.slot.col + 1;
            let c = char::from(b'0' + board_key);
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["reckon"]);

        assert_eq!(cli.config, None);
        assert_eq!(cli.rounds, None);
        assert_eq!(cli.seed, None);
        assert!(!cli.resend_pending);
        assert_eq!(cli.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_cli_overrides_apply() {
        let cli = Cli::parse_from([
            "reckon",
            "-r",
            "3",
            "--round-secs",
            "12",
            "-u",
            "https://assess.example.org/api",
            "--grid-rows",
            "4",
        ]);
        let config = cli.apply(Config::default());

        assert_eq!(config.total_rounds, 3);
        assert_eq!(config.round_secs, 12);
        assert_eq!(config.remote_base_url, "https://assess.example.org/api");
        assert_eq!(config.grid_rows, 4);
        assert_eq!(config.grid_cols, Config::default().grid_cols);
    }

    #[test]
    fn test_tick_rate_constant() {
        assert_eq!(TICK_RATE_MS, 100);
    }

    #[test]
    fn test_checks_gate_blocks_until_passed() {
        let mut app = App::new(quick_config(), Some(7));
        assert_eq!(app.state, AppState::Checks);

        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state, AppState::Checks);
        assert_matches!(app.on_key(key(KeyCode::Char('c'))), Command::RunChecks);

        app.checks = passing_checks();
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state, AppState::Bubbles);
        assert_eq!(app.challenge.phase(), Phase::Instructions);
    }

    #[test]
    fn test_escape_and_ctrl_c_quit() {
        let mut app = App::new(quick_config(), Some(7));
        assert_matches!(app.on_key(key(KeyCode::Esc)), Command::Quit);
        assert_matches!(
            app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Command::Quit
        );
    }

    #[test]
    fn test_board_keys_clear_rounds() {
        let mut app = App::new(quick_config(), Some(11));
        app.checks = passing_checks();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.challenge.phase(), Phase::Playing);

        clear_round(&mut app);
        assert_eq!(app.challenge.results().len(), 1);
        assert!(app.challenge.results()[0].completed_before_timeout);
        assert_eq!(app.challenge.results()[0].incorrect, 0);

        clear_round(&mut app);
        assert_eq!(app.challenge.phase(), Phase::Complete);
        assert_eq!(app.challenge.total_net_score(), {
            let r = app.challenge.results();
            r.iter().map(|r| i64::from(r.correct)).sum::<i64>()
        });
    }

    #[test]
    fn test_empty_board_key_is_ignored() {
        let mut app = App::new(quick_config(), Some(3));
        app.checks = passing_checks();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));

        let round = app.challenge.round().unwrap();
        let occupied: Vec<u8> = round
            .stimuli()
            .iter()
            .map(|s| s.slot.row * 3 + s.slot.col + 1)
            .collect();
        if let Some(empty) = (1..=9u8).find(|k| !occupied.contains(k)) {
            assert_eq!(app.stimulus_at_key(empty), None);
        }
        assert_eq!(app.stimulus_at_key(0), None);
    }

    #[test]
    fn test_focus_loss_keeps_clock_running() {
        let mut app = App::new(quick_config(), Some(5));
        app.checks = passing_checks();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));

        app.on_focus_lost();
        app.on_tick(Duration::from_secs(2));

        assert_eq!(app.focus_losses, 1);
        assert_eq!(
            app.challenge.clock().remaining_round_secs(),
            Config::default().round_secs - 2
        );
    }

    #[test]
    fn test_grid_flow_reaches_report() {
        let mut app = App::new(quick_config(), Some(9));
        app.checks = passing_checks();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('s')));
        assert_eq!(app.challenge.phase(), Phase::Complete);

        let start = app.on_key(key(KeyCode::Char('n')));
        assert_eq!(app.state, AppState::Grid);
        assert_matches!(&start, Command::Remote(call) if call.kind() == ActionKind::Start);
        run(&mut app, start);
        assert_eq!(app.grid.status(), RemoteStatus::Playing);

        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Right));
        assert_eq!(app.cursor, Position::new(1, 1));

        let select = app.on_key(key(KeyCode::Enter));
        run(&mut app, select);
        assert_eq!(app.grid.selected(), Some(Position::new(1, 1)));

        let rotate = app.on_key(key(KeyCode::Char('r')));
        run(&mut app, rotate);
        assert_eq!(app.grid.counters().rotations, 0);
        assert!(app.grid.last_error().is_some());

        let submit = app.on_key(key(KeyCode::Char('s')));
        run(&mut app, submit);
        assert_eq!(app.grid.status(), RemoteStatus::Animating);
        assert_matches!(app.on_key(key(KeyCode::Char('n'))), Command::None);

        app.on_tick(app.grid.animation_length());
        assert_eq!(app.grid.status(), RemoteStatus::Won);
        assert_matches!(app.on_key(key(KeyCode::Char('n'))), Command::Report);
        assert_eq!(app.state, AppState::Report);

        let payload = app.results_payload();
        assert_eq!(payload.scores.len(), 2);
        assert_eq!(payload.scores[0].game, results::BUBBLES_GAME);
        assert_eq!(payload.scores[1].game, results::GRID_GAME);
        assert!(payload.scores[1].completed_before_timeout);
    }

    #[test]
    fn test_ticks_are_ignored_outside_games() {
        let mut app = App::new(quick_config(), Some(1));
        app.on_tick(Duration::from_secs(600));
        app.checks = passing_checks();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(
            app.challenge.clock().remaining_session_secs(),
            Config::default().session_secs
        );
    }

    #[test]
    fn test_ui_renders_every_state() {
        use ratatui::{backend::TestBackend, Terminal};

        let mut app = App::new(quick_config(), Some(2));
        app.checks = passing_checks();
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();

        for state in [
            AppState::Checks,
            AppState::Bubbles,
            AppState::Grid,
            AppState::Report,
        ] {
            app.state = state;
            terminal.draw(|f| ui(&mut app, f)).unwrap();
            let content: String = terminal
                .backend()
                .buffer()
                .content
                .iter()
                .map(|c| c.symbol())
                .collect();
            assert!(!content.trim().is_empty(), "{state:?} rendered nothing");
        }
    }
}
