// Drives the grid protocol the way the binary does: calls run on the
// RemoteWorker thread and come back as EngineEvent::Remote through the
// runtime channel.

use std::sync::mpsc;
use std::time::Duration;

use reckon::remote::protocol::{
    FlipResponse, ResultsAck, RotateResponse, SelectResponse, StartResponse, SubmitResponse,
};
use reckon::remote::{
    Action, Dimensions, Position, PuzzleAuthority, RemoteError, RemoteSession, RemoteSettings,
    RemoteStatus, RemoteWorker, ResultsPayload,
};
use reckon::results::{self, ReportOutcome, ResultsDb, ResultsReporter};
use reckon::runtime::{EngineEvent, FixedTicker, Runner, TestEventSource};
use serde_json::json;

const TICK: Duration = Duration::from_millis(100);
const BUFFER: Duration = Duration::from_millis(250);

#[derive(Clone)]
struct Service {
    path_len: usize,
    reachable: bool,
}

impl Service {
    fn check(&self) -> Result<(), RemoteError> {
        if self.reachable {
            Ok(())
        } else {
            Err(RemoteError::Transport("connection refused".into()))
        }
    }
}

impl PuzzleAuthority for Service {
    fn start(&self, d: Dimensions) -> Result<StartResponse, RemoteError> {
        self.check()?;
        Ok(StartResponse {
            session_id: "grid-7".into(),
            grid: vec![vec![json!({"type": "L"}); d.cols]; d.rows],
            start: Some(Position::new(0, 0)),
            end: Some(Position::new(d.rows - 1, d.cols - 1)),
            status: Some("active".into()),
        })
    }

    fn select(&self, _id: &str, _c: Position) -> Result<SelectResponse, RemoteError> {
        self.check()?;
        Ok(SelectResponse::default())
    }

    fn rotate(&self, _id: &str, _c: Position) -> Result<RotateResponse, RemoteError> {
        self.check()?;
        Ok(RotateResponse {
            grid: vec![vec![json!("T"); 3]; 3],
            rotations: None,
        })
    }

    fn flip(&self, _id: &str, _c: Position) -> Result<FlipResponse, RemoteError> {
        self.check()?;
        Ok(FlipResponse {
            grid: vec![vec![json!("F"); 3]; 3],
            flips: Some(4),
        })
    }

    fn submit(&self, _id: &str) -> Result<SubmitResponse, RemoteError> {
        self.check()?;
        Ok(SubmitResponse {
            valid: true,
            status: Some("solved".into()),
            path: (0..self.path_len).map(|i| Position::new(i, i)).collect(),
        })
    }

    fn post_results(&self, _p: &ResultsPayload) -> Result<ResultsAck, RemoteError> {
        self.check()?;
        Ok(ResultsAck {
            id: Some("res-1".into()),
            message: None,
        })
    }
}

fn settings() -> RemoteSettings {
    RemoteSettings {
        dimensions: Dimensions { rows: 3, cols: 3 },
        countdown: Duration::from_secs(30),
        animation_tick: TICK,
        animation_buffer: BUFFER,
    }
}

struct Harness {
    session: RemoteSession,
    worker: RemoteWorker,
    runner: Runner<TestEventSource, FixedTicker>,
    elapsed: Duration,
}

impl Harness {
    fn new(service: Service) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = RemoteWorker::spawn(service, move |outcome| {
            tx.send(EngineEvent::Remote(outcome)).is_ok()
        });
        Self {
            session: RemoteSession::new(settings()),
            worker,
            runner: Runner::new(
                TestEventSource::new(rx),
                FixedTicker::new(Duration::from_millis(20)),
            ),
            elapsed: Duration::ZERO,
        }
    }

    /// Issue an action and pump events until its response is applied
    fn act(&mut self, action: Action) {
        let call = self.session.request(action).expect("action allowed");
        assert!(self.worker.dispatch(call));
        for _ in 0..250 {
            if let EngineEvent::Remote(outcome) = self.runner.step() {
                self.session.resolve(outcome);
                return;
            }
        }
        panic!("no response for {action:?}");
    }

    fn tick(&mut self) {
        self.session.on_tick(TICK);
        self.elapsed += TICK;
    }
}

#[test]
fn accepted_submit_replays_path_then_wins() {
    let mut h = Harness::new(Service {
        path_len: 3,
        reachable: true,
    });
    h.act(Action::Start);
    assert_eq!(h.session.status(), RemoteStatus::Playing);
    assert_eq!(h.session.session_id(), Some("grid-7"));

    h.act(Action::Select(Position::new(1, 2)));
    h.act(Action::Rotate);
    h.act(Action::Flip);
    let counters = h.session.counters();
    assert_eq!(counters.moves, 1);
    assert_eq!(counters.rotations, 1);
    assert_eq!(counters.flips, 4);

    h.act(Action::Submit);
    assert_eq!(h.session.status(), RemoteStatus::Animating);
    assert!(h.session.request(Action::Submit).is_none());

    h.elapsed = Duration::ZERO;
    while h.session.status() == RemoteStatus::Animating {
        h.tick();
        assert!(h.elapsed <= 3 * TICK + BUFFER + TICK, "replay overran");
    }
    assert_eq!(h.session.status(), RemoteStatus::Won);
    assert!(h.elapsed >= 3 * TICK);
    assert_eq!(h.session.revealed_path().len(), 3);
}

#[test]
fn unreachable_service_leaves_session_unavailable() {
    let mut h = Harness::new(Service {
        path_len: 0,
        reachable: false,
    });
    h.act(Action::Start);
    assert_eq!(h.session.status(), RemoteStatus::Unavailable);
    assert!(h.session.last_error().is_some());
    assert!(!h.session.accepts_input());
    assert!(h.session.request(Action::Select(Position::new(0, 0))).is_none());
}

#[test]
fn response_after_teardown_is_discarded() {
    let mut h = Harness::new(Service {
        path_len: 2,
        reachable: true,
    });
    let call = h.session.request(Action::Start).unwrap();
    assert!(h.worker.dispatch(call));
    h.session.teardown();

    let mut applied = None;
    for _ in 0..250 {
        if let EngineEvent::Remote(outcome) = h.runner.step() {
            applied = Some(h.session.resolve(outcome));
            break;
        }
    }
    assert_eq!(applied, Some(false));
    assert_eq!(h.session.session_id(), None);
}

#[test]
fn grid_outcome_falls_back_to_local_store() {
    let mut h = Harness::new(Service {
        path_len: 1,
        reachable: true,
    });
    h.act(Action::Start);
    h.act(Action::Submit);
    while h.session.status() == RemoteStatus::Animating {
        h.tick();
    }
    let record = results::grid_record(&h.session).expect("terminal state");
    assert!(record.completed_before_timeout);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("results.db");
    let payload = ResultsPayload {
        scores: vec![record],
    };

    let offline = Service {
        path_len: 0,
        reachable: false,
    };
    let outcome = ResultsReporter::new(&offline, db_path.clone()).report(&payload);
    assert!(matches!(outcome, ReportOutcome::StoredLocally { .. }));
    let stored = ResultsDb::open(&db_path).unwrap().pending().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload, payload);

    let online = Service {
        path_len: 0,
        reachable: true,
    };
    assert_eq!(
        ResultsReporter::new(&online, db_path.clone())
            .resend_pending()
            .unwrap(),
        1
    );
}
