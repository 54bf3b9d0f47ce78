use std::time::Duration;

/// Countdown advanced by an external tick source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    limit: Duration,
    elapsed: Duration,
}

impl Countdown {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            elapsed: Duration::ZERO,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.limit);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed)
    }

    /// Whole seconds left, rounded up so the display only reads 0 on expiry
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        let whole = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            whole + 1
        } else {
            whole
        }
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.limit
    }
}

/// Session and round countdowns. The session countdown runs across rounds;
/// the round countdown is replaced every time a round starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionClock {
    session: Countdown,
    round: Countdown,
}

impl SessionClock {
    pub fn new(session_limit: Duration, round_limit: Duration) -> Self {
        Self {
            session: Countdown::new(session_limit),
            round: Countdown::new(round_limit),
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.session.advance(dt);
        self.round.advance(dt);
    }

    pub fn reset_round(&mut self, round_limit: Duration) {
        self.round = Countdown::new(round_limit);
    }

    pub fn session(&self) -> &Countdown {
        &self.session
    }

    pub fn round(&self) -> &Countdown {
        &self.round
    }

    pub fn remaining_session_secs(&self) -> u64 {
        self.session.remaining_secs()
    }

    pub fn remaining_round_secs(&self) -> u64 {
        self.round.remaining_secs()
    }
}

/// One-shot guard that lets exactly one round-ending path through
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundLatch {
    closed: bool,
}

impl RoundLatch {
    /// Returns true for the first caller only
    pub fn try_close(&mut self) -> bool {
        if self.closed {
            false
        } else {
            self.closed = true;
            true
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn reset(&mut self) {
        self.closed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_expires_at_limit() {
        let mut c = Countdown::from_secs(2);
        assert_eq!(c.remaining_secs(), 2);
        c.advance(Duration::from_millis(1500));
        assert_eq!(c.remaining_secs(), 1);
        assert!(!c.is_expired());
        c.advance(Duration::from_millis(500));
        assert_eq!(c.remaining_secs(), 0);
        assert!(c.is_expired());
    }

    #[test]
    fn test_countdown_never_overshoots() {
        let mut c = Countdown::from_secs(1);
        c.advance(Duration::from_secs(10));
        assert_eq!(c.elapsed(), Duration::from_secs(1));
        assert_eq!(c.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_round_reset_leaves_session_running() {
        let mut clock = SessionClock::new(Duration::from_secs(60), Duration::from_secs(10));
        clock.advance(Duration::from_secs(4));
        clock.reset_round(Duration::from_secs(10));

        assert_eq!(clock.remaining_round_secs(), 10);
        assert_eq!(clock.remaining_session_secs(), 56);
    }

    #[test]
    fn test_latch_is_one_shot_until_reset() {
        let mut latch = RoundLatch::default();
        assert!(latch.try_close());
        assert!(!latch.try_close());
        assert!(latch.is_closed());
        latch.reset();
        assert!(latch.try_close());
    }
}
