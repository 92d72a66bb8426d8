use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// How a scheduler spaces out frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimingMode {
    /// One frame per interval, surplus time returned to the host for sleeping.
    Fixed(Duration),
    /// Every pass through the host loop is a frame.
    Continuous,
}

/// Cancellation token for one scheduler. Cloning hands out another view of
/// the same flag; cancelling any clone stops the scheduler.
#[derive(Clone)]
pub(crate) struct AnimationHandle {
    live: Rc<Cell<bool>>,
}

impl AnimationHandle {
    fn new() -> Self {
        Self {
            live: Rc::new(Cell::new(true)),
        }
    }

    /// Idempotent: a second cancel observes nothing new.
    pub(crate) fn cancel(&self) {
        self.live.set(false);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        !self.live.get()
    }
}

/// Paces one layer's tick. The host loop asks `fires` whether a frame is
/// due, then runs the tick through `dispatch`, which refuses to invoke
/// anything once the handle is cancelled. That check is what makes `stop`
/// effective even for a tick the host already decided to run.
pub(crate) struct FrameScheduler {
    mode: TimingMode,
    handle: AnimationHandle,
    last: Option<Instant>,
}

impl FrameScheduler {
    pub(crate) fn new(mode: TimingMode) -> Self {
        Self {
            mode,
            handle: AnimationHandle::new(),
            last: None,
        }
    }

    pub(crate) fn handle(&self) -> AnimationHandle {
        self.handle.clone()
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.handle.is_cancelled()
    }

    /// Whether a frame is due at `now`. Advances the phase when it is.
    pub(crate) fn fires(&mut self, now: Instant) -> bool {
        if self.handle.is_cancelled() {
            return false;
        }
        match self.mode {
            TimingMode::Continuous => true,
            TimingMode::Fixed(dt) => match self.last {
                None => {
                    self.last = Some(now);
                    true
                }
                Some(last) if now.saturating_duration_since(last) >= dt => {
                    self.last = Some(now);
                    true
                }
                Some(_) => false,
            },
        }
    }

    /// Runs `tick` unless the handle was cancelled in the meantime.
    /// Returns whether it ran.
    pub(crate) fn dispatch<F: FnOnce()>(&mut self, tick: F) -> bool {
        if self.handle.is_cancelled() {
            return false;
        }
        tick();
        true
    }

    /// Time until the next frame is due, for the host's poll timeout.
    pub(crate) fn until_due(&self, now: Instant) -> Duration {
        match self.mode {
            TimingMode::Continuous => Duration::ZERO,
            TimingMode::Fixed(dt) => match self.last {
                None => Duration::ZERO,
                Some(last) => dt.saturating_sub(now.saturating_duration_since(last)),
            },
        }
    }

    pub(crate) fn stop(&mut self) {
        self.handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_mode_fires_once_per_interval() {
        let dt = Duration::from_millis(50);
        let mut s = FrameScheduler::new(TimingMode::Fixed(dt));
        let t0 = Instant::now();
        assert!(s.fires(t0));
        assert!(!s.fires(t0 + Duration::from_millis(10)));
        assert!(s.fires(t0 + Duration::from_millis(60)));
    }

    #[test]
    fn continuous_mode_always_fires() {
        let mut s = FrameScheduler::new(TimingMode::Continuous);
        let t0 = Instant::now();
        assert!(s.fires(t0));
        assert!(s.fires(t0));
        assert_eq!(s.until_due(t0), Duration::ZERO);
    }

    #[test]
    fn queued_dispatch_after_stop_runs_nothing() {
        let mut s = FrameScheduler::new(TimingMode::Continuous);
        let t0 = Instant::now();
        // The host decided a frame was due, then teardown ran before the
        // tick itself was invoked.
        assert!(s.fires(t0));
        s.stop();
        let mut ran = false;
        assert!(!s.dispatch(|| ran = true));
        assert!(!ran);
        assert!(!s.fires(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut s = FrameScheduler::new(TimingMode::Fixed(Duration::from_millis(40)));
        let h = s.handle();
        s.stop();
        s.stop();
        h.cancel();
        assert!(h.is_cancelled());
        assert!(!s.is_live());
    }

    #[test]
    fn cancelling_a_cloned_handle_stops_the_scheduler() {
        let mut s = FrameScheduler::new(TimingMode::Continuous);
        let h = s.handle();
        h.cancel();
        assert!(!s.fires(Instant::now()));
    }
}
