//! Servo motion unit: one worker thread per servo channel.
//!
//! The worker parks on a condition variable while the unit is paused and
//! advances one step per tick while it is active. Every move call overwrites
//! the single target slot, so the latest command wins.

use crate::hardware::ServoChannel;
use crate::motion::{MotionProfile, MotionState, Rotation};
use crate::{CoreError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Result of asking a worker to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The worker exited and was joined.
    Stopped,
    /// An earlier shutdown already took the worker.
    AlreadyStopped,
    /// The worker did not exit within the timeout and was detached.
    TimedOut,
}

/// Point-in-time view of a servo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoSnapshot {
    pub current: f64,
    pub target: f64,
    pub active: bool,
}

struct Inner {
    motion: MotionState,
    channel: Box<dyn ServoChannel>,
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
    // Not behind `inner`: a stuck channel write holds that lock.
    running: AtomicBool,
    step_period: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wake the worker.
    ///
    /// The lock is taken once after the flag is cleared so a worker between
    /// its predicate check and its wait cannot miss the wakeup. Returns
    /// `false` if the lock stayed busy until `deadline`.
    fn request_stop(&self, deadline: Instant) -> bool {
        self.running.store(false, Ordering::SeqCst);
        loop {
            let mut inner = match self.inner.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return false;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };
            inner.motion.pause();
            drop(inner);
            self.wake.notify_all();
            return true;
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    done: mpsc::Receiver<()>,
}

/// A servo channel driven by its own motion thread.
pub struct ServoUnit {
    name: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl ServoUnit {
    /// Command the initial angle and start the worker thread.
    pub fn spawn(
        name: impl Into<String>,
        mut channel: Box<dyn ServoChannel>,
        initial_angle: f64,
        polarity: Rotation,
        profile: MotionProfile,
    ) -> Result<Self> {
        profile.validate()?;
        let name = name.into();
        let mut motion = MotionState::new(initial_angle, polarity, profile);
        channel.set_angle(motion.reset())?;

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner { motion, channel }),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
            step_period: profile.step_period(),
        });

        let (done_tx, done) = mpsc::channel();
        let worker_shared = shared.clone();
        let worker_name = name.clone();
        let handle = std::thread::Builder::new()
            .name(format!("servo-{}", name.to_lowercase()))
            .spawn(move || {
                // Dropped when the thread exits, which is what shutdown waits on.
                let _done = done_tx;
                run_worker(&worker_shared, &worker_name);
            })?;

        info!(target: "rasptank::servo", "Started {} servo worker at {}°", name, initial_angle);

        Ok(Self {
            name,
            shared,
            worker: Mutex::new(Some(Worker { handle, done })),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> ServoSnapshot {
        let inner = self.shared.lock();
        ServoSnapshot {
            current: inner.motion.current(),
            target: inner.motion.target(),
            active: inner.motion.is_active(),
        }
    }

    pub fn current_angle(&self) -> f64 {
        self.shared.lock().motion.current()
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock().motion.is_active()
    }

    pub fn initial_angle(&self) -> f64 {
        self.shared.lock().motion.initial()
    }

    /// Head for an absolute angle. Returns immediately; the worker does the stepping.
    pub fn move_to(&self, angle: f64) {
        self.shared.lock().motion.move_to(angle);
        debug!(target: "rasptank::servo", "{} move to {}", self.name, angle);
        self.shared.wake.notify_all();
    }

    /// Sweep in a direction to the range bound, or by `steps` steps.
    pub fn move_directional(&self, direction: Rotation, speed: f64, steps: Option<u32>) {
        let target = {
            let mut inner = self.shared.lock();
            inner.motion.move_directional(direction, speed, steps);
            inner.motion.target()
        };
        debug!(target: "rasptank::servo", "{} move {:?} towards {}", self.name, direction, target);
        self.shared.wake.notify_all();
    }

    pub fn clockwise(&self) {
        self.move_directional(Rotation::Clockwise, 1.0, None);
    }

    pub fn anticlockwise(&self) {
        self.move_directional(Rotation::Anticlockwise, 1.0, None);
    }

    /// Pause at the rounded current angle.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.shared.lock();
        let angle = inner.motion.stop();
        debug!(target: "rasptank::servo", "{} stop at {}", self.name, angle);
        inner.channel.set_angle(angle)
    }

    /// Pause and return to the initial angle with a synchronous write.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.shared.lock();
        let angle = inner.motion.reset();
        debug!(target: "rasptank::servo", "{} reset to {}", self.name, angle);
        inner.channel.set_angle(angle)
    }

    /// Nudge one degree up, bypassing the worker.
    pub fn increment(&self) -> Result<()> {
        self.nudge(1.0)
    }

    /// Nudge one degree down, bypassing the worker.
    pub fn decrement(&self) -> Result<()> {
        self.nudge(-1.0)
    }

    fn nudge(&self, delta: f64) -> Result<()> {
        let mut inner = self.shared.lock();
        let angle = inner.motion.nudge(delta);
        inner.channel.set_angle(angle)
    }

    /// Stop the worker for good and wait up to `timeout` for it to exit.
    ///
    /// Safe to call more than once. A worker that outlives the timeout is
    /// detached and reported as [`ShutdownOutcome::TimedOut`].
    pub fn shutdown(&self, timeout: Duration) -> Result<ShutdownOutcome> {
        let Some(worker) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(ShutdownOutcome::AlreadyStopped);
        };

        let deadline = Instant::now() + timeout;
        if !self.shared.request_stop(deadline) {
            warn!(target: "rasptank::servo", "{} worker is stuck holding its lock", self.name);
            return Ok(ShutdownOutcome::TimedOut);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match worker.done.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(target: "rasptank::servo", "{} worker did not stop within {:?}", self.name, timeout);
                Ok(ShutdownOutcome::TimedOut)
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match worker.handle.join() {
                Ok(()) => {
                    debug!(target: "rasptank::servo", "{} worker stopped", self.name);
                    Ok(ShutdownOutcome::Stopped)
                }
                Err(_) => Err(CoreError::WorkerPanicked(self.name.clone())),
            },
        }
    }
}

impl Drop for ServoUnit {
    fn drop(&mut self) {
        match self.shutdown(Duration::from_millis(500)) {
            Ok(ShutdownOutcome::TimedOut) | Err(_) => {
                warn!(target: "rasptank::servo", "{} worker not joined on drop", self.name);
            }
            Ok(_) => {}
        }
    }
}

fn run_worker(shared: &Shared, name: &str) {
    let mut inner = shared.lock();
    loop {
        inner = shared
            .wake
            .wait_while(inner, |i| shared.is_running() && !i.motion.is_active())
            .unwrap_or_else(PoisonError::into_inner);
        if !shared.is_running() {
            break;
        }

        if let Some(angle) = inner.motion.tick() {
            trace!(target: "rasptank::servo", "{} step -> {}", name, angle);
            if let Err(e) = inner.channel.set_angle(angle) {
                error!(target: "rasptank::servo", "{} angle write failed, pausing: {}", name, e);
                inner.motion.pause();
            }
        }

        // Sleep one period; only shutdown cuts it short.
        inner = shared
            .wake
            .wait_timeout_while(inner, shared.step_period, |_| shared.is_running())
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedController;
    use crate::hardware::PwmController;
    use std::time::Instant;

    fn fast_profile() -> MotionProfile {
        MotionProfile {
            step_period_ms: 1,
            degrees_per_second: 1000.0,
            ..MotionProfile::default()
        }
    }

    fn slow_profile() -> MotionProfile {
        MotionProfile {
            step_period_ms: 5,
            degrees_per_second: 200.0,
            ..MotionProfile::default()
        }
    }

    fn spawn_unit(
        sim: &SimulatedController,
        polarity: Rotation,
        profile: MotionProfile,
    ) -> ServoUnit {
        ServoUnit::spawn("TEST", sim.servo(0).unwrap(), 90.0, polarity, profile).unwrap()
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn reached(unit: &ServoUnit, sim: &SimulatedController, expected: f64) -> bool {
        let snap = unit.snapshot();
        !snap.active && snap.current == expected && sim.servo_angle(0) == Some(expected as u8)
    }

    #[test]
    fn test_initial_angle_written() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        assert_eq!(sim.servo_angle(0), Some(90));
        assert_eq!(unit.current_angle(), 90.0);
        assert!(!unit.is_active());
    }

    #[test]
    fn test_move_to_within_range() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        unit.move_to(120.0);
        assert!(wait_for(|| reached(&unit, &sim, 120.0)));
    }

    #[test]
    fn test_move_to_clips_to_max_and_min() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        unit.move_to(200.0);
        assert!(wait_for(|| reached(&unit, &sim, 180.0)));
        unit.move_to(-15.0);
        assert!(wait_for(|| reached(&unit, &sim, 0.0)));
    }

    #[test]
    fn test_stop_mid_motion() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, slow_profile());
        unit.move_to(180.0);
        assert!(wait_for(|| unit.current_angle() > 95.0));
        unit.stop().unwrap();

        let snap = unit.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.current, snap.current.round());
        assert!(snap.current > 90.0 && snap.current < 180.0);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(unit.current_angle(), snap.current);
        assert_eq!(sim.servo_angle(0), Some(snap.current as u8));
    }

    #[test]
    fn test_new_target_redirects_motion() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, slow_profile());
        unit.move_to(180.0);
        unit.move_to(60.0);
        assert!(wait_for(|| reached(&unit, &sim, 60.0)));
    }

    #[test]
    fn test_reset() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        unit.move_to(30.0);
        assert!(wait_for(|| reached(&unit, &sim, 30.0)));
        unit.reset().unwrap();
        assert_eq!(unit.current_angle(), 90.0);
        assert_eq!(sim.servo_angle(0), Some(90));
        assert!(!unit.is_active());
    }

    #[test]
    fn test_increment_and_decrement() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        unit.increment().unwrap();
        assert_eq!(sim.servo_angle(0), Some(91));
        unit.increment().unwrap();
        assert_eq!(sim.servo_angle(0), Some(92));
        unit.decrement().unwrap();
        assert_eq!(sim.servo_angle(0), Some(91));
    }

    #[test]
    fn test_clockwise_and_anticlockwise_sweeps() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        unit.clockwise();
        assert!(wait_for(|| reached(&unit, &sim, 180.0)));
        unit.anticlockwise();
        assert!(wait_for(|| reached(&unit, &sim, 0.0)));
    }

    #[test]
    fn test_reversed_polarity_sweeps() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Anticlockwise, fast_profile());
        unit.clockwise();
        assert!(wait_for(|| reached(&unit, &sim, 0.0)));
        unit.anticlockwise();
        assert!(wait_for(|| reached(&unit, &sim, 180.0)));
    }

    #[test]
    fn test_move_by_steps() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        unit.move_directional(Rotation::Clockwise, 1.0, Some(10));
        assert!(wait_for(|| reached(&unit, &sim, 100.0)));
    }

    #[test]
    fn test_write_fault_pauses_worker() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, slow_profile());
        sim.fail_servo(0);
        unit.move_to(180.0);
        assert!(wait_for(|| !unit.is_active()));
        assert!(matches!(unit.stop(), Err(CoreError::ActuatorWrite { .. })));
        assert!(matches!(unit.reset(), Err(CoreError::ActuatorWrite { .. })));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, slow_profile());
        unit.move_to(180.0);
        let outcome = unit.shutdown(Duration::from_secs(1)).unwrap();
        assert_eq!(outcome, ShutdownOutcome::Stopped);
        let outcome = unit.shutdown(Duration::from_secs(1)).unwrap();
        assert_eq!(outcome, ShutdownOutcome::AlreadyStopped);

        // No worker left to step.
        let frozen = unit.current_angle();
        unit.move_to(10.0);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(unit.current_angle(), frozen);
    }

    #[test]
    fn test_shutdown_of_idle_worker() {
        let sim = SimulatedController::new();
        let unit = spawn_unit(&sim, Rotation::Clockwise, fast_profile());
        assert_eq!(
            unit.shutdown(Duration::from_secs(1)).unwrap(),
            ShutdownOutcome::Stopped
        );
    }

    /// Blocks every write after `armed` is set until the sender side is dropped.
    struct StuckServo {
        armed: Arc<AtomicBool>,
        entered: Arc<AtomicBool>,
        release: mpsc::Receiver<()>,
    }

    impl ServoChannel for StuckServo {
        fn set_angle(&mut self, _angle: u8) -> Result<()> {
            if self.armed.load(Ordering::SeqCst) {
                self.entered.store(true, Ordering::SeqCst);
                let _ = self.release.recv();
            }
            Ok(())
        }
    }

    #[test]
    fn test_shutdown_times_out_on_stuck_write() {
        let armed = Arc::new(AtomicBool::new(false));
        let entered = Arc::new(AtomicBool::new(false));
        let (release_tx, release) = mpsc::channel();
        let channel = StuckServo {
            armed: armed.clone(),
            entered: entered.clone(),
            release,
        };
        let unit = ServoUnit::spawn(
            "STUCK",
            Box::new(channel),
            90.0,
            Rotation::Clockwise,
            fast_profile(),
        )
        .unwrap();

        armed.store(true, Ordering::SeqCst);
        unit.move_to(180.0);
        assert!(wait_for(|| entered.load(Ordering::SeqCst)));

        let started = Instant::now();
        let outcome = unit.shutdown(Duration::from_millis(20)).unwrap();
        assert_eq!(outcome, ShutdownOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(1));

        let outcome = unit.shutdown(Duration::from_millis(20)).unwrap();
        assert_eq!(outcome, ShutdownOutcome::AlreadyStopped);

        // unblock the detached worker so it can see the cleared flag and exit
        drop(release_tx);
    }

    #[test]
    fn test_invalid_profile_fails_spawn() {
        let sim = SimulatedController::new();
        let profile = MotionProfile {
            step_period_ms: 0,
            ..MotionProfile::default()
        };
        let channel = sim.servo(0).unwrap();
        let result = ServoUnit::spawn("ARM", channel, 90.0, Rotation::Clockwise, profile);
        assert!(matches!(result, Err(CoreError::InvalidMotionProfile(_))));
        assert_eq!(sim.servo_angle(0), None);
    }
}
