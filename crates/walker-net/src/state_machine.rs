//! Lifecycle state machine shared by the client facade and its workers.
//!
//! A client moves `Ready → Running` (or `Ready → Stopped` when start-up
//! fails) and eventually `→ Stopped`. Each direction runs at most once per
//! instance and never concurrently with the other one. Transitions execute on
//! their own short-lived thread; callers that need to wait poll with
//! [`StateMachine::spin_until`].

use std::ops::BitOr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::lock;

/// Sleep between two polls of the state machine or an empty queue.
pub const SPIN_INTERVAL: Duration = Duration::from_millis(10);

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed, not started yet.
    Ready,
    /// Connected and exchanging frames.
    Running,
    /// Stopped for good. A stopped client never runs again.
    Stopped,
}

impl ConnectionState {
    const fn bit(self) -> u8 {
        match self {
            ConnectionState::Ready => 0b001,
            ConnectionState::Running => 0b010,
            ConnectionState::Stopped => 0b100,
        }
    }
}

/// A set of acceptable [`ConnectionState`]s, built with `|`.
///
/// ```
/// use walker_net::{ConnectionState, StateMask};
///
/// let mask = ConnectionState::Running | ConnectionState::Stopped;
/// assert!(mask.contains(ConnectionState::Stopped));
/// assert!(!mask.contains(ConnectionState::Ready));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask(u8);

impl StateMask {
    /// Whether `state` is part of the mask.
    pub const fn contains(self, state: ConnectionState) -> bool {
        self.0 & state.bit() != 0
    }
}

impl From<ConnectionState> for StateMask {
    fn from(state: ConnectionState) -> Self {
        StateMask(state.bit())
    }
}

impl BitOr for ConnectionState {
    type Output = StateMask;

    fn bitor(self, rhs: ConnectionState) -> StateMask {
        StateMask(self.bit() | rhs.bit())
    }
}

impl BitOr<ConnectionState> for StateMask {
    type Output = StateMask;

    fn bitor(self, rhs: ConnectionState) -> StateMask {
        StateMask(self.0 | rhs.bit())
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Init,
    Stop,
}

impl Direction {
    fn admits(self) -> StateMask {
        match self {
            Direction::Init => ConnectionState::Ready.into(),
            Direction::Stop => ConnectionState::Ready | ConnectionState::Running,
        }
    }
}

/// State, in-progress flag and both one-shot latches. Always updated together
/// under one lock.
#[derive(Debug)]
struct Core {
    state: ConnectionState,
    in_transition: bool,
    init_fired: bool,
    stop_fired: bool,
}

impl Core {
    fn latch(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Init => &mut self.init_fired,
            Direction::Stop => &mut self.stop_fired,
        }
    }
}

/// Thread-safe lifecycle tracker. Cloning yields another handle to the same
/// machine.
#[derive(Debug, Clone)]
pub struct StateMachine {
    core: Arc<Mutex<Core>>,
    spin_interval: Duration,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a machine in [`ConnectionState::Ready`] polling at [`SPIN_INTERVAL`].
    pub fn new() -> Self {
        Self::with_spin_interval(SPIN_INTERVAL)
    }

    /// Create a machine with a custom polling interval.
    pub fn with_spin_interval(spin_interval: Duration) -> Self {
        Self {
            core: Arc::new(Mutex::new(Core {
                state: ConnectionState::Ready,
                in_transition: false,
                init_fired: false,
                stop_fired: false,
            })),
            spin_interval,
        }
    }

    /// The polling interval used by this machine.
    pub fn spin_interval(&self) -> Duration {
        self.spin_interval
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        lock(&self.core).state
    }

    /// Non-blocking check of the current state against `mask`.
    pub fn is_in_state(&self, mask: impl Into<StateMask>) -> bool {
        mask.into().contains(self.state())
    }

    /// Poll until the current state is in `mask`.
    pub fn spin_until(&self, mask: impl Into<StateMask>) {
        let mask = mask.into();
        while !self.is_in_state(mask) {
            std::thread::sleep(self.spin_interval);
        }
    }

    /// Run `init` on a new thread and move `Ready → Running` when it returns
    /// `true`, `Ready → Stopped` otherwise. A panicking `init` also ends in
    /// `Stopped`.
    ///
    /// Ignored when the machine has left `Ready` or `init` already ran.
    pub fn init_transition<F>(&self, init: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        let machine = self.clone();
        std::thread::Builder::new()
            .name("walker-init".into())
            .spawn(move || {
                if !machine.begin(Direction::Init) {
                    tracing::debug!("init transition rejected");
                    return;
                }
                let mut finish = Finish::new(&machine);
                if init() {
                    finish.outcome = ConnectionState::Running;
                }
            })
    }

    /// Run `stop` on a new thread, then force the state to `Stopped`.
    ///
    /// Admitted from `Ready` or `Running`, at most once. A stop requested
    /// while the init transition is still executing waits for it to finish.
    pub fn stop_transition<F>(&self, stop: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let machine = self.clone();
        std::thread::Builder::new()
            .name("walker-stop".into())
            .spawn(move || {
                if !machine.begin(Direction::Stop) {
                    tracing::debug!("stop transition rejected");
                    return;
                }
                let _finish = Finish::new(&machine);
                stop();
            })
    }

    /// Wait for any running transition, then claim `direction` if the current
    /// state and its latch allow it.
    fn begin(&self, direction: Direction) -> bool {
        loop {
            {
                let mut core = lock(&self.core);
                if !core.in_transition {
                    if !direction.admits().contains(core.state) || *core.latch(direction) {
                        return false;
                    }
                    core.in_transition = true;
                    *core.latch(direction) = true;
                    return true;
                }
            }
            std::thread::sleep(self.spin_interval);
        }
    }

    fn finish(&self, state: ConnectionState) {
        let mut core = lock(&self.core);
        core.in_transition = false;
        core.state = state;
    }
}

/// Ends a claimed transition when dropped, unwinding included. The outcome
/// stays `Stopped` unless the transition sets it.
struct Finish<'a> {
    machine: &'a StateMachine,
    outcome: ConnectionState,
}

impl<'a> Finish<'a> {
    fn new(machine: &'a StateMachine) -> Self {
        Self {
            machine,
            outcome: ConnectionState::Stopped,
        }
    }
}

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        self.machine.finish(self.outcome);
    }
}
