//! Display controller: which module is on screen and whether the user can
//! currently interact with it.
//!
//! The controller is a synchronous state machine. It never sleeps or spawns;
//! every input carries the instant it happened at, and timers are deadline
//! slots that fire when `advance` is called with an instant at or past their
//! deadline. A host loop (see `DisplaySession`) sleeps until
//! `next_deadline()` and feeds time back in.
//!
//! States: active, idle (screensaver, modules auto-cycle), locked (pinned to
//! one module, idle timer suspended) and a short interaction-disabled window
//! overlaying any of them right after a lock toggle.

use crate::error::DisplayError;
use crate::timer::TimerSlot;
use log::{debug, trace, warn};
use rg_kiosk_types::{DisplayState, DisplayTiming, ModuleInfo};
use tokio::time::Instant;

/// Input delivered to the display controller
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    /// Press / tap / touch start. Counts as user activity and starts a long-press.
    Press,
    /// End of a press. Cancels a pending long-press.
    Release,
    /// Pointer movement. Never counts as activity.
    PointerMove,
    /// Go to the previous module (wraps around)
    Previous,
    /// Go to the next module (wraps around)
    Next,
    /// Pin the display to a module by index (clamped to the module list)
    JumpTo(usize),
    /// Pin the display to a module by name (case and whitespace insensitive)
    JumpToName(String),
    /// Viewport size changed
    Resize { width: f64, height: f64 },
}

/// Timers owned by the controller, in the order they fire when due together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    InteractionRelease,
    LongPress,
    IdleTimeout,
    Cycle,
}

const TIMER_ORDER: [TimerKind; 4] = [
    TimerKind::InteractionRelease,
    TimerKind::LongPress,
    TimerKind::IdleTimeout,
    TimerKind::Cycle,
];

/// State machine governing the visible module
pub struct DisplayController {
    modules: Vec<ModuleInfo>,
    has_credential: bool,
    timing: DisplayTiming,
    state: DisplayState,
    idle_timer: TimerSlot,
    cycle_timer: TimerSlot,
    long_press_timer: TimerSlot,
    interaction_timer: TimerSlot,
}

impl DisplayController {
    /// Create a controller showing the first module, with the idle timer armed
    pub fn new(
        modules: Vec<ModuleInfo>,
        has_credential: bool,
        timing: DisplayTiming,
        now: Instant,
    ) -> Result<Self, DisplayError> {
        if modules.is_empty() {
            return Err(DisplayError::NoModules);
        }

        let mut controller = Self {
            modules,
            has_credential,
            timing,
            state: DisplayState::default(),
            idle_timer: TimerSlot::new(),
            cycle_timer: TimerSlot::new(),
            long_press_timer: TimerSlot::new(),
            interaction_timer: TimerSlot::new(),
        };
        controller.arm_idle_timer(now);
        Ok(controller)
    }

    /// Apply the start-up deep link, if any.
    ///
    /// A matching module is selected and the display locked to it. An unknown
    /// name is logged and ignored.
    pub fn with_initial_module(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name {
            self.jump_to_name(name);
        }
        self
    }

    /// Current state
    pub fn snapshot(&self) -> DisplayState {
        self.state
    }

    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    pub fn current_module(&self) -> &ModuleInfo {
        &self.modules[self.state.current_index]
    }

    /// Whether the idle cycling interval is armed
    pub fn is_cycling(&self) -> bool {
        self.cycle_timer.is_armed()
    }

    /// Whether the idle timeout is armed
    pub fn is_idle_timer_armed(&self) -> bool {
        self.idle_timer.is_armed()
    }

    /// Earliest instant at which a timer is due
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            &self.interaction_timer,
            &self.long_press_timer,
            &self.idle_timer,
            &self.cycle_timer,
        ]
        .iter()
        .filter_map(|slot| slot.deadline())
        .min()
    }

    /// Process one input. Returns whether the observable state changed.
    ///
    /// Timers due at or before `now` fire first, so an input arriving exactly
    /// when the interaction-disabled window ends is accepted.
    pub fn handle(&mut self, command: DisplayCommand, now: Instant) -> bool {
        let before = self.state;
        self.advance(now);

        match command {
            DisplayCommand::Press => self.press(now),
            DisplayCommand::Release => self.release(),
            DisplayCommand::PointerMove => trace!("Pointer move ignored for idle tracking"),
            DisplayCommand::Previous => self.navigate(-1, now),
            DisplayCommand::Next => self.navigate(1, now),
            DisplayCommand::JumpTo(index) => self.jump_to(index),
            DisplayCommand::JumpToName(name) => self.jump_to_name(&name),
            DisplayCommand::Resize { width, height } => self.resize(width, height),
        }

        self.state != before
    }

    /// Fire every timer due at or before `now`, in deadline order.
    /// Returns whether the observable state changed.
    pub fn advance(&mut self, now: Instant) -> bool {
        let before = self.state;

        while let Some((kind, deadline)) = self.earliest_due(now) {
            self.slot_mut(kind).cancel();
            self.fire(kind, deadline);
        }

        self.state != before
    }

    /// Cancel every outstanding timer
    pub fn teardown(&mut self) {
        for kind in TIMER_ORDER {
            self.slot_mut(kind).cancel();
        }
        debug!("Display controller torn down, all timers cancelled");
    }

    fn earliest_due(&self, now: Instant) -> Option<(TimerKind, Instant)> {
        let mut earliest: Option<(TimerKind, Instant)> = None;
        for kind in TIMER_ORDER {
            if let Some(deadline) = self.slot(kind).deadline() {
                let is_earlier = earliest.map_or(true, |(_, best)| deadline < best);
                if deadline <= now && is_earlier {
                    earliest = Some((kind, deadline));
                }
            }
        }
        earliest
    }

    fn slot(&self, kind: TimerKind) -> &TimerSlot {
        match kind {
            TimerKind::InteractionRelease => &self.interaction_timer,
            TimerKind::LongPress => &self.long_press_timer,
            TimerKind::IdleTimeout => &self.idle_timer,
            TimerKind::Cycle => &self.cycle_timer,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::InteractionRelease => &mut self.interaction_timer,
            TimerKind::LongPress => &mut self.long_press_timer,
            TimerKind::IdleTimeout => &mut self.idle_timer,
            TimerKind::Cycle => &mut self.cycle_timer,
        }
    }

    fn fire(&mut self, kind: TimerKind, deadline: Instant) {
        match kind {
            TimerKind::InteractionRelease => {
                self.state.is_interaction_disabled = false;
                trace!("Interaction re-enabled");
            }
            TimerKind::LongPress => {
                debug!("Long press detected");
                self.toggle_lock(deadline);
            }
            TimerKind::IdleTimeout => {
                if !self.state.is_locked {
                    debug!("Idle timeout reached, entering screensaver");
                    self.state.is_idle = true;
                    self.start_cycling(deadline);
                }
            }
            TimerKind::Cycle => {
                if self.state.is_idle && !self.state.is_locked && self.modules.len() > 1 {
                    self.state.current_index = self.next_idle_index();
                    debug!(
                        "Screensaver advanced to {}",
                        self.current_module().display_name
                    );
                    self.cycle_timer
                        .arm(deadline + self.timing.cycle_interval());
                }
            }
        }
    }

    fn press(&mut self, now: Instant) {
        if self.state.is_interaction_disabled {
            trace!("Press ignored: interaction disabled");
            return;
        }
        self.record_activity(now);
        self.long_press_timer.arm(now + self.timing.long_press());
    }

    fn release(&mut self) {
        if self.long_press_timer.cancel() {
            trace!("Press released before long-press threshold");
        }
    }

    fn cancel_long_press(&mut self) {
        if self.long_press_timer.cancel() {
            trace!("Pending long press cancelled");
        }
    }

    /// Qualifying user activity: leave the screensaver and restart the idle timer
    fn record_activity(&mut self, now: Instant) {
        self.idle_timer.cancel();
        self.cycle_timer.cancel();
        if self.state.is_idle {
            debug!("Activity detected, leaving screensaver");
        }
        self.state.is_idle = false;
        if !self.state.is_locked {
            self.arm_idle_timer(now);
        }
    }

    fn toggle_lock(&mut self, now: Instant) {
        if self.state.is_interaction_disabled {
            trace!("Lock toggle ignored: interaction disabled");
            return;
        }

        if self.state.is_locked {
            self.state.is_locked = false;
            if !self.state.is_idle {
                self.arm_idle_timer(now);
            }
            debug!("Display unlocked");
        } else {
            self.state.is_locked = true;
            self.state.is_idle = false;
            self.idle_timer.cancel();
            self.cycle_timer.cancel();
            debug!("Display locked to {}", self.current_module().display_name);
        }

        self.state.is_interaction_disabled = true;
        self.interaction_timer
            .arm(now + self.timing.interaction_disable());
    }

    fn navigate(&mut self, delta: isize, now: Instant) {
        if self.state.is_interaction_disabled {
            trace!("Navigation ignored: interaction disabled");
            return;
        }
        // An explicit command wins over a press still being held
        self.cancel_long_press();

        let count = self.modules.len();
        let current = self.state.current_index;
        self.state.current_index = if delta < 0 {
            if current == 0 {
                count - 1
            } else {
                current - 1
            }
        } else if current + 1 >= count {
            0
        } else {
            current + 1
        };

        if self.state.is_locked {
            debug!("Navigation released the lock");
            self.state.is_locked = false;
        }
        self.record_activity(now);
        debug!("Navigated to {}", self.current_module().display_name);
    }

    fn jump_to(&mut self, index: usize) {
        let last = self.modules.len() - 1;
        let target = if index > last {
            warn!(
                "Jump target {} out of range (0..={}), clamping to {}",
                index, last, last
            );
            last
        } else {
            index
        };

        self.cancel_long_press();
        self.state.current_index = target;
        self.state.is_locked = true;
        self.state.is_idle = false;
        self.idle_timer.cancel();
        self.cycle_timer.cancel();
        debug!("Jumped to {} and locked", self.current_module().display_name);
    }

    fn jump_to_name(&mut self, name: &str) {
        match self.modules.iter().position(|m| m.matches_name(name)) {
            Some(index) => self.jump_to(index),
            None => warn!("No module named '{}', staying on current module", name),
        }
    }

    fn resize(&mut self, width: f64, height: f64) {
        match DisplayState::compute_scale(width, height) {
            Some(scale) => self.state.scale = scale,
            None => trace!("Ignoring degenerate viewport {}x{}", width, height),
        }
    }

    fn arm_idle_timer(&mut self, now: Instant) {
        self.idle_timer.arm(now + self.timing.idle_timeout());
    }

    fn start_cycling(&mut self, from: Instant) {
        if self.modules.len() > 1 {
            self.cycle_timer.arm(from + self.timing.cycle_interval());
        }
    }

    fn is_eligible(&self, index: usize) -> bool {
        !self.modules[index].requires_credential || self.has_credential
    }

    /// Next module for the screensaver.
    ///
    /// Probes at most one full lap of candidates; when none is eligible the
    /// display advances to the next index unconditionally.
    fn next_idle_index(&self) -> usize {
        let count = self.modules.len();
        let current = self.state.current_index;

        (1..=count)
            .map(|step| (current + step) % count)
            .find(|&candidate| self.is_eligible(candidate))
            .unwrap_or((current + 1) % count)
    }
}
