//! Smart-interrupt behavior engine
//!
//! A key bound to a smart interrupt fires its `start` behavior once, then
//! holds its `continue` behavior for as long as the key is down. Releasing
//! the key does not end the interrupt: it stays open until its timeout runs
//! out or until another key or layer interrupts it, at which point the `end`
//! behavior is tapped.
//!
//! ## Architecture
//! - **Pool**: fixed array of [`ActiveInterrupt`] slots, one per key position
//!   currently inside an interrupt, found by linear scan
//! - **Timers**: one [`ReleaseTimer`] per slot, driven by the caller through
//!   [`SmartInterruptEngine::next_deadline`] and
//!   [`SmartInterruptEngine::fire_expired`]
//! - **Invocation**: all sub-behaviors go through a [`BehaviorInvoker`]
//!
//! All entry points must be called from one execution context, in event
//! order. Every effect of an input is complete when its call returns.

pub mod config;
pub mod timer;

use embassy_time::Instant;

use crate::behavior::BehaviorInvoker;
use crate::config::MAX_ACTIVE_SMART_INTERRUPTS;
use crate::error::Error;
use crate::types::{
    BindingEvent, EventResult, KeyEvent, LayerStateChanged, Position, PositionStateChanged,
};

pub use config::{BindingSlot, InterruptConfig, InterruptConfigBuilder, LayerSet, Membership};
pub use timer::{CancelResult, ReleaseTimer, TimerState};

/// How many interrupted slots one external event resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResolvePolicy {
    /// Stop after the first slot the event interrupts
    #[default]
    FirstMatch,
    /// Resolve every slot the event interrupts
    All,
}

/// Engine-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    pub resolve_policy: ResolvePolicy,
}

/// Handle to one pool slot, valid for the engine that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(usize);

/// One interrupt state machine
#[derive(Debug, Clone, Copy)]
pub struct ActiveInterrupt<'a> {
    is_active: bool,
    is_pressed: bool,
    first_press: bool,
    position: Position,
    config: Option<&'a InterruptConfig>,
    release_at: Instant,
    timer: ReleaseTimer,
}

impl<'a> ActiveInterrupt<'a> {
    const EMPTY: Self = Self {
        is_active: false,
        is_pressed: false,
        first_press: false,
        position: 0,
        config: None,
        release_at: Instant::from_ticks(0),
        timer: ReleaseTimer::new(),
    };

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    pub fn first_press(&self) -> bool {
        self.first_press
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn config(&self) -> Option<&'a InterruptConfig> {
        self.config
    }

    /// When the slot resolves if nothing else happens
    pub fn release_at(&self) -> Instant {
        self.release_at
    }

    pub fn timer(&self) -> &ReleaseTimer {
        &self.timer
    }

    fn activate(&mut self, position: Position, config: &'a InterruptConfig) {
        self.position = position;
        self.config = Some(config);
        self.is_active = true;
        self.is_pressed = false;
        self.first_press = true;
        self.timer.reset();
    }

    fn stop_timer(&mut self) -> CancelResult {
        let result = self.timer.cancel();
        if result == CancelResult::InProgress {
            // too late to cancel, the firing step sees the suppression flag
            debug!("{} smart interrupt timer already firing", self.position);
        }
        result
    }

    /// Restart the idle countdown from `basis`
    fn reset_timer(&mut self, basis: Instant, now: Instant) {
        let Some(config) = self.config else {
            return;
        };
        self.release_at = basis + config.timeout();
        if self.release_at > now {
            self.timer.schedule(self.release_at);
            trace!("{} smart interrupt timer reset", self.position);
        }
    }

    /// End the interrupt: close an open continue-press, then tap `end`
    fn resolve<I: BehaviorInvoker>(&mut self, now: Instant, invoker: &mut I) {
        self.is_active = false;
        self.stop_timer();
        let Some(config) = self.config else {
            return;
        };
        let event = BindingEvent::new(self.position, now);
        if self.is_pressed {
            invoker.binding_released(config.continue_behavior(), event);
        }
        invoker.tap(config.end_behavior(), event, config.tap());
    }
}

/// Bounded pool of smart-interrupt state machines
pub struct SmartInterruptEngine<'a, const N: usize = MAX_ACTIVE_SMART_INTERRUPTS> {
    slots: [ActiveInterrupt<'a>; N],
    config: EngineConfig,
}

impl<'a, const N: usize> SmartInterruptEngine<'a, N> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            slots: [ActiveInterrupt::EMPTY; N],
            config,
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active).count()
    }

    pub fn resolve_policy(&self) -> ResolvePolicy {
        self.config.resolve_policy
    }

    /// Active slot bound to `position`
    pub fn slot_id(&self, position: Position) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|slot| slot.is_active && slot.position == position)
            .map(SlotId)
    }

    pub fn slot(&self, id: SlotId) -> Option<&ActiveInterrupt<'a>> {
        self.slots.get(id.0)
    }

    /// Active interrupt bound to `position`
    pub fn find(&self, position: Position) -> Option<&ActiveInterrupt<'a>> {
        self.slot_id(position).and_then(|id| self.slot(id))
    }

    fn allocate(&mut self, position: Position, config: &'a InterruptConfig) -> Result<SlotId, Error> {
        let index = self
            .slots
            .iter()
            .position(|slot| !slot.is_active)
            .ok_or(Error::PoolExhausted)?;
        self.slots[index].activate(position, config);
        Ok(SlotId(index))
    }

    /// The bound key went down
    pub fn binding_pressed<I: BehaviorInvoker>(
        &mut self,
        config: &'a InterruptConfig,
        event: BindingEvent,
        invoker: &mut I,
    ) -> EventResult {
        let id = match self.slot_id(event.position) {
            Some(id) => id,
            None => match self.allocate(event.position, config) {
                Ok(id) => {
                    debug!("{} created new smart interrupt", event.position);
                    id
                }
                Err(e) => {
                    error!("Unable to create new smart interrupt: {}", e);
                    return EventResult::Handled;
                }
            },
        };

        debug!("{} smart interrupt pressed", event.position);
        let slot = &mut self.slots[id.0];
        slot.stop_timer();
        slot.is_pressed = true;
        if slot.first_press {
            invoker.tap(config.start_behavior(), event, config.tap());
            slot.first_press = false;
        }
        invoker.binding_pressed(config.continue_behavior(), event);
        EventResult::Handled
    }

    /// The bound key went up; re-arms the idle countdown from `now`
    pub fn binding_released<I: BehaviorInvoker>(
        &mut self,
        config: &'a InterruptConfig,
        event: BindingEvent,
        now: Instant,
        invoker: &mut I,
    ) -> EventResult {
        debug!("{} smart interrupt keybind released", event.position);
        let Some(id) = self.slot_id(event.position) else {
            return EventResult::Handled;
        };
        let slot = &mut self.slots[id.0];
        slot.is_pressed = false;
        invoker.binding_released(config.continue_behavior(), event);
        slot.reset_timer(now, now);
        EventResult::Handled
    }

    /// Earliest pending timer deadline across all slots
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().filter_map(|slot| slot.timer.deadline()).min()
    }

    /// First half of a timer fire: claims the slot's timer if it is due
    pub fn begin_timer(&mut self, id: SlotId, now: Instant) -> bool {
        self.slots
            .get_mut(id.0)
            .is_some_and(|slot| slot.timer.begin_fire(now))
    }

    /// Second half of a timer fire.
    ///
    /// Returns true if the slot was resolved. A fire that was cancelled,
    /// re-armed, or hits an inactive or pressed slot does nothing.
    pub fn complete_timer<I: BehaviorInvoker>(
        &mut self,
        id: SlotId,
        now: Instant,
        invoker: &mut I,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return false;
        };
        if !slot.timer.complete_fire() || !slot.is_active || slot.is_pressed {
            return false;
        }
        let Some(config) = slot.config else {
            return false;
        };
        debug!("Smart interrupt deactivated due to timer");
        slot.is_active = false;
        let event = BindingEvent::new(slot.position, now);
        invoker.tap(config.end_behavior(), event, config.tap());
        true
    }

    /// Fire every timer whose deadline is at or before `now`.
    ///
    /// Returns how many slots were resolved.
    pub fn fire_expired<I: BehaviorInvoker>(&mut self, now: Instant, invoker: &mut I) -> usize {
        let mut resolved = 0;
        for index in 0..N {
            let id = SlotId(index);
            if self.begin_timer(id, now) && self.complete_timer(id, now, invoker) {
                resolved += 1;
            }
        }
        resolved
    }

    /// Listener for position state changes; never consumes the event
    pub fn on_position_state_changed<I: BehaviorInvoker>(
        &mut self,
        ev: &PositionStateChanged,
        now: Instant,
        invoker: &mut I,
    ) -> EventResult {
        let policy = self.config.resolve_policy;
        for slot in self.slots.iter_mut() {
            if !slot.is_active || slot.position == ev.position {
                continue;
            }
            let Some(config) = slot.config else {
                continue;
            };
            if config.position_interrupts(ev.position) {
                debug!(
                    "Smart interrupt interrupted, ending at {} {}",
                    slot.position,
                    ev.position
                );
                slot.resolve(now, invoker);
                if policy == ResolvePolicy::FirstMatch {
                    return EventResult::PassThrough;
                }
                continue;
            }
            if ev.pressed {
                slot.stop_timer();
            } else {
                slot.reset_timer(ev.timestamp, now);
            }
        }
        EventResult::PassThrough
    }

    /// Listener for layer state changes; only activations interrupt
    pub fn on_layer_state_changed<I: BehaviorInvoker>(
        &mut self,
        ev: &LayerStateChanged,
        now: Instant,
        invoker: &mut I,
    ) -> EventResult {
        if !ev.active {
            return EventResult::PassThrough;
        }
        let policy = self.config.resolve_policy;
        for slot in self.slots.iter_mut() {
            if !slot.is_active {
                continue;
            }
            let Some(config) = slot.config else {
                continue;
            };
            if config.layer_interrupts(ev.layer) {
                debug!(
                    "Smart interrupt layer changed, ending at {} {}",
                    slot.position,
                    ev.layer
                );
                slot.resolve(now, invoker);
                if policy == ResolvePolicy::FirstMatch {
                    return EventResult::PassThrough;
                }
            }
        }
        EventResult::PassThrough
    }

    /// Route a subscribed event to its listener
    pub fn on_event<I: BehaviorInvoker>(
        &mut self,
        event: &KeyEvent,
        now: Instant,
        invoker: &mut I,
    ) -> EventResult {
        match event {
            KeyEvent::Position(ev) => self.on_position_state_changed(ev, now, invoker),
            KeyEvent::Layer(ev) => self.on_layer_state_changed(ev, now, invoker),
        }
    }
}

impl<const N: usize> Default for SmartInterruptEngine<'_, N> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
