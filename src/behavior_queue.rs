//! Deferred behavior invocation queue
//!
//! The engine must not block, yet a tap should hold its press for `tap_ms`.
//! [`QueuedInvoker`] turns every press and release into a [`QueuedBinding`]
//! on a channel; [`run_behavior_queue`] replays them in order against the
//! real keymap and sleeps for each item's `wait` before moving on.
//!
//! A press is only queued when there is still room for its release
//! afterwards. Every accepted press keeps one queue slot reserved until its
//! release goes in, so a release is never dropped and no key is left stuck.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Timer};
use heapless::Vec;

use crate::behavior::BehaviorInvoker;
use crate::config::MAX_ACTIVE_SMART_INTERRUPTS;
use crate::error::Error;
use crate::types::{BehaviorBinding, BindingEvent, Position};

/// One pending press or release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueuedBinding {
    pub binding: BehaviorBinding,
    pub event: BindingEvent,
    /// true for a press, false for a release
    pub pressed: bool,
    /// Delay before the next queued item is processed
    pub wait: Duration,
}

/// [`BehaviorInvoker`] that defers everything to the behavior queue
pub struct QueuedInvoker<'ch, M: RawMutex, const N: usize> {
    sender: Sender<'ch, M, QueuedBinding, N>,
    /// Presses queued without their release yet; each owns a reserved slot
    held: Vec<(BehaviorBinding, Position), MAX_ACTIVE_SMART_INTERRUPTS>,
}

impl<'ch, M: RawMutex, const N: usize> QueuedInvoker<'ch, M, N> {
    pub fn new(sender: Sender<'ch, M, QueuedBinding, N>) -> Self {
        Self {
            sender,
            held: Vec::new(),
        }
    }

    /// Queue a raw item, ignoring the release reservation
    pub fn enqueue(&self, item: QueuedBinding) -> Result<(), Error> {
        self.sender.try_send(item).map_err(|_| Error::QueueFull)
    }

    /// Number of presses still waiting for their release
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Whether `needed` more items fit without eating into reserved slots
    fn has_room(&self, needed: usize) -> bool {
        self.sender.free_capacity() >= self.held.len() + needed
    }

    fn item(
        binding: &BehaviorBinding,
        event: BindingEvent,
        pressed: bool,
        wait: Duration,
    ) -> QueuedBinding {
        QueuedBinding {
            binding: *binding,
            event,
            pressed,
            wait,
        }
    }
}

impl<M: RawMutex, const N: usize> BehaviorInvoker for QueuedInvoker<'_, M, N> {
    fn binding_pressed(&mut self, binding: &BehaviorBinding, event: BindingEvent) {
        if self.held.is_full() || !self.has_room(2) {
            warn!(
                "Dropping press of {} for {}: {}",
                binding.behavior,
                event.position,
                Error::QueueFull
            );
            return;
        }
        let item = Self::item(binding, event, true, Duration::from_ticks(0));
        if let Err(e) = self.enqueue(item) {
            warn!(
                "Dropping press of {} for {}: {}",
                binding.behavior,
                event.position,
                e
            );
            return;
        }
        // Checked is_full above
        let _ = self.held.push((*binding, event.position));
    }

    fn binding_released(&mut self, binding: &BehaviorBinding, event: BindingEvent) {
        let Some(idx) = self
            .held
            .iter()
            .position(|(b, pos)| b == binding && *pos == event.position)
        else {
            debug!(
                "Skipping release of {} for {}: press was not queued",
                binding.behavior,
                event.position
            );
            return;
        };
        self.held.swap_remove(idx);
        let item = Self::item(binding, event, false, Duration::from_ticks(0));
        if let Err(e) = self.enqueue(item) {
            error!("Lost release of {} for {}: {}", binding.behavior, event.position, e);
        }
    }

    fn tap(&mut self, binding: &BehaviorBinding, event: BindingEvent, hold: Duration) {
        if !self.has_room(2) {
            warn!(
                "Dropping tap of {} for {}: {}",
                binding.behavior,
                event.position,
                Error::QueueFull
            );
            return;
        }
        let press = Self::item(binding, event, true, hold);
        let release = Self::item(binding, event, false, Duration::from_ticks(0));
        if self.enqueue(press).and_then(|()| self.enqueue(release)).is_err() {
            error!("Tap of {} for {} split by a full queue", binding.behavior, event.position);
        }
    }
}

/// Take one item off the queue, invoke it and honour its wait
pub async fn process_next<M: RawMutex, I: BehaviorInvoker, const N: usize>(
    receiver: &Receiver<'_, M, QueuedBinding, N>,
    invoker: &mut I,
) -> QueuedBinding {
    let item = receiver.receive().await;
    trace!(
        "Behavior queue: {} {} at {}",
        item.binding.behavior,
        item.pressed,
        item.event.position
    );
    if item.pressed {
        invoker.binding_pressed(&item.binding, item.event);
    } else {
        invoker.binding_released(&item.binding, item.event);
    }
    if item.wait > Duration::from_ticks(0) {
        Timer::after(item.wait).await;
    }
    item
}

/// Drain the behavior queue forever
pub async fn run_behavior_queue<M: RawMutex, I: BehaviorInvoker, const N: usize>(
    receiver: Receiver<'_, M, QueuedBinding, N>,
    mut invoker: I,
) -> ! {
    info!("Behavior queue started");
    loop {
        process_next(&receiver, &mut invoker).await;
    }
}
