//! Sub-behavior invocation
//!
//! The engine never talks to the keymap directly. Every start, continue and
//! end action goes through a [`BehaviorInvoker`], which is either the keymap
//! itself or the [`crate::behavior_queue`] in front of it.

use embassy_time::Duration;

use crate::types::{BehaviorBinding, BindingEvent};

/// Presses and releases configured bindings on behalf of the engine
pub trait BehaviorInvoker {
    /// Press `binding` as if its key went down at `event.position`
    fn binding_pressed(&mut self, binding: &BehaviorBinding, event: BindingEvent);

    /// Release `binding` as if its key went up at `event.position`
    fn binding_released(&mut self, binding: &BehaviorBinding, event: BindingEvent);

    /// Press immediately followed by release.
    ///
    /// `hold` is how long the press should last. Invokers that cannot wait
    /// (the default) release right away.
    fn tap(&mut self, binding: &BehaviorBinding, event: BindingEvent, _hold: Duration) {
        self.binding_pressed(binding, event);
        self.binding_released(binding, event);
    }
}

impl<T: BehaviorInvoker + ?Sized> BehaviorInvoker for &mut T {
    fn binding_pressed(&mut self, binding: &BehaviorBinding, event: BindingEvent) {
        (**self).binding_pressed(binding, event)
    }

    fn binding_released(&mut self, binding: &BehaviorBinding, event: BindingEvent) {
        (**self).binding_released(binding, event)
    }

    fn tap(&mut self, binding: &BehaviorBinding, event: BindingEvent, hold: Duration) {
        (**self).tap(binding, event, hold)
    }
}
