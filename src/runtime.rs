//! Smart-interrupt event loop
//!
//! Serialises everything that touches the engine onto one task: inputs from
//! the input channel and expiry of the engine's earliest timer deadline.
//! An input is fully applied, including any end-behavior taps it causes,
//! before the next one is received.

use core::future::pending;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Instant, Timer};
use heapless::Vec;

use crate::behavior::BehaviorInvoker;
use crate::smart_interrupt::{InterruptConfig, SmartInterruptEngine};
use crate::types::{BindingEvent, EventResult, KeyEvent, PositionStateChanged};

/// Anything the runtime applies to the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// Subscribed position or layer event
    Event(KeyEvent),
    /// Key carrying a smart-interrupt binding went down
    BindingPressed {
        config: &'a InterruptConfig,
        event: BindingEvent,
    },
    /// Key carrying a smart-interrupt binding went up
    BindingReleased {
        config: &'a InterruptConfig,
        event: BindingEvent,
    },
}

/// Translate a position change into engine inputs.
///
/// The event is always published to the listener first; if `position` is
/// bound to a smart interrupt, the binding entry point follows.
pub fn route_position<'a>(
    ev: PositionStateChanged,
    binding_at: impl Fn(u32) -> Option<&'a InterruptConfig>,
) -> Vec<Input<'a>, 2> {
    let mut inputs = Vec::new();
    // capacity is exactly two, neither push can fail
    let _ = inputs.push(Input::Event(KeyEvent::Position(ev)));
    if let Some(config) = binding_at(ev.position) {
        let event = BindingEvent::new(ev.position, ev.timestamp);
        let input = if ev.pressed {
            Input::BindingPressed { config, event }
        } else {
            Input::BindingReleased { config, event }
        };
        let _ = inputs.push(input);
    }
    inputs
}

/// Send a position change and its binding call, in order
pub async fn publish_position<'a, M: RawMutex, const Q: usize>(
    sender: &Sender<'_, M, Input<'a>, Q>,
    ev: PositionStateChanged,
    binding_at: impl Fn(u32) -> Option<&'a InterruptConfig>,
) {
    for input in route_position(ev, binding_at) {
        sender.send(input).await;
    }
}

/// Apply one input to the engine
pub fn apply<'a, I: BehaviorInvoker, const N: usize>(
    engine: &mut SmartInterruptEngine<'a, N>,
    input: Input<'a>,
    now: Instant,
    invoker: &mut I,
) -> EventResult {
    match input {
        Input::Event(ev) => engine.on_event(&ev, now, invoker),
        Input::BindingPressed { config, event } => engine.binding_pressed(config, event, invoker),
        Input::BindingReleased { config, event } => {
            engine.binding_released(config, event, now, invoker)
        }
    }
}

/// Wait for the next input or timer deadline, whichever comes first, and
/// apply it
pub async fn step<'a, M: RawMutex, I: BehaviorInvoker, const Q: usize, const N: usize>(
    engine: &mut SmartInterruptEngine<'a, N>,
    inputs: &Receiver<'_, M, Input<'a>, Q>,
    invoker: &mut I,
) {
    let deadline = engine.next_deadline();
    let expiry = async {
        match deadline {
            Some(at) => Timer::at(at).await,
            None => pending::<()>().await,
        }
    };

    match select(inputs.receive(), expiry).await {
        Either::First(input) => {
            apply(engine, input, Instant::now(), invoker);
        }
        Either::Second(()) => {
            let resolved = engine.fire_expired(Instant::now(), invoker);
            trace!("Timer expiry resolved {} smart interrupts", resolved);
        }
    }
}

/// Run the engine forever
pub async fn run<'a, M: RawMutex, I: BehaviorInvoker, const Q: usize, const N: usize>(
    mut engine: SmartInterruptEngine<'a, N>,
    inputs: Receiver<'_, M, Input<'a>, Q>,
    mut invoker: I,
) -> ! {
    info!("Smart interrupt runtime started ({} slots)", N);
    loop {
        step(&mut engine, &inputs, &mut invoker).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BehaviorBinding;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::channel::Channel;
    use embassy_time::Duration;
    use std::vec::Vec as StdVec;

    const START: BehaviorBinding = BehaviorBinding::bare("start");
    const CONTINUE: BehaviorBinding = BehaviorBinding::bare("continue");
    const END: BehaviorBinding = BehaviorBinding::bare("end");

    #[derive(Default)]
    struct Recorder {
        calls: StdVec<(&'static str, bool)>,
    }

    impl BehaviorInvoker for Recorder {
        fn binding_pressed(&mut self, binding: &BehaviorBinding, _: BindingEvent) {
            self.calls.push((binding.behavior, true));
        }

        fn binding_released(&mut self, binding: &BehaviorBinding, _: BindingEvent) {
            self.calls.push((binding.behavior, false));
        }
    }

    fn key(position: u32, pressed: bool) -> PositionStateChanged {
        PositionStateChanged {
            position,
            pressed,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_route_unbound_position() {
        let inputs = route_position(key(2, true), |_| None);
        assert_eq!(inputs.len(), 1);
        assert!(matches!(inputs[0], Input::Event(KeyEvent::Position(_))));
    }

    #[test]
    fn test_route_bound_position_event_first() {
        let config = InterruptConfig::builder(START, CONTINUE, END).build().unwrap();
        let inputs = route_position(key(2, false), |p| (p == 2).then_some(&config));
        assert_eq!(inputs.len(), 2);
        assert!(matches!(inputs[0], Input::Event(_)));
        assert!(matches!(
            inputs[1],
            Input::BindingReleased { event, .. } if event.position == 2
        ));
    }

    #[tokio::test]
    async fn test_step_resolves_on_timeout() {
        let config = InterruptConfig::builder(START, CONTINUE, END)
            .timeout_ms(20)
            .build()
            .unwrap();
        let channel = Channel::<CriticalSectionRawMutex, Input, 4>::new();
        let mut engine: SmartInterruptEngine<'_> = SmartInterruptEngine::default();
        let mut rec = Recorder::default();

        publish_position(&channel.sender(), key(5, true), |_| Some(&config)).await;
        let released = Instant::now();
        publish_position(&channel.sender(), key(5, false), |_| Some(&config)).await;
        for _ in 0..4 {
            step(&mut engine, &channel.receiver(), &mut rec).await;
        }
        assert_eq!(engine.active_count(), 1);

        step(&mut engine, &channel.receiver(), &mut rec).await;

        assert_eq!(engine.active_count(), 0);
        assert!(Instant::now() - released >= Duration::from_millis(20));
        assert_eq!(
            rec.calls,
            [
                ("start", true),
                ("start", false),
                ("continue", true),
                ("continue", false),
                ("end", true),
                ("end", false),
            ]
        );
    }

    #[tokio::test]
    async fn test_step_input_preempts_timer() {
        let config = InterruptConfig::builder(START, CONTINUE, END)
            .timeout_ms(10_000)
            .build()
            .unwrap();
        let channel = Channel::<CriticalSectionRawMutex, Input, 4>::new();
        let mut engine: SmartInterruptEngine<'_> = SmartInterruptEngine::default();
        let mut rec = Recorder::default();

        publish_position(&channel.sender(), key(5, true), |_| Some(&config)).await;
        publish_position(&channel.sender(), key(5, false), |_| Some(&config)).await;
        for _ in 0..4 {
            step(&mut engine, &channel.receiver(), &mut rec).await;
        }

        channel.send(Input::Event(KeyEvent::Position(key(7, true)))).await;
        step(&mut engine, &channel.receiver(), &mut rec).await;

        assert_eq!(engine.active_count(), 0);
        assert_eq!(rec.calls.last(), Some(&("end", false)));
    }
}
