//! Common types and data structures used across the smart-interrupt firmware
//!
//! This module contains the key-event, binding and result types shared by the
//! engine, the behavior queue, the runtime and the matrix scanner.

use embassy_time::Instant;

/// Numeric identifier of one physical key in the keyboard matrix
pub type Position = u32;

/// Keymap layer index
pub type Layer = u8;

/// A configured action attached to a key, e.g. `("key_press", A, 0)`
///
/// `behavior` names the behavior device the binding is routed to; the two
/// parameters are passed through untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BehaviorBinding {
    pub behavior: &'static str,
    pub param1: u32,
    pub param2: u32,
}

impl BehaviorBinding {
    pub const fn new(behavior: &'static str, param1: u32, param2: u32) -> Self {
        Self {
            behavior,
            param1,
            param2,
        }
    }

    /// Binding without parameters
    pub const fn bare(behavior: &'static str) -> Self {
        Self::new(behavior, 0, 0)
    }
}

/// Position and time a binding is invoked with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BindingEvent {
    pub position: Position,
    pub timestamp: Instant,
}

impl BindingEvent {
    pub const fn new(position: Position, timestamp: Instant) -> Self {
        Self {
            position,
            timestamp,
        }
    }
}

/// A key went down or up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionStateChanged {
    pub position: Position,
    /// true if pressed, false if released
    pub pressed: bool,
    pub timestamp: Instant,
}

/// A layer was activated or deactivated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerStateChanged {
    pub layer: Layer,
    /// true if the layer became active
    pub active: bool,
    pub timestamp: Instant,
}

/// Events the engine subscribes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Position(PositionStateChanged),
    Layer(LayerStateChanged),
}

impl KeyEvent {
    pub fn timestamp(&self) -> Instant {
        match self {
            KeyEvent::Position(ev) => ev.timestamp,
            KeyEvent::Layer(ev) => ev.timestamp,
        }
    }
}

impl From<PositionStateChanged> for KeyEvent {
    fn from(ev: PositionStateChanged) -> Self {
        KeyEvent::Position(ev)
    }
}

impl From<LayerStateChanged> for KeyEvent {
    fn from(ev: LayerStateChanged) -> Self {
        KeyEvent::Layer(ev)
    }
}

/// Outcome reported back to the dispatch framework
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventResult {
    /// Fully handled (opaque); suppresses default key processing
    Handled,
    /// Not consumed; other listeners still observe the event
    PassThrough,
}

/// Current firmware version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
