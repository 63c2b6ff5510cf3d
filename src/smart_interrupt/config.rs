//! Per-instance smart-interrupt configuration
//!
//! One [`InterruptConfig`] exists per configured behavior instance. It is
//! built and validated once at boot and only read afterwards; active
//! interrupts borrow it.

use embassy_time::Duration;
use heapless::Vec;

use crate::config::{DEFAULT_TAP_MS, DEFAULT_TIMEOUT_MS, MAX_LAYERS, MAX_LISTED_POSITIONS};
use crate::error::ConfigError;
use crate::types::{BehaviorBinding, Layer, Position};

/// How the listed positions and layers are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Membership {
    /// Listed positions/layers never interrupt; everything else does.
    ///
    /// Both ignored and shared lists use this mode.
    #[default]
    ExcludeListed,
    /// Inverse policy: only listed positions/layers interrupt
    IncludeOnly,
}

impl Membership {
    /// Whether activity on an entry with the given list membership interrupts
    pub fn interrupts(self, listed: bool) -> bool {
        match self {
            Membership::ExcludeListed => !listed,
            Membership::IncludeOnly => listed,
        }
    }
}

/// Index of a chained sub-behavior in the merged binding list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindingSlot {
    Start = 0,
    Continue = 1,
    End = 2,
}

/// Set of layers stored as a bitmask, one bit per layer index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerSet(u32);

impl LayerSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, layer: Layer) -> Result<(), ConfigError> {
        if layer >= MAX_LAYERS {
            return Err(ConfigError::LayerOutOfRange(layer));
        }
        self.0 |= 1 << layer;
        Ok(())
    }

    pub fn contains(&self, layer: Layer) -> bool {
        layer < MAX_LAYERS && self.0 & (1 << layer) != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Immutable configuration of one smart-interrupt behavior instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptConfig {
    bindings: [BehaviorBinding; 3],
    positions: Vec<Position, MAX_LISTED_POSITIONS>,
    layers: LayerSet,
    membership: Membership,
    timeout: Duration,
    tap: Duration,
}

impl InterruptConfig {
    /// Start a configuration from the start, continue and end bindings
    pub fn builder<'a>(
        start: BehaviorBinding,
        continue_: BehaviorBinding,
        end: BehaviorBinding,
    ) -> InterruptConfigBuilder<'a> {
        Self::from_bindings([start, continue_, end])
    }

    /// Start a configuration from a merged `[start, continue, end]` list
    pub fn from_bindings<'a>(bindings: [BehaviorBinding; 3]) -> InterruptConfigBuilder<'a> {
        InterruptConfigBuilder {
            bindings,
            positions: &[],
            layers: &[],
            membership: Membership::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            tap_ms: DEFAULT_TAP_MS,
        }
    }

    pub fn binding(&self, slot: BindingSlot) -> &BehaviorBinding {
        &self.bindings[slot as usize]
    }

    pub fn start_behavior(&self) -> &BehaviorBinding {
        self.binding(BindingSlot::Start)
    }

    pub fn continue_behavior(&self) -> &BehaviorBinding {
        self.binding(BindingSlot::Continue)
    }

    pub fn end_behavior(&self) -> &BehaviorBinding {
        self.binding(BindingSlot::End)
    }

    /// Whether activity at `position` ends an interrupt using this config
    pub fn position_interrupts(&self, position: Position) -> bool {
        self.membership.interrupts(self.positions.contains(&position))
    }

    /// Whether activating `layer` ends an interrupt using this config
    pub fn layer_interrupts(&self, layer: Layer) -> bool {
        self.membership.interrupts(self.layers.contains(layer))
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn layers(&self) -> LayerSet {
        self.layers
    }

    pub fn membership(&self) -> Membership {
        self.membership
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tap(&self) -> Duration {
        self.tap
    }
}

/// Collects the declarative configuration surface and validates it
#[derive(Debug, Clone)]
pub struct InterruptConfigBuilder<'a> {
    bindings: [BehaviorBinding; 3],
    positions: &'a [Position],
    layers: &'a [Layer],
    membership: Membership,
    timeout_ms: u64,
    tap_ms: u64,
}

impl<'a> InterruptConfigBuilder<'a> {
    /// Ignored or shared key positions; with the default
    /// [`Membership::ExcludeListed`] these never interrupt
    pub fn positions(mut self, positions: &'a [Position]) -> Self {
        self.positions = positions;
        self
    }

    /// Ignored or shared layers; with the default
    /// [`Membership::ExcludeListed`] activating these never interrupts
    pub fn layers(mut self, layers: &'a [Layer]) -> Self {
        self.layers = layers;
        self
    }

    pub fn membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn tap_ms(mut self, tap_ms: u64) -> Self {
        self.tap_ms = tap_ms;
        self
    }

    pub fn build(self) -> Result<InterruptConfig, ConfigError> {
        if let Some(index) = self.bindings.iter().position(|b| b.behavior.is_empty()) {
            return Err(ConfigError::MissingDeviceBinding { index });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let positions =
            Vec::from_slice(self.positions).map_err(|_| ConfigError::TooManyPositions)?;

        let mut layers = LayerSet::empty();
        for &layer in self.layers {
            layers.insert(layer)?;
        }

        Ok(InterruptConfig {
            bindings: self.bindings,
            positions,
            layers,
            membership: self.membership,
            timeout: Duration::from_millis(self.timeout_ms),
            tap: Duration::from_millis(self.tap_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: BehaviorBinding = BehaviorBinding::new("key_press", 0xE3, 0);
    const CONTINUE: BehaviorBinding = BehaviorBinding::new("key_press", 0x2B, 0);
    const END: BehaviorBinding = BehaviorBinding::bare("none");

    #[test]
    fn test_builder_defaults() {
        let config = InterruptConfig::builder(START, CONTINUE, END).build().unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.tap(), Duration::from_millis(DEFAULT_TAP_MS));
        assert_eq!(config.membership(), Membership::ExcludeListed);
        assert!(config.positions().is_empty());
    }

    #[test]
    fn test_bindings_addressed_by_index() {
        let config = InterruptConfig::from_bindings([START, CONTINUE, END]).build().unwrap();
        assert_eq!(config.binding(BindingSlot::Start), &START);
        assert_eq!(config.continue_behavior(), &CONTINUE);
        assert_eq!(config.end_behavior(), &END);
    }

    #[test]
    fn test_missing_device_binding_rejected() {
        let result = InterruptConfig::builder(START, BehaviorBinding::bare(""), END).build();
        assert_eq!(result, Err(ConfigError::MissingDeviceBinding { index: 1 }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = InterruptConfig::builder(START, CONTINUE, END).timeout_ms(0).build();
        assert_eq!(result, Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_layer_out_of_range_rejected() {
        let result = InterruptConfig::builder(START, CONTINUE, END)
            .layers(&[1, 32])
            .build();
        assert_eq!(result, Err(ConfigError::LayerOutOfRange(32)));
    }

    #[test]
    fn test_too_many_positions_rejected() {
        let positions = [0u32; MAX_LISTED_POSITIONS + 1];
        let result = InterruptConfig::builder(START, CONTINUE, END)
            .positions(&positions)
            .build();
        assert_eq!(result, Err(ConfigError::TooManyPositions));
    }

    #[test]
    fn test_exclude_listed_membership() {
        let config = InterruptConfig::builder(START, CONTINUE, END)
            .positions(&[3, 4])
            .layers(&[2])
            .build()
            .unwrap();
        assert!(!config.position_interrupts(3));
        assert!(config.position_interrupts(7));
        assert!(!config.layer_interrupts(2));
        assert!(config.layer_interrupts(1));
    }

    #[test]
    fn test_include_only_membership() {
        let config = InterruptConfig::builder(START, CONTINUE, END)
            .positions(&[3, 4])
            .layers(&[2])
            .membership(Membership::IncludeOnly)
            .build()
            .unwrap();
        assert!(config.position_interrupts(3));
        assert!(!config.position_interrupts(7));
        assert!(config.layer_interrupts(2));
        assert!(!config.layer_interrupts(1));
    }

    #[test]
    fn test_layer_set_bits() {
        let mut layers = LayerSet::empty();
        layers.insert(0).unwrap();
        layers.insert(5).unwrap();
        assert_eq!(layers.bits(), 0b10_0001);
        assert!(layers.contains(5));
        assert!(!layers.contains(40));
    }
}
