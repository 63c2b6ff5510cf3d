//! Smart Interrupt - key behavior engine for Embassy keyboard firmware
//!
//! A smart interrupt turns one key into a start / continue / end sequence:
//! the first press taps `start`, every press holds `continue`, and once the
//! key has been idle for its timeout, or another key or layer interrupts it,
//! `end` is tapped. The classic use is an alt-tab key that keeps alt held
//! while tab is pressed repeatedly.
//!
//! ## Architecture
//! - **Engine**: bounded pool of per-key interrupt state machines
//!   ([`smart_interrupt`])
//! - **Runtime**: one Embassy task serialising key events, binding calls
//!   and timer expiry ([`runtime`])
//! - **Behavior queue**: in-order sub-behavior invocation with tap holds
//!   ([`behavior_queue`])
//! - **Matrix**: debounced key scanning feeding the runtime ([`matrix`])
//!
//! ## Features
//! - `defmt`: defmt logging and `defmt::Format` derives
//! - `rp2040`: Raspberry Pi Pico firmware binary (`zen_pad`)

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod behavior;
pub mod behavior_queue;
pub mod channels;
pub mod config;
pub mod error;
pub mod matrix;
pub mod runtime;
pub mod smart_interrupt;
pub mod supervisor;
pub mod types;

pub use behavior::BehaviorInvoker;
pub use error::{ConfigError, Error};
pub use smart_interrupt::{
    EngineConfig, InterruptConfig, Membership, ResolvePolicy, SmartInterruptEngine,
};
pub use types::{
    BehaviorBinding, BindingEvent, EventResult, KeyEvent, LayerStateChanged, PositionStateChanged,
};
