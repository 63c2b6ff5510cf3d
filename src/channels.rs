//! Inter-task communication channels
//!
//! This module defines the Embassy channels connecting the matrix scanner,
//! the smart-interrupt runtime and the behavior queue.

use crate::behavior_queue::QueuedBinding;
use crate::config::{BEHAVIOR_QUEUE_SIZE, INPUT_CHANNEL_SIZE};
use crate::runtime::Input;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Key events and binding entry-point calls from the scanner to the runtime
/// Buffer size: 16 (a full matrix roll plus binding calls)
pub static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, Input<'static>, INPUT_CHANNEL_SIZE> =
    Channel::new();

/// Sub-behavior invocations from the runtime to the behavior queue task
/// Buffer size: 32 (several taps with holds in flight)
pub static BEHAVIOR_QUEUE: Channel<CriticalSectionRawMutex, QueuedBinding, BEHAVIOR_QUEUE_SIZE> =
    Channel::new();
