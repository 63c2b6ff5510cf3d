//! Build-time configuration for the smart-interrupt firmware
//! RP2040-based key pad running the smart-interrupt behavior

// ===================================================================
// Smart Interrupt Engine
// ===================================================================

pub const MAX_ACTIVE_SMART_INTERRUPTS: usize = 10; // Concurrent interrupt slots
pub const MAX_LISTED_POSITIONS: usize = 32; // Ignored/shared positions per instance
pub const MAX_LAYERS: u8 = 32; // Layers are tracked as a u32 bitmask

pub const DEFAULT_TIMEOUT_MS: u64 = 200; // Idle time before auto-resolve
pub const DEFAULT_TAP_MS: u64 = 0; // Synthetic hold for taps (0 = instantaneous)

// ===================================================================
// Queues and Channels
// ===================================================================

pub const BEHAVIOR_QUEUE_SIZE: usize = 32; // Pending sub-behavior invocations
pub const INPUT_CHANNEL_SIZE: usize = 16; // Pending engine inputs

// ===================================================================
// Key Matrix Layout
// ===================================================================

pub const MATRIX_ROWS: usize = 2;
pub const MATRIX_COLS: usize = 3;
pub const MATRIX_KEYS: usize = MATRIX_ROWS * MATRIX_COLS; // 6 keys (3x2 layout)

// ===================================================================
// Input Scanning
// ===================================================================

pub const BUTTON_DEBOUNCE_MS: u64 = 20; // Button debounce time
pub const BUTTON_SCAN_RATE_HZ: u64 = 1000; // Matrix scan frequency
pub const MATRIX_SETTLE_US: u64 = 10; // Row settling time before reading columns

// ===================================================================
// Supervisor
// ===================================================================

pub const HEARTBEAT_INTERVAL_S: u64 = 10;
pub const STATUS_INTERVAL_S: u32 = 60;
