//! Key matrix scanning
//!
//! Scans a row/column matrix with debouncing and turns settled key changes
//! into [`PositionStateChanged`] events for the smart-interrupt runtime.

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use crate::config::{BUTTON_DEBOUNCE_MS, MATRIX_SETTLE_US};
use crate::types::{Position, PositionStateChanged};

// ===================================================================
// Debouncing
// ===================================================================

#[derive(Clone, Copy)]
struct KeyDebounceState {
    current: bool,
    raw: bool,
    last_change: Instant,
}

/// Per-key debouncer; a raw level must hold for the debounce window
/// before it becomes the key's state
pub struct Debouncer<const KEYS: usize> {
    keys: [KeyDebounceState; KEYS],
    window: Duration,
}

impl<const KEYS: usize> Debouncer<KEYS> {
    pub fn new(window: Duration) -> Self {
        Self {
            keys: [KeyDebounceState {
                current: false,
                raw: false,
                last_change: Instant::from_ticks(0),
            }; KEYS],
            window,
        }
    }

    /// Feed a raw sample; returns the new state if the key settled into it
    pub fn update(&mut self, key: usize, raw_state: bool, now: Instant) -> Option<bool> {
        let state = self.keys.get_mut(key)?;

        if raw_state != state.raw {
            state.raw = raw_state;
            state.last_change = now;
        }

        if state.current != state.raw && now.duration_since(state.last_change) >= self.window {
            state.current = state.raw;
            Some(state.current)
        } else {
            None
        }
    }

    pub fn is_pressed(&self, key: usize) -> bool {
        self.keys.get(key).is_some_and(|state| state.current)
    }
}

impl<const KEYS: usize> Default for Debouncer<KEYS> {
    fn default() -> Self {
        Self::new(Duration::from_millis(BUTTON_DEBOUNCE_MS))
    }
}

// ===================================================================
// Matrix Scanning
// ===================================================================

/// Row-driven key matrix; rows are pulled low one at a time and the
/// pulled-up columns read low for pressed keys
pub struct KeyMatrix<R, C, const ROWS: usize, const COLS: usize> {
    rows: [R; ROWS],
    cols: [C; COLS],
}

impl<R: OutputPin, C: InputPin, const ROWS: usize, const COLS: usize> KeyMatrix<R, C, ROWS, COLS> {
    pub fn new(rows: [R; ROWS], cols: [C; COLS]) -> Self {
        Self { rows, cols }
    }

    pub fn key_count(&self) -> usize {
        ROWS * COLS
    }

    /// Read the raw level of every key, indexed by `row * COLS + col`
    pub async fn scan(&mut self) -> [[bool; COLS]; ROWS] {
        let mut states = [[false; COLS]; ROWS];

        for (row, row_states) in self.rows.iter_mut().zip(states.iter_mut()) {
            let _ = row.set_low();
            Timer::after(Duration::from_micros(MATRIX_SETTLE_US)).await;

            for (col, state) in self.cols.iter_mut().zip(row_states.iter_mut()) {
                *state = matches!(col.is_low(), Ok(true));
            }

            let _ = row.set_high();
        }

        states
    }

    /// Scan once and debounce; returns the keys whose state settled
    pub async fn scan_changes<const KEYS: usize>(
        &mut self,
        debouncer: &mut Debouncer<KEYS>,
    ) -> Vec<PositionStateChanged, KEYS> {
        let states = self.scan().await;
        let now = Instant::now();
        let mut changes = Vec::new();

        for (key, pressed) in states.iter().flatten().copied().enumerate() {
            if let Some(pressed) = debouncer.update(key, pressed, now) {
                debug!("Key {} {}", key, if pressed { "pressed" } else { "released" });
                let change = PositionStateChanged {
                    position: key as Position,
                    pressed,
                    timestamp: now,
                };
                if changes.push(change).is_err() {
                    warn!("Key {} outside of debouncer range", key);
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;
    use std::cell::Cell;
    use std::rc::Rc;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_debounce_requires_stable_window() {
        let mut debouncer: Debouncer<4> = Debouncer::new(Duration::from_millis(20));
        assert_eq!(debouncer.update(1, true, at(0)), None);
        assert_eq!(debouncer.update(1, true, at(19)), None);
        assert_eq!(debouncer.update(1, true, at(20)), Some(true));
        assert!(debouncer.is_pressed(1));
        assert_eq!(debouncer.update(1, true, at(40)), None);
    }

    #[test]
    fn test_debounce_ignores_bounce() {
        let mut debouncer: Debouncer<4> = Debouncer::new(Duration::from_millis(20));
        debouncer.update(0, true, at(0));
        debouncer.update(0, false, at(5));
        debouncer.update(0, true, at(10));
        assert_eq!(debouncer.update(0, true, at(25)), None);
        assert_eq!(debouncer.update(0, true, at(30)), Some(true));
    }

    #[test]
    fn test_debounce_release() {
        let mut debouncer: Debouncer<4> = Debouncer::new(Duration::from_millis(20));
        debouncer.update(2, true, at(0));
        debouncer.update(2, true, at(20));
        debouncer.update(2, false, at(100));
        assert_eq!(debouncer.update(2, false, at(120)), Some(false));
        assert!(!debouncer.is_pressed(2));
    }

    #[test]
    fn test_debounce_out_of_range_key() {
        let mut debouncer: Debouncer<2> = Debouncer::new(Duration::from_millis(20));
        assert_eq!(debouncer.update(5, true, at(100)), None);
        assert!(!debouncer.is_pressed(5));
    }

    /// Row pin that records its level in a shared cell
    struct RowPin(Rc<Cell<bool>>);

    impl ErrorType for RowPin {
        type Error = Infallible;
    }

    impl OutputPin for RowPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.set(true);
            Ok(())
        }
    }

    /// Column pin that reads low when the row it is wired to is driven low
    /// and the key between them is held
    struct ColPin {
        row: Rc<Cell<bool>>,
        held: bool,
    }

    impl ErrorType for ColPin {
        type Error = Infallible;
    }

    impl InputPin for ColPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!(self.held && !self.row.get()))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    #[tokio::test]
    async fn test_scan_reads_held_key() {
        let row0 = Rc::new(Cell::new(true));
        let row1 = Rc::new(Cell::new(true));
        // a single-column matrix per row keeps the wiring explicit
        let mut top: KeyMatrix<RowPin, ColPin, 1, 1> = KeyMatrix::new(
            [RowPin(row0.clone())],
            [ColPin {
                row: row0.clone(),
                held: true,
            }],
        );
        let mut bottom: KeyMatrix<RowPin, ColPin, 1, 1> = KeyMatrix::new(
            [RowPin(row1.clone())],
            [ColPin {
                row: row1.clone(),
                held: false,
            }],
        );

        assert_eq!(top.scan().await, [[true]]);
        assert_eq!(bottom.scan().await, [[false]]);
        assert!(row0.get(), "row is released after the scan");
    }

    #[tokio::test]
    async fn test_scan_changes_reports_settled_key() {
        let row = Rc::new(Cell::new(true));
        let mut matrix: KeyMatrix<RowPin, ColPin, 1, 2> = KeyMatrix::new(
            [RowPin(row.clone())],
            [
                ColPin {
                    row: row.clone(),
                    held: false,
                },
                ColPin {
                    row: row.clone(),
                    held: true,
                },
            ],
        );
        let mut debouncer: Debouncer<2> = Debouncer::new(Duration::from_ticks(0));

        let changes = matrix.scan_changes(&mut debouncer).await;

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].position, 1);
        assert!(changes[0].pressed);
        assert_eq!(matrix.key_count(), 2);
    }
}
