// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    assert!(b >= a);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.epoch_ms();
    clock.advance(Duration::from_secs(90));
    assert_eq!(clock.epoch_ms(), start + 90_000);
}

#[test]
fn fake_clock_set_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(5);
    assert_eq!(clock.epoch_ms(), 5);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), other.epoch_ms());
}
