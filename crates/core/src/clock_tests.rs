// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Datelike, Weekday};

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn fake_clock_starts_on_a_monday() {
    let clock = FakeClock::new();
    assert_eq!(clock.now().weekday(), Weekday::Mon);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(Duration::minutes(90));
    assert_eq!(clock.now() - start, Duration::minutes(90));
}

#[test]
fn fake_clock_set_overrides() {
    let clock = FakeClock::new();
    let target = clock.now() + Duration::days(3);
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::seconds(30));
    assert_eq!(clock.now(), other.now());
}
