//! Tests for the injectable clock implementations.

use chrono::{Duration, TimeZone, Utc};

use agent_keepintouch::clock::{Clock, FixedClock, ManualClock, SystemClock};

fn instant() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

#[test]
fn system_clock_tracks_real_time() {
    let before = Utc::now();
    let now = SystemClock.now();
    let after = Utc::now();

    assert!(before <= now && now <= after);
}

#[test]
fn fixed_clock_never_moves() {
    let clock = FixedClock::new(instant());

    assert_eq!(clock.now(), instant());
    assert_eq!(clock.now(), instant());
}

#[test]
fn manual_clock_advances_by_seconds() {
    let clock = ManualClock::new(instant());

    clock.advance_secs(90);
    assert_eq!(clock.now(), instant() + Duration::seconds(90));

    clock.advance_secs(10);
    assert_eq!(clock.now(), instant() + Duration::seconds(100));
}

#[test]
fn manual_clock_jumps_to_an_absolute_instant() {
    let clock = ManualClock::new(instant());
    let later = instant() + Duration::hours(6);

    clock.set(later);
    assert_eq!(clock.now(), later);

    // Moving backwards is allowed; skew handling is the reader's job.
    clock.set(instant());
    assert_eq!(clock.now(), instant());
}
