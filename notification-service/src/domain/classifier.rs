use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use shared::types::Journey;
use utoipa::ToSchema;

use crate::error::ValidationError;

const SECONDS_PER_HOUR: f64 = 3600.0;
const FULL_DAY_HOURS: f64 = 24.0;
const MORNING_START_HOUR: u32 = 6;
const AFTERNOON_START_HOUR: u32 = 12;
const NIGHT_START_HOUR: u32 = 18;

/// Derived shift fields. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Classification {
    pub duration_hours: f64,
    pub journey: Journey,
}

/// A validated shift: local start for banding, elapsed time for duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftInterval {
    local_start: NaiveDateTime,
    elapsed: TimeDelta,
}

impl ShiftInterval {
    /// Wall-clock interval with no timezone attached, so elapsed time is `end - start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvertedInterval { start, end });
        }
        Ok(Self {
            local_start: start,
            elapsed: end - start,
        })
    }

    /// Validates on the UTC instants. Only the start hour is read in `timezone`.
    pub fn from_utc(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: Tz,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvertedInterval {
                start: start.naive_utc(),
                end: end.naive_utc(),
            });
        }
        Ok(Self {
            local_start: shared::time::localize(start, timezone),
            elapsed: end - start,
        })
    }

    pub fn local_start(&self) -> NaiveDateTime {
        self.local_start
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.elapsed
    }

    pub fn classify(&self) -> Classification {
        classify_elapsed(self.local_start.hour(), self.elapsed)
    }
}

/// Duration and journey of a shift given its wall-clock start and end.
///
/// Inverted or empty intervals yield `duration_hours == 0.0`; use
/// [`ShiftInterval::new`] to reject them instead.
pub fn classify(start: NaiveDateTime, end: NaiveDateTime) -> Classification {
    classify_elapsed(start.hour(), end - start)
}

/// Same as [`classify`] for UTC timestamps. Duration is real elapsed time;
/// the band comes from the start hour in `timezone`, so DST shifts never
/// stretch or shrink a shift.
pub fn classify_utc(start: DateTime<Utc>, end: DateTime<Utc>, timezone: Tz) -> Classification {
    classify_elapsed(
        shared::time::localize(start, timezone).hour(),
        end - start,
    )
}

fn classify_elapsed(start_hour: u32, elapsed: TimeDelta) -> Classification {
    let duration_hours = hours_of(elapsed);
    Classification {
        duration_hours,
        journey: journey_for(start_hour, duration_hours),
    }
}

/// Hours between `start` and `end`, rounded to two decimals, never negative.
pub fn duration_hours(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    hours_of(end - start)
}

fn hours_of(elapsed: TimeDelta) -> f64 {
    let seconds = elapsed.num_seconds();
    if seconds <= 0 {
        return 0.0;
    }
    let hours = seconds as f64 / SECONDS_PER_HOUR;
    (hours * 100.0).round() / 100.0
}

/// Band rule: a 24 hour shift wins, otherwise the start hour picks the band.
/// Bands are lower-inclusive: 06 → Morning, 12 → Afternoon, 18 → Night.
pub fn journey_for(start_hour: u32, duration_hours: f64) -> Journey {
    if duration_hours == FULL_DAY_HOURS {
        return Journey::FullDay;
    }
    match start_hour {
        h if (MORNING_START_HOUR..AFTERNOON_START_HOUR).contains(&h) => Journey::Morning,
        h if (AFTERNOON_START_HOUR..NIGHT_START_HOUR).contains(&h) => Journey::Afternoon,
        _ => Journey::Night,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use chrono_tz::America::New_York;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn day_shift_is_eight_hour_morning() {
        let output = classify(at(9, 0), at(17, 0));
        assert_eq!(output.duration_hours, 8.0);
        assert_eq!(output.journey, Journey::Morning);
    }

    #[test]
    fn evening_start_twelve_hours_is_night() {
        let start = at(19, 0);
        let output = classify(start, start + Duration::hours(12));
        assert_eq!(output.duration_hours, 12.0);
        assert_eq!(output.journey, Journey::Night);
    }

    #[test]
    fn full_day_wins_over_every_band() {
        for hour in 0..24 {
            let start = at(hour, 0);
            let output = classify(start, start + Duration::hours(24));
            assert_eq!(output.duration_hours, 24.0);
            assert_eq!(output.journey, Journey::FullDay, "start hour {hour}");
        }
    }

    #[test]
    fn every_hour_maps_to_its_band() {
        for hour in 0..24 {
            let start = at(hour, 30);
            let expected = match hour {
                6..=11 => Journey::Morning,
                12..=17 => Journey::Afternoon,
                _ => Journey::Night,
            };
            let output = classify(start, start + Duration::hours(6));
            assert_eq!(output.journey, expected, "start hour {hour}");
        }
    }

    #[test]
    fn boundaries_belong_to_band_starting_there() {
        assert_eq!(classify(at(6, 0), at(7, 0)).journey, Journey::Morning);
        assert_eq!(classify(at(12, 0), at(13, 0)).journey, Journey::Afternoon);
        assert_eq!(classify(at(18, 0), at(19, 0)).journey, Journey::Night);
        assert_eq!(classify(at(5, 59), at(7, 0)).journey, Journey::Night);
        assert_eq!(classify(at(0, 0), at(6, 0)).journey, Journey::Night);
    }

    #[test]
    fn duration_rounds_to_two_decimals() {
        // 7h 20m = 7.333.. hours
        assert_eq!(classify(at(8, 0), at(15, 20)).duration_hours, 7.33);
        // 10m = 0.1666.. hours
        assert_eq!(classify(at(8, 0), at(8, 10)).duration_hours, 0.17);
    }

    #[test]
    fn duration_matches_seconds_over_3600_and_is_never_negative() {
        let start = at(0, 0);
        for minutes in (1..=48 * 60).step_by(7) {
            let end = start + Duration::minutes(minutes);
            let output = classify(start, end);
            let expected = ((minutes as f64 * 60.0 / 3600.0) * 100.0).round() / 100.0;
            assert_eq!(output.duration_hours, expected);
            assert!(output.duration_hours >= 0.0);
        }
    }

    #[test]
    fn inverted_interval_classifies_to_zero_hours() {
        let output = classify(at(17, 0), at(9, 0));
        assert_eq!(output.duration_hours, 0.0);
    }

    #[test]
    fn interval_rejects_end_not_after_start() {
        assert!(matches!(
            ShiftInterval::new(at(9, 0), at(9, 0)),
            Err(ValidationError::InvertedInterval { .. })
        ));
        assert!(ShiftInterval::new(at(17, 0), at(9, 0)).is_err());

        let interval = ShiftInterval::new(at(9, 0), at(17, 0)).unwrap();
        assert_eq!(interval.classify().duration_hours, 8.0);
    }

    #[test]
    fn utc_timestamps_are_localized_before_banding() {
        // 12:00 UTC is 07:00 in Bogota (UTC-5)
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let end = start + Duration::hours(8);

        assert_eq!(classify_utc(start, end, Tz::UTC).journey, Journey::Afternoon);
        assert_eq!(
            classify_utc(start, end, chrono_tz::America::Bogota).journey,
            Journey::Morning
        );

        let interval = ShiftInterval::from_utc(start, end, chrono_tz::America::Bogota).unwrap();
        assert_eq!(interval.local_start().hour(), 7);
        assert_eq!(interval.elapsed(), Duration::hours(8));
    }

    #[test]
    fn full_day_across_spring_forward_is_still_24_hours() {
        // New York clocks jump 02:00 -> 03:00 on 2026-03-08
        let start = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let end = start + Duration::hours(24);

        let output = classify_utc(start, end, New_York);
        assert_eq!(output.duration_hours, 24.0);
        assert_eq!(output.journey, Journey::FullDay);

        let interval = ShiftInterval::from_utc(start, end, New_York).unwrap();
        assert_eq!(interval.classify(), output);
    }

    #[test]
    fn full_day_across_fall_back_is_still_24_hours() {
        // New York clocks repeat 01:00-02:00 on 2026-11-01
        let start = Utc.with_ymd_and_hms(2026, 10, 31, 12, 0, 0).unwrap();
        let end = start + Duration::hours(24);

        let output = classify_utc(start, end, New_York);
        assert_eq!(output.duration_hours, 24.0);
        assert_eq!(output.journey, Journey::FullDay);
        assert_eq!(
            ShiftInterval::from_utc(start, end, New_York).unwrap().classify(),
            output
        );
    }

    #[test]
    fn short_shift_inside_repeated_hour_is_accepted() {
        // 05:30Z is 01:30 EDT, 06:10Z is 01:10 EST: locally the end reads earlier
        let start = Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 11, 1, 6, 10, 0).unwrap();

        let interval = ShiftInterval::from_utc(start, end, New_York).unwrap();
        let output = interval.classify();
        assert_eq!(output.duration_hours, 0.67);
        assert_eq!(output.journey, Journey::Night);
        assert_eq!(classify_utc(start, end, New_York), output);
    }

    #[test]
    fn utc_duration_matches_elapsed_seconds_in_dst_zone() {
        let base = Utc.with_ymd_and_hms(2026, 3, 7, 20, 0, 0).unwrap();
        for minutes in (1..=36 * 60).step_by(11) {
            let end = base + Duration::minutes(minutes);
            let expected = ((minutes as f64 * 60.0 / 3600.0) * 100.0).round() / 100.0;
            assert_eq!(classify_utc(base, end, New_York).duration_hours, expected);
        }
    }

    #[test]
    fn utc_interval_rejects_end_not_after_start() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert!(matches!(
            ShiftInterval::from_utc(start, start - Duration::minutes(1), New_York),
            Err(ValidationError::InvertedInterval { .. })
        ));
    }
}
