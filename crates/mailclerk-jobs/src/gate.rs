//! Schedule gate: pure pre-condition checks over "now".
//!
//! Checks run in a fixed order (day of month, day of week, time of day) and
//! the first failing check wins. An empty allow-list means "any day". No
//! side effects: the gate sees only the clock value it is given.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};
use mailclerk_core::{ClerkError, Outcome};

/// Fixed-offset wall-clock zone plus the label diagnostics print.
#[derive(Debug, Clone)]
pub struct Zone {
    pub offset: FixedOffset,
    pub label: String,
}

impl Zone {
    pub fn utc() -> Self {
        Self {
            offset: FixedOffset::east_opt(0).unwrap(),
            label: "UTC".to_string(),
        }
    }

    /// Parse an offset like "+01:00" or "-05:30" with its display label.
    pub fn parse(offset: &str, label: &str) -> Outcome<Self> {
        let invalid = || ClerkError::config(format!("invalid timezone offset '{offset}'"));
        let (sign, rest) = match offset.split_at_checked(1) {
            Some(("+", rest)) => (1i32, rest),
            Some(("-", rest)) => (-1i32, rest),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        let seconds = sign * (hours * 3600 + minutes * 60);
        Ok(Self {
            offset: FixedOffset::east_opt(seconds).ok_or_else(invalid)?,
            label: label.to_string(),
        })
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::utc()
    }
}

/// Configuration deciding whether a run proceeds at all.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGate {
    pub days_of_month: Vec<u32>,
    pub days_of_week: Vec<Weekday>,
    pub run_after: Option<NaiveTime>,
    pub zone: Zone,
}

impl ScheduleGate {
    /// Allow-list of days of the month, evaluated in UTC.
    pub fn on_days_of_month(days: Vec<u32>) -> Self {
        Self {
            days_of_month: days,
            ..Self::default()
        }
    }

    /// Allow-list of weekdays with a minimum local time of day.
    pub fn on_weekdays_after(days: Vec<Weekday>, run_after: NaiveTime, zone: Zone) -> Self {
        Self {
            days_of_month: Vec::new(),
            days_of_week: days,
            run_after: Some(run_after),
            zone,
        }
    }

    /// Decide whether this run should proceed; passes `now` through on
    /// success so the pipeline keeps a single validated clock value.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Outcome<DateTime<Utc>> {
        let local = now.with_timezone(&self.zone.offset);

        if !self.days_of_month.is_empty() && !self.days_of_month.contains(&local.day()) {
            return Err(ClerkError::NoNeedToRunOnThisDayOfMonth {
                day: local.day(),
                days: self.days_of_month.clone(),
            });
        }
        if !self.days_of_week.is_empty() && !self.days_of_week.contains(&local.weekday()) {
            return Err(ClerkError::NoNeedToRunOnThisDayOfWeek {
                day: local.weekday(),
                days: self.days_of_week.clone(),
            });
        }
        if let Some(run_after) = self.run_after {
            let time = local.time();
            if time < run_after {
                return Err(ClerkError::NoNeedToRunAtThisTime {
                    now: time,
                    run_after,
                    zone: self.zone.label.clone(),
                });
            }
        }
        Ok(now)
    }
}

/// Parse a full weekday name from configuration ("Thursday").
pub fn weekday_from_name(name: &str) -> Outcome<Weekday> {
    name.parse()
        .map_err(|_| ClerkError::config(format!("invalid weekday '{name}'")))
}

/// Parse a minimum time of day from configuration ("HH:MM").
pub fn time_from_config(value: &str) -> Outcome<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ClerkError::config(format!("invalid time of day '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn passes_iff_day_of_month_is_allowed() {
        let gate = ScheduleGate::on_days_of_month(vec![2, 11, 12, 31]);
        assert!(gate.evaluate(at(2018, 6, 2, 0, 0)).is_ok());
        assert!(gate.evaluate(at(2018, 6, 11, 0, 0)).is_ok());

        // One day outside the set always rejects with the same reason shape.
        let err = gate.evaluate(at(2018, 6, 1, 0, 0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No need to run - day of month is 1, only running on day 2, 11, 12, 31 of each month"
        );
        assert!(matches!(
            gate.evaluate(at(2018, 6, 13, 0, 0)).unwrap_err(),
            ClerkError::NoNeedToRunOnThisDayOfMonth { day: 13, .. }
        ));
    }

    #[test]
    fn empty_allow_lists_pass_any_day() {
        let gate = ScheduleGate::default();
        assert!(gate.evaluate(at(2018, 6, 1, 0, 0)).is_ok());
    }

    #[test]
    fn weekday_check_rejects_with_full_names() {
        let gate = ScheduleGate::on_weekdays_after(
            vec![Weekday::Thu, Weekday::Fri],
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            Zone::utc(),
        );
        // 2018-06-04 was a Monday
        let err = gate.evaluate(at(2018, 6, 4, 12, 0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No need to run - today is Monday, only running on Thursday, Friday"
        );
        // 2018-06-07 was a Thursday
        assert!(gate.evaluate(at(2018, 6, 7, 12, 0)).is_ok());
    }

    #[test]
    fn time_check_uses_the_configured_zone() {
        let zone = Zone::parse("+01:00", "CET").unwrap();
        let gate = ScheduleGate::on_weekdays_after(
            vec![Weekday::Thu],
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            zone,
        );
        // 08:30 UTC is 09:30 CET, too early.
        let err = gate.evaluate(at(2018, 6, 7, 8, 30)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No need to run - time is 09:30 in CET, only running after 10:00 in CET"
        );
        // 09:00 UTC is 10:00 CET, exactly on the cutoff.
        assert!(gate.evaluate(at(2018, 6, 7, 9, 0)).is_ok());
    }

    #[test]
    fn day_check_wins_over_time_check() {
        let gate = ScheduleGate::on_weekdays_after(
            vec![Weekday::Thu],
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            Zone::utc(),
        );
        // Wrong day AND too early: the day rejection is reported.
        let err = gate.evaluate(at(2018, 6, 4, 5, 0)).unwrap_err();
        assert!(matches!(err, ClerkError::NoNeedToRunOnThisDayOfWeek { .. }));
    }

    #[test]
    fn parses_config_values() {
        assert_eq!(weekday_from_name("Thursday").unwrap(), Weekday::Thu);
        assert!(weekday_from_name("Someday").is_err());
        assert_eq!(
            time_from_config("10:00").unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert!(time_from_config("25:99").is_err());
        assert!(Zone::parse("+1:00", "X").is_ok());
        assert!(Zone::parse("0100", "X").is_err());
    }
}
