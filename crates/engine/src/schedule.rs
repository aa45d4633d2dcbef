use std::future::Future;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{info, warn};

use common::{Error, Result, ScheduleConfig};

/// A fixed wall-clock time on weekdays in one time zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySchedule {
    time: NaiveTime,
    timezone: Tz,
}

impl DailySchedule {
    pub fn new(cfg: &ScheduleConfig) -> Result<Self> {
        let time = NaiveTime::from_hms_opt(cfg.hour, cfg.minute, 0).ok_or_else(|| {
            Error::Config(format!("invalid schedule time {:02}:{:02}", cfg.hour, cfg.minute))
        })?;
        Ok(Self { time, timezone: cfg.timezone })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The first scheduled instant strictly after `now`, skipping weekends.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.timezone).date_naive();
        (0..14)
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
            .filter_map(|date| self.fire_time(date))
            .find(|fire| *fire > now)
    }

    /// The trading date an instant belongs to in this schedule's zone.
    pub fn trading_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    fn fire_time(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(self.time);
        // A time skipped by a DST jump fires an hour later.
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| self.timezone.from_local_datetime(&(local + Duration::hours(1))).earliest())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Sleep until each scheduled time and run `job` for that trading date,
/// until ctrl-c.
pub async fn run_daily<F, Fut>(schedule: DailySchedule, mut job: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let now = Utc::now();
        let next = schedule
            .next_run_after(now)
            .ok_or_else(|| Error::Config("schedule has no upcoming run".into()))?;
        let wait = (next - now).to_std().unwrap_or_default();
        info!(
            next_run = %next.with_timezone(&schedule.timezone()),
            wait_secs = wait.as_secs(),
            "Waiting for next scheduled run"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                job(schedule.trading_date(next)).await;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for ctrl-c");
                }
                info!("Shutdown signal received. Exiting scheduler.");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(hour: u32, minute: u32) -> DailySchedule {
        DailySchedule::new(&ScheduleConfig::new(hour, minute, chrono_tz::US::Eastern).unwrap()).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn same_day_when_before_fire_time() {
        // Wednesday 2024-05-01 10:00 EDT
        let next = schedule(16, 0).next_run_after(utc(2024, 5, 1, 14, 0)).unwrap();
        assert_eq!(next, utc(2024, 5, 1, 20, 0));
    }

    #[test]
    fn exactly_at_fire_time_moves_to_next_day() {
        let next = schedule(16, 0).next_run_after(utc(2024, 5, 1, 20, 0)).unwrap();
        assert_eq!(next, utc(2024, 5, 2, 20, 0));
    }

    #[test]
    fn friday_evening_skips_to_monday() {
        // Friday 2024-05-03 17:00 EDT
        let next = schedule(16, 0).next_run_after(utc(2024, 5, 3, 21, 0)).unwrap();
        assert_eq!(next, utc(2024, 5, 6, 20, 0));
        assert_eq!(next.with_timezone(&chrono_tz::US::Eastern).weekday(), Weekday::Mon);
    }

    #[test]
    fn follows_daylight_saving_offsets() {
        // January is EST (UTC-5).
        let next = schedule(16, 0).next_run_after(utc(2024, 1, 10, 12, 0)).unwrap();
        assert_eq!(next, utc(2024, 1, 10, 21, 0));
    }

    #[test]
    fn skipped_local_time_fires_an_hour_later() {
        // 02:30 on 2024-03-10 does not exist in US/Eastern.
        let s = schedule(2, 30);
        let fire = s.fire_time(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()).unwrap();
        assert_eq!(fire, utc(2024, 3, 10, 7, 30));
    }

    #[test]
    fn trading_date_uses_schedule_zone() {
        // 01:00 UTC on May 2 is still May 1 in New York.
        assert_eq!(
            schedule(16, 0).trading_date(utc(2024, 5, 2, 1, 0)),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }
}
