//! Scheduling trigger: run now, then once a day at a fixed local time.

use crate::batch::BatchCoordinator;
use crate::output::RunOutput;
use chrono::{Local, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tracing::{error, info};

/// First occurrence of `at` strictly after `now`.
pub fn next_daily_run(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Run one batch, logging a failed run instead of returning it.
pub async fn run_logged(coordinator: &mut BatchCoordinator) -> Option<RunOutput> {
    match coordinator.run_once().await {
        Ok(output) => Some(output),
        Err(e) => {
            error!("Run failed: {}", e);
            None
        }
    }
}

/// Run immediately, then every day at `at` local time. Never returns.
///
/// Runs never overlap: the next wait starts only after the current run has
/// finished, and a run that overshoots a trigger time moves to the next day.
pub async fn run_daily(mut coordinator: BatchCoordinator, at: NaiveTime) {
    info!("Starting price-list monitor; daily run at {}", at.format("%H:%M"));
    run_logged(&mut coordinator).await;

    loop {
        let now = Local::now().naive_local();
        let next = next_daily_run(now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!("Next run at {} (in {}s)", next.format("%Y-%m-%d %H:%M"), wait.as_secs());

        tokio::time::sleep(wait).await;
        info!("Running scheduled task...");
        run_logged(&mut coordinator).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_time(at(h, m))
    }

    #[test]
    fn before_trigger_runs_today() {
        assert_eq!(next_daily_run(dt(15, 9, 30), at(10, 0)), dt(15, 10, 0));
    }

    #[test]
    fn after_trigger_runs_tomorrow() {
        assert_eq!(next_daily_run(dt(15, 10, 1), at(10, 0)), dt(16, 10, 0));
    }

    #[test]
    fn exactly_at_trigger_runs_tomorrow() {
        assert_eq!(next_daily_run(dt(15, 10, 0), at(10, 0)), dt(16, 10, 0));
    }

    #[test]
    fn crosses_month_end() {
        assert_eq!(
            next_daily_run(dt(31, 23, 0), at(10, 0)),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_time(at(10, 0))
        );
    }
}
