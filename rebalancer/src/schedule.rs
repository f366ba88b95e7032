//! Scheduling shell: wait for the open, rebalance on a fixed interval and
//! flatten the book shortly before the close.

use std::time::Duration;

use log::{error, info};
use longshort_broker::{Clock, Gateway};

use crate::cycle::Rebalancer;
use crate::error::{self, Error, Result};

/// What the shell should do given the market clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WaitForOpen,
    Rebalance,
    Liquidate,
}

/// Whole minutes until the next close (negative once past it).
pub fn minutes_to_close(clock: &Clock) -> i64 {
    (clock.next_close - clock.timestamp).num_minutes()
}

pub fn next_action(clock: &Clock, close_buffer_mins: i64) -> Action {
    if !clock.is_open {
        Action::WaitForOpen
    } else if minutes_to_close(clock) < close_buffer_mins {
        Action::Liquidate
    } else {
        Action::Rebalance
    }
}

/// Drives a [`Rebalancer`] on the market clock.
pub struct Scheduler<G: Gateway> {
    rebalancer: Rebalancer<G>,
}

impl<G: Gateway> Scheduler<G> {
    pub fn new(rebalancer: Rebalancer<G>) -> Self {
        Self { rebalancer }
    }

    pub fn into_inner(self) -> Rebalancer<G> {
        self.rebalancer
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.rebalancer.config().schedule.interval_secs)
    }

    fn open_poll(&self) -> Duration {
        Duration::from_secs(self.rebalancer.config().schedule.open_poll_secs)
    }

    fn clock(&self) -> Result<Clock> {
        self.rebalancer.gateway().clock().map_err(error::gateway)
    }

    /// One step of the loop. Returns how long to sleep before the next.
    ///
    /// When open, a cycle runs first; the close check follows it, so the
    /// last cycle of the day is followed by liquidation.
    pub fn tick(&mut self) -> Result<Duration> {
        let buffer = self.rebalancer.config().schedule.close_buffer_mins;

        if next_action(&self.clock()?, buffer) == Action::WaitForOpen {
            info!("Market closed, waiting for open");
            return Ok(self.open_poll());
        }

        let report = self.rebalancer.run_cycle()?;
        print!("{report}");

        let clock = self.clock()?;
        if next_action(&clock, buffer) != Action::Liquidate {
            return Ok(self.interval());
        }

        info!(
            "Market closes in {} min, closing positions",
            minutes_to_close(&clock)
        );
        self.rebalancer.liquidate_all()?;
        let until_close = (clock.next_close - clock.timestamp)
            .to_std()
            .unwrap_or_default();
        Ok(until_close + self.open_poll())
    }

    /// Run until a configuration or audit failure. Gateway failures are
    /// logged and retried on the next tick.
    pub fn run(&mut self) -> Result<()> {
        let summary = self.rebalancer.cancel_open_orders()?;
        info!("Startup: cancelled {} open orders", summary.cancelled);

        loop {
            let pause = match self.tick() {
                Ok(pause) => pause,
                Err(Error::Connection(msg) | Error::Gateway(msg)) => {
                    error!("Cycle failed: {msg}");
                    self.interval()
                }
                Err(e) => return Err(e),
            };
            std::thread::sleep(pause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn clock(is_open: bool, mins_to_close: i64) -> Clock {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 15, 0, 0).unwrap();
        Clock {
            timestamp: now,
            is_open,
            next_open: now + chrono::Duration::hours(18),
            next_close: now + chrono::Duration::minutes(mins_to_close),
        }
    }

    #[test]
    fn minutes_to_close_counts_down() {
        assert_eq!(minutes_to_close(&clock(true, 90)), 90);
        assert_eq!(minutes_to_close(&clock(true, -5)), -5);
    }

    #[test]
    fn action_by_clock() {
        assert_eq!(next_action(&clock(false, 600), 15), Action::WaitForOpen);
        assert_eq!(next_action(&clock(true, 60), 15), Action::Rebalance);
        assert_eq!(next_action(&clock(true, 15), 15), Action::Rebalance);
        assert_eq!(next_action(&clock(true, 14), 15), Action::Liquidate);
    }
}
