//! Built-in triggers.
//!
//! Event-driven triggers ([`ButtonPressTrigger`], [`ZoneLevelTrigger`]) keep
//! their state between events; timer triggers ([`IntervalTrigger`],
//! [`TimeOfDayTrigger`]) fire through a background task that ends with the
//! recipe.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use homelink_domain::error::HubError;
use homelink_domain::event::Event;
use homelink_domain::id::{ButtonId, ZoneId};
use homelink_domain::recipe::{TriggerConfig, parse_time_of_day};
use homelink_domain::time::Timestamp;

use crate::ports::{Trigger, TriggerInit};

/// Fires after a number of presses of one button within a time window.
#[derive(Debug)]
pub struct ButtonPressTrigger {
    button_id: ButtonId,
    press_count: usize,
    window: Option<TimeDelta>,
    presses: VecDeque<Timestamp>,
}

impl ButtonPressTrigger {
    /// A zero `window` keeps presses forever.
    #[must_use]
    pub fn new(button_id: ButtonId, press_count: u32, window: Duration) -> Self {
        Self {
            button_id,
            press_count: usize::try_from(press_count.max(1)).unwrap_or(usize::MAX),
            window: TimeDelta::from_std(window).ok().filter(|w| !w.is_zero()),
            presses: VecDeque::new(),
        }
    }
}

impl Trigger for ButtonPressTrigger {
    fn init(&mut self, _done: CancellationToken) -> TriggerInit {
        TriggerInit {
            fire: None,
            processes_events: true,
        }
    }

    fn process_event(&mut self, event: &Event) -> bool {
        if event.pressed_button() != Some(self.button_id) {
            return false;
        }
        self.presses.push_back(event.timestamp);
        if let Some(window) = self.window {
            while self
                .presses
                .front()
                .is_some_and(|first| event.timestamp - *first > window)
            {
                self.presses.pop_front();
            }
        }
        if self.presses.len() >= self.press_count {
            self.presses.clear();
            return true;
        }
        false
    }
}

/// Fires when a zone's reported level enters `min..=max`.
#[derive(Debug)]
pub struct ZoneLevelTrigger {
    zone_id: ZoneId,
    min: f64,
    max: f64,
    inside: bool,
}

impl ZoneLevelTrigger {
    #[must_use]
    pub fn new(zone_id: ZoneId, min: f64, max: f64) -> Self {
        Self {
            zone_id,
            min,
            max,
            inside: false,
        }
    }
}

impl Trigger for ZoneLevelTrigger {
    fn init(&mut self, _done: CancellationToken) -> TriggerInit {
        TriggerInit {
            fire: None,
            processes_events: true,
        }
    }

    fn process_event(&mut self, event: &Event) -> bool {
        let Some((zone_id, level)) = event.zone_level() else {
            return false;
        };
        if zone_id != self.zone_id {
            return false;
        }
        let inside = (self.min..=self.max).contains(&level);
        let entered = inside && !self.inside;
        self.inside = inside;
        entered
    }
}

/// Fires every `every`, starting one period after the recipe starts.
#[derive(Debug)]
pub struct IntervalTrigger {
    every: Duration,
}

impl IntervalTrigger {
    #[must_use]
    pub fn new(every: Duration) -> Self {
        Self { every }
    }
}

impl Trigger for IntervalTrigger {
    fn init(&mut self, done: CancellationToken) -> TriggerInit {
        let (fire, signal) = mpsc::channel(1);
        let every = self.every;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = done.cancelled() => break,
                    _ = ticker.tick() => {
                        if fire.send(true).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        TriggerInit {
            fire: Some(signal),
            processes_events: false,
        }
    }

    fn process_event(&mut self, _event: &Event) -> bool {
        false
    }
}

/// Fires once a day at a fixed UTC time.
#[derive(Debug)]
pub struct TimeOfDayTrigger {
    at: NaiveTime,
}

impl TimeOfDayTrigger {
    #[must_use]
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }
}

/// First occurrence of `at` strictly after `now`.
fn next_occurrence(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// Target following one that just `fired`. Always later than `fired`, even
/// when the wall clock lags the timer.
fn next_after_fire(fired: DateTime<Utc>, now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    next_occurrence(fired.max(now), at)
}

fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

impl Trigger for TimeOfDayTrigger {
    fn init(&mut self, done: CancellationToken) -> TriggerInit {
        let (fire, signal) = mpsc::channel(1);
        let at = self.at;
        tokio::spawn(async move {
            let mut target = next_occurrence(Utc::now(), at);
            loop {
                tokio::select! {
                    () = done.cancelled() => break,
                    () = tokio::time::sleep(until(target, Utc::now())) => {
                        if fire.send(true).await.is_err() {
                            break;
                        }
                        target = next_after_fire(target, Utc::now(), at);
                    }
                }
            }
        });
        TriggerInit {
            fire: Some(signal),
            processes_events: false,
        }
    }

    fn process_event(&mut self, _event: &Event) -> bool {
        false
    }
}

/// Any built-in trigger.
#[derive(Debug)]
pub enum AnyTrigger {
    ButtonPress(ButtonPressTrigger),
    ZoneLevel(ZoneLevelTrigger),
    Interval(IntervalTrigger),
    TimeOfDay(TimeOfDayTrigger),
}

impl TryFrom<&TriggerConfig> for AnyTrigger {
    type Error = HubError;

    fn try_from(config: &TriggerConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(match config {
            TriggerConfig::ButtonPress {
                button_id,
                press_count,
                window_ms,
            } => Self::ButtonPress(ButtonPressTrigger::new(
                *button_id,
                *press_count,
                Duration::from_millis(*window_ms),
            )),
            TriggerConfig::ZoneLevel { zone_id, min, max } => {
                Self::ZoneLevel(ZoneLevelTrigger::new(*zone_id, *min, *max))
            }
            TriggerConfig::Interval { seconds } => {
                Self::Interval(IntervalTrigger::new(Duration::from_secs(*seconds)))
            }
            TriggerConfig::TimeOfDay { at } => {
                Self::TimeOfDay(TimeOfDayTrigger::new(parse_time_of_day(at)?))
            }
        })
    }
}

impl Trigger for AnyTrigger {
    fn init(&mut self, done: CancellationToken) -> TriggerInit {
        match self {
            Self::ButtonPress(inner) => inner.init(done),
            Self::ZoneLevel(inner) => inner.init(done),
            Self::Interval(inner) => inner.init(done),
            Self::TimeOfDay(inner) => inner.init(done),
        }
    }

    fn process_event(&mut self, event: &Event) -> bool {
        match self {
            Self::ButtonPress(inner) => inner.process_event(event),
            Self::ZoneLevel(inner) => inner.process_event(event),
            Self::Interval(inner) => inner.process_event(event),
            Self::TimeOfDay(inner) => inner.process_event(event),
        }
    }
}
