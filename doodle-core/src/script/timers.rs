//! `setTimeout` and `setInterval`, counted in game ticks.

use std::collections::BTreeMap;

/// Handle to clear a timer. The first timer of a [`Timers`] is `1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u32);
impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
struct Timer<C> {
    callback: C,
    ticks: u64,
    next_tick: u64,
    repeat: bool,
}

/// Pending timers of one script, each holding a callback `C`.
#[derive(Debug)]
pub struct Timers<C> {
    fps: u32,
    last_id: u32,
    timers: BTreeMap<TimerId, Timer<C>>,
}

impl<C> Timers<C> {
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self {
            fps: target_fps,
            last_id: 0,
            timers: BTreeMap::new(),
        }
    }
    /// Run `callback` once, `ms` milliseconds after tick `now`.
    pub fn set_timeout(&mut self, now: u64, callback: C, ms: u64) -> TimerId {
        self.add(now, callback, ms, false)
    }
    /// Run `callback` every `ms` milliseconds, starting `ms` after tick `now`.
    pub fn set_interval(&mut self, now: u64, callback: C, ms: u64) -> TimerId {
        self.add(now, callback, ms, true)
    }
    fn add(&mut self, now: u64, callback: C, ms: u64, repeat: bool) -> TimerId {
        self.last_id += 1;
        let id = TimerId(self.last_id);
        let ticks = crate::settings::ms_to_ticks(ms, self.fps);
        self.timers.insert(
            id,
            Timer {
                callback,
                ticks,
                next_tick: now + ticks,
                repeat,
            },
        );
        id
    }
    /// Clears timeouts and intervals alike. `false` if there was no such timer.
    pub fn clear(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Run every timer that is due at tick `now`, in id order. Intervals are rescheduled, timeouts dropped.
    ///
    /// Returns how many fired.
    pub fn tick(&mut self, now: u64, mut run: impl FnMut(TimerId, &mut C)) -> usize {
        let mut expired = Vec::new();
        let mut fired = 0;
        for (&id, timer) in &mut self.timers {
            if now < timer.next_tick {
                continue;
            }
            run(id, &mut timer.callback);
            fired += 1;
            if timer.repeat {
                // Zero-length intervals still wait a tick between runs.
                timer.next_tick = now + timer.ticks.max(1);
            } else {
                expired.push(id);
            }
        }
        for id in expired {
            self.timers.remove(&id);
        }
        fired
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeout_fires_once() {
        let mut timers = Timers::new(60);
        let id = timers.set_timeout(10, "hello", 1000);
        assert_eq!(id, TimerId(1));

        let mut seen = Vec::new();
        for tick in 10..200 {
            timers.tick(tick, |_, msg| seen.push((tick, *msg)));
        }
        assert_eq!(seen, [(70, "hello")]);
        assert!(timers.is_empty());
    }
    #[test]
    fn interval_repeats_until_cleared() {
        let mut timers = Timers::new(60);
        let fast = timers.set_interval(0, 0_u32, 500);
        let slow = timers.set_timeout(0, 0_u32, 2000);
        assert_eq!(slow, TimerId(2));

        for tick in 0..=90 {
            timers.tick(tick, |_, count| *count += 1);
        }
        let mut counts = Vec::new();
        timers.tick(91, |id, count| counts.push((id, *count)));
        assert!(counts.is_empty());
        // Fired at 30, 60 and 90. Both are due at 120, in id order.
        let mut due = Vec::new();
        timers.tick(120, |id, count| due.push((id, *count)));
        assert_eq!(due, [(fast, 3), (slow, 0)]);

        assert_eq!(timers.len(), 1);
        assert!(timers.clear(fast));
        assert!(!timers.clear(fast));
        assert!(timers.is_empty());
    }
}
