//! Keystroke request scheduler: throttle for short or word-complete
//! queries, debounce for everything else.
//!
//! The scheduler never sleeps. Callers pass the current [`Instant`] in and
//! poll [`RequestScheduler::next_deadline`] to know when to come back,
//! which keeps every timing decision deterministic under test.
//!
//! ```text
//!  len < 4, or ends in whitespace and len < 24  ──► Throttle      (1100ms, leading + trailing)
//!  len > 24                                     ──► LongDebounce  (1800ms, trailing)
//!  otherwise                                    ──► ShortDebounce (800ms, trailing)
//! ```

use std::time::{Duration, Instant};

use crate::config::AutocompleteConfig;

/// Which timing path a query goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingPolicy {
    /// At most one request per interval, always with the latest query.
    Throttle,
    /// Fire once typing pauses for the short delay.
    ShortDebounce,
    /// Fire once typing pauses for the long delay.
    LongDebounce,
}

impl TimingPolicy {
    /// Choose the policy for the raw input text.
    ///
    /// Lengths are measured in characters on the trimmed text; trailing
    /// whitespace on the raw text signals a completed word.
    pub fn for_query(raw: &str, config: &AutocompleteConfig) -> Self {
        Self::classify(raw, config.short_query_chars, config.long_query_chars)
    }

    fn classify(raw: &str, short_query_chars: usize, long_query_chars: usize) -> Self {
        let len = raw.trim().chars().count();
        let word_complete = raw.ends_with(char::is_whitespace);
        if len < short_query_chars || (word_complete && len < long_query_chars) {
            Self::Throttle
        } else if len > long_query_chars {
            Self::LongDebounce
        } else {
            Self::ShortDebounce
        }
    }
}

/// A cancellable one-shot timer handle.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// Arm (or re-arm) the timer to expire at `at`.
    pub fn arm(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return `true` if the timer has expired by `now`.
    pub fn take_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A timer paired with the query it will fire with.
#[derive(Debug, Clone, Default)]
struct PendingCall {
    timer: Timer,
    query: Option<String>,
}

impl PendingCall {
    fn set(&mut self, at: Instant, query: String) {
        self.timer.arm(at);
        self.query = Some(query);
    }

    fn cancel(&mut self) {
        self.timer.cancel();
        self.query = None;
    }

    fn take_if_due(&mut self, now: Instant) -> Option<String> {
        if self.timer.take_if_due(now) {
            self.query.take()
        } else {
            None
        }
    }
}

/// Decides per keystroke when a suggestion request goes out.
#[derive(Debug)]
pub struct RequestScheduler {
    throttle_interval: Duration,
    short_delay: Duration,
    long_delay: Duration,
    short_query_chars: usize,
    long_query_chars: usize,
    last_throttled_at: Option<Instant>,
    throttle: PendingCall,
    short: PendingCall,
    long: PendingCall,
}

impl RequestScheduler {
    pub fn new(config: &AutocompleteConfig) -> Self {
        Self {
            throttle_interval: config.throttle_interval(),
            short_delay: config.short_debounce(),
            long_delay: config.long_debounce(),
            short_query_chars: config.short_query_chars,
            long_query_chars: config.long_query_chars,
            last_throttled_at: None,
            throttle: PendingCall::default(),
            short: PendingCall::default(),
            long: PendingCall::default(),
        }
    }

    /// Schedule a request for `raw`.
    ///
    /// Returns the trimmed query if it should be sent right now (the
    /// throttle's leading edge). Otherwise the query is parked behind a
    /// timer and comes back out of [`fire_due`](Self::fire_due). Pending
    /// calls of the other policies are cancelled.
    pub fn schedule(&mut self, raw: &str, now: Instant) -> Option<String> {
        let query = raw.trim().to_owned();
        match TimingPolicy::classify(raw, self.short_query_chars, self.long_query_chars) {
            TimingPolicy::Throttle => {
                self.short.cancel();
                self.long.cancel();
                self.throttle_call(query, now)
            }
            TimingPolicy::ShortDebounce => {
                self.throttle.cancel();
                self.long.cancel();
                self.short.set(now + self.short_delay, query);
                None
            }
            TimingPolicy::LongDebounce => {
                self.throttle.cancel();
                self.short.cancel();
                self.long.set(now + self.long_delay, query);
                None
            }
        }
    }

    fn throttle_call(&mut self, query: String, now: Instant) -> Option<String> {
        let window_open = self
            .last_throttled_at
            .is_none_or(|last| now.duration_since(last) >= self.throttle_interval);
        if window_open && !self.throttle.timer.is_armed() {
            self.last_throttled_at = Some(now);
            return Some(query);
        }
        // Trailing edge: keep the original deadline, swap in the latest query.
        let at = self
            .throttle
            .timer
            .deadline()
            .or_else(|| self.last_throttled_at.map(|last| last + self.throttle_interval))
            .unwrap_or(now);
        self.throttle.set(at, query);
        None
    }

    /// Pop every query whose timer has expired by `now`.
    pub fn fire_due(&mut self, now: Instant) -> Vec<String> {
        let mut fired = Vec::new();
        if let Some(query) = self.throttle.take_if_due(now) {
            self.last_throttled_at = Some(now);
            fired.push(query);
        }
        fired.extend(self.short.take_if_due(now));
        fired.extend(self.long.take_if_due(now));
        fired
    }

    /// The earliest pending deadline, if any call is parked.
    pub fn next_deadline(&self) -> Option<Instant> {
        [&self.throttle, &self.short, &self.long]
            .into_iter()
            .filter_map(|pending| pending.timer.deadline())
            .min()
    }

    pub fn has_pending(&self) -> bool {
        self.next_deadline().is_some()
    }

    /// Drop every parked call. The throttle window itself is kept.
    pub fn cancel_all(&mut self) {
        self.throttle.cancel();
        self.short.cancel();
        self.long.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn scheduler() -> RequestScheduler {
        RequestScheduler::new(&AutocompleteConfig::default())
    }

    #[test]
    fn policy_boundaries() {
        let config = AutocompleteConfig::default();
        assert_eq!(TimingPolicy::for_query("d", &config), TimingPolicy::Throttle);
        assert_eq!(TimingPolicy::for_query("dog", &config), TimingPolicy::Throttle);
        assert_eq!(TimingPolicy::for_query("dogs", &config), TimingPolicy::ShortDebounce);
        assert_eq!(TimingPolicy::for_query("hello ", &config), TimingPolicy::Throttle);
        assert_eq!(
            TimingPolicy::for_query("a".repeat(24).as_str(), &config),
            TimingPolicy::ShortDebounce
        );
        assert_eq!(
            TimingPolicy::for_query(&format!("{} ", "a".repeat(24)), &config),
            TimingPolicy::ShortDebounce
        );
        assert_eq!(
            TimingPolicy::for_query("a".repeat(25).as_str(), &config),
            TimingPolicy::LongDebounce
        );
    }

    #[test]
    fn policy_counts_characters_not_bytes() {
        let config = AutocompleteConfig::default();
        assert_eq!(TimingPolicy::for_query("ñoñ", &config), TimingPolicy::Throttle);
    }

    #[test]
    fn timer_take_if_due() {
        let start = Instant::now();
        let mut timer = Timer::default();
        assert!(!timer.take_if_due(start));
        timer.arm(start + ms(10));
        assert!(!timer.take_if_due(start + ms(9)));
        assert!(timer.take_if_due(start + ms(10)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn throttle_fires_leading_edge_immediately() {
        let mut s = scheduler();
        let start = Instant::now();
        assert_eq!(s.schedule("d", start), Some("d".to_string()));
        assert!(!s.has_pending());
    }

    #[test]
    fn throttle_bursts_collapse_to_one_trailing_call() {
        let mut s = scheduler();
        let start = Instant::now();
        assert_eq!(s.schedule("d", start), Some("d".into()));
        assert_eq!(s.schedule("do", start + ms(100)), None);
        assert_eq!(s.schedule("dog", start + ms(200)), None);
        assert_eq!(s.next_deadline(), Some(start + ms(1100)));

        assert!(s.fire_due(start + ms(1099)).is_empty());
        assert_eq!(s.fire_due(start + ms(1100)), vec!["dog".to_string()]);
        assert!(!s.has_pending());
    }

    #[test]
    fn throttle_never_fires_twice_per_window() {
        let mut s = scheduler();
        let start = Instant::now();
        let mut sent = Vec::new();
        // A keystroke every 50ms for three seconds.
        for i in 0..60u64 {
            let now = start + ms(i * 50);
            sent.extend(s.fire_due(now).into_iter().map(|q| (now, q)));
            if let Some(q) = s.schedule("abc", now) {
                sent.push((now, q));
            }
        }
        for pair in sent.windows(2) {
            assert!(pair[1].0.duration_since(pair[0].0) >= ms(1100));
        }
        assert!(sent.len() >= 2);
    }

    #[test]
    fn throttle_window_reopens() {
        let mut s = scheduler();
        let start = Instant::now();
        assert!(s.schedule("a", start).is_some());
        assert!(s.schedule("ab", start + ms(1200)).is_some());
    }

    #[test]
    fn short_debounce_resets_on_each_call() {
        let mut s = scheduler();
        let start = Instant::now();
        assert_eq!(s.schedule("dogs", start), None);
        assert_eq!(s.schedule("dogsl", start + ms(500)), None);
        assert!(s.fire_due(start + ms(800)).is_empty());
        assert_eq!(s.fire_due(start + ms(1300)), vec!["dogsl".to_string()]);
    }

    #[test]
    fn long_debounce_only_last_call_in_burst() {
        let mut s = scheduler();
        let start = Instant::now();
        let base = "a".repeat(25);
        for i in 0..5u64 {
            let query = format!("{base}{i}");
            assert_eq!(s.schedule(&query, start + ms(i * 300)), None);
        }
        assert!(s.fire_due(start + ms(1800)).is_empty());
        let fired = s.fire_due(start + ms(1200 + 1800));
        assert_eq!(fired, vec![format!("{base}4")]);
    }

    #[test]
    fn switching_policy_cancels_other_pending_calls() {
        let mut s = scheduler();
        let start = Instant::now();
        assert_eq!(s.schedule("dogs", start), None);
        let long = "a".repeat(30);
        assert_eq!(s.schedule(&long, start + ms(100)), None);
        // Only the long debounce remains.
        assert_eq!(s.next_deadline(), Some(start + ms(1900)));
        assert_eq!(s.fire_due(start + ms(5000)), vec![long]);
    }

    #[test]
    fn trailing_whitespace_is_trimmed_from_fired_query() {
        let mut s = scheduler();
        assert_eq!(s.schedule("hello ", Instant::now()), Some("hello".into()));
    }

    #[test]
    fn cancel_all_clears_pending() {
        let mut s = scheduler();
        let start = Instant::now();
        s.schedule("dogs", start);
        s.cancel_all();
        assert!(!s.has_pending());
        assert!(s.fire_due(start + ms(10_000)).is_empty());
    }
}
