use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use copydesk_common::{BurstWindow, CadenceState, CopydeskError, VerticalConfig};
use serde::Serialize;
use tracing::{debug, info};

/// Result of a cadence check.
#[derive(Debug, Clone, Serialize)]
pub struct CadenceVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
    /// Publications counted against the weekly cap right now.
    pub current: u32,
    pub limit: u32,
    /// True when admission rides an open burst window instead of the cap.
    pub via_burst: bool,
}

pub const REASON_COOLDOWN: &str = "cooldown active";
pub const REASON_WEEKLY_LIMIT: &str = "weekly limit reached";

/// Durable get/save surface for per-vertical cadence state. The storage
/// technology behind it is out of scope; tests and the CLI use the in-memory
/// implementation.
pub trait CadenceStore: Send + Sync {
    fn load(&self, vertical: &str) -> Result<Option<CadenceState>, CopydeskError>;
    fn save(&self, state: &CadenceState) -> Result<(), CopydeskError>;
}

#[derive(Default)]
pub struct InMemoryCadenceStore {
    states: Mutex<HashMap<String, CadenceState>>,
}

impl CadenceStore for InMemoryCadenceStore {
    fn load(&self, vertical: &str) -> Result<Option<CadenceState>, CopydeskError> {
        Ok(self
            .states
            .lock()
            .expect("cadence store lock poisoned")
            .get(vertical)
            .cloned())
    }

    fn save(&self, state: &CadenceState) -> Result<(), CopydeskError> {
        self.states
            .lock()
            .expect("cadence store lock poisoned")
            .insert(state.vertical.clone(), state.clone());
        Ok(())
    }
}

/// Sliding windows: the day/week/month counts are computed over the trailing
/// 24h/7d/30d from the retained publish-timestamp log, not calendar
/// boundaries.
const WEEK: i64 = 7;
const RETENTION_DAYS: i64 = 30;

/// Tracks and enforces publication-rate limits per vertical. The
/// check-then-increment sequence runs under a per-vertical mutex so two
/// concurrent drafts can never both consume the last slot.
pub struct CadenceTracker {
    store: Arc<dyn CadenceStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CadenceTracker {
    pub fn new(store: Arc<dyn CadenceStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCadenceStore::default()))
    }

    fn vertical_lock(&self, vertical: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("cadence lock table poisoned");
        locks
            .entry(vertical.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load_state(&self, vertical: &str) -> Result<CadenceState, CopydeskError> {
        Ok(self
            .store
            .load(vertical)?
            .unwrap_or_else(|| CadenceState {
                vertical: vertical.to_string(),
                ..CadenceState::default()
            }))
    }

    /// Read-only capacity check. Does not consume a slot.
    pub fn enforce(
        &self,
        config: &VerticalConfig,
        event_tags: &[String],
        now: DateTime<Utc>,
    ) -> Result<CadenceVerdict, CopydeskError> {
        let state = self.load_state(&config.slug)?;
        Ok(evaluate(&state, config, event_tags, now))
    }

    /// Current state snapshot, for dashboards. Eventually consistent — reads
    /// do not take the per-vertical lock.
    pub fn state(&self, vertical: &str) -> Result<CadenceState, CopydeskError> {
        self.load_state(vertical)
    }

    /// Increment counters for a publication admitted outside this tracker's
    /// reservation path. Prefer `try_reserve`, which checks and commits under
    /// one lock.
    pub fn commit(
        &self,
        config: &VerticalConfig,
        event_tags: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), CopydeskError> {
        let lock = self.vertical_lock(&config.slug);
        let _guard = lock.lock().expect("vertical lock poisoned");
        let mut state = self.load_state(&config.slug)?;
        apply_commit(&mut state, config, event_tags, now);
        self.store.save(&state)
    }

    /// Atomic check-then-increment: under the per-vertical lock, evaluate
    /// capacity and, if allowed, run `on_commit` (decision persistence) and
    /// record the publication. Exactly C of N concurrent calls succeed when C
    /// slots remain.
    pub fn try_reserve<F>(
        &self,
        config: &VerticalConfig,
        event_tags: &[String],
        now: DateTime<Utc>,
        on_commit: F,
    ) -> Result<CadenceVerdict, CopydeskError>
    where
        F: FnOnce(),
    {
        let lock = self.vertical_lock(&config.slug);
        let _guard = lock.lock().expect("vertical lock poisoned");

        let mut state = self.load_state(&config.slug)?;
        let verdict = evaluate(&state, config, event_tags, now);
        if !verdict.allowed {
            debug!(
                vertical = config.slug.as_str(),
                reason = verdict.reason.as_deref().unwrap_or(""),
                "Cadence blocked"
            );
            return Ok(verdict);
        }

        apply_commit(&mut state, config, event_tags, now);
        self.store.save(&state)?;
        on_commit();

        info!(
            vertical = config.slug.as_str(),
            weekly = state.published_since(now - Duration::days(WEEK)),
            via_burst = verdict.via_burst,
            "Publication slot reserved"
        );
        Ok(verdict)
    }
}

/// Does an open (or openable) burst window admit one more publication?
fn burst_admits(
    state: &CadenceState,
    config: &VerticalConfig,
    event_tags: &[String],
    now: DateTime<Utc>,
) -> bool {
    let burst = match &config.burst {
        Some(b) => b,
        None => return false,
    };
    if !event_tags.iter().any(|t| t == &burst.trigger) {
        return false;
    }

    match &state.burst {
        Some(window) if window.trigger == burst.trigger && now < window.expires_at => {
            // Extras are bounded per trailing day inside the window.
            let used_today = window
                .extras
                .iter()
                .filter(|t| **t > now - Duration::days(1))
                .count() as u32;
            used_today < burst.max_extra_per_day
        }
        // No active window: the matching trigger opens one.
        _ => burst.max_extra_per_day > 0,
    }
}

fn evaluate(
    state: &CadenceState,
    config: &VerticalConfig,
    event_tags: &[String],
    now: DateTime<Utc>,
) -> CadenceVerdict {
    let weekly = state.published_since(now - Duration::days(WEEK));
    let limit = config.max_publications_per_week;

    // 1. Cooldown, unless a matching burst window overrides it.
    if let Some(last) = state.last_published_at {
        if now - last < Duration::hours(config.cooldown_hours)
            && !burst_admits(state, config, event_tags, now)
        {
            return CadenceVerdict {
                allowed: false,
                reason: Some(REASON_COOLDOWN.to_string()),
                current: weekly,
                limit,
                via_burst: false,
            };
        }
    }

    // 2. Weekly cap, with burst override.
    if weekly >= limit {
        if burst_admits(state, config, event_tags, now) {
            return CadenceVerdict {
                allowed: true,
                reason: None,
                current: weekly,
                limit,
                via_burst: true,
            };
        }
        return CadenceVerdict {
            allowed: false,
            reason: Some(REASON_WEEKLY_LIMIT.to_string()),
            current: weekly,
            limit,
            via_burst: false,
        };
    }

    // 3. Capacity remains.
    CadenceVerdict {
        allowed: true,
        reason: None,
        current: weekly,
        limit,
        via_burst: false,
    }
}

fn apply_commit(
    state: &mut CadenceState,
    config: &VerticalConfig,
    event_tags: &[String],
    now: DateTime<Utc>,
) {
    let weekly = state.published_since(now - Duration::days(WEEK));
    let over_cap = weekly >= config.max_publications_per_week;

    match &config.burst {
        Some(burst_cfg) if over_cap && burst_admits(state, config, event_tags, now) => {
            let window_active = matches!(
                &state.burst,
                Some(w) if w.trigger == burst_cfg.trigger && now < w.expires_at
            );
            if !window_active {
                state.burst = Some(BurstWindow {
                    trigger: burst_cfg.trigger.clone(),
                    opened_at: now,
                    expires_at: now + Duration::hours(burst_cfg.duration_hours),
                    extras: Vec::new(),
                });
                info!(
                    vertical = state.vertical.as_str(),
                    trigger = burst_cfg.trigger.as_str(),
                    "Burst window opened"
                );
            }
            if let Some(window) = &mut state.burst {
                window.extras.push(now);
            }
        }
        _ => state.publishes.push(now),
    }

    state.last_published_at = Some(now);

    // Prune past the widest window so the log stays bounded.
    let cutoff = now - Duration::days(RETENTION_DAYS);
    state.publishes.retain(|t| *t >= cutoff);
    if state.burst.as_ref().is_some_and(|w| now >= w.expires_at) {
        state.burst = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_common::{BurstConfig, QualityThresholds};

    fn config(cap: u32, cooldown_hours: i64, burst: Option<BurstConfig>) -> VerticalConfig {
        VerticalConfig {
            slug: "eu-policy".to_string(),
            max_publications_per_week: cap,
            allowed_types: vec!["brief".to_string()],
            thresholds: QualityThresholds {
                min_trust_score: 0.0,
                min_novelty_score: 0.0,
                min_impact_score: 0.0,
                min_sources: 0,
            },
            cooldown_hours,
            burst,
        }
    }

    fn burst(trigger: &str, max_extra_per_day: u32, duration_hours: i64) -> BurstConfig {
        BurstConfig {
            trigger: trigger.to_string(),
            max_extra_per_day,
            duration_hours,
        }
    }

    fn reserve(
        tracker: &CadenceTracker,
        cfg: &VerticalConfig,
        tags: &[String],
        now: DateTime<Utc>,
    ) -> CadenceVerdict {
        tracker.try_reserve(cfg, tags, now, || {}).unwrap()
    }

    #[test]
    fn sixth_publication_blocked_at_cap_of_five() {
        let tracker = CadenceTracker::in_memory();
        let cfg = config(5, 0, None);
        let mut now = Utc::now();

        for i in 0..5 {
            let v = reserve(&tracker, &cfg, &[], now);
            assert!(v.allowed, "publication {i} should fit under the cap");
            now += Duration::hours(1);
        }

        let v = reserve(&tracker, &cfg, &[], now);
        assert!(!v.allowed);
        assert_eq!(v.reason.as_deref(), Some(REASON_WEEKLY_LIMIT));
        assert_eq!(v.current, 5);
        assert_eq!(v.limit, 5);
    }

    #[test]
    fn cap_frees_up_as_window_slides() {
        let tracker = CadenceTracker::in_memory();
        let cfg = config(2, 0, None);
        let start = Utc::now();

        assert!(reserve(&tracker, &cfg, &[], start).allowed);
        assert!(reserve(&tracker, &cfg, &[], start + Duration::days(1)).allowed);
        assert!(!reserve(&tracker, &cfg, &[], start + Duration::days(2)).allowed);
        // Eight days on, the first publish has slid out of the window.
        assert!(reserve(&tracker, &cfg, &[], start + Duration::days(8)).allowed);
    }

    #[test]
    fn cooldown_blocks_back_to_back_publishes() {
        let tracker = CadenceTracker::in_memory();
        let cfg = config(10, 6, None);
        let now = Utc::now();

        assert!(reserve(&tracker, &cfg, &[], now).allowed);
        let v = reserve(&tracker, &cfg, &[], now + Duration::hours(1));
        assert!(!v.allowed);
        assert_eq!(v.reason.as_deref(), Some(REASON_COOLDOWN));
        assert!(reserve(&tracker, &cfg, &[], now + Duration::hours(7)).allowed);
    }

    #[test]
    fn burst_admits_extras_then_blocks() {
        let tracker = CadenceTracker::in_memory();
        let cfg = config(1, 0, Some(burst("eu-summit", 2, 48)));
        let tags = vec!["eu-summit".to_string()];
        let mut now = Utc::now();

        // Fill the weekly cap without the tag.
        assert!(reserve(&tracker, &cfg, &[], now).allowed);
        now += Duration::hours(1);

        // No matching tag: blocked.
        let v = reserve(&tracker, &cfg, &[], now);
        assert_eq!(v.reason.as_deref(), Some(REASON_WEEKLY_LIMIT));

        // Matching tag: two extras fit, the third does not.
        let v = reserve(&tracker, &cfg, &tags, now);
        assert!(v.allowed && v.via_burst);
        now += Duration::hours(1);
        let v = reserve(&tracker, &cfg, &tags, now);
        assert!(v.allowed && v.via_burst);
        now += Duration::hours(1);
        let v = reserve(&tracker, &cfg, &tags, now);
        assert!(!v.allowed);
        assert_eq!(v.reason.as_deref(), Some(REASON_WEEKLY_LIMIT));
    }

    #[test]
    fn burst_window_expires_after_duration() {
        let tracker = CadenceTracker::in_memory();
        let cfg = config(1, 0, Some(burst("election", 5, 24)));
        let tags = vec!["election".to_string()];
        let start = Utc::now();

        assert!(reserve(&tracker, &cfg, &[], start).allowed);
        // Opens the window.
        assert!(reserve(&tracker, &cfg, &tags, start + Duration::hours(1)).allowed);

        // 30h later the window has expired; the weekly cap is still full, and
        // the old window is gone, but the same trigger opens a fresh one.
        let state = tracker.state("eu-policy").unwrap();
        assert!(state.burst.is_some());
        let v = reserve(&tracker, &cfg, &[], start + Duration::hours(30));
        assert!(!v.allowed);
    }

    #[test]
    fn extras_do_not_consume_weekly_cap() {
        let tracker = CadenceTracker::in_memory();
        let cfg = config(2, 0, Some(burst("storm", 5, 48)));
        let tags = vec!["storm".to_string()];
        let start = Utc::now();

        assert!(reserve(&tracker, &cfg, &[], start).allowed);
        assert!(reserve(&tracker, &cfg, &[], start + Duration::hours(1)).allowed);
        // Cap reached; extra rides the burst window.
        assert!(reserve(&tracker, &cfg, &tags, start + Duration::hours(2)).via_burst);

        let state = tracker.state("eu-policy").unwrap();
        assert_eq!(state.published_since(start - Duration::days(1)), 2);
        assert_eq!(state.burst.as_ref().unwrap().extras.len(), 1);
    }

    #[test]
    fn concurrent_reservations_never_exceed_capacity() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let tracker = Arc::new(CadenceTracker::in_memory());
        let cfg = Arc::new(config(3, 0, None));
        let now = Utc::now();
        let admitted = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = tracker.clone();
                let cfg = cfg.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    let v = tracker.try_reserve(&cfg, &[], now, || {}).unwrap();
                    if v.allowed {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 3);
    }
}
