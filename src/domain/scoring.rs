//! Popularity scoring for the hot-content ranking.
//!
//! The formula is pluggable behind [`ScoreFunction`]; the only contract
//! is monotonic decay: of two articles with equal raw signals, the newer
//! one must score strictly higher.

use time::OffsetDateTime;

/// Raw accumulated signals for one article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSignals {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

pub trait ScoreFunction: Send + Sync {
    fn score(&self, now: OffsetDateTime, created_at: OffsetDateTime, signals: &RawSignals) -> f64;
}

/// Gravity-decay scoring: weighted signals divided by a power of age.
///
/// `(w_v·views + w_l·likes + w_c·comments + 1) / (age_hours + 2)^gravity`
///
/// The `+ 1` keeps zero-signal articles on the curve so recency alone
/// still orders them.
#[derive(Debug, Clone)]
pub struct GravityDecay {
    pub view_weight: f64,
    pub like_weight: f64,
    pub comment_weight: f64,
    pub gravity: f64,
}

impl Default for GravityDecay {
    fn default() -> Self {
        Self {
            view_weight: 1.0,
            like_weight: 4.0,
            comment_weight: 8.0,
            gravity: 1.2,
        }
    }
}

impl ScoreFunction for GravityDecay {
    fn score(&self, now: OffsetDateTime, created_at: OffsetDateTime, signals: &RawSignals) -> f64 {
        let age_hours = (now - created_at).as_seconds_f64().max(0.0) / 3600.0;
        let weight = self.view_weight * signals.views as f64
            + self.like_weight * signals.likes as f64
            + self.comment_weight * signals.comments as f64
            + 1.0;
        weight / (age_hours + 2.0).powf(self.gravity)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn signals(views: i64, likes: i64, comments: i64) -> RawSignals {
        RawSignals {
            views,
            likes,
            comments,
        }
    }

    #[test]
    fn equal_signals_newer_scores_strictly_higher() {
        let score_fn = GravityDecay::default();
        let now = OffsetDateTime::now_utc();
        let newer = now - Duration::hours(1);
        let older = now - Duration::hours(48);

        let raw = signals(120, 5, 3);
        assert!(score_fn.score(now, newer, &raw) > score_fn.score(now, older, &raw));
    }

    #[test]
    fn zero_signal_articles_still_decay() {
        let score_fn = GravityDecay::default();
        let now = OffsetDateTime::now_utc();
        let raw = signals(0, 0, 0);

        let fresh = score_fn.score(now, now - Duration::hours(1), &raw);
        let stale = score_fn.score(now, now - Duration::days(10), &raw);
        assert!(fresh > stale);
        assert!(stale > 0.0);
    }

    #[test]
    fn heavier_signals_beat_lighter_at_equal_age() {
        let score_fn = GravityDecay::default();
        let now = OffsetDateTime::now_utc();
        let created = now - Duration::hours(6);

        let busy = score_fn.score(now, created, &signals(100, 10, 4));
        let quiet = score_fn.score(now, created, &signals(10, 0, 0));
        assert!(busy > quiet);
    }

    #[test]
    fn clock_skew_is_clamped() {
        let score_fn = GravityDecay::default();
        let now = OffsetDateTime::now_utc();
        // created_at slightly in the future must not blow up the curve
        let skewed = score_fn.score(now, now + Duration::minutes(5), &signals(1, 0, 0));
        assert!(skewed.is_finite());
        assert!(skewed > 0.0);
    }
}
