//! Per-key admission history.

use std::collections::VecDeque;
use std::time::Duration;

/// Admission timestamps for one (client, endpoint) key, oldest first.
#[derive(Debug, Default, Clone)]
pub(crate) struct AdmissionWindow {
    admitted: VecDeque<Duration>,
}

impl AdmissionWindow {
    /// Drops timestamps at or before `now - horizon`.
    pub(crate) fn prune(&mut self, now: Duration, horizon: Duration) {
        let cutoff = now.saturating_sub(horizon);
        while let Some(&front) = self.admitted.front() {
            if front <= cutoff {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admissions strictly newer than `now - span`, and the oldest of them.
    pub(crate) fn within(&self, now: Duration, span: Duration) -> (usize, Option<Duration>) {
        let cutoff = now.saturating_sub(span);
        let mut recent = self.admitted.iter().filter(|&&ts| ts > cutoff);
        match recent.next() {
            Some(&oldest) => (1 + recent.count(), Some(oldest)),
            None => (0, None),
        }
    }

    pub(crate) fn record(&mut self, now: Duration) {
        self.admitted.push_back(now);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.admitted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_within_counts_strictly_newer() {
        let mut window = AdmissionWindow::default();
        for ts in [100, 130, 160] {
            window.record(secs(ts));
        }
        // Cutoff 100: the entry at exactly 100 is outside
        assert_eq!(window.within(secs(160), secs(60)), (2, Some(secs(130))));
        assert_eq!(window.within(secs(1_000), secs(60)), (0, None));
    }

    #[test]
    fn test_prune() {
        let mut window = AdmissionWindow::default();
        window.record(secs(10));
        window.record(secs(20));
        window.prune(secs(3_610), secs(3_600));
        assert_eq!(window.len(), 1);
        window.prune(secs(4_000), secs(3_600));
        assert!(window.is_empty());
    }
}
