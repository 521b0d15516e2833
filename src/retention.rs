//! Keeps a location in the download set for `extra` cycles after it stops
//! qualifying, so the end of a rain event is captured too.

use std::collections::HashMap;

use log::info;

use crate::selector::Candidates;

#[derive(Debug, Default)]
pub struct RetentionTracker {
    extra: u32,
    remaining: HashMap<String, u32>,
    to_download: Candidates,
}

impl RetentionTracker {
    pub fn new(extra: u32) -> Self {
        RetentionTracker {
            extra,
            ..Default::default()
        }
    }

    /// Folds in this cycle's candidates and returns what to download now.
    ///
    /// A location seen in cycle `k` stays eligible through cycle `k + extra`.
    /// `remaining` counts the cycles a location is still eligible for,
    /// the current one included.
    pub fn advance(&mut self, new: Candidates) -> &Candidates {
        let to_download = &mut self.to_download;
        self.remaining.retain(|name, left| {
            *left -= 1;
            if *left == 0 {
                to_download.remove(name);
                return false;
            }
            true
        });

        for name in new.keys() {
            self.remaining.insert(name.clone(), self.extra + 1);
        }
        self.to_download.extend(new);

        for (name, left) in &self.remaining {
            if *left <= self.extra {
                info!("{}: rain stopped, {} capture(s) left", name, left);
            }
        }

        &self.to_download
    }

    #[cfg(test)]
    pub fn remaining(&self, name: &str) -> Option<u32> {
        self.remaining.get(name).copied()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::selector::CandidateEntry;

    fn entry(url: &str, weather: &str) -> CandidateEntry {
        CandidateEntry {
            url: url.to_string(),
            quality: "best".to_string(),
            weather: weather.to_string(),
        }
    }

    fn cycle(names: &[&str]) -> Candidates {
        names
            .iter()
            .map(|n| (n.to_string(), entry(&format!("https://cams/{}", n), "rain")))
            .collect()
    }

    #[test]
    fn should_keep_location_one_extra_cycle() {
        let mut tracker = RetentionTracker::new(1);

        assert!(tracker.advance(cycle(&["A"])).contains_key("A"));
        assert!(tracker.advance(cycle(&[])).contains_key("A"));
        assert!(tracker.advance(cycle(&[])).is_empty());
    }

    #[test]
    fn should_retain_exactly_extra_cycles() {
        for extra in 0..5 {
            let mut tracker = RetentionTracker::new(extra);

            assert!(tracker.advance(cycle(&["A"])).contains_key("A"));
            for _ in 0..extra {
                assert!(tracker.advance(cycle(&[])).contains_key("A"));
            }
            assert!(tracker.advance(cycle(&[])).is_empty());
            assert_eq!(tracker.remaining("A"), None);
        }
    }

    #[test]
    fn should_download_only_current_cycle_with_zero_extra() {
        let mut tracker = RetentionTracker::new(0);

        assert!(tracker.advance(cycle(&["A"])).contains_key("A"));
        assert!(!tracker.advance(cycle(&["B"])).contains_key("A"));
        assert!(tracker.to_download.contains_key("B"));
    }

    #[test]
    fn should_reset_countdown_when_seen_again() {
        let mut tracker = RetentionTracker::new(2);

        tracker.advance(cycle(&["A"]));
        assert_eq!(tracker.remaining("A"), Some(3));
        tracker.advance(cycle(&[]));
        assert_eq!(tracker.remaining("A"), Some(2));

        tracker.advance(cycle(&["A"]));
        assert_eq!(tracker.remaining("A"), Some(3));
        assert!(tracker.advance(cycle(&[])).contains_key("A"));
        assert!(tracker.advance(cycle(&[])).contains_key("A"));
        assert!(tracker.advance(cycle(&[])).is_empty());
    }

    #[test]
    fn should_overwrite_stale_entry() {
        let mut tracker = RetentionTracker::new(1);

        tracker.advance(cycle(&["A"]));
        let mut fresh = Candidates::new();
        fresh.insert("A".to_string(), entry("https://cams/a-new", "thunderstorm"));
        tracker.advance(fresh);

        let a = &tracker.to_download["A"];
        assert_eq!(a.url, "https://cams/a-new");
        assert_eq!(a.weather, "thunderstorm");
    }

    #[test]
    fn should_track_locations_independently() {
        let mut tracker = RetentionTracker::new(1);

        tracker.advance(cycle(&["A"]));
        let now = tracker.advance(cycle(&["B"]));
        assert!(now.contains_key("A") && now.contains_key("B"));

        let now = tracker.advance(cycle(&[]));
        assert!(!now.contains_key("A"));
        assert!(now.contains_key("B"));
    }
}
