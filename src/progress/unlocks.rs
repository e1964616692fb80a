//! Unlock graph: which chapters may be entered given the completed set.

use std::collections::HashMap;

use crate::engine::source::{Route, Story};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Completed,
    Available,
    Locked,
}

/// The two quick-navigation targets shown under the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickNav {
    pub main: Option<String>,
    pub bonus: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UnlockGraph {
    entry: String,
    prereq: HashMap<String, String>,
    /// Entry sentinel followed by main-route chapters in story order.
    main_order: Vec<String>,
    bonus: Vec<String>,
}

impl UnlockGraph {
    pub fn from_story(story: &Story) -> Self {
        let prereq = story
            .chapters
            .iter()
            .map(|c| (c.id.clone(), story.requires_of(c).to_string()))
            .collect();
        let main_order = std::iter::once(story.entry.clone())
            .chain(
                story
                    .chapters
                    .iter()
                    .filter(|c| c.route == Route::Main)
                    .map(|c| c.id.clone()),
            )
            .collect();
        let bonus = story
            .chapters
            .iter()
            .filter(|c| c.route == Route::Bonus)
            .map(|c| c.id.clone())
            .collect();
        UnlockGraph {
            entry: story.entry.clone(),
            prereq,
            main_order,
            bonus,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn is_available(&self, id: &str, completed: &[String]) -> bool {
        if id == self.entry {
            return true;
        }
        match self.prereq.get(id) {
            Some(req) => completed.iter().any(|c| c == req),
            None => false,
        }
    }

    pub fn status(&self, id: &str, completed: &[String]) -> NodeStatus {
        if completed.iter().any(|c| c == id) {
            NodeStatus::Completed
        } else if self.is_available(id, completed) {
            NodeStatus::Available
        } else {
            NodeStatus::Locked
        }
    }

    pub fn quick_nav(&self, completed: &[String]) -> QuickNav {
        let done = |id: &str| completed.iter().any(|c| c == id);
        let main = self
            .main_order
            .windows(2)
            .find(|pair| done(&pair[0]) && !done(&pair[1]) && self.is_available(&pair[1], completed))
            .map(|pair| pair[1].clone());
        let bonus = self
            .bonus
            .iter()
            .find(|id| {
                self.prereq.get(*id).is_some_and(|req| done(req))
                    && !done(id)
                    && self.is_available(id, completed)
            })
            .cloned();
        QuickNav { main, bonus }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn graph() -> UnlockGraph {
        UnlockGraph::from_story(&Story::builtin().unwrap())
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_chapter_waits_for_the_entry() {
        let g = graph();
        assert!(g.is_available("start", &[]));
        assert!(!g.is_available("napoleon", &[]));
        assert!(g.is_available("napoleon", &ids(&["start"])));
        assert!(!g.is_available("nowhere", &ids(&["start", "napoleon"])));
    }

    #[test]
    fn statuses_follow_completion() {
        let g = graph();
        let done = ids(&["start", "napoleon"]);
        assert_eq!(g.status("napoleon", &done), NodeStatus::Completed);
        assert_eq!(g.status("jednou_vetou", &done), NodeStatus::Available);
        assert_eq!(g.status("freaky_comix", &done), NodeStatus::Locked);
    }

    #[test]
    fn quick_nav_points_at_the_next_main_and_bonus_chapters() {
        let g = graph();
        assert_eq!(g.quick_nav(&[]), QuickNav::default());
        let nav = g.quick_nav(&ids(&["start"]));
        assert_eq!(nav.main.as_deref(), Some("napoleon"));
        assert_eq!(nav.bonus, None);

        let nav = g.quick_nav(&ids(&["start", "napoleon", "jednou_vetou"]));
        assert_eq!(nav.main, None);
        assert_eq!(nav.bonus.as_deref(), Some("freaky_comix"));

        let nav = g.quick_nav(&ids(&["start", "napoleon", "jednou_vetou", "freaky_comix"]));
        assert_eq!(nav.main.as_deref(), Some("nektera_proc"));
        assert_eq!(nav.bonus, None);
    }

    proptest! {
        #[test]
        fn availability_is_monotonic(
            base in proptest::sample::subsequence(
                vec!["start", "napoleon", "jednou_vetou", "freaky_comix", "nektera_proc",
                     "site_video", "pudinkovy_pribeh", "konec"], 0..8),
            extra in proptest::sample::select(
                vec!["start", "napoleon", "jednou_vetou", "freaky_comix", "nektera_proc",
                     "site_video", "pudinkovy_pribeh", "konec"]),
        ) {
            let g = graph();
            let before = ids(&base);
            let mut after = before.clone();
            after.push(extra.to_string());
            for id in ["start", "napoleon", "jednou_vetou", "freaky_comix", "nektera_proc",
                       "site_video", "pudinkovy_pribeh", "konec", "unknown"] {
                if g.is_available(id, &before) {
                    prop_assert!(g.is_available(id, &after));
                }
            }
        }
    }
}
