//! Map model: Location nodes, their status and the quick-navigation targets.
//!
//! Pure data derived from the story and the completed set; drawing it is the
//! terminal's job.

use crate::engine::source::{Route, Story};
use crate::progress::unlocks::{NodeStatus, QuickNav, UnlockGraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    pub id: String,
    pub name: String,
    pub route: Route,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapModel {
    pub nodes: Vec<MapNode>,
    pub selected: usize,
    pub quick: QuickNav,
    /// Shown under the map after a refused selection.
    pub notice: Option<String>,
}

impl MapModel {
    /// Recompute node statuses and quick navigation. Keeps the selection.
    pub fn refresh(&mut self, story: &Story, graph: &UnlockGraph, completed: &[String]) {
        self.nodes = story
            .chapters
            .iter()
            .map(|c| MapNode {
                id: c.id.clone(),
                name: c.name.clone(),
                route: c.route,
                status: graph.status(&c.id, completed),
            })
            .collect();
        self.quick = graph.quick_nav(completed);
        self.selected = self.selected.min(self.nodes.len().saturating_sub(1));
    }

    pub fn selected_node(&self) -> Option<&MapNode> {
        self.nodes.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.nodes.is_empty() {
            self.selected = (self.selected + 1) % self.nodes.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.nodes.is_empty() {
            self.selected = (self.selected + self.nodes.len() - 1) % self.nodes.len();
        }
    }

    /// Move the selection onto `id` if it is on the map.
    pub fn select(&mut self, id: &str) -> bool {
        match self.nodes.iter().position(|n| n.id == id) {
            Some(i) => {
                self.selected = i;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_marks_the_first_chapter_available() {
        let story = Story::builtin().unwrap();
        let graph = UnlockGraph::from_story(&story);
        let mut map = MapModel::default();
        map.refresh(&story, &graph, &["start".to_string()]);
        assert_eq!(map.nodes.len(), story.chapters.len());
        let napoleon = map.nodes.iter().find(|n| n.id == "napoleon").unwrap();
        assert_eq!(napoleon.status, NodeStatus::Available);
        assert!(map.nodes.iter().filter(|n| n.id != "napoleon").all(|n| n.status == NodeStatus::Locked));
        assert_eq!(map.quick.main.as_deref(), Some("napoleon"));
    }

    #[test]
    fn selection_wraps() {
        let story = Story::builtin().unwrap();
        let graph = UnlockGraph::from_story(&story);
        let mut map = MapModel::default();
        map.refresh(&story, &graph, &[]);
        map.select_prev();
        assert_eq!(map.selected, map.nodes.len() - 1);
        map.select_next();
        assert_eq!(map.selected, 0);
        assert!(map.select("konec"));
        assert!(!map.select("nope"));
    }
}
