use crate::crawler::GraphCrawler;
use crate::types::{FocusSource, NodeKey, NodeType, Relation};
use std::collections::HashSet;

impl GraphCrawler {
    /// Ancestors of `key`, nearest first. Stops at the first repeated key.
    #[must_use]
    pub fn ancestors(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([key.clone()]);
        let mut current = key;
        while let Some(parent) = self.parent_map.get(current) {
            if !seen.insert(parent.clone()) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    fn has_type(&self, key: &NodeKey, desired: NodeType) -> bool {
        self.nodes
            .get(key)
            .is_some_and(|node| node.node_type == desired)
    }

    /// Pick the node of `desired` type closest to the focus.
    ///
    /// Order: the focus itself, its ancestor chain, then cross-referencing nodes and their
    /// ancestors. Falls back to the current focus with [`FocusSource::NotFound`].
    #[must_use]
    pub fn find_best_focus(&self, desired: NodeType) -> (NodeKey, FocusSource) {
        if self.has_type(&self.focus, desired) {
            return (self.focus.clone(), FocusSource::Itself);
        }

        if let Some(ancestor) = self
            .ancestors(&self.focus)
            .into_iter()
            .find(|key| self.has_type(key, desired))
        {
            return (ancestor, FocusSource::Ancestor);
        }

        if let Some(found) = self.find_cross_referenced_node(&self.focus, desired) {
            return (found, FocusSource::CrossRefAncestor);
        }

        (self.focus.clone(), FocusSource::NotFound)
    }

    /// Search the `Related` neighbours of `from` (incoming first) for a node of `desired`
    /// type, then the ancestor chains of those neighbours.
    #[must_use]
    pub fn find_cross_referenced_node(
        &self,
        from: &NodeKey,
        desired: NodeType,
    ) -> Option<NodeKey> {
        if !self.nodes.contains_key(from) {
            return None;
        }

        let related = || self.edges.iter().filter(|e| e.relation == Relation::Related);
        let mut neighbours: Vec<&NodeKey> = Vec::new();
        for edge in related().filter(|e| e.to == *from && e.from != *from) {
            neighbours.push(&edge.from);
        }
        for edge in related().filter(|e| e.from == *from && e.to != *from) {
            neighbours.push(&edge.to);
        }

        if let Some(direct) = neighbours.iter().find(|key| self.has_type(key, desired)) {
            return Some((*direct).clone());
        }

        neighbours.iter().find_map(|neighbour| {
            self.ancestors(neighbour)
                .into_iter()
                .find(|key| self.has_type(key, desired))
        })
    }

    /// Move the focus marker to `key` after the crawl.
    pub fn refocus_to(&mut self, key: &NodeKey, source: FocusSource) {
        self.focus = key.clone();
        self.focus_source = source;
        for (node_key, node) in &mut self.nodes {
            node.is_focus = node_key == key;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CrawlConfig;
    use crate::crawler::GraphCrawler;
    use crate::snapshot::{SnapshotItem, SnapshotSource};
    use crate::types::{FocusSource, NodeKey, NodeType};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    async fn crawled(source: SnapshotSource, number: u64) -> GraphCrawler {
        let mut crawler = GraphCrawler::new(
            Arc::new(source),
            NodeKey::new("o", "r", number),
            CrawlConfig::default(),
        );
        crawler.crawl(&CancellationToken::new()).await.unwrap();
        crawler
    }

    #[tokio::test]
    async fn batch_found_through_cross_reference_ancestor() {
        let source = SnapshotSource::new()
            .with_item(
                SnapshotItem::pull_request("o", "r", 461, "Implement parser")
                    .cross_referenced_by("o", "r", 886),
            )
            .with_item(
                SnapshotItem::issue("o", "r", 886, "Parser task")
                    .parent("o", "r", 871)
                    .body("Implemented in #461"),
            )
            .with_item(
                SnapshotItem::issue("o", "r", 871, "Q3 parser work")
                    .sub_issue(886)
                    .sub_issue(887),
            )
            .with_item(SnapshotItem::issue("o", "r", 887, "Docs"));
        let crawler = crawled(source, 461).await;

        assert_eq!(
            crawler.find_best_focus(NodeType::Batch),
            (NodeKey::new("o", "r", 871), FocusSource::CrossRefAncestor)
        );
        assert_eq!(
            crawler.find_best_focus(NodeType::PullRequest),
            (NodeKey::new("o", "r", 461), FocusSource::Itself)
        );
        assert_eq!(
            crawler.find_best_focus(NodeType::Epic),
            (NodeKey::new("o", "r", 461), FocusSource::NotFound)
        );
    }

    #[tokio::test]
    async fn ancestor_chain_is_walked_upwards() {
        let source = SnapshotSource::new()
            .with_item(SnapshotItem::issue("o", "r", 3, "Task").parent("o", "r", 2))
            .with_item(
                SnapshotItem::issue("o", "r", 2, "Batch")
                    .sub_issue(3)
                    .parent("o", "r", 1),
            )
            .with_item(
                SnapshotItem::issue("o", "r", 1, "Roadmap")
                    .label("Epic")
                    .sub_issue(2),
            );
        let mut crawler = crawled(source, 3).await;

        assert_eq!(
            crawler.ancestors(&NodeKey::new("o", "r", 3)),
            vec![NodeKey::new("o", "r", 2), NodeKey::new("o", "r", 1)]
        );
        let (key, source) = crawler.find_best_focus(NodeType::Epic);
        assert_eq!((key.number, source), (1, FocusSource::Ancestor));

        crawler.refocus_to(&key, source);
        let focused: Vec<u64> = crawler
            .nodes
            .values()
            .filter(|n| n.is_focus)
            .map(|n| n.number)
            .collect();
        assert_eq!(focused, vec![1]);
    }

    #[test]
    fn ancestors_survive_cycles() {
        let mut crawler = GraphCrawler::new(
            Arc::new(SnapshotSource::new()),
            NodeKey::new("o", "r", 1),
            CrawlConfig::default(),
        );
        crawler
            .parent_map
            .insert(NodeKey::new("o", "r", 1), NodeKey::new("o", "r", 2));
        crawler
            .parent_map
            .insert(NodeKey::new("o", "r", 2), NodeKey::new("o", "r", 1));
        assert_eq!(
            crawler.ancestors(&NodeKey::new("o", "r", 1)),
            vec![NodeKey::new("o", "r", 2)]
        );
    }
}
