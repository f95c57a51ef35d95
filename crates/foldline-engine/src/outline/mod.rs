//! # Outline tree
//!
//! The render-oriented headline hierarchy of one document, built straight
//! from its lines. It is deliberately independent of the Org parser: it only
//! needs the marker run of each headline, so it serves Markdown and Org alike.
//!
//! Nodes live in an arena in document order. Parent and child links are
//! [`NodeHandle`]s carrying the generation of the build that minted them;
//! every [`OutlineTree::build`] starts a new generation, so a handle kept
//! across a rebuild resolves to `None` instead of to the wrong node.
//!
//! Fold state is per node, starts `Expanded`, and is advisory until the
//! editor adapter reconciles it with the renderer.

mod fold_state;

pub use fold_state::FoldState;

use std::collections::HashMap;
use std::fmt::Write;

use foldline_syntax::HeadlineSyntax;
use serde::Serialize;
use uuid::Uuid;

/// Stable reference to a node within one build of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    generation: Uuid,
    index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// `node-<line>` at creation time.
    pub id: String,
    pub handle: NodeHandle,
    pub line: usize,
    /// Last line of the section, up to the next same-or-shallower headline.
    pub end_line: usize,
    pub level: usize,
    pub title: String,
    /// Text between the headline and its first child (or section end), trimmed.
    pub content: String,
    /// `None` for top-level nodes, which belong to the synthetic root.
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
    pub fold_state: FoldState,
}

impl OutlineNode {
    pub fn start_line(&self) -> usize {
        self.line
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Result of [`OutlineTree::cycle_fold_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldCycle {
    pub node: NodeHandle,
    pub state: FoldState,
}

/// Export shape for tree visualizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct D3Node {
    pub id: String,
    pub line: usize,
    pub level: usize,
    pub title: String,
    pub content: String,
    pub children: Vec<D3Node>,
    pub collapsed: bool,
}

#[derive(Debug, Clone)]
pub struct OutlineTree {
    syntax: HeadlineSyntax,
    generation: Uuid,
    nodes: Vec<OutlineNode>,
    top_level: Vec<NodeHandle>,
    by_line: HashMap<usize, usize>,
    by_id: HashMap<String, usize>,
    line_count: usize,
}

impl OutlineTree {
    /// An empty tree; call [`OutlineTree::build`] to populate it.
    pub fn new(syntax: HeadlineSyntax) -> Self {
        Self {
            syntax,
            generation: Uuid::new_v4(),
            nodes: Vec::new(),
            top_level: Vec::new(),
            by_line: HashMap::new(),
            by_id: HashMap::new(),
            line_count: 0,
        }
    }

    pub fn from_text(syntax: HeadlineSyntax, text: &str) -> Self {
        let mut tree = Self::new(syntax);
        tree.build(text);
        tree
    }

    pub fn syntax(&self) -> HeadlineSyntax {
        self.syntax
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    /// Line count of the text the tree was last built from.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recompute the whole tree from `text`. Fold state is not preserved and
    /// every previously issued handle goes stale.
    pub fn build(&mut self, text: &str) {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        let last_line = lines.len().saturating_sub(1);
        let start = front_matter_end(&lines).map_or(0, |end| end + 1);

        self.generation = Uuid::new_v4();
        self.nodes.clear();
        self.top_level.clear();
        self.by_line.clear();
        self.by_id.clear();
        self.line_count = lines.len();

        // Indices of nodes whose section is still open, shallowest first.
        let mut open: Vec<usize> = Vec::new();

        for (line, text) in lines.iter().enumerate().skip(start) {
            let Some(headline) = self.syntax.match_line(text) else {
                continue;
            };

            while let Some(&top) = open.last() {
                if self.nodes[top].level < headline.level {
                    break;
                }
                self.nodes[top].end_line = line - 1;
                open.pop();
            }

            let index = self.nodes.len();
            let handle = NodeHandle {
                generation: self.generation,
                index,
            };
            let parent = open.last().map(|&p| self.nodes[p].handle);
            match open.last() {
                Some(&p) => self.nodes[p].children.push(handle),
                None => self.top_level.push(handle),
            }

            let id = format!("node-{line}");
            self.by_line.insert(line, index);
            self.by_id.insert(id.clone(), index);
            self.nodes.push(OutlineNode {
                id,
                handle,
                line,
                end_line: last_line,
                level: headline.level,
                title: headline.title.to_string(),
                content: String::new(),
                parent,
                children: Vec::new(),
                fold_state: FoldState::Expanded,
            });
            open.push(index);
        }

        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            let body_end = match self.nodes.get(index + 1) {
                Some(next) if next.line <= node.end_line => next.line - 1,
                _ => node.end_line,
            };
            let content = lines[node.line + 1..=body_end.max(node.line)]
                .join("\n")
                .trim()
                .to_string();
            self.nodes[index].content = content;
        }
    }

    /// Same as [`OutlineTree::build`]; named for the document-changed path.
    pub fn rebuild(&mut self, text: &str) {
        self.build(text);
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&OutlineNode> {
        if handle.generation != self.generation {
            return None;
        }
        self.nodes.get(handle.index)
    }

    fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut OutlineNode> {
        if handle.generation != self.generation {
            return None;
        }
        self.nodes.get_mut(handle.index)
    }

    pub fn node_at_line(&self, line: usize) -> Option<&OutlineNode> {
        self.by_line.get(&line).map(|&index| &self.nodes[index])
    }

    pub fn node_by_id(&self, id: &str) -> Option<&OutlineNode> {
        self.by_id.get(id).map(|&index| &self.nodes[index])
    }

    /// Nearest headline at or above `line`.
    pub fn enclosing_node(&self, line: usize) -> Option<&OutlineNode> {
        self.nodes.iter().rev().find(|node| node.line <= line)
    }

    /// Every node, pre-order. Arena order is document order, which for a
    /// tree nested by a stack is exactly pre-order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &OutlineNode> {
        self.nodes.iter()
    }

    /// Children of the synthetic root.
    pub fn top_level(&self) -> impl Iterator<Item = &OutlineNode> {
        self.top_level.iter().filter_map(|&h| self.get(h))
    }

    pub fn children<'a>(&'a self, node: &'a OutlineNode) -> impl Iterator<Item = &'a OutlineNode> {
        node.children.iter().filter_map(|&h| self.get(h))
    }

    /// Siblings of `node` (itself included), in document order.
    pub fn siblings<'a>(&'a self, node: &OutlineNode) -> Vec<&'a OutlineNode> {
        let handles = match node.parent.and_then(|p| self.get(p)) {
            Some(parent) => &parent.children,
            None => &self.top_level,
        };
        handles.iter().filter_map(|&h| self.get(h)).collect()
    }

    /// Last line of the node's own body, before its first child.
    pub fn body_end(&self, node: &OutlineNode) -> usize {
        self.children(node)
            .next()
            .map_or(node.end_line, |child| child.line - 1)
    }

    pub fn next_fold_state(&self, node: &OutlineNode) -> FoldState {
        node.fold_state.next(node.has_children())
    }

    /// Advance the fold state of the node at `line`. `None` if no headline
    /// starts on that line.
    pub fn cycle_fold_state(&mut self, line: usize) -> Option<FoldCycle> {
        let &index = self.by_line.get(&line)?;
        let node = &mut self.nodes[index];
        node.fold_state = node.fold_state.next(node.has_children());
        Some(FoldCycle {
            node: node.handle,
            state: node.fold_state,
        })
    }

    /// Record a fold state. `ChildrenVisible` on a leaf is stored as
    /// `Expanded`. Returns `false` for a stale handle.
    pub fn set_fold_state(&mut self, handle: NodeHandle, state: FoldState) -> bool {
        match self.get_mut(handle) {
            Some(node) => {
                node.fold_state = state.normalized(node.has_children());
                true
            }
            None => false,
        }
    }

    pub fn to_d3_format(&self) -> Vec<D3Node> {
        self.top_level().map(|node| self.to_d3_node(node)).collect()
    }

    fn to_d3_node(&self, node: &OutlineNode) -> D3Node {
        D3Node {
            id: node.id.clone(),
            line: node.line,
            level: node.level,
            title: node.title.clone(),
            content: node.content.clone(),
            children: self
                .children(node)
                .map(|child| self.to_d3_node(child))
                .collect(),
            collapsed: node.fold_state == FoldState::Folded,
        }
    }

    /// Indented dump of the tree for logs and debugging.
    pub fn debug_info(&self) -> String {
        let mut out = String::new();
        for node in self.all_nodes() {
            let _ = writeln!(
                out,
                "{}{} [line {}, level {}, {}, {} children]",
                "  ".repeat(node.level.saturating_sub(1)),
                node.title,
                node.line,
                node.level,
                node.fold_state,
                node.children.len()
            );
        }
        out
    }
}

/// Index of the closing `---` when line 0 opens a YAML front matter block.
pub fn front_matter_end<S: AsRef<str>>(lines: &[S]) -> Option<usize> {
    if lines.first()?.as_ref().trim() != "---" {
        return None;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.as_ref().trim() == "---")
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn markdown(text: &str) -> OutlineTree {
        OutlineTree::from_text(HeadlineSyntax::Markdown, text)
    }

    fn summary(tree: &OutlineTree) -> Vec<(&str, usize, usize, usize)> {
        tree.all_nodes()
            .map(|n| (n.title.as_str(), n.line, n.level, n.end_line))
            .collect()
    }

    #[test]
    fn test_basic_structure() {
        let tree = markdown("# A\ncontent\n## B\nmore\n# C\n");

        assert_eq!(
            summary(&tree),
            vec![("A", 0, 1, 3), ("B", 2, 2, 3), ("C", 4, 1, 5)]
        );

        let a = tree.node_at_line(0).unwrap();
        let b = tree.node_at_line(2).unwrap();
        assert_eq!(b.parent, Some(a.handle));
        assert_eq!(a.children, vec![b.handle]);
        assert_eq!(tree.top_level().count(), 2);
    }

    #[test]
    fn test_content_stops_at_first_child() {
        let tree = markdown("# A\n\nintro\n\n## B\nmore\n");

        assert_eq!(tree.node_at_line(0).unwrap().content, "intro");
        assert_eq!(tree.node_at_line(4).unwrap().content, "more");
    }

    #[test]
    fn test_front_matter_is_skipped() {
        let tree = markdown("---\ntitle: x\n---\n# A\n");

        assert_eq!(summary(&tree), vec![("A", 3, 1, 4)]);
    }

    #[test]
    fn test_headlines_inside_front_matter_are_ignored() {
        let tree = markdown("---\n# not a headline\n---\n# Real\n");

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.all_nodes().next().unwrap().title, "Real");
    }

    #[test]
    fn test_unclosed_front_matter_scans_from_start() {
        let tree = markdown("---\n# A\n");

        assert_eq!(summary(&tree), vec![("A", 1, 1, 2)]);
    }

    #[test]
    fn test_skipped_levels_attach_to_nearest_shallower() {
        let tree = markdown("# A\n### Deep\n## Mid\n");

        let a = tree.node_at_line(0).unwrap();
        assert_eq!(a.children.len(), 2);
        assert_eq!(tree.node_at_line(2).unwrap().parent, Some(a.handle));
    }

    #[test]
    fn test_org_syntax() {
        let tree = OutlineTree::from_text(HeadlineSyntax::Org, "* One\n** TODO Two\n# comment\n");

        assert_eq!(summary(&tree), vec![("One", 0, 1, 3), ("TODO Two", 1, 2, 3)]);
    }

    #[test]
    fn test_lookup_by_id_and_line() {
        let tree = markdown("intro\n# A\n");

        let by_id = tree.node_by_id("node-1").unwrap();
        assert_eq!(by_id.title, "A");
        assert!(tree.node_at_line(0).is_none());
        assert!(tree.node_by_id("node-0").is_none());
    }

    #[test]
    fn test_lines_strictly_increase_and_levels_nest() {
        let tree = markdown("# A\n## B\n### C\n## D\n# E\n###### F\n## G\n");

        let lines: Vec<usize> = tree.all_nodes().map(|n| n.line).collect();
        assert!(lines.windows(2).all(|w| w[0] < w[1]));

        for node in tree.all_nodes() {
            if let Some(parent) = node.parent.and_then(|p| tree.get(p)) {
                assert!(parent.level < node.level);
                assert!(parent.end_line >= node.end_line);
            }
            assert!(node.end_line >= node.line);
        }
    }

    #[test]
    fn test_cycle_fold_state() {
        let mut tree = markdown("# Parent\n## Child\ntext\n# Leaf\n");

        let states: Vec<FoldState> = (0..3)
            .map(|_| tree.cycle_fold_state(0).unwrap().state)
            .collect();
        assert_eq!(
            states,
            vec![
                FoldState::Folded,
                FoldState::ChildrenVisible,
                FoldState::Expanded
            ]
        );

        let states: Vec<FoldState> = (0..2)
            .map(|_| tree.cycle_fold_state(3).unwrap().state)
            .collect();
        assert_eq!(states, vec![FoldState::Folded, FoldState::Expanded]);

        assert_eq!(tree.cycle_fold_state(2), None);
    }

    #[test]
    fn test_rebuild_makes_old_handles_stale() {
        let mut tree = markdown("# A\n");
        let handle = tree.node_at_line(0).unwrap().handle;
        tree.cycle_fold_state(0);

        tree.rebuild("# A\n");

        assert!(tree.get(handle).is_none());
        assert!(!tree.set_fold_state(handle, FoldState::Folded));
        assert_eq!(tree.node_at_line(0).unwrap().fold_state, FoldState::Expanded);
    }

    #[test]
    fn test_leaf_never_stores_children_visible() {
        let mut tree = markdown("# Leaf\n");
        let handle = tree.node_at_line(0).unwrap().handle;

        tree.set_fold_state(handle, FoldState::ChildrenVisible);

        assert_eq!(tree.get(handle).unwrap().fold_state, FoldState::Expanded);
    }

    #[test]
    fn test_d3_export() {
        let mut tree = markdown("# A\nbody\n## B\n");
        tree.cycle_fold_state(0);

        let json = serde_json::to_value(tree.to_d3_format()).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{
                "id": "node-0",
                "line": 0,
                "level": 1,
                "title": "A",
                "content": "body",
                "collapsed": true,
                "children": [{
                    "id": "node-2",
                    "line": 2,
                    "level": 2,
                    "title": "B",
                    "content": "",
                    "collapsed": false,
                    "children": [],
                }],
            }])
        );
    }

    #[test]
    fn test_debug_info() {
        let mut tree = markdown("# Root\n## One\n### Deep\n## Two\n");
        tree.cycle_fold_state(1);

        assert_snapshot!(tree.debug_info(), @r"
        Root [line 0, level 1, EXPANDED, 2 children]
          One [line 1, level 2, FOLDED, 1 children]
            Deep [line 2, level 3, EXPANDED, 0 children]
          Two [line 3, level 2, EXPANDED, 0 children]
        ");
    }

    #[test]
    fn test_empty_document() {
        let tree = markdown("");

        assert!(tree.is_empty());
        assert!(tree.to_d3_format().is_empty());
        assert_eq!(tree.line_count(), 1);
    }
}
