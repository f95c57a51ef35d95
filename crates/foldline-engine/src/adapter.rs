//! # Editor adapter
//!
//! The only code that issues folding primitives. It turns the fold state the
//! outline tree wants into renderer calls, and rebuilds the tree's fold state
//! from what the renderer reports as visible.
//!
//! Renderer calls return once the host has processed them, but hosts may
//! still be animating. After each primitive the adapter pauses through
//! [`Renderer::settle`] for a configurable time. This is a heuristic and the
//! usual cause of flaky folding on slow hosts; tests use
//! [`SettleDelays::none`].

use std::time::Duration;

use log::{debug, trace, warn};

use crate::outline::{FoldState, NodeHandle, OutlineTree};
use crate::renderer::{LineRange, Primitive, Renderer};

/// Pauses inserted after renderer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// After moving the caret.
    pub caret: Duration,
    /// After each fold primitive.
    pub primitive: Duration,
    /// After folding each child in the `ChildrenVisible` branch.
    pub child: Duration,
    /// Before reading visibility back.
    pub verify: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            caret: Duration::from_millis(10),
            primitive: Duration::from_millis(50),
            child: Duration::from_millis(20),
            verify: Duration::from_millis(100),
        }
    }
}

impl SettleDelays {
    pub fn none() -> Self {
        Self {
            caret: Duration::ZERO,
            primitive: Duration::ZERO,
            child: Duration::ZERO,
            verify: Duration::ZERO,
        }
    }
}

pub struct EditorAdapter<'a, R: Renderer + ?Sized> {
    renderer: &'a mut R,
    tree: &'a mut OutlineTree,
    delays: SettleDelays,
}

impl<'a, R: Renderer + ?Sized> EditorAdapter<'a, R> {
    pub fn new(renderer: &'a mut R, tree: &'a mut OutlineTree, delays: SettleDelays) -> Self {
        Self {
            renderer,
            tree,
            delays,
        }
    }

    pub fn tree(&self) -> &OutlineTree {
        self.tree
    }

    /// Drive the renderer towards `state` for the node and record it.
    /// Returns `false` if the handle is stale.
    pub fn apply_fold_state(&mut self, handle: NodeHandle, state: FoldState) -> bool {
        let Some(node) = self.tree.get(handle) else {
            debug!("apply_fold_state: stale handle {handle:?}");
            return false;
        };
        let line = node.line;
        let has_children = node.has_children();
        let children: Vec<usize> = self.tree.children(node).map(|child| child.line).collect();

        self.move_caret(line);

        if has_children && state != FoldState::ChildrenVisible {
            self.apply_with_toggle(line, state);
        } else {
            self.apply_recursively(line, state, &children);
        }

        self.tree.set_fold_state(handle, state);
        true
    }

    /// Caret must already be on `line`. One toggle flips the node's own region
    /// when the renderer disagrees with the target; when it already agrees the
    /// recursive branch still runs so that descendants end up consistent.
    fn apply_with_toggle(&mut self, line: usize, state: FoldState) {
        let want_folded = state == FoldState::Folded;
        if self.is_line_folded(line) != want_folded {
            debug!("line {line}: toggling towards {state}");
            self.run_sequence(&[(Primitive::ToggleFold, self.delays.primitive)]);
        } else {
            debug!("line {line}: already matches {state}, applying recursively");
            self.apply_recursively(line, state, &[]);
        }
    }

    /// Caret must already be on `line`.
    fn apply_recursively(&mut self, line: usize, state: FoldState, children: &[usize]) {
        let pause = self.delays.primitive;
        match state {
            FoldState::Expanded => {
                self.run_sequence(&[
                    (Primitive::Fold, pause),
                    (Primitive::UnfoldRecursively, pause),
                ]);
            }
            FoldState::Folded => {
                self.run_sequence(&[
                    (Primitive::Unfold, pause),
                    (Primitive::FoldRecursively, pause),
                ]);
            }
            FoldState::ChildrenVisible => {
                self.run_sequence(&[(Primitive::UnfoldRecursively, pause)]);
                for &child in children {
                    self.move_caret(child);
                    self.run_sequence(&[(Primitive::FoldRecursively, self.delays.child)]);
                }
                self.move_caret(line);
            }
        }
    }

    /// Folded when the first non-blank line after `line` is not visible.
    /// Nothing after `line` means nothing to fold.
    pub fn is_line_folded(&self, line: usize) -> bool {
        self.is_folded_in(line, &self.renderer.visible_line_ranges())
    }

    /// `visible` must be sorted by start line, as renderers report it.
    fn is_folded_in(&self, line: usize, visible: &[LineRange]) -> bool {
        let line_count = self.renderer.line_count();
        let content_line = (line + 1..line_count).find(|&l| {
            self.renderer
                .line_text(l)
                .is_some_and(|text| !text.trim().is_empty())
        });
        let Some(content_line) = content_line else {
            return false;
        };
        let index = visible.partition_point(|range| range.end < content_line);
        !visible
            .get(index)
            .is_some_and(|range| range.contains(content_line))
    }

    /// Recompute every node's fold state from renderer visibility. Parents
    /// only look at their direct children. Visibility is read once per pass.
    pub fn sync_tree_with_editor(&mut self) {
        self.renderer.settle(self.delays.verify);
        let visible = self.renderer.visible_line_ranges();

        let observed: Vec<(NodeHandle, FoldState)> = self
            .tree
            .all_nodes()
            .map(|node| {
                let state = if self.is_folded_in(node.line, &visible) {
                    FoldState::Folded
                } else if self
                    .tree
                    .children(node)
                    .any(|child| self.is_folded_in(child.line, &visible))
                {
                    FoldState::ChildrenVisible
                } else {
                    FoldState::Expanded
                };
                (node.handle, state)
            })
            .collect();

        for (handle, state) in observed {
            self.tree.set_fold_state(handle, state);
        }
        trace!("synced tree:\n{}", self.tree.debug_info());
    }

    /// Cycle the node under the caret. `false` when the caret is not on a
    /// headline.
    pub fn cycle_folding_at_cursor(&mut self) -> bool {
        let line = self.renderer.caret_line();
        let Some(cycle) = self.tree.cycle_fold_state(line) else {
            return false;
        };
        debug!("cycling line {line} to {}", cycle.state);
        self.apply_fold_state(cycle.node, cycle.state)
    }

    /// Fold the region at `line` and record it, if a headline starts there.
    pub fn fold_line(&mut self, line: usize) -> bool {
        let Some(handle) = self.tree.node_at_line(line).map(|node| node.handle) else {
            return false;
        };
        self.move_caret(line);
        self.run_sequence(&[(Primitive::Fold, self.delays.primitive)]);
        self.tree.set_fold_state(handle, FoldState::Folded);
        true
    }

    /// Show only level-1 headlines: unfold everything first, then fold each
    /// top-level node in document order.
    pub fn fold_top_level(&mut self) {
        self.unfold_everything();
        let top: Vec<usize> = self
            .tree
            .all_nodes()
            .filter(|node| node.level == 1)
            .map(|node| node.line)
            .collect();
        for line in top {
            self.fold_line(line);
        }
    }

    pub fn unfold_everything(&mut self) {
        self.run_sequence(&[(Primitive::UnfoldAll, self.delays.primitive)]);
        let handles: Vec<NodeHandle> = self.tree.all_nodes().map(|node| node.handle).collect();
        for handle in handles {
            self.tree.set_fold_state(handle, FoldState::Expanded);
        }
    }

    fn move_caret(&mut self, line: usize) {
        self.renderer.move_caret_to(line, 0);
        self.renderer.reveal_line(line);
        self.renderer.settle(self.delays.caret);
    }

    /// Run primitives in order. The first failure is answered with a single
    /// `toggle_fold` and the rest of the sequence is dropped.
    fn run_sequence(&mut self, steps: &[(Primitive, Duration)]) {
        for &(primitive, pause) in steps {
            trace!("primitive {primitive}");
            match self.renderer.invoke(primitive) {
                Ok(()) => self.renderer.settle(pause),
                Err(error) => {
                    warn!("{error}; falling back to toggle-fold");
                    if primitive != Primitive::ToggleFold
                        && let Err(error) = self.renderer.toggle_fold()
                    {
                        warn!("fallback failed: {error}");
                    }
                    self.renderer.settle(pause);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessRenderer;
    use foldline_syntax::HeadlineSyntax;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "# A\na\n## B\nb\n### B1\nb1\n## C\nc\n# D\nd\n";

    fn setup() -> (HeadlessRenderer, OutlineTree) {
        (
            HeadlessRenderer::new(HeadlineSyntax::Markdown, TEXT),
            OutlineTree::from_text(HeadlineSyntax::Markdown, TEXT),
        )
    }

    fn states(tree: &OutlineTree) -> Vec<(usize, FoldState)> {
        tree.all_nodes().map(|n| (n.line, n.fold_state)).collect()
    }

    #[test]
    fn test_full_cycle_on_parent() {
        let (mut renderer, mut tree) = setup();
        renderer.move_caret_to(0, 0);
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        // When: Expanded -> Folded
        assert!(adapter.cycle_folding_at_cursor());
        // Then
        assert!(adapter.is_line_folded(0));

        // When: Folded -> ChildrenVisible
        assert!(adapter.cycle_folding_at_cursor());
        // Then
        assert!(!adapter.is_line_folded(0));
        assert!(adapter.is_line_folded(2));
        assert!(adapter.is_line_folded(6));

        // When: ChildrenVisible -> Expanded
        assert!(adapter.cycle_folding_at_cursor());
        // Then
        assert!(!adapter.is_line_folded(2));
        assert!(!adapter.is_line_folded(4));
        drop(adapter);
        assert_eq!(renderer.visible_lines().len(), 11);
        assert_eq!(tree.node_at_line(0).unwrap().fold_state, FoldState::Expanded);
    }

    #[test]
    fn test_children_visible_folds_each_direct_child() {
        let (mut renderer, mut tree) = setup();
        let handle = tree.node_at_line(0).unwrap().handle;
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.apply_fold_state(handle, FoldState::ChildrenVisible);

        drop(adapter);
        assert_eq!(
            renderer.history(),
            &[
                Primitive::UnfoldRecursively,
                Primitive::FoldRecursively,
                Primitive::FoldRecursively
            ]
        );
        assert!(renderer.is_collapsed(2));
        assert!(renderer.is_collapsed(4));
        assert!(renderer.is_collapsed(6));
        assert_eq!(renderer.caret_line(), 0);
    }

    #[test]
    fn test_toggle_fast_path_issues_single_toggle() {
        let (mut renderer, mut tree) = setup();
        let handle = tree.node_at_line(0).unwrap().handle;
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.apply_fold_state(handle, FoldState::Folded);

        drop(adapter);
        assert_eq!(renderer.history(), &[Primitive::ToggleFold]);
        assert!(renderer.is_collapsed(0));
    }

    #[test]
    fn test_leaf_uses_recursive_branch() {
        let (mut renderer, mut tree) = setup();
        let handle = tree.node_at_line(8).unwrap().handle;
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.apply_fold_state(handle, FoldState::Folded);

        drop(adapter);
        assert_eq!(
            renderer.history(),
            &[Primitive::Unfold, Primitive::FoldRecursively]
        );
        assert!(renderer.is_collapsed(8));
    }

    #[test]
    fn test_failed_primitive_falls_back_to_toggle_once() {
        let (mut renderer, mut tree) = setup();
        renderer.reject(Primitive::Unfold);
        let handle = tree.node_at_line(8).unwrap().handle;
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.apply_fold_state(handle, FoldState::Folded);

        assert_eq!(
            adapter.tree().node_at_line(8).unwrap().fold_state,
            FoldState::Folded
        );
        drop(adapter);
        assert_eq!(
            renderer.history(),
            &[Primitive::Unfold, Primitive::ToggleFold]
        );
        assert!(renderer.is_collapsed(8));
    }

    #[test]
    fn test_is_line_folded_skips_blank_lines() {
        let text = "# A\n\n\nbody\n# B\n";
        let mut renderer = HeadlessRenderer::new(HeadlineSyntax::Markdown, text);
        let mut tree = OutlineTree::from_text(HeadlineSyntax::Markdown, text);
        renderer.fold().unwrap();
        let adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        assert!(adapter.is_line_folded(0));
        assert!(!adapter.is_line_folded(4));
        assert!(!adapter.is_line_folded(5));
    }

    #[test]
    fn test_sync_reads_renderer_state_and_is_idempotent() {
        let (mut renderer, mut tree) = setup();
        renderer.move_caret_to(2, 0);
        renderer.fold().unwrap();
        renderer.move_caret_to(8, 0);
        renderer.fold().unwrap();
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.sync_tree_with_editor();
        let first = states(adapter.tree());
        adapter.sync_tree_with_editor();

        assert_eq!(states(adapter.tree()), first);
        assert_eq!(
            first,
            vec![
                (0, FoldState::ChildrenVisible),
                (2, FoldState::Folded),
                (4, FoldState::Folded),
                (6, FoldState::Expanded),
                (8, FoldState::Folded),
            ]
        );
    }

    #[test]
    fn test_sync_handles_thousands_of_lines() {
        // Given: 4000 lines, every region collapsed
        let text: String = (0..1000)
            .map(|i| format!("# H{i}\nbody\n## C{i}\nmore\n"))
            .collect();
        let mut renderer = HeadlessRenderer::new(HeadlineSyntax::Markdown, &text);
        let mut tree = OutlineTree::from_text(HeadlineSyntax::Markdown, &text);
        renderer.fold_all().unwrap();
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        // When
        adapter.sync_tree_with_editor();

        // Then
        let tree = adapter.tree();
        assert_eq!(tree.len(), 2000);
        assert!(
            tree.all_nodes()
                .all(|node| node.fold_state == FoldState::Folded)
        );
    }

    #[test]
    fn test_sync_checks_direct_children_only() {
        let (mut renderer, mut tree) = setup();
        renderer.move_caret_to(4, 0);
        renderer.fold().unwrap();
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.sync_tree_with_editor();

        let tree = adapter.tree();
        assert_eq!(tree.node_at_line(0).unwrap().fold_state, FoldState::Expanded);
        assert_eq!(
            tree.node_at_line(2).unwrap().fold_state,
            FoldState::ChildrenVisible
        );
    }

    #[test]
    fn test_cycle_off_headline_is_no_op() {
        let (mut renderer, mut tree) = setup();
        renderer.move_caret_to(1, 0);
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        assert!(!adapter.cycle_folding_at_cursor());
        drop(adapter);
        assert!(renderer.history().is_empty());
    }

    #[test]
    fn test_fold_top_level() {
        let (mut renderer, mut tree) = setup();
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        adapter.fold_top_level();

        drop(adapter);
        assert_eq!(renderer.visible_lines(), vec![0, 8]);
        assert_eq!(tree.node_at_line(0).unwrap().fold_state, FoldState::Folded);
        assert_eq!(tree.node_at_line(2).unwrap().fold_state, FoldState::Expanded);
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let (mut renderer, mut tree) = setup();
        let handle = tree.node_at_line(0).unwrap().handle;
        tree.rebuild(TEXT);
        let mut adapter = EditorAdapter::new(&mut renderer, &mut tree, SettleDelays::none());

        assert!(!adapter.apply_fold_state(handle, FoldState::Folded));
        drop(adapter);
        assert!(renderer.history().is_empty());
    }
}
