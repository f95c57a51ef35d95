//! # Fold commands
//!
//! Entry points a host binds to keys and notifications. Trees live in a
//! [`TreeRegistry`] keyed by document id: created on first use, rebuilt in
//! place when the document changes, dropped when it closes. A rebuild keeps
//! the `OutlineTree` value in place, so a host holding the registry never
//! sees it swapped out, but every [`NodeHandle`](crate::NodeHandle) from
//! before the rebuild goes stale.

use std::collections::HashMap;

use log::debug;

use crate::adapter::{EditorAdapter, SettleDelays};
use crate::document::{DocumentId, TextDocument};
use crate::editing::{self, EditError, EditOutcome, NoTarget};
use crate::outline::OutlineTree;
use crate::renderer::Renderer;

struct RegistryEntry {
    version: u64,
    tree: OutlineTree,
}

/// Outline trees of the open documents.
#[derive(Default)]
pub struct TreeRegistry {
    trees: HashMap<DocumentId, RegistryEntry>,
}

impl TreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document's tree, built on first access and rebuilt when the
    /// document has been edited since.
    pub fn get_or_create(&mut self, doc: &TextDocument) -> &mut OutlineTree {
        let entry = self.trees.entry(doc.id().clone()).or_insert_with(|| {
            debug!("building outline for {}", doc.id());
            RegistryEntry {
                version: doc.version(),
                tree: OutlineTree::from_text(doc.syntax(), &doc.text()),
            }
        });
        if entry.version != doc.version() {
            debug!("outline for {} is stale, rebuilding", doc.id());
            entry.tree.rebuild(&doc.text());
            entry.version = doc.version();
        }
        &mut entry.tree
    }

    pub fn get(&self, id: &DocumentId) -> Option<&OutlineTree> {
        self.trees.get(id).map(|entry| &entry.tree)
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.trees.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Rebuild the cached tree, if any, from the new text.
    pub fn document_changed(&mut self, doc: &TextDocument) {
        if let Some(entry) = self.trees.get_mut(doc.id()) {
            debug!("{} changed, rebuilding outline", doc.id());
            entry.tree.rebuild(&doc.text());
            entry.version = doc.version();
        }
    }

    /// Forget the document's tree. Returns whether one was cached.
    pub fn document_closed(&mut self, id: &DocumentId) -> bool {
        debug!("{id} closed");
        self.trees.remove(id).is_some()
    }
}

/// Result of [`FoldCommands::cycle_folding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Cycled,
    /// Caret is not on a headline; the host should run the key's default
    /// action.
    PassThrough,
}

/// Requests from an outline visualization panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelIntent {
    SelectNode {
        line: usize,
    },
    FoldNode {
        line: usize,
    },
    SaveNode {
        line: usize,
        title: String,
        content: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOutcome {
    CaretMoved,
    Folded,
    /// The document text changed; the host must reload its view.
    Saved,
    NoTarget(NoTarget),
}

pub struct FoldCommands {
    registry: TreeRegistry,
    delays: SettleDelays,
}

impl FoldCommands {
    pub fn new(registry: TreeRegistry, delays: SettleDelays) -> Self {
        Self { registry, delays }
    }

    pub fn registry(&self) -> &TreeRegistry {
        &self.registry
    }

    pub fn delays(&self) -> SettleDelays {
        self.delays
    }

    /// Cycle folding of the headline under the caret. The tree is synced
    /// with the renderer first, since the user may have folded by other
    /// means.
    pub fn cycle_folding<R: Renderer + ?Sized>(
        &mut self,
        doc: &TextDocument,
        renderer: &mut R,
    ) -> CycleOutcome {
        let caret = renderer.caret_line();
        let on_headline = renderer
            .line_text(caret)
            .is_some_and(|text| doc.syntax().is_headline(&text));
        if !on_headline {
            return CycleOutcome::PassThrough;
        }

        let tree = self.registry.get_or_create(doc);
        if tree.node_at_line(caret).is_none() {
            return CycleOutcome::PassThrough;
        }

        let mut adapter = EditorAdapter::new(renderer, tree, self.delays);
        adapter.sync_tree_with_editor();
        if adapter.cycle_folding_at_cursor() {
            CycleOutcome::Cycled
        } else {
            CycleOutcome::PassThrough
        }
    }

    /// Fold every level-1 headline.
    pub fn fold_all<R: Renderer + ?Sized>(&mut self, doc: &TextDocument, renderer: &mut R) {
        let tree = self.registry.get_or_create(doc);
        EditorAdapter::new(renderer, tree, self.delays).fold_top_level();
    }

    pub fn unfold_all<R: Renderer + ?Sized>(&mut self, doc: &TextDocument, renderer: &mut R) {
        let tree = self.registry.get_or_create(doc);
        EditorAdapter::new(renderer, tree, self.delays).unfold_everything();
    }

    pub fn handle_panel_intent<R: Renderer + ?Sized>(
        &mut self,
        doc: &mut TextDocument,
        renderer: &mut R,
        intent: PanelIntent,
    ) -> Result<PanelOutcome, EditError> {
        debug!("panel intent {intent:?}");
        match intent {
            PanelIntent::SelectNode { line } => {
                renderer.move_caret_to(line, 0);
                renderer.reveal_line(line);
                Ok(PanelOutcome::CaretMoved)
            }
            PanelIntent::FoldNode { line } => {
                let tree = self.registry.get_or_create(doc);
                if EditorAdapter::new(renderer, tree, self.delays).fold_line(line) {
                    Ok(PanelOutcome::Folded)
                } else {
                    Ok(PanelOutcome::NoTarget(NoTarget::NotOnHeadline))
                }
            }
            PanelIntent::SaveNode {
                line,
                title,
                content,
            } => match editing::save_node(doc, line, &title, &content)? {
                EditOutcome::Applied { .. } => {
                    self.registry.document_changed(doc);
                    Ok(PanelOutcome::Saved)
                }
                EditOutcome::NoTarget(reason) => Ok(PanelOutcome::NoTarget(reason)),
            },
        }
    }

    /// The document's tree, for visualization.
    pub fn tree_for(&mut self, doc: &TextDocument) -> &OutlineTree {
        self.registry.get_or_create(doc)
    }

    pub fn document_changed(&mut self, doc: &TextDocument) {
        self.registry.document_changed(doc);
    }

    pub fn document_closed(&mut self, id: &DocumentId) -> bool {
        self.registry.document_closed(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::FoldState;
    use crate::renderer::HeadlessRenderer;
    use foldline_syntax::HeadlineSyntax;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "# A\na\n## B\nb\n# C\nc\n";

    fn setup() -> (FoldCommands, TextDocument, HeadlessRenderer) {
        (
            FoldCommands::new(TreeRegistry::new(), SettleDelays::none()),
            TextDocument::new("notes.md", HeadlineSyntax::Markdown, TEXT),
            HeadlessRenderer::new(HeadlineSyntax::Markdown, TEXT),
        )
    }

    #[test]
    fn test_registry_lifecycle() {
        let mut registry = TreeRegistry::new();
        let mut doc = TextDocument::new("notes.md", HeadlineSyntax::Markdown, "# A\n");

        let generation = registry.get_or_create(&doc).generation();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_or_create(&doc).generation(), generation);

        doc.set_text("# A\n# B\n");
        assert_eq!(registry.get_or_create(&doc).len(), 2);
        assert_ne!(registry.get(doc.id()).unwrap().generation(), generation);

        assert!(registry.document_closed(doc.id()));
        assert!(!registry.contains(doc.id()));
        assert!(!registry.document_closed(doc.id()));
    }

    #[test]
    fn test_document_changed_ignores_unknown_documents() {
        let mut registry = TreeRegistry::new();
        let doc = TextDocument::new("notes.md", HeadlineSyntax::Markdown, "# A\n");

        registry.document_changed(&doc);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_cycle_off_headline_passes_through() {
        let (mut commands, doc, mut renderer) = setup();
        renderer.move_caret_to(1, 0);

        assert_eq!(
            commands.cycle_folding(&doc, &mut renderer),
            CycleOutcome::PassThrough
        );
        assert!(commands.registry().is_empty());
    }

    #[test]
    fn test_cycle_syncs_before_cycling() {
        // Given: the user folded A directly in the renderer
        let (mut commands, doc, mut renderer) = setup();
        renderer.fold().unwrap();

        // When
        let outcome = commands.cycle_folding(&doc, &mut renderer);

        // Then: Folded -> ChildrenVisible, not Expanded -> Folded
        assert_eq!(outcome, CycleOutcome::Cycled);
        let tree = commands.tree_for(&doc);
        assert_eq!(
            tree.node_at_line(0).unwrap().fold_state,
            FoldState::ChildrenVisible
        );
        assert!(!renderer.is_collapsed(0));
        assert!(renderer.is_collapsed(2));
    }

    #[test]
    fn test_fold_all_and_unfold_all() {
        let (mut commands, doc, mut renderer) = setup();

        commands.fold_all(&doc, &mut renderer);
        assert_eq!(renderer.visible_lines(), vec![0, 4]);

        commands.unfold_all(&doc, &mut renderer);
        assert_eq!(renderer.visible_lines().len(), 7);
        assert!(
            commands
                .tree_for(&doc)
                .all_nodes()
                .all(|node| node.fold_state == FoldState::Expanded)
        );
    }

    #[test]
    fn test_panel_intents() {
        let (mut commands, mut doc, mut renderer) = setup();

        let selected = commands
            .handle_panel_intent(&mut doc, &mut renderer, PanelIntent::SelectNode { line: 2 })
            .unwrap();
        assert_eq!(selected, PanelOutcome::CaretMoved);
        assert_eq!(renderer.caret_line(), 2);
        assert_eq!(renderer.revealed_line(), Some(2));

        let folded = commands
            .handle_panel_intent(&mut doc, &mut renderer, PanelIntent::FoldNode { line: 4 })
            .unwrap();
        assert_eq!(folded, PanelOutcome::Folded);
        assert!(renderer.is_collapsed(4));

        let missed = commands
            .handle_panel_intent(&mut doc, &mut renderer, PanelIntent::FoldNode { line: 1 })
            .unwrap();
        assert_eq!(missed, PanelOutcome::NoTarget(NoTarget::NotOnHeadline));
    }

    #[test]
    fn test_save_node_rebuilds_tree() {
        let (mut commands, mut doc, mut renderer) = setup();
        commands.tree_for(&doc);

        let saved = commands
            .handle_panel_intent(
                &mut doc,
                &mut renderer,
                PanelIntent::SaveNode {
                    line: 2,
                    title: "Renamed".to_string(),
                    content: "new\ntext".to_string(),
                },
            )
            .unwrap();

        assert_eq!(saved, PanelOutcome::Saved);
        assert_eq!(doc.text(), "# A\na\n## Renamed\nnew\ntext\n# C\nc\n");
        let tree = commands.registry().get(doc.id()).unwrap();
        assert_eq!(tree.node_at_line(2).unwrap().title, "Renamed");
        assert_eq!(tree.node_at_line(5).unwrap().title, "C");
    }
}
