//! # foldline-engine
//!
//! Outline folding for Markdown and Org documents.
//!
//! - [`outline`]: the headline tree and its per-node fold state machine
//!   (`Expanded → Folded → ChildrenVisible → Expanded`, leaves skip the
//!   middle state).
//! - [`renderer`]: the interface to whatever actually shows the text, plus an
//!   in-memory [`HeadlessRenderer`].
//! - [`adapter`]: turns fold states into renderer primitives and reads
//!   visibility back.
//! - [`commands`]: per-document tree registry and the host-facing commands.
//! - [`editing`], [`folding`], [`symbols`], [`agenda`]: headline editing and
//!   the syntax-tree based providers.
//!
//! ```
//! use foldline_engine::{FoldCommands, HeadlessRenderer, SettleDelays, TextDocument, TreeRegistry};
//! use foldline_syntax::HeadlineSyntax;
//!
//! let text = "# Notes\nsome text\n## Detail\nmore\n";
//! let doc = TextDocument::new("notes.md", HeadlineSyntax::Markdown, text);
//! let mut renderer = HeadlessRenderer::new(HeadlineSyntax::Markdown, text);
//! let mut commands = FoldCommands::new(TreeRegistry::new(), SettleDelays::none());
//!
//! commands.cycle_folding(&doc, &mut renderer);
//! assert_eq!(renderer.visible_lines(), vec![0]);
//! ```

pub mod adapter;
pub mod agenda;
pub mod commands;
pub mod document;
pub mod editing;
pub mod folding;
pub mod outline;
pub mod renderer;
pub mod symbols;

pub use adapter::{EditorAdapter, SettleDelays};
pub use agenda::{AgendaItem, collect_agenda_items};
pub use commands::{CycleOutcome, FoldCommands, PanelIntent, PanelOutcome, TreeRegistry};
pub use document::{DocumentError, DocumentId, TextDocument};
pub use editing::{EditError, EditOutcome, NoTarget};
pub use folding::{FoldingKind, FoldingRange, headline_folding_ranges, syntax_folding_ranges};
pub use outline::{D3Node, FoldCycle, FoldState, NodeHandle, OutlineNode, OutlineTree};
pub use renderer::{HeadlessRenderer, LineRange, Primitive, Renderer, RendererError};
pub use symbols::{DocumentSymbol, SymbolKind, document_symbols};
