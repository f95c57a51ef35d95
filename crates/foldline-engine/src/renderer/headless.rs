use std::collections::{BTreeSet, HashSet};

use foldline_syntax::HeadlineSyntax;

use super::{LineRange, Primitive, Renderer, RendererError};
use crate::folding::headline_folding_ranges;

/// In-memory renderer over headline fold regions.
///
/// A region spans a headline section (`line..=end_line`) when the section
/// has more than one line. Caret primitives act on the region that starts on
/// the caret line and do nothing when none does. Used by the terminal host
/// and by tests; individual primitives can be made to fail with
/// [`HeadlessRenderer::reject`], and every primitive call is recorded.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    syntax: HeadlineSyntax,
    lines: Vec<String>,
    regions: Vec<LineRange>,
    collapsed: BTreeSet<usize>,
    caret: usize,
    revealed: Option<usize>,
    rejected: HashSet<Primitive>,
    history: Vec<Primitive>,
}

impl HeadlessRenderer {
    pub fn new(syntax: HeadlineSyntax, text: &str) -> Self {
        let mut renderer = Self {
            syntax,
            lines: Vec::new(),
            regions: Vec::new(),
            collapsed: BTreeSet::new(),
            caret: 0,
            revealed: None,
            rejected: HashSet::new(),
            history: Vec::new(),
        };
        renderer.set_text(text);
        renderer
    }

    /// Load new text. Collapsed regions that still start on the same line
    /// stay collapsed.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        self.regions = headline_folding_ranges(self.syntax, text)
            .into_iter()
            .map(|range| LineRange::new(range.start, range.end))
            .collect();
        let starts: BTreeSet<usize> = self.regions.iter().map(|r| r.start).collect();
        self.collapsed.retain(|start| starts.contains(start));
        self.caret = self.caret.min(self.lines.len().saturating_sub(1));
    }

    pub fn regions(&self) -> &[LineRange] {
        &self.regions
    }

    /// Whether the region starting at `line` is collapsed.
    pub fn is_collapsed(&self, line: usize) -> bool {
        self.collapsed.contains(&line)
    }

    pub fn is_hidden(&self, line: usize) -> bool {
        self.collapsed_regions()
            .any(|region| region.start < line && line <= region.end)
    }

    /// Indices of all visible lines.
    pub fn visible_lines(&self) -> Vec<usize> {
        self.visible_line_ranges()
            .into_iter()
            .flat_map(|range| range.start..=range.end)
            .collect()
    }

    pub fn revealed_line(&self) -> Option<usize> {
        self.revealed
    }

    /// Make `primitive` fail until [`HeadlessRenderer::accept`] is called.
    pub fn reject(&mut self, primitive: Primitive) {
        self.rejected.insert(primitive);
    }

    pub fn accept(&mut self, primitive: Primitive) {
        self.rejected.remove(&primitive);
    }

    /// Primitives invoked so far, rejected ones included.
    pub fn history(&self) -> &[Primitive] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn collapsed_regions(&self) -> impl Iterator<Item = &LineRange> {
        self.regions
            .iter()
            .filter(|region| self.collapsed.contains(&region.start))
    }

    fn region_at_caret(&self) -> Option<LineRange> {
        self.regions
            .iter()
            .find(|region| region.start == self.caret)
            .copied()
    }

    /// Starts of `outer` and every region nested in it.
    fn nested_starts(&self, outer: LineRange) -> Vec<usize> {
        self.regions
            .iter()
            .filter(|region| outer.start <= region.start && region.end <= outer.end)
            .map(|region| region.start)
            .collect()
    }

    fn record(&mut self, primitive: Primitive) -> Result<(), RendererError> {
        self.history.push(primitive);
        if self.rejected.contains(&primitive) {
            return Err(RendererError::Rejected {
                primitive,
                reason: "rejected by test configuration".to_string(),
            });
        }
        Ok(())
    }
}

impl Renderer for HeadlessRenderer {
    fn fold(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::Fold)?;
        if let Some(region) = self.region_at_caret() {
            self.collapsed.insert(region.start);
        }
        Ok(())
    }

    fn unfold(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::Unfold)?;
        if let Some(region) = self.region_at_caret() {
            self.collapsed.remove(&region.start);
        }
        Ok(())
    }

    fn fold_recursively(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::FoldRecursively)?;
        if let Some(region) = self.region_at_caret() {
            self.collapsed.extend(self.nested_starts(region));
        }
        Ok(())
    }

    fn unfold_recursively(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::UnfoldRecursively)?;
        if let Some(region) = self.region_at_caret() {
            for start in self.nested_starts(region) {
                self.collapsed.remove(&start);
            }
        }
        Ok(())
    }

    fn toggle_fold(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::ToggleFold)?;
        if let Some(region) = self.region_at_caret()
            && !self.collapsed.remove(&region.start)
        {
            self.collapsed.insert(region.start);
        }
        Ok(())
    }

    fn fold_all(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::FoldAll)?;
        self.collapsed = self.regions.iter().map(|region| region.start).collect();
        Ok(())
    }

    fn unfold_all(&mut self) -> Result<(), RendererError> {
        self.record(Primitive::UnfoldAll)?;
        self.collapsed.clear();
        Ok(())
    }

    /// One sweep over the collapsed regions in start order. A collapsed
    /// region starting inside an earlier one is already hidden.
    fn visible_line_ranges(&self) -> Vec<LineRange> {
        let line_count = self.lines.len();
        let mut ranges = Vec::new();
        let mut next = 0;
        for region in self.collapsed_regions() {
            if region.start < next {
                next = next.max(region.end + 1);
                continue;
            }
            ranges.push(LineRange::new(next, region.start));
            next = region.end + 1;
        }
        if next < line_count {
            ranges.push(LineRange::new(next, line_count - 1));
        }
        ranges
    }

    fn move_caret_to(&mut self, line: usize, _column: usize) {
        self.caret = line.min(self.lines.len().saturating_sub(1));
    }

    fn reveal_line(&mut self, line: usize) {
        self.revealed = Some(line);
    }

    fn caret_line(&self) -> usize {
        self.caret
    }

    fn line_text(&self, line: usize) -> Option<String> {
        self.lines.get(line).cloned()
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn settle(&mut self, _pause: std::time::Duration) {}
}
