use std::fmt;

use serde::Serialize;

/// Visual fold state of an outline node.
///
/// Leaves toggle between `Expanded` and `Folded`. Parents cycle
/// `Expanded → Folded → ChildrenVisible → Expanded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FoldState {
    #[default]
    Expanded,
    Folded,
    /// Own body visible, each direct child collapsed.
    ChildrenVisible,
}

impl FoldState {
    /// Next state in the cycle for a node with or without children.
    pub fn next(self, has_children: bool) -> FoldState {
        match (has_children, self) {
            (false, FoldState::Expanded) => FoldState::Folded,
            (false, _) => FoldState::Expanded,
            (true, FoldState::Expanded) => FoldState::Folded,
            (true, FoldState::Folded) => FoldState::ChildrenVisible,
            (true, FoldState::ChildrenVisible) => FoldState::Expanded,
        }
    }

    /// Leaves cannot show "children only".
    pub fn normalized(self, has_children: bool) -> FoldState {
        match (has_children, self) {
            (false, FoldState::ChildrenVisible) => FoldState::Expanded,
            (_, state) => state,
        }
    }
}

impl fmt::Display for FoldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FoldState::Expanded => "EXPANDED",
            FoldState::Folded => "FOLDED",
            FoldState::ChildrenVisible => "CHILDREN_VISIBLE",
        })
    }
}
