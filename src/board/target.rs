use std::str::FromStr;

use crate::models::Stage;

/// Where a card was dropped: a stage column, or another card (meaning that
/// card's current stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Column(Stage),
    Card(i64),
}

impl FromStr for DropTarget {
    type Err = String;

    /// Accepts `column-<Stage>`, `deal-<id>`, a bare stage label, or a bare deal id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(label) = s.strip_prefix("column-") {
            return label.parse().map(DropTarget::Column);
        }
        if let Some(id) = s.strip_prefix("deal-") {
            return id
                .parse()
                .map(DropTarget::Card)
                .map_err(|_| format!("Invalid deal id in drop target: {}", s));
        }
        if let Ok(stage) = s.parse::<Stage>() {
            return Ok(DropTarget::Column(stage));
        }
        s.parse()
            .map(DropTarget::Card)
            .map_err(|_| format!("Invalid drop target: {}", s))
    }
}
