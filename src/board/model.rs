//! Board data model: cards and lists as returned by the board API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A card as observed at the start of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    /// Due instant, if the card has one.
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    /// The list the card currently sits in.
    #[serde(rename = "idList")]
    pub list_id: String,
}

impl Card {
    pub fn new(id: impl Into<String>, name: impl Into<String>, list_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            due: None,
            list_id: list_id.into(),
        }
    }

    /// Builder: set due date.
    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }
}

/// A list on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}
