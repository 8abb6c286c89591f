//! Task board access: the card/list operations the reconciler consumes.

pub mod model;
pub mod trello;

pub use model::{BoardList, Card};
pub use trello::TrelloClient;

use async_trait::async_trait;

use crate::error::BoardError;

/// Operations against a single task board.
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Fetch every open card on the board.
    async fn list_cards(&self) -> Result<Vec<Card>, BoardError>;

    /// Move a card into another list.
    ///
    /// A failure is returned as a value so callers can keep going with other cards.
    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), BoardError>;

    /// Fetch the board's lists. Used for configuration checks only.
    async fn list_board_lists(&self) -> Result<Vec<BoardList>, BoardError>;
}
