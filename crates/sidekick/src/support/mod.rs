//! Customer support: a ticket store on disk and a searchable knowledge base.

mod embed;
mod knowledge;
mod tickets;
pub mod tools;

use std::io;

use thiserror::Error;

pub use embed::HashingEmbedder;
pub use knowledge::{KnowledgeBase, SearchHit, TOP_K_RESULTS};
pub use tickets::{Note, Priority, Ticket, TicketStatus, TicketStore, TicketUpdate};

#[derive(Debug, Error)]
pub enum SupportError {
    #[error("Ticket {0} not found.")]
    TicketNotFound(String),
    #[error("'{0}' is not a valid ticket id (expected TKT-YYYYMMDDHHMMSS)")]
    InvalidTicketId(String),
    #[error("ticket subject must not be empty")]
    EmptySubject,
    #[error("search query must not be empty")]
    EmptyQuery,
    #[error("malformed ticket file: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl SupportError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SupportError::TicketNotFound(_)
                | SupportError::InvalidTicketId(_)
                | SupportError::EmptySubject
                | SupportError::EmptyQuery
        )
    }
}
