//! The reservation state machine (§4): the user registry, train catalog
//! and seat inventory, and order ledger, each backed by the storage
//! layer's B+-trees and paged files.

pub mod error;
mod order_service;
mod train_service;
mod trees;
mod user_service;

pub use error::{Error, Result};
pub use order_service::{BuyOutcome, OrderService};
pub use train_service::{
    BuyTicketOutcome, SortBy, StationLine, TicketCandidate, TrainService, TransferCandidate,
};
pub use user_service::UserService;
