//! Concrete B+-tree type aliases for the reservation services (§6.1).
//!
//! The capacity const generics are `N + 1` / `M + 1` (§4.5) and must track
//! `storage::EngineConfig`'s documented `node_fanout`/`page_capacity`
//! defaults (63) — see that module's doc comment on why these can't be
//! threaded through at runtime.

use model::{Order, Train, User};
use model::train::TRAIN_ID_LEN;
use model::fixed_str::FixedStr;
use storage::BTree;

const NODE_CAP: usize = 64;
const PAGE_CAP: usize = 64;

/// `hash64(username) -> User` (§4.6).
pub type UserTree = BTree<u64, User, NODE_CAP, PAGE_CAP>;

/// `hash64(trainID) -> Train` (§4.7.1).
pub type TrainTree = BTree<u64, Train, NODE_CAP, PAGE_CAP>;

/// `(hash64(from), hash64(to)) -> trainID` (§4.7.1 `releaseTrain`,
/// `byPair`).
pub type TicketLookupTree = BTree<(u64, u64), FixedStr<TRAIN_ID_LEN>, NODE_CAP, PAGE_CAP>;

/// `hash64(from) -> trainID` (§4.7.1 `releaseTrain`, `byFrom`).
pub type TransferLookupTree = BTree<u64, FixedStr<TRAIN_ID_LEN>, NODE_CAP, PAGE_CAP>;

/// `hash64(username) -> Order` (§4.8 `byUser`).
pub type OrderTree = BTree<u64, Order, NODE_CAP, PAGE_CAP>;

/// `(hash64(trainID), originDateMMDD) -> Order` (§4.8 `pendingByTrain`).
pub type PendingTree = BTree<(u64, u16), Order, NODE_CAP, PAGE_CAP>;
