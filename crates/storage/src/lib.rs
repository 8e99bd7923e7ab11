//! The disk-resident storage layer: F, V, C, CF, and B (§4.1–§4.5).

pub mod btree;
pub mod cache;
pub mod cached_file;
pub mod config;
pub mod engine;
pub mod error;
pub mod paged_file;
pub mod record;
pub mod varint_file;

pub use btree::BTree;
pub use cache::LruKCache;
pub use cached_file::CachedPagedFile;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use paged_file::PagedFile;
pub use record::{Bounded, Codec, FixedSizeRecord};
pub use varint_file::VarIntFile;
