//! # recmap-store
//!
//! Store access layer for [`recmap`](https://docs.rs/recmap): the
//! [`ItemStore`] abstraction over a hosted key/range item store, an
//! in-memory backend that emulates its conditional-write semantics, and the
//! high-level [`RecordMapper`] combining schemas, migrations, optimistic
//! locking, rate gating, and batch chunking.
//!
//! ## Quick Start
//!
//! ```
//! use recmap::{AttrValue, ConditionExpression, RawItem};
//! use recmap_store::{ItemKey, ItemStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! let key = ItemKey::new("id", AttrValue::from("a"));
//! let mut item = RawItem::new();
//! item.insert("id".into(), AttrValue::from("a"));
//! store
//!     .put_item("docs", &key, item, &ConditionExpression::default())
//!     .unwrap();
//! assert!(store.get_item("docs", &key, false).unwrap().is_some());
//! ```
//!
//! ## Pieces
//!
//! | Piece | Role |
//! |-------|------|
//! | [`ItemStore`] | backend contract: conditional writes, queries, batches |
//! | [`MemoryStore`] | in-memory emulation for tests and prototyping |
//! | [`RecordMapper`] | typed save/update/get/query/scan/batch over a backend |
//! | [`RateGate`] | optional blocking capacity gate per store round trip |

#![warn(missing_docs)]

mod codec;
mod limiter;
mod mapper;
mod memory;
mod requests;
mod traits;

pub use codec::{decode_item, encode_item, CodecError};
pub use limiter::{RateGate, ReadWriteGates, Unthrottled};
pub use mapper::{MapperError, RecordMapper, RecordMapperBuilder};
pub use memory::{MemoryError, MemoryStore};
pub use requests::{
    BatchGetResult, BatchWriteResult, DeleteRequest, GetRequest, QueryRequest, SaveParams,
    ScanRequest,
};
pub use traits::{
    BatchGetOutput, ItemKey, ItemStore, KeyCondition, RangeCondition, WriteOutcome,
    MAX_BATCH_GET, MAX_BATCH_WRITE,
};
