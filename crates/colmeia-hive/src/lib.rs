//! Colmeia Hive - shared household groups with vote-gated deletions
//!
//! Members of a group ("colmeia") share tasks, routines, expenses and a
//! shopping list. Destructive actions in groups of three or more members
//! go through a vote; smaller groups act directly.
//!
//! # Architecture
//!
//! - **Models**: Group, member, vote and activity records
//! - **Storage**: Document store over RocksDB or memory, with a change feed
//! - **Voting**: Vote ledger, quorum-triggered execution, direct fallback
//! - **Cascade**: Resumable removal of a whole group
//! - **API**: HTTP endpoints and a live vote feed for clients
//!
//! # Example
//!
//! ```no_run
//! use colmeia_hive::{HiveConfig, HiveNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HiveConfig::from_env()?;
//!     let node = HiveNode::new(config)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod api;
pub mod cascade;
pub mod error;
pub mod groups;
pub mod identity;
pub mod models;
pub mod node;
pub mod storage;
pub mod voting;
pub mod ws;

pub use activity::{ActivityLog, ActivitySink, StoreActivitySink};
pub use colmeia_quorum::{ActionKind, Quorum};
pub use error::{Error, Result};
pub use groups::GroupDirectory;
pub use identity::Actor;
pub use models::{Activity, ActivityKind, Group, Member, MemberRole, Vote, VoteStatus};
pub use node::{HiveConfig, HiveNode, HiveState};
pub use storage::{DocumentStore, DocumentStoreExt, MemoryStore, RocksStore};
pub use voting::{DeletionOutcome, VotingSystem};
