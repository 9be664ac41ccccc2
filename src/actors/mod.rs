//! Actor-based multi-tenant storage
//!
//! Each tenant's shard runs as an independent async task communicating via
//! Tokio channels. Serializing a tenant's operations through its single
//! actor gives linearizable per-tenant semantics without explicit locking;
//! actors for different tenants never coordinate.
//!
//! ## Architecture Overview
//!
//! ```text
//!                   ┌─────────────────┐
//!                   │     Gateway     │
//!                   └────────┬────────┘
//!                            │ resolves app_id
//!                   ┌────────▼────────┐
//!                   │  ShardManager   │
//!                   └────────┬────────┘
//!               ┌────────────┼────────────┐
//!               │            │            │
//!       ┌───────▼───────┐    │    ┌───────▼───────┐
//!       │ ShardActor A  │   ...   │ ShardActor N  │
//!       │ logs + health │         │ logs + health │
//!       └───────┬───────┘         └───────┬───────┘
//!               │                         │
//!       ┌───────▼───────┐         ┌───────▼───────┐
//!       │  a.db (SQLite)│         │  n.db (SQLite)│
//!       └───────────────┘         └───────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each shard has an mpsc command channel
//! 2. **Request/Response**: oneshot channels for replies
//! 3. **Timers**: the health scheduler's deadline is polled in the actor's
//!    `select!` loop alongside the command channel

pub mod health;
pub mod manager;
pub mod messages;
pub mod shard;
