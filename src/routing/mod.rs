//! Read/write routing.
//!
//! - `state`: process-wide flags, per-session state and routing decisions
//! - `scope`: scoped "force primary" override
//! - `role`: task-local reading/writing role
//! - `guard`: transaction guard for the read-only connection
//! - `router`: the statement router tying them together

pub mod guard;
pub mod role;
pub mod router;
pub mod scope;
pub mod state;

pub use guard::{TransactionDepth, TransactionGuard, TransactionOperation};
pub use role::{Role, connected_to, current_role};
pub use router::{ReplicaRouter, replica_label};
pub use scope::{PrimaryScope, ScopedRouting};
pub use state::{RoutingDecision, RoutingFlags, RoutingReason, RoutingState};
