//! Background jobs
//!
//! - rank reconciliation: periodic dense-rank recompute over the durable leaderboard

pub mod rank_reconciler;

pub use rank_reconciler::{run_reconciler_loop, RankReconciler, ReconcileReport};
