//! Live query subscriptions and change notification.
//!
//! A subscription is a registered live query that pushes full-snapshot
//! [`crate::types::ChangeEvent`]s until explicitly cancelled. Events from all
//! subscriptions of a registry flow through one outbound channel whose single
//! consumer is the host's designated delivery context, which gives strict
//! per-subscription ordering; no ordering is guaranteed across different
//! subscriptions or stores.

mod manager;

pub use manager::SubscriptionManager;
