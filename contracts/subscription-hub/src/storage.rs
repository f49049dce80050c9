//! Persistent state schema shared by the hub and every logic module.
//!
//! This is the one place the storage layout is defined. Modules never touch
//! `env.storage()` directly; they read and write through a [`StateHandle`]
//! lent to them by the hub for a single forwarded call.
//!
//! ## Layout
//! - `instance()`: `Owner`, `ActiveModule`.
//! - `persistent()`: `Plan(plan_id)`, `Subscription(subscriber)`, each with
//!   its own TTL, bumped on every write.
//!
//! Keys are resolved by variant name, not position. New variants go at the
//! end; existing variants and record fields are never reordered or retyped.

use soroban_sdk::{contracttype, Address, Env, Map};

// ---------------------------------------------------------------------------
// TTL / storage constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;
/// Renew ~7 days before the entry would lapse.
pub const PERSISTENT_BUMP_THRESHOLD: u32 = PERSISTENT_BUMP_LEDGERS - 100_800;

/// Opaque handle of a logic module, resolved by [`crate::module::resolve`].
pub type ModuleRef = u32;

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Owner,
    ActiveModule,
    // --- persistent() ---
    /// Plan definition keyed by plan_id.
    Plan(u32),
    /// Subscription record keyed by subscriber.
    Subscription(Address),
}

/// A subscription tier.
///
/// A `price` of zero marks a plan id as unregistered.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plan {
    /// Minimum attached value for one term.
    pub price: i128,
    /// Length of one term in seconds.
    pub duration: u64,
}

/// Per-subscriber record. Created on first subscribe, never deleted.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscription {
    pub plan_id: u32,
    /// Unix timestamp (seconds) at which the current term ends.
    pub expires_at: u64,
    pub paused: bool,
}

impl Subscription {
    /// Unexpired and not paused at `now`.
    pub fn is_active_at(&self, now: u64) -> bool {
        now < self.expires_at && !self.paused
    }
}

// ---------------------------------------------------------------------------
// StateHandle
// ---------------------------------------------------------------------------

/// Mutable view of the hub's persistent state for one forwarded call.
///
/// Reads fall through to ledger storage; writes are staged in memory and only
/// reach storage through [`StateHandle::commit`]. Dropping the handle without
/// committing discards every staged write.
pub struct StateHandle<'a> {
    env: &'a Env,
    owner: Address,
    plans: Map<u32, Plan>,
    subscriptions: Map<Address, Subscription>,
}

impl<'a> StateHandle<'a> {
    pub(crate) fn open(env: &'a Env, owner: Address) -> Self {
        StateHandle {
            env,
            owner,
            plans: Map::new(env),
            subscriptions: Map::new(env),
        }
    }

    pub fn env(&self) -> &Env {
        self.env
    }

    /// The hub owner. Read-only to modules.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn plan(&self, plan_id: u32) -> Option<Plan> {
        self.plans.get(plan_id).or_else(|| {
            self.env
                .storage()
                .persistent()
                .get(&DataKey::Plan(plan_id))
        })
    }

    pub fn set_plan(&mut self, plan_id: u32, plan: Plan) {
        self.plans.set(plan_id, plan);
    }

    pub fn subscription(&self, subscriber: &Address) -> Option<Subscription> {
        self.subscriptions.get(subscriber.clone()).or_else(|| {
            self.env
                .storage()
                .persistent()
                .get(&DataKey::Subscription(subscriber.clone()))
        })
    }

    pub fn set_subscription(&mut self, subscriber: Address, record: Subscription) {
        self.subscriptions.set(subscriber, record);
    }

    /// Flush staged writes to persistent storage.
    pub(crate) fn commit(self) {
        let persistent = self.env.storage().persistent();

        for (plan_id, plan) in self.plans.iter() {
            let key = DataKey::Plan(plan_id);
            persistent.set(&key, &plan);
            persistent.extend_ttl(&key, PERSISTENT_BUMP_THRESHOLD, PERSISTENT_BUMP_LEDGERS);
        }

        for (subscriber, record) in self.subscriptions.iter() {
            let key = DataKey::Subscription(subscriber);
            persistent.set(&key, &record);
            persistent.extend_ttl(&key, PERSISTENT_BUMP_THRESHOLD, PERSISTENT_BUMP_LEDGERS);
        }
    }
}
