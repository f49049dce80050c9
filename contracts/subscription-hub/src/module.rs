//! Call surface between the hub and its swappable logic modules.
//!
//! The hub owns state; a module owns behavior. Anything that is not part of
//! the hub's own interface arrives at the active module as a [`Call`] and is
//! executed against a [`StateHandle`] borrowed from the hub.

use soroban_sdk::{contracttype, Address};

use crate::storage::{ModuleRef, Plan, StateHandle};
use crate::subscription::{GuardedSubscriptionModule, SubscriptionModule};

/// Handle of [`SubscriptionModule`].
pub const SUBSCRIPTION_V1: ModuleRef = 1;
/// Handle of [`GuardedSubscriptionModule`].
pub const SUBSCRIPTION_V2: ModuleRef = 2;

static SUBSCRIPTION: SubscriptionModule = SubscriptionModule;
static GUARDED_SUBSCRIPTION: GuardedSubscriptionModule = GuardedSubscriptionModule;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewPlan {
    pub plan_id: u32,
    pub price: i128,
    pub duration: u64,
}

/// A forwarded call.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    AddPlan(NewPlan),
    /// Subscribe the caller to a plan, paying the attached value.
    Subscribe(u32),
    IsActive(Address),
    PauseAccount(Address),
    ResumeAccount(Address),
    GetPlan(u32),
    StatusOf(Address),
    /// Handle of the module answering the call.
    Version,
}

impl Call {
    /// Queries that never stage a write.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Call::IsActive(_) | Call::GetPlan(_) | Call::StatusOf(_) | Call::Version
        )
    }
}

/// Public view of one subscriber.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscriptionStatus {
    /// Whether the subscriber has ever subscribed.
    pub has_subscription: bool,
    /// The plan_id if subscribed, or 0 if none.
    pub plan_id: u32,
    /// Expiry timestamp in seconds. 0 if not subscribed.
    pub expires_at: u64,
    pub paused: bool,
    pub is_active: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallResult {
    Done,
    Active(bool),
    Plan(Plan),
    Status(SubscriptionStatus),
    Version(u32),
}

/// Who is calling and with what, as seen by the module.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub caller: Address,
    /// Value attached to the call.
    pub value: i128,
    /// Ledger timestamp of the call.
    pub now: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised inside a module. The hub relays them unchanged; see
/// [`crate::Error::forwarded`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ModuleError {
    Unauthorized = 1,
    InvalidPlan = 2,
    InsufficientPayment = 3,
    Overflow = 4,
}

// ---------------------------------------------------------------------------
// LogicModule
// ---------------------------------------------------------------------------

pub trait LogicModule {
    fn module_ref(&self) -> ModuleRef;

    /// Run `call` against the hub's state. Staged writes are committed by the
    /// hub only if this returns `Ok`.
    fn execute(
        &self,
        state: &mut StateHandle,
        ctx: &CallContext,
        call: Call,
    ) -> Result<CallResult, ModuleError>;
}

/// Indirection table from module handle to implementation.
pub fn resolve(module: ModuleRef) -> Option<&'static dyn LogicModule> {
    match module {
        SUBSCRIPTION_V1 => Some(&SUBSCRIPTION),
        SUBSCRIPTION_V2 => Some(&GUARDED_SUBSCRIPTION),
        _ => None,
    }
}
