//! Stellarcade Subscription Hub
//!
//! An upgradeable storage shell in front of a swappable subscription module.
//! The hub owns every byte of persistent state and a handle to the active
//! logic module. Its own interface is `init`, `upgrade` and two views; every
//! other call is relayed through `forward` to the active module, which runs
//! against the hub's state and keeps none of its own.
//!
//! ## Dispatch
//! `forward` resolves the stored [`ModuleRef`] through [`module::resolve`],
//! lends the module a [`StateHandle`], and commits the staged writes only if
//! the module succeeds. A module error aborts the whole call with no writes
//! and is relayed as [`Error`] in the forwarded band (codes 100+).
//!
//! ## Upgrades
//! `upgrade` swaps the module handle and nothing else. No migration runs:
//! every module is written against the single schema in [`storage`].
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contract, contracterror, contractevent, contractimpl, Address, Env};

pub mod module;
pub mod storage;
pub mod subscription;

pub use module::{
    Call, CallContext, CallResult, LogicModule, ModuleError, NewPlan, SubscriptionStatus,
    SUBSCRIPTION_V1, SUBSCRIPTION_V2,
};
pub use storage::{DataKey, ModuleRef, Plan, StateHandle, Subscription};

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

/// Errors surfaced by the hub.
///
/// Codes below 100 are raised by the hub itself. Codes from 100 upward relay
/// a [`ModuleError`] from the active module as `100 + code`; use
/// [`Error::forwarded`] to recover it.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    ModuleNotConfigured = 4,
    // --- forwarded from the active module ---
    ModuleUnauthorized = 101,
    InvalidPlan = 102,
    InsufficientPayment = 103,
    Overflow = 104,
}

impl Error {
    /// The module error this relays, if any.
    pub fn forwarded(self) -> Option<ModuleError> {
        match self {
            Error::ModuleUnauthorized => Some(ModuleError::Unauthorized),
            Error::InvalidPlan => Some(ModuleError::InvalidPlan),
            Error::InsufficientPayment => Some(ModuleError::InsufficientPayment),
            Error::Overflow => Some(ModuleError::Overflow),
            Error::AlreadyInitialized
            | Error::NotInitialized
            | Error::Unauthorized
            | Error::ModuleNotConfigured => None,
        }
    }
}

impl From<ModuleError> for Error {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Unauthorized => Error::ModuleUnauthorized,
            ModuleError::InvalidPlan => Error::InvalidPlan,
            ModuleError::InsufficientPayment => Error::InsufficientPayment,
            ModuleError::Overflow => Error::Overflow,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct HubInitialized {
    #[topic]
    pub owner: Address,
    pub module: ModuleRef,
}

#[contractevent]
pub struct ModuleUpgraded {
    #[topic]
    pub owner: Address,
    pub previous: ModuleRef,
    pub current: ModuleRef,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct SubscriptionHub;

#[contractimpl]
impl SubscriptionHub {
    /// Initialize the hub. May only be called once.
    ///
    /// `owner` is the only address allowed to upgrade. `module` must resolve
    /// to a known logic module.
    pub fn init(env: Env, owner: Address, module: ModuleRef) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }

        owner.require_auth();

        if module::resolve(module).is_none() {
            return Err(Error::ModuleNotConfigured);
        }

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::ActiveModule, &module);

        HubInitialized { owner, module }.publish(&env);

        Ok(())
    }

    /// Point the hub at a different logic module. Owner only.
    ///
    /// State is left untouched; the next forwarded call runs the new module
    /// over the existing plans and subscriptions.
    pub fn upgrade(env: Env, caller: Address, new_module: ModuleRef) -> Result<(), Error> {
        require_owner(&env, &caller)?;

        if module::resolve(new_module).is_none() {
            return Err(Error::ModuleNotConfigured);
        }

        let previous = active_module_ref(&env).ok_or(Error::NotInitialized)?;
        env.storage()
            .instance()
            .set(&DataKey::ActiveModule, &new_module);

        ModuleUpgraded {
            owner: caller,
            previous,
            current: new_module,
        }
        .publish(&env);

        Ok(())
    }

    /// Relay `call` from `caller`, with `value` attached, to the active module.
    ///
    /// The module's result or error is returned unchanged. On error nothing
    /// the module staged is written. Read-only calls need no signature from
    /// `caller`.
    pub fn forward(env: Env, caller: Address, call: Call, value: i128) -> Result<CallResult, Error> {
        let module = active_module_ref(&env)
            .and_then(module::resolve)
            .ok_or(Error::ModuleNotConfigured)?;

        if !call.is_read_only() {
            caller.require_auth();
        }

        let owner = get_owner(&env)?;
        let ctx = CallContext {
            caller,
            value,
            now: env.ledger().timestamp(),
        };

        let mut state = StateHandle::open(&env, owner);
        let result = module.execute(&mut state, &ctx, call)?;
        state.commit();

        Ok(result)
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        get_owner(&env)
    }

    pub fn active_module(env: Env) -> Result<ModuleRef, Error> {
        active_module_ref(&env).ok_or(Error::NotInitialized)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn get_owner(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .ok_or(Error::NotInitialized)
}

fn active_module_ref(env: &Env) -> Option<ModuleRef> {
    env.storage().instance().get(&DataKey::ActiveModule)
}

/// Verify that `caller` is the stored owner and has signed the invocation.
fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner = get_owner(env)?;
    caller.require_auth();
    if caller != &owner {
        return Err(Error::Unauthorized);
    }
    Ok(())
}
