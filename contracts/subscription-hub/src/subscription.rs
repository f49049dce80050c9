//! Subscription logic modules.
//!
//! Both modules run the same plan catalog and subscription lifecycle over the
//! hub's state; they differ only in who may mutate the catalog and toggle the
//! paused flag.
//!
//! ## State Machine
//! Derived per subscriber from `expires_at`, `paused` and the ledger time:
//!
//!   (none)  --subscribe-->   Active(now + duration)
//!   Active  --subscribe-->   Active(expires_at + duration)   [stacks while unexpired]
//!   Active  --pause-->       Paused
//!   Paused  --resume/subscribe--> Active                     [if not expired]
//!   Active/Paused --time passes--> Expired
//!   Expired --subscribe-->   Active(now + duration)
//!
//! A record is active iff `now < expires_at && !paused`.

use soroban_sdk::{contractevent, Address};

use crate::module::{
    Call, CallContext, CallResult, LogicModule, ModuleError, NewPlan, SubscriptionStatus,
    SUBSCRIPTION_V1, SUBSCRIPTION_V2,
};
use crate::storage::{ModuleRef, Plan, StateHandle, Subscription};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct PlanAdded {
    #[topic]
    pub plan_id: u32,
    pub price: i128,
    pub duration: u64,
}

#[contractevent]
pub struct Subscribed {
    #[topic]
    pub subscriber: Address,
    #[topic]
    pub plan_id: u32,
    pub expires_at: u64,
    pub amount_paid: i128,
    /// True when the term was stacked onto an unexpired one.
    pub renewed: bool,
}

#[contractevent]
pub struct AccountPaused {
    #[topic]
    pub subscriber: Address,
}

#[contractevent]
pub struct AccountResumed {
    #[topic]
    pub subscriber: Address,
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// Open catalog: anyone may add plans and pause or resume any account.
pub struct SubscriptionModule;

/// Same lifecycle, but `AddPlan` is owner-only and pause/resume are limited
/// to the subscriber or the owner.
pub struct GuardedSubscriptionModule;

impl LogicModule for SubscriptionModule {
    fn module_ref(&self) -> ModuleRef {
        SUBSCRIPTION_V1
    }

    fn execute(
        &self,
        state: &mut StateHandle,
        ctx: &CallContext,
        call: Call,
    ) -> Result<CallResult, ModuleError> {
        dispatch(self.module_ref(), state, ctx, call)
    }
}

impl LogicModule for GuardedSubscriptionModule {
    fn module_ref(&self) -> ModuleRef {
        SUBSCRIPTION_V2
    }

    fn execute(
        &self,
        state: &mut StateHandle,
        ctx: &CallContext,
        call: Call,
    ) -> Result<CallResult, ModuleError> {
        match &call {
            Call::AddPlan(_) => require_owner(state, &ctx.caller)?,
            Call::PauseAccount(subscriber) | Call::ResumeAccount(subscriber) => {
                if &ctx.caller != subscriber {
                    require_owner(state, &ctx.caller)?;
                }
            }
            _ => {}
        }
        dispatch(self.module_ref(), state, ctx, call)
    }
}

fn dispatch(
    module: ModuleRef,
    state: &mut StateHandle,
    ctx: &CallContext,
    call: Call,
) -> Result<CallResult, ModuleError> {
    match call {
        Call::AddPlan(new_plan) => {
            add_plan(state, new_plan);
            Ok(CallResult::Done)
        }
        Call::Subscribe(plan_id) => {
            subscribe(state, ctx, plan_id)?;
            Ok(CallResult::Done)
        }
        Call::IsActive(subscriber) => Ok(CallResult::Active(is_active(state, ctx.now, &subscriber))),
        Call::PauseAccount(subscriber) => {
            set_paused(state, subscriber, true);
            Ok(CallResult::Done)
        }
        Call::ResumeAccount(subscriber) => {
            set_paused(state, subscriber, false);
            Ok(CallResult::Done)
        }
        Call::GetPlan(plan_id) => Ok(CallResult::Plan(registered_plan(state, plan_id)?)),
        Call::StatusOf(subscriber) => Ok(CallResult::Status(status_of(state, ctx.now, &subscriber))),
        Call::Version => Ok(CallResult::Version(module)),
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Insert or overwrite a plan. Overwriting with a zero price delists it.
fn add_plan(state: &mut StateHandle, new_plan: NewPlan) {
    state.set_plan(
        new_plan.plan_id,
        Plan {
            price: new_plan.price,
            duration: new_plan.duration,
        },
    );

    PlanAdded {
        plan_id: new_plan.plan_id,
        price: new_plan.price,
        duration: new_plan.duration,
    }
    .publish(state.env());
}

/// Start or extend the caller's term.
///
/// An unexpired term (paused or not) is extended from its current expiry;
/// otherwise a fresh term starts now. Either way the record moves to
/// `plan_id` and is unpaused.
fn subscribe(state: &mut StateHandle, ctx: &CallContext, plan_id: u32) -> Result<(), ModuleError> {
    let plan = registered_plan(state, plan_id)?;
    if ctx.value < plan.price {
        return Err(ModuleError::InsufficientPayment);
    }

    let (base, renewed) = match state.subscription(&ctx.caller) {
        Some(existing) if ctx.now < existing.expires_at => (existing.expires_at, true),
        _ => (ctx.now, false),
    };
    let expires_at = base
        .checked_add(plan.duration)
        .ok_or(ModuleError::Overflow)?;

    state.set_subscription(
        ctx.caller.clone(),
        Subscription {
            plan_id,
            expires_at,
            paused: false,
        },
    );

    Subscribed {
        subscriber: ctx.caller.clone(),
        plan_id,
        expires_at,
        amount_paid: ctx.value,
        renewed,
    }
    .publish(state.env());

    Ok(())
}

fn is_active(state: &StateHandle, now: u64, subscriber: &Address) -> bool {
    state
        .subscription(subscriber)
        .map_or(false, |record| record.is_active_at(now))
}

/// Accounts that never subscribed are left untouched.
fn set_paused(state: &mut StateHandle, subscriber: Address, paused: bool) {
    let Some(mut record) = state.subscription(&subscriber) else {
        return;
    };
    if record.paused == paused {
        return;
    }

    record.paused = paused;
    state.set_subscription(subscriber.clone(), record);

    if paused {
        AccountPaused { subscriber }.publish(state.env());
    } else {
        AccountResumed { subscriber }.publish(state.env());
    }
}

fn status_of(state: &StateHandle, now: u64, subscriber: &Address) -> SubscriptionStatus {
    match state.subscription(subscriber) {
        None => SubscriptionStatus {
            has_subscription: false,
            plan_id: 0,
            expires_at: 0,
            paused: false,
            is_active: false,
        },
        Some(record) => SubscriptionStatus {
            has_subscription: true,
            plan_id: record.plan_id,
            expires_at: record.expires_at,
            paused: record.paused,
            is_active: record.is_active_at(now),
        },
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Fetch a plan, treating a zero price as unregistered.
fn registered_plan(state: &StateHandle, plan_id: u32) -> Result<Plan, ModuleError> {
    state
        .plan(plan_id)
        .filter(|plan| plan.price != 0)
        .ok_or(ModuleError::InvalidPlan)
}

fn require_owner(state: &StateHandle, caller: &Address) -> Result<(), ModuleError> {
    if caller != state.owner() {
        return Err(ModuleError::Unauthorized);
    }
    Ok(())
}
