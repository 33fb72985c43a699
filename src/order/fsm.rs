//! The order finite-state machine: a table-driven `(state, trigger) -> state` lookup
//! (spec §3/§9 Design Notes), backed by a lookup-time check rather than a typestate per
//! variant — every receiver of [`apply`] that hits an undefined transition raises
//! [`StateError::InvalidStateTrigger`].

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult, StateError};
use crate::identifiers::ClientOrderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OrderStatus {
    Initialized,
    Denied,
    Submitted,
    Accepted,
    Rejected,
    PendingUpdate,
    PendingCancel,
    Triggered,
    PartiallyFilled,
    Canceled,
    Expired,
    Filled,
}

impl OrderStatus {
    /// Terminal states accept no further transitions (spec §3/§8).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Denied
                | OrderStatus::Rejected
                | OrderStatus::Canceled
                | OrderStatus::Expired
                | OrderStatus::Filled
        )
    }
}

/// The trigger driving a state transition; one variant per `OrderEvent` kind applied to
/// the FSM (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Trigger {
    Deny,
    Submit,
    Accept,
    Reject,
    RequestUpdate,
    UpdateRejected,
    RequestCancel,
    CancelRejected,
    Update,
    TriggerStop,
    Cancel,
    Expire,
    PartiallyFill,
    Fill,
}

/// Looks up the legal next state for `(current, trigger)`, mirroring the spec §3 FSM
/// table exactly. `PENDING_UPDATE`/`PENDING_CANCEL` may self-loop (to allow multiple
/// concurrent requests) or revert to their prior status on reject.
pub fn legal_transition(current: OrderStatus, previous: Option<OrderStatus>, trigger: Trigger) -> Option<OrderStatus> {
    use OrderStatus::*;
    use Trigger::*;

    match (current, trigger) {
        (Initialized, Deny) => Some(Denied),
        (Initialized, Submit) => Some(Submitted),
        (Initialized, Accept) => Some(Accepted),
        (Initialized, Reject) => Some(Rejected),
        (Initialized, Cancel) => Some(Canceled),

        (Submitted, Reject) => Some(Rejected),
        (Submitted, Cancel) => Some(Canceled),
        (Submitted, Accept) => Some(Accepted),
        (Submitted, PartiallyFill) => Some(PartiallyFilled),
        (Submitted, Fill) => Some(Filled),

        (Accepted, Reject) => Some(Rejected),
        (Accepted, RequestUpdate) => Some(PendingUpdate),
        (Accepted, RequestCancel) => Some(PendingCancel),
        (Accepted, Cancel) => Some(Canceled),
        (Accepted, TriggerStop) => Some(Triggered),
        (Accepted, Expire) => Some(Expired),
        (Accepted, PartiallyFill) => Some(PartiallyFilled),
        (Accepted, Fill) => Some(Filled),

        (Triggered, Reject) => Some(Rejected),
        (Triggered, RequestUpdate) => Some(PendingUpdate),
        (Triggered, RequestCancel) => Some(PendingCancel),
        (Triggered, Cancel) => Some(Canceled),
        (Triggered, Expire) => Some(Expired),
        (Triggered, PartiallyFill) => Some(PartiallyFilled),
        (Triggered, Fill) => Some(Filled),

        (PartiallyFilled, Reject) => Some(Rejected),
        (PartiallyFilled, RequestUpdate) => Some(PendingUpdate),
        (PartiallyFilled, RequestCancel) => Some(PendingCancel),
        (PartiallyFilled, Cancel) => Some(Canceled),
        (PartiallyFilled, Expire) => Some(Expired),
        (PartiallyFilled, PartiallyFill) => Some(PartiallyFilled),
        (PartiallyFilled, Fill) => Some(Filled),

        // Self-loop: a second concurrent modify/cancel request while one is already
        // in flight (spec §3: "self-loop to allow multiple concurrent requests").
        (PendingUpdate, RequestUpdate) => Some(PendingUpdate),
        (PendingUpdate, Update) => previous,
        (PendingUpdate, UpdateRejected) => previous,
        (PendingUpdate, Cancel) => Some(Canceled),
        (PendingUpdate, PartiallyFill) => Some(PartiallyFilled),
        (PendingUpdate, Fill) => Some(Filled),
        (PendingUpdate, Expire) => Some(Expired),

        (PendingCancel, RequestCancel) => Some(PendingCancel),
        (PendingCancel, Cancel) => Some(Canceled),
        (PendingCancel, CancelRejected) => previous,
        (PendingCancel, PartiallyFill) => Some(PartiallyFilled),
        (PendingCancel, Fill) => Some(Filled),
        (PendingCancel, Expire) => Some(Expired),

        _ => None,
    }
}

/// Applies `trigger` to `current`, returning the new status or a typed
/// [`StateError::InvalidStateTrigger`] naming the offending order (spec §3/§9).
pub fn apply(
    client_order_id: &ClientOrderId,
    current: OrderStatus,
    previous: Option<OrderStatus>,
    trigger: Trigger,
) -> SimResult<OrderStatus> {
    legal_transition(current, previous, trigger).ok_or_else(|| {
        SimError::State(StateError::InvalidStateTrigger {
            client_order_id: client_order_id.to_string(),
            current: current.to_string(),
            trigger: trigger.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialized_accepts_only_table_transitions() {
        let id = ClientOrderId::new("O-1");
        assert!(apply(&id, OrderStatus::Initialized, None, Trigger::Submit).is_ok());
        assert!(apply(&id, OrderStatus::Initialized, None, Trigger::Fill).is_err());
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        let id = ClientOrderId::new("O-1");
        for terminal in [OrderStatus::Filled, OrderStatus::Canceled, OrderStatus::Expired, OrderStatus::Rejected, OrderStatus::Denied] {
            for trigger in [Trigger::Submit, Trigger::Accept, Trigger::Fill, Trigger::Cancel] {
                assert!(apply(&id, terminal, None, trigger).is_err(), "{terminal:?} + {trigger:?} should be illegal");
            }
        }
    }

    #[test]
    fn pending_update_reverts_to_previous_on_reject() {
        let id = ClientOrderId::new("O-1");
        let result = apply(&id, OrderStatus::PendingUpdate, Some(OrderStatus::Accepted), Trigger::UpdateRejected).unwrap();
        assert_eq!(result, OrderStatus::Accepted);
    }

    #[test]
    fn pending_cancel_self_loops_on_concurrent_request() {
        let id = ClientOrderId::new("O-1");
        let result = apply(&id, OrderStatus::PendingCancel, Some(OrderStatus::Accepted), Trigger::RequestCancel).unwrap();
        assert_eq!(result, OrderStatus::PendingCancel);
    }
}
