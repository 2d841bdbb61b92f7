//! Order state transition rules

use crate::order::OrderStatus;

/// State transition Error
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Order already reached its terminal success state
    #[error("Order already fulfilled")]
    AlreadyFulfilled,
    /// Invalid transition
    #[error("Invalid order status transition: From {0} to {1}")]
    InvalidTransition(OrderStatus, OrderStatus),
}

/// Check if the order status transition is allowed
///
/// Valid transitions:
/// - Created -> Processing
/// - Processing -> Fulfilled, MintFailed, OwnershipMintFailed, LinkFailed
/// - MintFailed -> Processing (restarts from the authenticity mint)
/// - OwnershipMintFailed -> Processing (resumes at the ownership mint)
/// - LinkFailed -> Processing (replays the finalize step only)
/// - Fulfilled -> (no transitions allowed)
///
/// No transition may be skipped; `Created -> Fulfilled` is invalid.
#[inline]
pub fn check_order_state_transition(
    current_status: OrderStatus,
    new_status: OrderStatus,
) -> Result<(), Error> {
    let is_valid_transition = match current_status {
        OrderStatus::Created => matches!(new_status, OrderStatus::Processing),
        OrderStatus::Processing => matches!(
            new_status,
            OrderStatus::Fulfilled
                | OrderStatus::MintFailed
                | OrderStatus::OwnershipMintFailed
                | OrderStatus::LinkFailed
        ),
        OrderStatus::MintFailed
        | OrderStatus::OwnershipMintFailed
        | OrderStatus::LinkFailed => matches!(new_status, OrderStatus::Processing),
        OrderStatus::Fulfilled => false,
    };

    if !is_valid_transition {
        Err(match current_status {
            OrderStatus::Fulfilled => Error::AlreadyFulfilled,
            _ => Error::InvalidTransition(current_status, new_status),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path_is_stepwise() {
        assert!(
            check_order_state_transition(OrderStatus::Created, OrderStatus::Processing).is_ok()
        );
        assert!(
            check_order_state_transition(OrderStatus::Processing, OrderStatus::Fulfilled).is_ok()
        );
        // Skipping the processing state is invalid
        assert!(
            check_order_state_transition(OrderStatus::Created, OrderStatus::Fulfilled).is_err()
        );
    }

    #[test]
    fn failed_states_reenter_processing_only() {
        for failed in [
            OrderStatus::MintFailed,
            OrderStatus::OwnershipMintFailed,
            OrderStatus::LinkFailed,
        ] {
            assert!(check_order_state_transition(failed, OrderStatus::Processing).is_ok());
            assert!(check_order_state_transition(failed, OrderStatus::Fulfilled).is_err());
            assert!(check_order_state_transition(failed, OrderStatus::Created).is_err());
        }
    }

    #[test]
    fn fulfilled_is_terminal() {
        for next in [
            OrderStatus::Created,
            OrderStatus::Processing,
            OrderStatus::MintFailed,
            OrderStatus::OwnershipMintFailed,
            OrderStatus::LinkFailed,
        ] {
            assert!(matches!(
                check_order_state_transition(OrderStatus::Fulfilled, next),
                Err(Error::AlreadyFulfilled)
            ));
        }
    }

    #[test]
    fn failure_states_only_reachable_from_processing() {
        assert!(
            check_order_state_transition(OrderStatus::Created, OrderStatus::MintFailed).is_err()
        );
        assert!(check_order_state_transition(
            OrderStatus::MintFailed,
            OrderStatus::OwnershipMintFailed
        )
        .is_err());
    }
}
