use crate::{entities::order::OrderStatus, errors::ServiceError};

/// Whether an admin may move an order from `from` to `to`.
///
/// Orders advance one step at a time through
/// Pending, Processing, Shipped and Delivered. Any non-terminal order may be
/// cancelled. Re-applying the current status is accepted as a no-op.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    match (from, to) {
        _ if from == to => true,

        (Pending, Processing) => true,
        (Processing, Shipped) => true,
        (Shipped, Delivered) => true,

        (Pending | Processing | Shipped, Cancelled) => true,

        _ => false,
    }
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot transition from status '{}' to '{}'",
            from, to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sea_orm::Iterable;
    use OrderStatus::*;

    #[rstest]
    #[case(Pending, Processing)]
    #[case(Processing, Shipped)]
    #[case(Shipped, Delivered)]
    #[case(Pending, Cancelled)]
    #[case(Processing, Cancelled)]
    #[case(Shipped, Cancelled)]
    fn forward_and_cancel_transitions_allowed(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert!(is_valid_transition(from, to));
    }

    #[rstest]
    #[case(Pending, Shipped)]
    #[case(Pending, Delivered)]
    #[case(Shipped, Processing)]
    #[case(Processing, Pending)]
    fn skipping_or_reversing_rejected(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert!(matches!(
            ensure_transition(from, to),
            Err(ServiceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn terminal_states_only_accept_themselves() {
        for terminal in [Delivered, Cancelled] {
            for target in OrderStatus::iter() {
                assert_eq!(is_valid_transition(terminal, target), terminal == target);
            }
        }
    }
}
