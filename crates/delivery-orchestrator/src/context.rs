use delivery_protocol::Pose;

use crate::error::DeliveryError;

/// Data the state machine carries between ticks. Mutated only from the
/// tick loop; worker tasks never touch this directly, they report back
/// through the completion values in [`crate::worker`].
#[derive(Debug, Default)]
pub struct DeliveryContext {
    /// Where the customer was last seen, saved on entry to `Verifying` and
    /// used again as the `ReturningToCustomer` goal.
    pub customer_pose: Option<Pose>,
    pub order_id: Option<u32>,
    /// How many consecutive `navigate_to(home)` attempts `ErrorRecovery`
    /// has made since its last success.
    pub recovery_attempts: u32,
    /// The error that most recently drove the machine into `ErrorRecovery`,
    /// kept for logging and for the fatal/non-fatal escalation decision.
    pub last_error: Option<String>,
    pub last_error_fatal: bool,
}

impl DeliveryContext {
    pub fn record_error(&mut self, error: &DeliveryError) {
        self.last_error = Some(error.to_string());
        self.last_error_fatal = error.is_fatal();
    }

    pub fn clear_order(&mut self) {
        self.customer_pose = None;
        self.order_id = None;
    }
}
