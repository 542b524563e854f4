mod consumers;
mod correlation;
mod errors;
mod orchestrator;

#[allow(unused_imports)]
pub use consumers::{run_availability_consumer, run_response_consumer};
#[allow(unused_imports)]
pub use correlation::{
    AlreadyInFlight, ExchangeKey, ExchangeKind, PendingExchanges, PollBudget, Registration,
};
#[allow(unused_imports)]
pub use errors::{CirculationError, Result};
#[allow(unused_imports)]
pub use orchestrator::{CirculationDependencies, request_borrow, request_return};
