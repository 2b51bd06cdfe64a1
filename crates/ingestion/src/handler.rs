//! MessageHandler - what a listener does with each received message

use std::future::Future;

use contracts::{BusMessage, CatalogStore, MessageBus};
use dispatcher::{DispatchOutcome, EventDispatcher};
use triage::PriorityScorer;

/// Consumer of bus messages, shared by every listener
///
/// Implementations must not fail: each message resolves to an outcome.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(
        &self,
        listener: &str,
        message: &BusMessage,
    ) -> impl Future<Output = DispatchOutcome> + Send;
}

impl<B, S, P> MessageHandler for EventDispatcher<B, S, P>
where
    B: MessageBus + Send + Sync + 'static,
    S: CatalogStore + Send + Sync + 'static,
    P: PriorityScorer + 'static,
{
    fn handle(
        &self,
        listener: &str,
        message: &BusMessage,
    ) -> impl Future<Output = DispatchOutcome> + Send {
        self.dispatch(listener, message)
    }
}
