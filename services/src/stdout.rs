//! Stdout actor: the single writer of process standard output, so every
//! other actor that wants to print goes through one capability-gated
//! choke point instead of calling `println!` directly.

use std::sync::Arc;

use async_trait::async_trait;
use slug_kernel::prelude::*;

#[derive(Debug, Clone)]
pub struct WriteLineRequest(pub String);

struct StdoutHandler;

#[async_trait]
impl Handler for StdoutHandler {
    async fn handle(&mut self, msg: Message, _ctx: &mut ActorContext) -> ControlSignal {
        if let Some(line) = msg.downcast_ref::<WriteLineRequest>() {
            println!("{}", line.0);
        }
        ControlSignal::Continue
    }
}

/// Spawn the stdout actor, requiring `Rights::WRITE` to submit a
/// `WriteLineRequest`.
pub fn spawn(kernel: &Kernel, parent: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<WriteLineRequest>(Rights::WRITE);
    let factory: Arc<dyn HandlerFactory> =
        Arc::new(|| Box::new(StdoutHandler) as Box<dyn Handler>);
    kernel.spawn(parent, Some("stdout".into()), op_map, factory)
}
