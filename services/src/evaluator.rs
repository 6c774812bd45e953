//! Placeholder evaluator actor, standing in for tree-walking evaluation of
//! a parsed module.

use std::sync::Arc;

use async_trait::async_trait;
use slug_kernel::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct EvalRequest {
    pub node_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EvalResponse {
    pub result: i64,
}

struct EvaluatorHandler;

#[async_trait]
impl Handler for EvaluatorHandler {
    async fn handle(&mut self, mut msg: Message, ctx: &mut ActorContext) -> ControlSignal {
        if let Some(req) = msg.downcast_ref::<EvalRequest>().copied() {
            let result = req.node_count as i64;
            let self_id = ctx.id();
            msg.reply(self_id, EvalResponse { result });
        }
        ControlSignal::Continue
    }
}

pub fn spawn(kernel: &Kernel, parent: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<EvalRequest>(Rights::EXEC);
    let factory: Arc<dyn HandlerFactory> =
        Arc::new(|| Box::new(EvaluatorHandler) as Box<dyn Handler>);
    kernel.spawn(parent, Some("evaluator".into()), op_map, factory)
}
