//! Placeholder parser actor. Stands in for a real recursive-descent parser
//! over the lexer's token stream.

use std::sync::Arc;

use async_trait::async_trait;
use slug_kernel::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct ParseRequest {
    pub token_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ParseResponse {
    pub node_count: usize,
}

struct ParserHandler;

#[async_trait]
impl Handler for ParserHandler {
    async fn handle(&mut self, mut msg: Message, ctx: &mut ActorContext) -> ControlSignal {
        if let Some(req) = msg.downcast_ref::<ParseRequest>().copied() {
            // Every three tokens fold into roughly one AST node; a stand-in
            // ratio, not a grammar.
            let node_count = (req.token_count + 2) / 3;
            let self_id = ctx.id();
            msg.reply(self_id, ParseResponse { node_count });
        }
        ControlSignal::Continue
    }
}

pub fn spawn(kernel: &Kernel, parent: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<ParseRequest>(Rights::WRITE);
    let factory: Arc<dyn HandlerFactory> =
        Arc::new(|| Box::new(ParserHandler) as Box<dyn Handler>);
    kernel.spawn(parent, Some("parser".into()), op_map, factory)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use slug_kernel::KernelConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn folds_tokens_into_nodes() {
        let kernel = Kernel::new(KernelConfig::default());
        let parser = spawn(&kernel, ActorId::KERNEL).unwrap();

        let reply = kernel
            .send_sync(
                ActorId::KERNEL,
                parser,
                ParseRequest { token_count: 9 },
                Duration::from_millis(200),
            )
            .await
            .unwrap();
        assert_eq!(reply.downcast::<ParseResponse>().unwrap().node_count, 3);
    }
}
