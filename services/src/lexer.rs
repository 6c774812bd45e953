//! A placeholder lexer actor. Tokenization is whitespace-splitting only —
//! real lexical analysis is out of scope here; this module exists to show
//! how a language-frontend stage registers itself with the kernel.

use std::sync::Arc;

use async_trait::async_trait;
use slug_kernel::prelude::*;

/// Request to tokenize a source string.
#[derive(Debug, Clone)]
pub struct TokenizeRequest {
    pub source: String,
}

/// Token count, standing in for an actual token stream.
#[derive(Debug, Clone, Copy)]
pub struct TokenizeResponse {
    pub token_count: usize,
}

struct LexerHandler;

#[async_trait]
impl Handler for LexerHandler {
    async fn handle(&mut self, mut msg: Message, ctx: &mut ActorContext) -> ControlSignal {
        match msg.downcast_ref::<TokenizeRequest>() {
            Some(req) => {
                let token_count = req.source.split_whitespace().count();
                let self_id = ctx.id();
                msg.reply(self_id, TokenizeResponse { token_count });
            }
            None => {
                tracing::warn!("lexer received an unrecognized payload");
            }
        }
        ControlSignal::Continue
    }
}

/// Spawn the lexer under `parent`, requiring `Rights::WRITE` to submit a
/// `TokenizeRequest`.
pub fn spawn(kernel: &Kernel, parent: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<TokenizeRequest>(Rights::WRITE);
    let factory: Arc<dyn HandlerFactory> = Arc::new(|| Box::new(LexerHandler) as Box<dyn Handler>);
    kernel.spawn(parent, Some("lexer".into()), op_map, factory)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use slug_kernel::KernelConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn tokenizes_by_whitespace() {
        let kernel = Kernel::new(KernelConfig::default());
        let lexer = spawn(&kernel, ActorId::KERNEL).unwrap();

        let reply = kernel
            .send_sync(
                ActorId::KERNEL,
                lexer,
                TokenizeRequest {
                    source: "let x = 1".into(),
                },
                Duration::from_millis(200),
            )
            .await
            .unwrap();
        let resp = reply.downcast::<TokenizeResponse>().unwrap();
        assert_eq!(resp.token_count, 4);
    }
}
