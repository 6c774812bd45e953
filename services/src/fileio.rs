//! File I/O actor: the one collaborator in this crate that performs real
//! (sandboxed by capability, not by path) work, grounded in the way the
//! teacher's `executors::filesystem` wraps OS calls behind an operation
//! type rather than exposing `std::fs` directly to callers.

use std::sync::Arc;

use async_trait::async_trait;
use slug_kernel::prelude::*;

#[derive(Debug, Clone)]
pub struct ReadFileRequest {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ReadFileResponse {
    pub contents: Result<String, String>,
}

struct FileIoHandler;

#[async_trait]
impl Handler for FileIoHandler {
    async fn handle(&mut self, mut msg: Message, ctx: &mut ActorContext) -> ControlSignal {
        if let Some(req) = msg.downcast_ref::<ReadFileRequest>().cloned() {
            let contents = tokio::fs::read_to_string(&req.path)
                .await
                .map_err(|err| err.to_string());
            let self_id = ctx.id();
            msg.reply(self_id, ReadFileResponse { contents });
        }
        ControlSignal::Continue
    }
}

/// Spawn the file I/O actor, requiring `Rights::READ` to submit a
/// `ReadFileRequest`.
pub fn spawn(kernel: &Kernel, parent: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<ReadFileRequest>(Rights::READ);
    let factory: Arc<dyn HandlerFactory> =
        Arc::new(|| Box::new(FileIoHandler) as Box<dyn Handler>);
    kernel.spawn(parent, Some("fileio".into()), op_map, factory)
}
