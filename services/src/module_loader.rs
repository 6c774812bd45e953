//! Module loader actor: resolves a module path to source text by
//! delegating to the file I/O actor, demonstrating one actor acting as a
//! capability-checked caller of another.

use std::sync::Arc;

use async_trait::async_trait;
use slug_kernel::prelude::*;

use crate::fileio::{ReadFileRequest, ReadFileResponse};

#[derive(Debug, Clone)]
pub struct LoadModuleRequest {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct LoadModuleResponse {
    pub source: Result<String, String>,
}

struct ModuleLoaderHandler {
    fileio: ActorId,
}

#[async_trait]
impl Handler for ModuleLoaderHandler {
    async fn handle(&mut self, mut msg: Message, ctx: &mut ActorContext) -> ControlSignal {
        let Some(req) = msg.downcast_ref::<LoadModuleRequest>().cloned() else {
            return ControlSignal::Continue;
        };

        let self_id = ctx.id();
        let reply = ctx
            .kernel()
            .send_sync(
                self_id,
                self.fileio,
                ReadFileRequest { path: req.path },
                std::time::Duration::from_secs(2),
            )
            .await;

        let source = match reply.and_then(|m| {
            m.downcast::<ReadFileResponse>()
                .map_err(|_| KernelError::NoSuchActor(self.fileio))
        }) {
            Ok(resp) => resp.contents,
            Err(err) => Err(err.to_string()),
        };

        msg.reply(self_id, LoadModuleResponse { source });
        ControlSignal::Continue
    }
}

/// Spawn the module loader as a child of `parent`, delegating reads to
/// `fileio`. The loader must hold `Rights::READ` on `fileio` for this to
/// ever succeed — grant it before routing real traffic.
pub fn spawn(kernel: &Kernel, parent: ActorId, fileio: ActorId) -> Result<ActorId, KernelError> {
    let op_map = OperationMap::new().require::<LoadModuleRequest>(Rights::WRITE);
    let factory: Arc<dyn HandlerFactory> =
        Arc::new(move || Box::new(ModuleLoaderHandler { fileio }) as Box<dyn Handler>);
    kernel.spawn(parent, Some("module_loader".into()), op_map, factory)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::fileio;
    use slug_kernel::KernelConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn reports_the_fileio_error_when_unauthorized() {
        let kernel = Kernel::new(KernelConfig::default());
        let fileio = fileio::spawn(&kernel, ActorId::KERNEL).unwrap();
        let loader = spawn(&kernel, ActorId::KERNEL, fileio).unwrap();

        let reply = kernel
            .send_sync(
                ActorId::KERNEL,
                loader,
                LoadModuleRequest {
                    path: "/etc/hosts".into(),
                },
                Duration::from_millis(300),
            )
            .await
            .unwrap();
        let resp = reply.downcast::<LoadModuleResponse>().unwrap();
        assert!(resp.source.is_err());
    }

    #[tokio::test]
    async fn loads_module_source_once_granted_read() {
        let kernel = Kernel::new(KernelConfig::default());
        let fileio = fileio::spawn(&kernel, ActorId::KERNEL).unwrap();
        let loader = spawn(&kernel, ActorId::KERNEL, fileio).unwrap();
        kernel
            .grant_cap(fileio, loader, fileio, Rights::READ, None)
            .unwrap();

        let reply = kernel
            .send_sync(
                ActorId::KERNEL,
                loader,
                LoadModuleRequest {
                    path: "/etc/hostname".into(),
                },
                Duration::from_millis(300),
            )
            .await
            .unwrap();
        let resp = reply.downcast::<LoadModuleResponse>().unwrap();
        let _ = resp.source; // either Ok or a filesystem-specific Err; both are fine here
    }
}
