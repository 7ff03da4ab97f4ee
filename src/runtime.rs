//! Process-wide, one-time initialization.
//!
//! [`init`] must run before the first [`crate::RenderContext`] is created. It installs the
//! `tracing` subscriber and records the host environment; later calls are no-ops.

use std::sync::{Arc, OnceLock};

use crate::render::media::ContentResolver;

/// Host services registered once per process.
#[derive(Clone, Default)]
pub struct HostEnv {
    /// Opens `content://` media URIs.
    pub content_resolver: Option<Arc<dyn ContentResolver>>,
    /// Install a `tracing` fmt subscriber at INFO. Hosts with their own subscriber leave this off.
    pub install_logger: bool,
}

impl HostEnv {
    pub fn new() -> Self {
        Self {
            content_resolver: None,
            install_logger: true,
        }
    }

    pub fn with_content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content_resolver = Some(resolver);
        self
    }
}

impl std::fmt::Debug for HostEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEnv")
            .field("content_resolver", &self.content_resolver.is_some())
            .field("install_logger", &self.install_logger)
            .finish()
    }
}

static HOST: OnceLock<HostEnv> = OnceLock::new();

/// Register the host environment. Returns `true` for the call that performed the registration.
pub fn init(env: HostEnv) -> bool {
    let mut first = false;
    HOST.get_or_init(|| {
        first = true;
        if env.install_logger {
            // A host or test harness may already own the global subscriber.
            let _ = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::INFO)
                .try_init();
        }
        tracing::info!(
            content_resolver = env.content_resolver.is_some(),
            "runtime initialized"
        );
        env
    });
    if !first {
        tracing::debug!("runtime already initialized; ignoring");
    }
    first
}

pub fn is_initialized() -> bool {
    HOST.get().is_some()
}

pub(crate) fn content_resolver() -> Option<&'static dyn ContentResolver> {
    HOST.get()?.content_resolver.as_deref()
}
