//! edgequake-rerank server binary.

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use edgequake_rerank::{
    server, HttpInference, InferenceCapability, KeyValueStore, MemoryStore, RerankService,
    ServiceConfig,
};

#[actix_web::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = match ServiceConfig::load().and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new(config.cache.max_entries));

    let capability: Option<Arc<dyn InferenceCapability>> = if config.inference.enabled {
        match HttpInference::from_config(&config.inference) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                error!(error = %e, "failed to create inference client");
                return ExitCode::FAILURE;
            }
        }
    } else {
        warn!("inference disabled, ai mode requests will be ranked by math");
        None
    };

    let service = Arc::new(RerankService::from_config(&config, store, capability));
    info!(
        ai = service.ai_enabled(),
        cache = config.cache.enabled,
        ttl_secs = config.cache.ttl_secs,
        "rerank service ready"
    );

    match server::run(&config, service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server exited");
            ExitCode::FAILURE
        }
    }
}
