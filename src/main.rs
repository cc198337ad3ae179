use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use whatsapp_gateway_middleware::config::{Settings, StoreBackend};
use whatsapp_gateway_middleware::store::{InMemoryStore, Store, SupabaseStore};
use whatsapp_gateway_middleware::utils::logging::*;
use whatsapp_gateway_middleware::utils::AppResult;
use whatsapp_gateway_middleware::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Inicializar tracing (RUST_LOG, padrão info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        // Em produção não existe .env - variáveis vêm do ambiente
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new().context("Failed to load settings")?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let store = build_store(&settings).context("Failed to initialize store")?;
    let state = Arc::new(AppState::new(settings.clone(), store).context("Failed to build application state")?);

    // Reconciliação periódica das conexões
    if settings.sync.interval_seconds > 0 {
        log_info(&format!(
            "🔄 Sincronização de conexões a cada {}s",
            settings.sync.interval_seconds
        ));
        state
            .sync
            .clone()
            .spawn_periodic(Duration::from_secs(settings.sync.interval_seconds));
    }

    if settings.webhook.default_forward_url.is_none() {
        log_warning("⚠️  N8N_WEBHOOK_URL não configurado - apenas webhooks configurados por tenant serão usados");
    }

    let app = build_router(state);

    // No Cloud Run, usar a variável de ambiente PORT
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

fn build_store(settings: &Settings) -> AppResult<Arc<dyn Store>> {
    match settings.store.backend {
        StoreBackend::Supabase => {
            let url = settings.store.url.as_deref().unwrap_or_default();
            let key = settings.store.service_key.as_deref().unwrap_or_default();
            let store = SupabaseStore::new(url, key, Duration::from_secs(settings.store.timeout_seconds))?;
            log_info(&format!("🗄️  Store Supabase: {}", url));
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            let store = match settings.store.seed_file.as_deref() {
                Some(path) => {
                    log_info(&format!("🗄️  Store em memória carregado de {}", path));
                    InMemoryStore::from_seed_file(path)?
                }
                None => {
                    log_warning("⚠️  Store em memória vazio - use apenas em desenvolvimento");
                    InMemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
    }
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("Failed to install Ctrl+C handler: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("Failed to install SIGTERM handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
