use tracing::{info, warn, error, debug};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_webhook_received(provider: &str, instance: &str, event: &str) {
    info!("📥 Webhook {} recebido - instância: {} - evento: {}", provider, instance, event);
}

pub fn log_connection_not_found(instance: &str) {
    warn!("❌ Conexão não encontrada para instância '{}' (sem retry)", instance);
}

pub fn log_status_correlated(external_id: &str, status: &str, matched: bool) {
    if matched {
        info!("✅ Status '{}' aplicado à mensagem {}", status, external_id);
    } else {
        info!("ℹ️ Nenhuma mensagem com external_id {} - status '{}' apenas encaminhado", external_id, status);
    }
}

pub fn log_forward_result(url: &str, status: Option<u16>, error: Option<&str>) {
    match (status, error) {
        (Some(code), None) if (200..300).contains(&code) => {
            info!("📤 Evento encaminhado para {} - Status: {}", url, code)
        }
        (status, error) => {
            error!("❌ Falha ao encaminhar evento para {} - Status: {:?} - Error: {}",
                   url, status, error.unwrap_or("non-2xx response"))
        }
    }
}

pub fn log_media_attempt_failed(url: &str, attempt: u32, max_attempts: u32, error: &str) {
    warn!("⚠️ Download de mídia falhou ({}/{}) {}: {}", attempt, max_attempts, url, error);
}

pub fn log_dispatch_result(workspace_id: &str, provider: &str, ok: bool, detail: &str) {
    if ok {
        info!("✅ Mensagem enviada via {} (workspace {}) - id: {}", provider, workspace_id, detail);
    } else {
        warn!("❌ Envio via {} falhou (workspace {}): {}", provider, workspace_id, detail);
    }
}

pub fn log_failover(workspace_id: &str, from: &str, to: &str) {
    warn!("🔁 Failover de provedor no workspace {}: {} → {}", workspace_id, from, to);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 WhatsApp gateway middleware server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
