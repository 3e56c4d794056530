use parking_lot::Mutex;

// O coletor de notificações que a camada de cima observa. Disparar e
// esquecer: o núcleo nunca espera resposta nem lê retorno daqui.
pub trait NotificationSink: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}

// Implementação padrão: escreve no log estruturado.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!("✅ {}", message);
    }

    fn notify_error(&self, message: &str) {
        tracing::error!("🔥 {}", message);
    }
}

// Guarda as mensagens em memória para inspeção nos testes.
#[derive(Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.successes.lock().push(message.to_string());
    }

    fn notify_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}
