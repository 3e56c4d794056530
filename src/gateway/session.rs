// src/gateway/session.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::models::auth::{AuthEvent, AuthSession, Credentials, SignUpData};

use super::remote::RemoteError;

// O provedor de sessão é uma caixa-preta: guarda credenciais, tokens e
// afins do lado de lá. O núcleo só enxerga operações e eventos.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, RemoteError>;
    async fn sign_up(&self, data: &SignUpData) -> Result<AuthSession, RemoteError>;
    async fn sign_out(&self) -> Result<(), RemoteError>;

    // A fonte de eventos deste provedor; compartilhada, nunca recriada.
    fn events(&self) -> Arc<AuthEventSource>;
}

type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type AuthHandler = Box<dyn Fn(AuthEvent) -> HandlerFuture + Send + Sync>;

// Fonte explícita de eventos de autenticação: um único handler por vez,
// com cancelamento explícito. `emit` roda o handler até o fim antes de
// retornar, o que mantém a ordem dos efeitos determinística.
#[derive(Default)]
pub struct AuthEventSource {
    handler: RwLock<Option<AuthHandler>>,
}

impl AuthEventSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // Registra o handler. Se já havia um, ele é substituído.
    pub fn subscribe(self: &Arc<Self>, handler: AuthHandler) -> AuthSubscription {
        *self.handler.write() = Some(handler);
        AuthSubscription {
            source: Arc::downgrade(self),
        }
    }

    pub fn unsubscribe(&self) {
        *self.handler.write() = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    pub async fn emit(&self, event: AuthEvent) {
        // O lock só cobre a construção do futuro; o await roda fora dele.
        let pending = {
            let guard = self.handler.read();
            guard.as_ref().map(|handler| handler(event))
        };
        if let Some(future) = pending {
            future.await;
        }
    }
}

// Recibo da assinatura. Cancela ao ser liberado, ou antes, por chamada
// explícita a `unsubscribe`.
pub struct AuthSubscription {
    source: Weak<AuthEventSource>,
}

impl AuthSubscription {
    pub fn unsubscribe(&self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_handler(counter: Arc<AtomicUsize>) -> AuthHandler {
        Box::new(move |_event| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn emit_runs_the_registered_handler() {
        let source = AuthEventSource::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _subscription = source.subscribe(counting_handler(Arc::clone(&counter)));

        source.emit(AuthEvent::SignedOut).await;
        source.emit(AuthEvent::SignedOut).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let source = AuthEventSource::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = source.subscribe(counting_handler(Arc::clone(&counter)));

        subscription.unsubscribe();
        source.emit(AuthEvent::SignedOut).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!source.has_handler());
    }

    #[tokio::test]
    async fn dropping_the_subscription_unsubscribes() {
        let source = AuthEventSource::new();
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _subscription = source.subscribe(counting_handler(Arc::clone(&counter)));
            assert!(source.has_handler());
        }

        source.emit(AuthEvent::SignedOut).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn emit_without_handler_is_a_no_op() {
        let source = AuthEventSource::new();
        source.emit(AuthEvent::SignedOut).await;
        assert!(!source.has_handler());
    }
}
