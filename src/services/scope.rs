// src/services/scope.rs

use std::future::Future;
use std::pin::Pin;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::tenancy::TenantScope;

type ListenerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type ScopeListener = Box<dyn Fn(TenantScope) -> ListenerFuture + Send + Sync>;

// Deriva o par (organização, filial) da sessão e avisa o ouvinte
// registrado apenas quando algum dos dois ids realmente muda.
#[derive(Default)]
pub struct TenantScopeResolver {
    current: RwLock<TenantScope>,
    listener: RwLock<Option<ScopeListener>>,
}

impl TenantScopeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> TenantScope {
        *self.current.read()
    }

    pub fn set_listener(&self, listener: ScopeListener) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    // Recalcula o escopo e propaga se mudou. Igualdade por valor:
    // empurrar o mesmo par de novo não dispara nada.
    pub async fn update(&self, organization_id: Option<Uuid>, branch_id: Option<Uuid>) -> bool {
        let next = TenantScope::new(organization_id, branch_id);
        {
            let mut current = self.current.write();
            if *current == next {
                return false;
            }
            *current = next;
        }
        tracing::debug!(
            "escopo ativo agora é org={:?} filial={:?}",
            next.organization_id,
            next.branch_id
        );
        let pending = {
            let guard = self.listener.read();
            guard.as_ref().map(|listener| listener(next))
        };
        if let Some(future) = pending {
            future.await;
        }
        true
    }
}
