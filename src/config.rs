// src/config.rs

use std::sync::Arc;

use crate::common::notify::NotificationSink;
use crate::gateway::{AuthSubscription, RemoteGateway, SessionProvider};
use crate::services::{
    DashboardService, InventoryStore, SessionContext, TenantScopeResolver, TransferService,
};

// O estado construído explicitamente que amarra provedor, gateway e
// serviços. Quem consome recebe referências daqui; não existe estado
// ambiente escondido.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionContext>,
    pub store: Arc<InventoryStore>,
    pub resolver: Arc<TenantScopeResolver>,
    pub dashboard: DashboardService,
    pub transfer: TransferService,
    auth_subscription: Arc<AuthSubscription>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        gateway: Arc<dyn RemoteGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        // --- Monta o gráfico de dependências ---
        let resolver = Arc::new(TenantScopeResolver::new());
        let store = Arc::new(InventoryStore::new(
            Arc::clone(&gateway),
            Arc::clone(&notifier),
        ));

        // Mudou o escopo → o store invalida as buscas em voo e recarrega.
        {
            let store = Arc::clone(&store);
            resolver.set_listener(Box::new(move |scope| {
                let store = Arc::clone(&store);
                Box::pin(async move { store.on_scope_changed(scope).await })
            }));
        }

        let session = Arc::new(SessionContext::new(
            Arc::clone(&provider),
            Arc::clone(&gateway),
            Arc::clone(&resolver),
            Arc::clone(&notifier),
        ));
        let auth_subscription = Arc::new(session.attach(&provider.events()));

        let dashboard = DashboardService::new(Arc::clone(&store));
        let transfer = TransferService::new(Arc::clone(&store), Arc::clone(&notifier));

        tracing::info!("✅ Núcleo de inventário montado com sucesso!");

        Self {
            session,
            store,
            resolver,
            dashboard,
            transfer,
            auth_subscription,
        }
    }

    // Desliga o handler de autenticação; o resto é derrubado pelo
    // próprio sign-out.
    pub fn shutdown(&self) {
        self.auth_subscription.unsubscribe();
        self.resolver.clear_listener();
    }
}
