// src/services/session.rs

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::{AppError, PartialSetupError, SetupStep};
use crate::common::notify::NotificationSink;
use crate::gateway::{AuthEventSource, AuthSubscription, RemoteGateway, SessionProvider};
use crate::models::auth::{
    AuthEvent, Credentials, MemberRole, Membership, NewUserProfile, OrganizationMember,
    SignUpData, User,
};
use crate::models::tenancy::{
    Branch, NewBranch, NewOrganization, Organization, OrganizationSettings,
};
use crate::services::scope::TenantScopeResolver;

// ---
// 1. Estado da Sessão
// ---

// A parte viva de uma sessão autenticada: quem é o usuário, de quais
// organizações ele participa e qual par (organização, filial) está ativo.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub user: User,
    pub memberships: Vec<Membership>,
    pub current_organization: Option<Organization>,
    pub current_branch: Option<Branch>,
}

impl ActiveSession {
    fn new(user: User) -> Self {
        Self {
            user,
            memberships: Vec::new(),
            current_organization: None,
            current_branch: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    // Entre o pedido ao provedor e a resposta dele.
    Authenticating,
    Authenticated(ActiveSession),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

// ---
// 2. SessionContext
// ---
// Dono do ciclo de vida da sessão. Toda transição termina empurrando o
// par (organização, filial) derivado para o TenantScopeResolver; é o
// único caminho pelo qual o resto do sistema fica sabendo do escopo.

pub struct SessionContext {
    provider: Arc<dyn SessionProvider>,
    gateway: Arc<dyn RemoteGateway>,
    resolver: Arc<TenantScopeResolver>,
    notifier: Arc<dyn NotificationSink>,
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        gateway: Arc<dyn RemoteGateway>,
        resolver: Arc<TenantScopeResolver>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            provider,
            gateway,
            resolver,
            notifier,
            state: RwLock::new(SessionState::default()),
        }
    }

    // --- Leitura ---

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        match &*self.state.read() {
            SessionState::Authenticated(active) => Some(active.user.clone()),
            _ => None,
        }
    }

    pub fn memberships(&self) -> Vec<Membership> {
        match &*self.state.read() {
            SessionState::Authenticated(active) => active.memberships.clone(),
            _ => Vec::new(),
        }
    }

    pub fn current_organization(&self) -> Option<Organization> {
        match &*self.state.read() {
            SessionState::Authenticated(active) => active.current_organization.clone(),
            _ => None,
        }
    }

    pub fn current_branch(&self) -> Option<Branch> {
        match &*self.state.read() {
            SessionState::Authenticated(active) => active.current_branch.clone(),
            _ => None,
        }
    }

    // --- Assinatura de eventos do provedor ---

    // Registra este contexto como o handler da fonte de eventos. O
    // recibo retornado cancela a assinatura quando liberado.
    pub fn attach(self: &Arc<Self>, source: &Arc<AuthEventSource>) -> AuthSubscription {
        let context = Arc::clone(self);
        source.subscribe(Box::new(move |event| {
            let context = Arc::clone(&context);
            Box::pin(async move { context.auth_state_changed(event).await })
        }))
    }

    // Invocado pelo provedor a cada login ou logout.
    pub async fn auth_state_changed(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                self.enter_session(session.user).await;
            }
            AuthEvent::SignedOut => {
                *self.state.write() = SessionState::Unauthenticated;
                self.push_scope().await;
            }
        }
    }

    // --- Transições ---

    // Retoma uma sessão deixada pelo provedor, se houver. Não ter
    // sessão não é erro: o estado apenas volta a não autenticado.
    pub async fn resume_session(&self) {
        *self.state.write() = SessionState::Authenticating;
        match self.provider.current_session().await {
            Ok(Some(session)) => {
                tracing::info!("🔑 Sessão retomada para {}", session.user.email);
                self.enter_session(session.user).await;
            }
            Ok(None) => {
                *self.state.write() = SessionState::Unauthenticated;
                self.push_scope().await;
            }
            Err(error) => {
                tracing::warn!("não foi possível retomar a sessão: {}", error);
                *self.state.write() = SessionState::Unauthenticated;
                self.push_scope().await;
            }
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), AppError> {
        credentials.validate()?;
        *self.state.write() = SessionState::Authenticating;
        match self.provider.sign_in(credentials).await {
            Ok(_session) => {
                // O evento SignedIn já foi processado dentro da chamada.
                self.notifier.notify_success("Login realizado com sucesso!");
                Ok(())
            }
            Err(error) => {
                *self.state.write() = SessionState::Unauthenticated;
                self.notifier.notify_error(&error.message);
                Err(error.into())
            }
        }
    }

    // Cadastro composto: a conta de autenticação primeiro, depois a
    // montagem organização → vínculo → filial → perfil.
    pub async fn sign_up(&self, data: &SignUpData) -> Result<(), AppError> {
        data.validate()?;
        *self.state.write() = SessionState::Authenticating;
        let session = match self.provider.sign_up(data).await {
            Ok(session) => session,
            Err(error) => {
                *self.state.write() = SessionState::Unauthenticated;
                self.notifier.notify_error(&error.message);
                return Err(error.into());
            }
        };

        let setup = self.provision_account(&session.user, data).await;
        // O evento de login só é processado com a montagem encerrada,
        // completa ou desfeita; nunca no meio dela.
        self.auth_state_changed(AuthEvent::SignedIn(session)).await;

        match setup {
            Ok(()) => {
                self.notifier.notify_success("Conta criada com sucesso!");
                Ok(())
            }
            Err(error) => {
                self.notifier.notify_error(&error.to_string());
                Err(error)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        match self.provider.sign_out().await {
            Ok(()) => {
                // O evento SignedOut já limpou o estado e o escopo.
                self.notifier.notify_success("Sessão encerrada com sucesso!");
                Ok(())
            }
            Err(error) => {
                self.notifier.notify_error(&error.message);
                Err(error.into())
            }
        }
    }

    // Troca a organização ativa. A filial é limpa antes de qualquer
    // auto-seleção; nunca existe um estado observável com organização
    // nova e filial da antiga.
    pub async fn switch_organization(&self, organization: Organization) -> Result<(), AppError> {
        let organization_id = organization.id;
        {
            let mut state = self.state.write();
            let SessionState::Authenticated(active) = &mut *state else {
                return Err(AppError::NotAuthenticated);
            };
            // Só organizações das quais o usuário participa.
            let member = active
                .memberships
                .iter()
                .any(|membership| membership.organization.id == organization_id);
            if !member {
                return Err(AppError::OrganizationOutsideMemberships(organization.name));
            }
            active.current_organization = Some(organization);
            active.current_branch = None;
        }
        // Primeiro o par incompleto: derruba o escopo velho e segura
        // qualquer carga até existir filial nova.
        self.push_scope().await;
        self.load_branches(organization_id).await;
        self.push_scope().await;
        Ok(())
    }

    pub async fn switch_branch(&self, branch: Branch) -> Result<(), AppError> {
        {
            let mut state = self.state.write();
            let SessionState::Authenticated(active) = &mut *state else {
                return Err(AppError::NotAuthenticated);
            };
            let Some(organization) = &active.current_organization else {
                return Err(AppError::NoOrganizationSelected);
            };
            // Filial de outra organização é recusada antes de qualquer
            // mudança de estado.
            if branch.organization_id != organization.id {
                return Err(AppError::BranchOutsideOrganization {
                    branch: branch.name,
                    organization: organization.name.clone(),
                });
            }
            active.current_branch = Some(branch);
        }
        self.push_scope().await;
        Ok(())
    }

    // --- Equipe ---

    pub async fn organization_members(&self) -> Result<Vec<OrganizationMember>, AppError> {
        let organization_id = self
            .current_organization()
            .map(|organization| organization.id)
            .ok_or(AppError::NoOrganizationSelected)?;
        Ok(self
            .gateway
            .fetch_organization_members(organization_id)
            .await?)
    }

    pub async fn update_member_role(
        &self,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), AppError> {
        let organization_id = self
            .current_organization()
            .map(|organization| organization.id)
            .ok_or(AppError::NoOrganizationSelected)?;
        match self
            .gateway
            .update_member_role(organization_id, user_id, role)
            .await
        {
            Ok(()) => {
                self.notifier
                    .notify_success("Papel do membro atualizado com sucesso!");
                Ok(())
            }
            Err(error) => {
                self.notifier.notify_error(&error.message);
                Err(error.into())
            }
        }
    }

    pub async fn remove_member(&self, user_id: Uuid) -> Result<(), AppError> {
        let organization_id = self
            .current_organization()
            .map(|organization| organization.id)
            .ok_or(AppError::NoOrganizationSelected)?;
        match self
            .gateway
            .delete_membership(organization_id, user_id)
            .await
        {
            Ok(()) => {
                self.notifier.notify_success("Membro removido com sucesso!");
                Ok(())
            }
            Err(error) => {
                self.notifier.notify_error(&error.message);
                Err(error.into())
            }
        }
    }

    // --- Interno ---

    // Entra (ou atualiza) a sessão autenticada e cascateia as seleções.
    async fn enter_session(&self, user: User) {
        let user_id = user.id;
        {
            let mut state = self.state.write();
            match &mut *state {
                // Sessão renovada: mantém organização e filial atuais.
                SessionState::Authenticated(active) => active.user = user,
                _ => *state = SessionState::Authenticated(ActiveSession::new(user)),
            }
        }
        self.load_memberships(user_id).await;
        self.push_scope().await;
    }

    // Carrega os vínculos do usuário e, se nada estiver selecionado,
    // escolhe a primeira organização e cascateia para as filiais.
    async fn load_memberships(&self, user_id: Uuid) {
        let memberships = match self.gateway.fetch_memberships(user_id).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!("falha ao carregar organizações: {}", error);
                self.notifier.notify_error("Falha ao carregar organizações");
                return;
            }
        };
        let cascade = {
            let mut state = self.state.write();
            let SessionState::Authenticated(active) = &mut *state else {
                return;
            };
            active.memberships = memberships;
            if active.current_organization.is_none() {
                let first = active
                    .memberships
                    .first()
                    .map(|membership| membership.organization.clone());
                active.current_organization = first.clone();
                first.map(|organization| organization.id)
            } else {
                None
            }
        };
        if let Some(organization_id) = cascade {
            self.load_branches(organization_id).await;
        }
    }

    // Busca as filiais (em ordem de nome) e seleciona a primeira se
    // nenhuma estiver ativa.
    async fn load_branches(&self, organization_id: Uuid) {
        let branches = match self.gateway.fetch_branches(organization_id).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!("falha ao carregar filiais: {}", error);
                self.notifier.notify_error("Falha ao carregar filiais");
                return;
            }
        };
        let mut state = self.state.write();
        if let SessionState::Authenticated(active) = &mut *state {
            if active.current_branch.is_none() {
                active.current_branch = branches.first().cloned();
            }
        }
    }

    // Montagem composta do cadastro: organização → vínculo de dono →
    // filial padrão → perfil. Se um passo falhar, os anteriores são
    // desfeitos na ordem inversa antes de o erro subir.
    async fn provision_account(&self, user: &User, data: &SignUpData) -> Result<(), AppError> {
        let organization = self
            .gateway
            .create_organization(NewOrganization {
                name: data.organization_name.clone(),
                owner_id: user.id,
                settings: OrganizationSettings::default(),
            })
            .await?;

        let mut completed = vec![SetupStep::Organization];
        let mut branch_id = None;

        let failure = 'setup: {
            if let Err(error) = self
                .gateway
                .create_membership(organization.id, user.id, MemberRole::Owner)
                .await
            {
                break 'setup Some((SetupStep::Membership, error));
            }
            completed.push(SetupStep::Membership);

            match self
                .gateway
                .create_branch(NewBranch {
                    organization_id: organization.id,
                    name: "Main Branch".to_string(),
                    address: String::new(),
                    manager_id: Some(user.id),
                })
                .await
            {
                Ok(branch) => {
                    branch_id = Some(branch.id);
                    completed.push(SetupStep::Branch);
                }
                Err(error) => break 'setup Some((SetupStep::Branch, error)),
            }

            if let Err(error) = self
                .gateway
                .create_user_profile(NewUserProfile {
                    user_id: user.id,
                    full_name: data.full_name.clone(),
                    avatar_url: None,
                })
                .await
            {
                break 'setup Some((SetupStep::Profile, error));
            }

            None
        };

        let Some((failed_step, cause)) = failure else {
            tracing::info!(
                "🏢 Organização '{}' montada para {}",
                organization.name,
                user.email
            );
            return Ok(());
        };

        tracing::warn!(
            "cadastro falhou no passo '{}'; desfazendo {} passo(s)",
            failed_step,
            completed.len()
        );
        let mut remaining = Vec::new();
        for step in completed.iter().rev().copied() {
            let undo = match step {
                SetupStep::Branch => match branch_id {
                    Some(id) => self.gateway.delete_branch(id).await,
                    None => Ok(()),
                },
                SetupStep::Membership => {
                    self.gateway
                        .delete_membership(organization.id, user.id)
                        .await
                }
                SetupStep::Organization => {
                    self.gateway.delete_organization(organization.id).await
                }
                // O perfil é o último passo; nunca fica para trás.
                SetupStep::Profile => Ok(()),
            };
            if let Err(undo_error) = undo {
                tracing::error!("compensação de '{}' falhou: {}", step, undo_error);
                remaining.push(step);
            }
        }

        if remaining.is_empty() {
            Err(cause.into())
        } else {
            remaining.reverse();
            Err(PartialSetupError {
                failed_step,
                remaining,
                message: cause.message,
            }
            .into())
        }
    }

    fn scope_ids(&self) -> (Option<Uuid>, Option<Uuid>) {
        let state = self.state.read();
        match &*state {
            SessionState::Authenticated(active) => (
                active
                    .current_organization
                    .as_ref()
                    .map(|organization| organization.id),
                active.current_branch.as_ref().map(|branch| branch.id),
            ),
            _ => (None, None),
        }
    }

    // Toda transição termina aqui: o par derivado vai para o resolvedor,
    // que só propaga se algo realmente mudou.
    async fn push_scope(&self) {
        let (organization_id, branch_id) = self.scope_ids();
        self.resolver.update(organization_id, branch_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::notify::RecordingNotifier;
    use crate::gateway::{MemoryGateway, MemoryProvider};

    fn build_context(
        provider: Arc<MemoryProvider>,
        gateway: Arc<MemoryGateway>,
    ) -> Arc<SessionContext> {
        Arc::new(SessionContext::new(
            provider,
            gateway,
            Arc::new(TenantScopeResolver::new()),
            Arc::new(RecordingNotifier::new()),
        ))
    }

    fn sign_up_data() -> SignUpData {
        SignUpData {
            email: "dona@loja.com".to_string(),
            password: "segredo123".to_string(),
            full_name: "Dona da Loja".to_string(),
            organization_name: "Mercearia Central".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_provisions_the_full_account() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));

        context.sign_up(&sign_up_data()).await.unwrap();

        assert_eq!(gateway.organization_count(), 1);
        assert_eq!(gateway.membership_count(), 1);
        assert_eq!(gateway.branch_count(), 1);
        assert_eq!(gateway.profile_count(), 1);

        let organization = context.current_organization().expect("organização ativa");
        assert_eq!(organization.name, "Mercearia Central");
        let branch = context.current_branch().expect("filial ativa");
        assert_eq!(branch.name, "Main Branch");
    }

    #[tokio::test]
    async fn failed_branch_step_rolls_back_earlier_steps() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        gateway.fail_next("create_branch", "sem permissão");
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));

        let error = context.sign_up(&sign_up_data()).await.unwrap_err();

        assert!(matches!(error, AppError::RemoteError(_)));
        assert_eq!(gateway.organization_count(), 0);
        assert_eq!(gateway.membership_count(), 0);
        assert_eq!(gateway.branch_count(), 0);
        // A conta de autenticação existe, mas sem organização.
        assert!(context.state().is_authenticated());
        assert_eq!(context.current_organization(), None);
    }

    #[tokio::test]
    async fn failed_compensation_reports_remaining_steps() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        gateway.fail_next("create_branch", "sem permissão");
        gateway.fail_next("delete_organization", "sem conexão");
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));

        let error = context.sign_up(&sign_up_data()).await.unwrap_err();

        let AppError::PartialSetup(partial) = error else {
            panic!("esperava PartialSetup, veio {:?}", error);
        };
        assert_eq!(partial.failed_step, SetupStep::Branch);
        assert_eq!(partial.remaining, vec![SetupStep::Organization]);
        // O vínculo foi desfeito mesmo com a organização órfã.
        assert_eq!(gateway.membership_count(), 0);
        assert_eq!(gateway.organization_count(), 1);
    }

    #[tokio::test]
    async fn switch_branch_rejects_foreign_branch() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));
        context.sign_up(&sign_up_data()).await.unwrap();

        let other_organization = gateway.seed_organization("Outra Loja", Uuid::new_v4());
        let foreign = gateway.seed_branch(other_organization.id, "Depósito");

        let before = context.current_branch();
        let error = context.switch_branch(foreign).await.unwrap_err();

        assert!(matches!(error, AppError::BranchOutsideOrganization { .. }));
        assert_eq!(context.current_branch(), before);
    }

    #[tokio::test]
    async fn switch_organization_requires_membership() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));
        context.sign_up(&sign_up_data()).await.unwrap();

        let outsider = gateway.seed_organization("Outra Loja", Uuid::new_v4());
        let error = context.switch_organization(outsider).await.unwrap_err();

        assert!(matches!(error, AppError::OrganizationOutsideMemberships(_)));
        let organization = context.current_organization().expect("organização ativa");
        assert_eq!(organization.name, "Mercearia Central");
    }

    #[tokio::test]
    async fn member_listing_reflects_role_updates() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));
        context.sign_up(&sign_up_data()).await.unwrap();

        let members = context.organization_members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].full_name.as_deref(), Some("Dona da Loja"));
        assert_eq!(members[0].role, MemberRole::Owner);

        context
            .update_member_role(members[0].user_id, MemberRole::Admin)
            .await
            .unwrap();
        let members = context.organization_members().await.unwrap();
        assert_eq!(members[0].role, MemberRole::Admin);
    }

    #[tokio::test]
    async fn removing_a_member_deletes_the_membership() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let context = build_context(Arc::clone(&provider), Arc::clone(&gateway));
        context.sign_up(&sign_up_data()).await.unwrap();

        let colleague = Uuid::new_v4();
        let organization = context.current_organization().expect("organização ativa");
        gateway.seed_membership(organization.id, colleague, MemberRole::Member);
        assert_eq!(context.organization_members().await.unwrap().len(), 2);

        context.remove_member(colleague).await.unwrap();

        let members = context.organization_members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, MemberRole::Owner);
        assert_eq!(gateway.membership_count(), 1);
    }

    #[tokio::test]
    async fn failed_role_update_reaches_the_notifier() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let context = Arc::new(SessionContext::new(
            provider,
            gateway.clone(),
            Arc::new(TenantScopeResolver::new()),
            notifier.clone(),
        ));
        context.sign_up(&sign_up_data()).await.unwrap();
        let members = context.organization_members().await.unwrap();

        gateway.fail_next("update_member_role", "sem conexão");
        let error = context
            .update_member_role(members[0].user_id, MemberRole::Admin)
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::RemoteError(_)));
        assert_eq!(notifier.errors(), vec!["sem conexão".to_string()]);
    }

    #[tokio::test]
    async fn resume_without_session_stays_unauthenticated() {
        let provider = Arc::new(MemoryProvider::new());
        let gateway = Arc::new(MemoryGateway::new());
        let context = build_context(provider, gateway);

        context.resume_session().await;

        assert_eq!(context.state(), SessionState::Unauthenticated);
    }
}
