use std::borrow::Cow;
use std::fmt;

use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::gateway::RemoteError;

// Os passos da montagem composta de conta, na ordem em que executam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Organization,
    Membership,
    Branch,
    Profile,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStep::Organization => "organização",
            SetupStep::Membership => "vínculo de membro",
            SetupStep::Branch => "filial",
            SetupStep::Profile => "perfil",
        };
        write!(f, "{}", name)
    }
}

// A montagem de conta falhou no meio E a compensação não conseguiu
// remover tudo o que já tinha sido criado. Os passos em `remaining`
// deixaram registros órfãos no armazenamento remoto.
#[derive(Debug, Error)]
#[error("Configuração de conta incompleta: o passo '{failed_step}' falhou ({message}) e restaram registros de {remaining:?}")]
pub struct PartialSetupError {
    pub failed_step: SetupStep,
    pub remaining: Vec<SetupStep>,
    pub message: String,
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("Já existe uma categoria chamada '{0}'")]
    CategoryNameAlreadyExists(String),

    #[error("Já existe um fornecedor chamado '{0}'")]
    SupplierNameAlreadyExists(String),

    #[error("Arquivo de importação inválido: {0}")]
    InvalidImportPayload(String),

    #[error("A filial '{branch}' não pertence à organização '{organization}'")]
    BranchOutsideOrganization { branch: String, organization: String },

    #[error("O usuário não participa da organização '{0}'")]
    OrganizationOutsideMemberships(String),

    #[error("Nenhuma sessão ativa")]
    NotAuthenticated,

    #[error("Nenhuma organização selecionada")]
    NoOrganizationSelected,

    #[error("Nenhuma filial selecionada")]
    NoBranchSelected,

    // Qualquer falha vinda da fronteira remota. O núcleo nunca tenta
    // de novo sozinho; quem chamou decide o que fazer.
    #[error("{0}")]
    RemoteError(#[from] RemoteError),

    #[error(transparent)]
    PartialSetup(#[from] PartialSetupError),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno")]
    InternalServerError(#[from] anyhow::Error),
}

// Monta um `ValidationErrors` de um único campo, no mesmo formato que o
// derive de `validator` produz. Útil para checagens feitas à mão.
pub fn field_error(field: &'static str, code: &'static str, message: &str) -> ValidationErrors {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message.to_string()));
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}
