// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

// Estrutura de dados ("claims") dentro do JWT do provedor de identidade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (uid do usuário)
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

/// Identidade já validada, como veio do provedor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub role: Role,
    pub email: Option<String>,
}

/// Contexto explícito de cada chamada (unidade atual + quem está agindo).
/// Construído uma vez por requisição e repassado aos serviços.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub unit_id: Uuid,
    pub identity: Identity,
}

impl RequestContext {
    pub fn new(unit_id: Uuid, identity: Identity) -> Self {
        Self { unit_id, identity }
    }

    pub fn user_id(&self) -> &str {
        &self.identity.uid
    }

    pub fn is_admin(&self) -> bool {
        self.identity.role == Role::Admin
    }
}
