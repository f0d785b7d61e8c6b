// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{MemoryStore, Repositories},
    services::{
        auth::AuthService,
        notification_service::{LogNotifier, Notifier},
        Services,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBackend {
    Postgres,
    Memory,
}

impl FromStr for DataBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(DataBackend::Postgres),
            "memory" | "mem" => Ok(DataBackend::Memory),
            other => bail!("DATA_BACKEND desconhecido: {other}"),
        }
    }
}

/// Configuração lida do ambiente (com `.env` opcional).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_env: String,
    pub bind_addr: String,
    pub data_backend: DataBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub reminder_interval: Duration,
    pub reminder_window_hours: i64,
}

fn var_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} inválida: {e}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let data_backend = match env::var("DATA_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => DataBackend::Postgres,
        };
        let database_url = env::var("DATABASE_URL").ok();
        if data_backend == DataBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida");
        }

        Ok(Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            data_backend,
            database_url,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            reminder_interval: Duration::from_secs(var_or("REMINDER_INTERVAL_SECS", 1800)?),
            reminder_window_hours: var_or("REMINDER_WINDOW_HOURS", 24)?,
        })
    }

    pub fn reminder_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.reminder_window_hours)
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub services: Services,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        match config.data_backend {
            DataBackend::Postgres => {
                let database_url = config
                    .database_url
                    .clone()
                    .context("DATABASE_URL deve ser definida")?;

                // Conecta ao banco de dados, usando '?' para propagar erros
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(&database_url)
                    .await?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                let repos = Repositories::postgres(db_pool.clone());
                let mut state = Self::with_repositories(config, repos, Arc::new(LogNotifier));
                state.db_pool = Some(db_pool);
                Ok(state)
            }
            DataBackend::Memory => {
                tracing::warn!("🧪 Usando armazenamento em memória (dados somem ao reiniciar)");
                let repos = Repositories::memory(Arc::new(MemoryStore::new()));
                Ok(Self::with_repositories(config, repos, Arc::new(LogNotifier)))
            }
        }
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_repositories(config: AppConfig, repos: Repositories, notifier: Arc<dyn Notifier>) -> Self {
        let auth_service = AuthService::new(config.jwt_secret.clone());
        let services = Services::build(&repos, notifier, config.reminder_window());

        Self {
            config: Arc::new(config),
            db_pool: None,
            i18n_store: Arc::new(I18nStore::builtin()),
            auth_service,
            services,
        }
    }
}
