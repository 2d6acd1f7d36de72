use anyhow::Context;
use axum::Router;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A configured application: settings, the opened store, and its modules.
pub struct App {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl App {
    /// Open the configured database and register every module against it.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(settings.database.backend, &settings.database.path)
            .with_context(|| {
                format!(
                    "failed to open database at {}",
                    settings.database.path.display()
                )
            })?;
        Ok(Self::with_database(settings, db))
    }

    pub fn with_database(settings: Settings, db: Database) -> Self {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db);
        Self {
            settings,
            db,
            registry,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.db,
        }
    }

    /// Apply pending module migrations and return how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let applied = self.db.migrate(self.registry.collect_migrations()).await?;
        tracing::info!(applied, backend = ?self.db.backend(), "migrations complete");
        Ok(applied)
    }

    /// Migrate, then initialize modules in registration order.
    pub async fn init(&self) -> anyhow::Result<()> {
        self.migrate().await?;
        self.registry.init_all(&self.ctx()).await
    }

    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings)
    }

    /// Run until a shutdown signal arrives, then stop modules in reverse order.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.init().await?;
        self.registry.start_all(&self.ctx()).await?;

        let served =
            shelf_http::start_server(&self.registry, &self.settings, shelf_http::shutdown_signal())
                .await;

        self.registry.stop_all().await?;
        served
    }
}
