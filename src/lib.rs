pub mod autosave;
pub mod bus;
pub mod commands;
pub mod config;
pub mod date;
pub mod db;
pub mod debounce;
pub mod drag;
pub mod errors;
pub mod logging;
pub mod models;
pub mod ordering;
pub mod remote;
pub mod store;
pub mod views;
pub mod window;

pub use crate::autosave::{EditorSession, MemoFields, SaveOutcome};
pub use crate::bus::{ChangeBus, LocalChangeBus};
pub use crate::commands::LocalBackend;
pub use crate::config::ClientConfig;
pub use crate::db::Database;
pub use crate::drag::{DragController, DragOutcome};
pub use crate::errors::{AppError, AppResult};
pub use crate::ordering::{resolve_drop, Board, DragItem, DropTarget, OrderCommand};
pub use crate::remote::{Invoker, RemoteStoreClient};
pub use crate::store::ClientStore;
pub use crate::window::{InMemoryWindowSurface, WindowOutcome, WindowRuntime, WindowSurface, WindowTarget};

use std::path::Path;
use std::sync::Arc;

/// Process-wide wiring: one backend and one change bus shared by every window.
#[derive(Clone)]
pub struct App {
    config: ClientConfig,
    db: Arc<Database>,
    client: RemoteStoreClient,
    bus: Arc<LocalChangeBus>,
    surface: Arc<dyn WindowSurface>,
}

impl App {
    pub fn open(data_dir: &Path, config: ClientConfig) -> AppResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::new(&data_dir.join(&config.database_file))?;
        Ok(Self::with_database(Arc::new(db), config))
    }

    pub fn open_in_memory(config: ClientConfig) -> AppResult<Self> {
        Ok(Self::with_database(Arc::new(Database::open_in_memory()?), config))
    }

    fn with_database(db: Arc<Database>, config: ClientConfig) -> Self {
        let client = RemoteStoreClient::new(Arc::new(LocalBackend::new(db.clone())));
        Self {
            config,
            db,
            client,
            bus: Arc::new(LocalChangeBus::new()),
            surface: Arc::new(InMemoryWindowSurface::new()),
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn WindowSurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn client(&self) -> &RemoteStoreClient {
        &self.client
    }

    pub fn bus(&self) -> Arc<dyn ChangeBus> {
        self.bus.clone()
    }

    pub fn drag_controller(&self) -> DragController {
        DragController::new(self.config.drag_activation_distance)
    }

    /// Asks the window manager for the viewport. A label that is already open
    /// is focused instead.
    pub fn request_window(&self, target: &WindowTarget) -> AppResult<WindowOutcome> {
        self.surface.open_or_focus(&target.request())
    }

    /// Runs the client for a window that has just been opened.
    pub async fn start_window(&self, target: WindowTarget) -> AppResult<WindowRuntime> {
        WindowRuntime::start(target, self.client.clone(), self.bus(), &self.config).await
    }

    pub fn open_archive(&self) -> AppResult<WindowOutcome> {
        self.request_window(&WindowTarget::Archive)
    }

    pub fn open_memo(&self, memo_id: &str) -> AppResult<WindowOutcome> {
        self.request_window(&WindowTarget::Memo {
            memo_id: memo_id.to_string(),
        })
    }

    pub fn open_create_memo(&self, category_id: &str, default_color: Option<&str>) -> AppResult<WindowOutcome> {
        self.request_window(&WindowTarget::CreateMemo {
            category_id: category_id.to_string(),
            default_color: default_color.map(str::to_string),
        })
    }
}

/// Loads configuration, installs logging, opens the data store and starts the
/// main window's client.
pub async fn run(data_dir: &Path, config_path: Option<&Path>) -> AppResult<(App, WindowRuntime)> {
    std::fs::create_dir_all(data_dir)?;
    logging::init_tracing(data_dir)?;
    let config = ClientConfig::load(config_path)?;
    let app = App::open(data_dir, config)?;
    app.request_window(&WindowTarget::Main)?;
    let main = app.start_window(WindowTarget::Main).await?;
    tracing::info!(data_dir = %data_dir.display(), "ideanode client started");
    Ok((app, main))
}
