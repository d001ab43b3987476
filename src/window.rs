use crate::autosave::EditorSession;
use crate::bus::{ChangeBus, ChangeSubscription};
use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult};
use crate::models::Id;
use crate::remote::RemoteStoreClient;
use crate::store::ClientStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::form_urlencoded;

pub const MAIN_LABEL: &str = "main";
pub const ARCHIVE_LABEL: &str = "archive";

/// What a window shows. Secondary windows run the same client runtime and
/// read this back from their query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowTarget {
    Main,
    Archive,
    Memo { memo_id: Id },
    CreateMemo { category_id: Id, default_color: Option<String> },
}

impl WindowTarget {
    pub fn label(&self) -> String {
        match self {
            Self::Main => MAIN_LABEL.to_string(),
            Self::Archive => ARCHIVE_LABEL.to_string(),
            Self::Memo { memo_id } => format!("memo-{memo_id}"),
            Self::CreateMemo { category_id, .. } => format!("memo-new-{category_id}"),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Main => "IdeaNode",
            Self::Archive => "Archive",
            Self::Memo { .. } => "Memo",
            Self::CreateMemo { .. } => "New memo",
        }
    }

    pub fn url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        match self {
            Self::Main => return "/".to_string(),
            Self::Archive => {
                query.append_pair("archive", "1");
            }
            Self::Memo { memo_id } => {
                query.append_pair("memo", memo_id);
            }
            Self::CreateMemo {
                category_id,
                default_color,
            } => {
                query.append_pair("create_category_id", category_id);
                if let Some(color) = default_color {
                    query.append_pair("default_color", color);
                }
            }
        }
        format!("/?{}", query.finish())
    }

    /// Accepts a full path with query (`/?memo=1`), a bare query (`?memo=1`)
    /// or just the pairs. Unknown or empty parameters select the main board.
    pub fn from_query(raw: &str) -> Self {
        let query = raw.split_once('?').map_or(raw, |(_, query)| query);
        let params = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect::<HashMap<String, String>>();

        if let Some(memo_id) = params.get("memo") {
            return Self::Memo {
                memo_id: memo_id.clone(),
            };
        }
        if let Some(category_id) = params.get("create_category_id") {
            return Self::CreateMemo {
                category_id: category_id.clone(),
                default_color: params.get("default_color").cloned(),
            };
        }
        if params.get("archive").map(String::as_str) == Some("1") {
            return Self::Archive;
        }
        Self::Main
    }

    pub fn request(&self) -> WindowRequest {
        WindowRequest {
            label: self.label(),
            url: self.url(),
            title: self.title().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub label: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Opened,
    Focused,
}

/// The window manager: one viewport per label.
pub trait WindowSurface: Send + Sync {
    fn open_or_focus(&self, request: &WindowRequest) -> AppResult<WindowOutcome>;
    fn close(&self, label: &str) -> AppResult<bool>;
}

/// Keeps open windows in memory. Used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct InMemoryWindowSurface {
    windows: Mutex<Vec<WindowRequest>>,
    focused: Mutex<Option<String>>,
}

impl InMemoryWindowSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_labels(&self) -> Vec<String> {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|window| window.label.clone())
            .collect()
    }

    pub fn focused(&self) -> Option<String> {
        self.focused.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl WindowSurface for InMemoryWindowSurface {
    fn open_or_focus(&self, request: &WindowRequest) -> AppResult<WindowOutcome> {
        if request.label.trim().is_empty() {
            return Err(AppError::InvalidInput("window label is required".to_string()));
        }
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = if windows.iter().any(|window| window.label == request.label) {
            WindowOutcome::Focused
        } else {
            windows.push(request.clone());
            WindowOutcome::Opened
        };
        *self.focused.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.label.clone());
        tracing::info!(label = %request.label, url = %request.url, ?outcome, "window requested");
        Ok(outcome)
    }

    fn close(&self, label: &str) -> AppResult<bool> {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|window| window.label != label);
        let mut focused = self.focused.lock().unwrap_or_else(PoisonError::into_inner);
        if focused.as_deref() == Some(label) {
            *focused = None;
        }
        Ok(windows.len() != before)
    }
}

/// One window's client: its own cache, kept fresh by refreshing on every
/// change notification until shut down.
pub struct WindowRuntime {
    target: WindowTarget,
    store: ClientStore,
    config: ClientConfig,
    shutdown: watch::Sender<bool>,
    listener: Option<JoinHandle<()>>,
}

impl WindowRuntime {
    /// Subscribes before the first load so no notification falls between them.
    pub async fn start(
        target: WindowTarget,
        client: RemoteStoreClient,
        bus: Arc<dyn ChangeBus>,
        config: &ClientConfig,
    ) -> AppResult<Self> {
        let subscription = bus.subscribe(&config.change_topic)?;
        let store = ClientStore::new(client, bus, config);
        store.refresh().await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let listener = tokio::spawn(listen(target.label(), store.clone(), subscription, shutdown_rx));
        tracing::info!(label = %target.label(), "window runtime started");

        Ok(Self {
            target,
            store,
            config: config.clone(),
            shutdown,
            listener: Some(listener),
        })
    }

    pub fn target(&self) -> &WindowTarget {
        &self.target
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    /// The editor a memo window hosts. `None` for board windows and for a
    /// memo that is not in the cache.
    pub fn open_editor(&self) -> Option<EditorSession> {
        match &self.target {
            WindowTarget::Main | WindowTarget::Archive => None,
            WindowTarget::Memo { memo_id } => {
                let memo = self.store.find_memo(memo_id)?;
                Some(EditorSession::edit(self.store.clone(), &memo, &self.config))
            }
            WindowTarget::CreateMemo {
                category_id,
                default_color,
            } => {
                let color = default_color.as_deref().unwrap_or(&self.config.default_memo_color);
                Some(EditorSession::create_with_color(
                    self.store.clone(),
                    category_id,
                    color,
                    &self.config,
                ))
            }
        }
    }

    pub async fn shutdown(mut self) -> AppResult<()> {
        let _ = self.shutdown.send(true);
        if let Some(listener) = self.listener.take() {
            listener.await?;
        }
        tracing::info!(label = %self.target.label(), "window runtime stopped");
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

async fn listen(
    label: String,
    store: ClientStore,
    mut subscription: ChangeSubscription,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            event = subscription.recv() => {
                let Some(event) = event else {
                    tracing::debug!(label = %label, "change bus closed");
                    break;
                };
                // One refetch answers every notification queued behind this one.
                let coalesced = subscription.drain_pending();
                tracing::debug!(
                    label = %label,
                    sequence = event.sequence,
                    coalesced,
                    "shared data changed; refreshing"
                );
                store.refresh().await;
            }
        }
    }
}
