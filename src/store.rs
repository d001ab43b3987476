use crate::bus::ChangeBus;
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::errors::AppResult;
use crate::models::{
    AppSettings, Category, CategoryWithMemos, CreateCategoryInput, CreateMemoInput, Memo, MoveMemoInput,
    ReorderCategoriesInput, ReorderMemosInput, SetBackgroundColorInput, SetCategoryArchivedInput,
    SetCategoryCollapsedInput, UpdateCategoryInput, UpdateMemoInput,
};
use crate::ordering::{Board, OrderCommand};
use crate::remote::RemoteStoreClient;
use crate::views;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub loading: bool,
    pub error: Option<String>,
    pub categories: Vec<CategoryWithMemos>,
    pub settings: AppSettings,
}

/// Which side owns the background color right now. While a local preview is
/// pending or being saved, refreshed server values do not overwrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundColorState {
    Synced,
    PendingLocal { value: String },
    Saving { value: String },
}

impl BackgroundColorState {
    fn local_value(&self) -> Option<&str> {
        match self {
            Self::Synced => None,
            Self::PendingLocal { value } | Self::Saving { value } => Some(value),
        }
    }
}

struct StoreState {
    snapshot: StoreSnapshot,
    background: BackgroundColorState,
    /// Bumped on every local background transition. A refresh that started
    /// under an older epoch may carry a server color from before the save.
    background_epoch: u64,
    refreshes_in_flight: usize,
}

struct StoreInner {
    client: RemoteStoreClient,
    bus: Arc<dyn ChangeBus>,
    topic: String,
    default_background_color: String,
    background_debouncer: Debouncer,
    state: RwLock<StoreState>,
}

/// One window's cache of the shared data plus every mutation on it. Mutations
/// never patch the cache: they call the backend, refetch everything, then tell
/// the other windows to do the same.
#[derive(Clone)]
pub struct ClientStore {
    inner: Arc<StoreInner>,
}

impl ClientStore {
    pub fn new(client: RemoteStoreClient, bus: Arc<dyn ChangeBus>, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                client,
                bus,
                topic: config.change_topic.clone(),
                default_background_color: config.default_background_color.clone(),
                background_debouncer: Debouncer::new(config.background_delay()),
                state: RwLock::new(StoreState {
                    snapshot: StoreSnapshot::default(),
                    background: BackgroundColorState::Synced,
                    background_epoch: 0,
                    refreshes_in_flight: 0,
                }),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn client(&self) -> &RemoteStoreClient {
        &self.inner.client
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.read().snapshot.clone()
    }

    pub fn categories(&self) -> Vec<CategoryWithMemos> {
        self.read().snapshot.categories.clone()
    }

    pub fn settings(&self) -> AppSettings {
        self.read().snapshot.settings.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().snapshot.loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().snapshot.error.clone()
    }

    pub fn board(&self) -> Board {
        Board::from_categories(&self.read().snapshot.categories)
    }

    pub fn main_board(&self, query: &str) -> Vec<CategoryWithMemos> {
        views::main_board(&self.read().snapshot.categories, query)
    }

    pub fn archive_listing(&self, query: &str) -> Vec<CategoryWithMemos> {
        views::archive_listing(&self.read().snapshot.categories, query)
    }

    pub fn find_category(&self, id: &str) -> Option<Category> {
        self.read()
            .snapshot
            .categories
            .iter()
            .find(|item| item.category.id == id)
            .map(|item| item.category.clone())
    }

    pub fn find_memo(&self, id: &str) -> Option<Memo> {
        self.read()
            .snapshot
            .categories
            .iter()
            .flat_map(|item| item.memos.iter())
            .find(|memo| memo.id == id)
            .cloned()
    }

    /// Replaces the cache from a concurrent fetch of the tree and the settings.
    /// On failure the previous data stays and `error` carries the message.
    pub async fn refresh(&self) {
        let started_epoch = {
            let mut state = self.write();
            state.refreshes_in_flight += 1;
            state.snapshot.loading = true;
            state.snapshot.error = None;
            state.background_epoch
        };

        let client = &self.inner.client;
        let result = tokio::try_join!(client.list_categories_with_memos(), client.get_app_settings());

        let mut state = self.write();
        state.refreshes_in_flight = state.refreshes_in_flight.saturating_sub(1);
        state.snapshot.loading = state.refreshes_in_flight > 0;
        match result {
            Ok((categories, mut settings)) => {
                if let Some(local) = state.background.local_value() {
                    settings.background_color = local.to_string();
                } else if state.background_epoch != started_epoch {
                    settings.background_color = state.snapshot.settings.background_color.clone();
                }
                state.snapshot.categories = categories;
                state.snapshot.settings = settings;
            }
            Err(error) => {
                tracing::warn!(error = %error, "refresh failed; keeping cached data");
                state.snapshot.error = Some(error.to_string());
            }
        }
    }

    /// Best effort: a failed publish only leaves sibling windows stale.
    pub fn notify_changed(&self) {
        if let Err(error) = self.inner.bus.publish(&self.inner.topic) {
            tracing::warn!(error = %error, topic = %self.inner.topic, "change notification failed");
        }
    }

    async fn commit<T>(&self, result: AppResult<T>) -> AppResult<T> {
        let value = result?;
        self.refresh().await;
        self.notify_changed();
        Ok(value)
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<Category> {
        let result = self.inner.client.create_category(&input).await;
        self.commit(result).await
    }

    pub async fn update_category(&self, input: UpdateCategoryInput) -> AppResult<Category> {
        let result = self.inner.client.update_category(&input).await;
        self.commit(result).await
    }

    pub async fn set_category_collapsed(&self, input: SetCategoryCollapsedInput) -> AppResult<Category> {
        let result = self.inner.client.set_category_collapsed(&input).await;
        self.commit(result).await
    }

    pub async fn toggle_collapsed(&self, category: &Category) -> AppResult<Category> {
        self.set_category_collapsed(SetCategoryCollapsedInput {
            id: category.id.clone(),
            is_collapsed: !category.is_collapsed,
        })
        .await
    }

    pub async fn set_category_archived(&self, input: SetCategoryArchivedInput) -> AppResult<Category> {
        let result = self.inner.client.set_category_archived(&input).await;
        self.commit(result).await
    }

    pub async fn toggle_archived(&self, category: &Category) -> AppResult<Category> {
        self.set_category_archived(SetCategoryArchivedInput {
            id: category.id.clone(),
            archived: !category.archived,
        })
        .await
    }

    pub async fn delete_category(&self, id: &str) -> AppResult<()> {
        let result = self.inner.client.delete_category(id).await;
        self.commit(result).await
    }

    pub async fn reorder_categories(&self, input: ReorderCategoriesInput) -> AppResult<()> {
        let result = self.inner.client.reorder_categories(&input).await;
        self.commit(result).await
    }

    pub async fn reorder_memos(&self, input: ReorderMemosInput) -> AppResult<()> {
        let result = self.inner.client.reorder_memos(&input).await;
        self.commit(result).await
    }

    pub async fn create_memo(&self, input: CreateMemoInput) -> AppResult<Memo> {
        let result = self.inner.client.create_memo(&input).await;
        self.commit(result).await
    }

    pub async fn update_memo(&self, input: UpdateMemoInput) -> AppResult<Memo> {
        let result = self.inner.client.update_memo(&input).await;
        self.commit(result).await
    }

    pub async fn toggle_todo_done(&self, memo: &Memo) -> AppResult<Memo> {
        let mut input = UpdateMemoInput::from_memo(memo);
        input.todo_done = !memo.todo_done;
        self.update_memo(input).await
    }

    pub async fn delete_memo(&self, id: &str) -> AppResult<()> {
        let result = self.inner.client.delete_memo(id).await;
        self.commit(result).await
    }

    pub async fn move_memo(&self, input: MoveMemoInput) -> AppResult<()> {
        let result = self.inner.client.move_memo(&input).await;
        self.commit(result).await
    }

    pub async fn apply_order(&self, command: OrderCommand) -> AppResult<()> {
        match command {
            OrderCommand::ReorderCategories(input) => self.reorder_categories(input).await,
            OrderCommand::ReorderMemos(input) => self.reorder_memos(input).await,
            OrderCommand::MoveMemo(input) => self.move_memo(input).await,
        }
    }

    pub fn background_state(&self) -> BackgroundColorState {
        self.read().background.clone()
    }

    /// The color to paint; blank settings fall back to the configured default.
    pub fn effective_background_color(&self) -> String {
        let state = self.read();
        let current = state.snapshot.settings.background_color.trim();
        if current.is_empty() {
            self.inner.default_background_color.clone()
        } else {
            current.to_string()
        }
    }

    /// Live preview: the cache changes immediately, persistence is left to a
    /// later save.
    pub fn set_background_color_local(&self, color: &str) {
        let mut state = self.write();
        state.snapshot.settings.background_color = color.to_string();
        state.background = BackgroundColorState::PendingLocal {
            value: color.to_string(),
        };
        state.background_epoch += 1;
    }

    /// Preview now and persist once the color stops changing.
    pub fn preview_background_color(&self, color: &str) {
        self.set_background_color_local(color);
        let store = self.clone();
        let color = color.to_string();
        self.inner.background_debouncer.schedule(async move {
            if let Err(error) = store
                .save_background_color(SetBackgroundColorInput { background_color: color })
                .await
            {
                tracing::warn!(error = %error, "background color autosave failed");
            }
        });
    }

    pub async fn save_background_color(&self, input: SetBackgroundColorInput) -> AppResult<()> {
        {
            let mut state = self.write();
            state.background = BackgroundColorState::Saving {
                value: input.background_color.clone(),
            };
            state.background_epoch += 1;
        }

        let result = self.inner.client.set_background_color(&input).await;
        {
            let mut state = self.write();
            let still_ours = matches!(
                &state.background,
                BackgroundColorState::Saving { value } if *value == input.background_color
            );
            if still_ours {
                state.background = match &result {
                    Ok(()) => BackgroundColorState::Synced,
                    Err(_) => BackgroundColorState::PendingLocal {
                        value: input.background_color.clone(),
                    },
                };
                state.background_epoch += 1;
            }
        }
        self.commit(result).await
    }

    pub fn has_pending_background_save(&self) -> bool {
        self.inner.background_debouncer.is_pending()
    }
}
