use crate::config::ClientConfig;
use crate::date::{today_ymd, ymd_from_ms};
use crate::debounce::Debouncer;
use crate::errors::AppResult;
use crate::models::{CreateMemoInput, Id, Memo, UpdateMemoInput};
use crate::store::ClientStore;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub const NEW_MEMO_TITLE: &str = "New memo";
pub const UNTITLED: &str = "Untitled";

/// Every editable field of a memo as the editor holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoFields {
    pub emoji: String,
    pub title: String,
    pub color: String,
    pub date_ymd: String,
    pub content_md: String,
    pub todo_done: bool,
}

impl MemoFields {
    pub fn for_new_memo(default_color: &str) -> Self {
        Self {
            emoji: String::new(),
            title: NEW_MEMO_TITLE.to_string(),
            color: default_color.to_string(),
            date_ymd: today_ymd(),
            content_md: String::new(),
            todo_done: false,
        }
    }

    /// Older records may carry a blank date; those show the creation date.
    pub fn from_memo(memo: &Memo) -> Self {
        let date_ymd = if memo.date_ymd.trim().is_empty() {
            ymd_from_ms(memo.created_at)
        } else {
            memo.date_ymd.clone()
        };
        Self {
            emoji: memo.emoji.clone(),
            title: memo.title.clone(),
            color: memo.color.clone(),
            date_ymd,
            content_md: memo.content_md.clone(),
            todo_done: memo.todo_done,
        }
    }

    /// The values that would be written: titles are trimmed and never blank.
    pub fn persisted(&self) -> Self {
        let title = self.title.trim();
        Self {
            title: if title.is_empty() { UNTITLED } else { title }.to_string(),
            ..self.clone()
        }
    }

    fn update_input(&self, id: &str) -> UpdateMemoInput {
        UpdateMemoInput {
            id: id.to_string(),
            emoji: self.emoji.clone(),
            title: self.title.clone(),
            color: self.color.clone(),
            date_ymd: self.date_ymd.clone(),
            content_md: self.content_md.clone(),
            todo_done: self.todo_done,
        }
    }

    fn create_input(&self, category_id: &str) -> CreateMemoInput {
        CreateMemoInput {
            category_id: category_id.to_string(),
            emoji: Some(self.emoji.clone()),
            title: self.title.clone(),
            color: self.color.clone(),
            date_ymd: Some(self.date_ymd.clone()),
            content_md: self.content_md.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create { category_id: Id, default_color: String },
    Edit { memo_id: Id },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Creating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Unchanged,
    /// No backing record yet, so there was nothing to save against.
    NoRecord,
    /// Background save whose error was logged and dropped.
    Failed,
}

struct SessionState {
    memo_id: Option<Id>,
    category_id: Id,
    draft: DraftState,
    fields: MemoFields,
    last_saved: Option<MemoFields>,
    closed: bool,
}

struct SessionInner {
    store: ClientStore,
    mode: EditorMode,
    debouncer: Debouncer,
    state: Mutex<SessionState>,
    save_lock: Arc<AsyncMutex<()>>,
}

/// Editing state of one open memo editor.
///
/// Field edits restart a debounce timer; when it fires the current values are
/// compared with the last persisted ones and written only if they differ. The
/// same comparison runs once more on close. In create mode a draft record is
/// created as soon as the session opens and every later write updates it.
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

impl EditorSession {
    /// Opens a create-mode session. The draft request starts immediately and
    /// holds the save lock until it resolves.
    pub fn create(store: ClientStore, category_id: &str, config: &ClientConfig) -> Self {
        let default_color = config.default_memo_color.clone();
        Self::create_with_color(store, category_id, &default_color, config)
    }

    /// Outside a tokio runtime no draft request can start, so the session
    /// opens as a failed draft and the first `save()` creates the memo.
    pub fn create_with_color(store: ClientStore, category_id: &str, default_color: &str, config: &ClientConfig) -> Self {
        let fields = MemoFields::for_new_memo(default_color);
        let draft = fields.persisted();
        let save_lock = Arc::new(AsyncMutex::new(()));
        let session = Self::build(
            store,
            EditorMode::Create {
                category_id: category_id.to_string(),
                default_color: default_color.to_string(),
            },
            SessionState {
                memo_id: None,
                category_id: category_id.to_string(),
                draft: DraftState::Creating,
                fields,
                last_saved: None,
                closed: false,
            },
            save_lock.clone(),
            config,
        );

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(category_id, "no async runtime; draft waits for an explicit save");
                session.inner.lock_state().draft = DraftState::Failed;
                return session;
            }
        };
        match save_lock.try_lock_owned() {
            Ok(guard) => {
                let inner = session.inner.clone();
                handle.spawn(async move { inner.open_draft(draft, guard).await });
            }
            Err(_) => {
                tracing::warn!(category_id, "draft lock unexpectedly held");
                session.inner.lock_state().draft = DraftState::Failed;
            }
        }
        session
    }

    pub fn edit(store: ClientStore, memo: &Memo, config: &ClientConfig) -> Self {
        let fields = MemoFields::from_memo(memo);
        Self::build(
            store,
            EditorMode::Edit {
                memo_id: memo.id.clone(),
            },
            SessionState {
                memo_id: Some(memo.id.clone()),
                category_id: memo.category_id.clone(),
                draft: DraftState::Ready,
                last_saved: Some(fields.persisted()),
                fields,
                closed: false,
            },
            Arc::new(AsyncMutex::new(())),
            config,
        )
    }

    fn build(
        store: ClientStore,
        mode: EditorMode,
        state: SessionState,
        save_lock: Arc<AsyncMutex<()>>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store,
                mode,
                debouncer: Debouncer::new(config.autosave_delay()),
                state: Mutex::new(state),
                save_lock,
            }),
        }
    }

    pub fn mode(&self) -> &EditorMode {
        &self.inner.mode
    }

    pub fn memo_id(&self) -> Option<Id> {
        self.inner.lock_state().memo_id.clone()
    }

    pub fn draft_state(&self) -> DraftState {
        self.inner.lock_state().draft
    }

    pub fn fields(&self) -> MemoFields {
        self.inner.lock_state().fields.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }

    pub fn has_pending_autosave(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Applies an edit and restarts the autosave timer. Edits made before the
    /// draft exists are kept and picked up once it does.
    pub fn edit_fields(&self, apply: impl FnOnce(&mut MemoFields)) {
        let has_record = {
            let mut state = self.inner.lock_state();
            if state.closed {
                return;
            }
            apply(&mut state.fields);
            state.memo_id.is_some()
        };
        if has_record {
            self.inner.schedule_autosave();
        }
    }

    pub fn set_emoji(&self, emoji: &str) {
        self.edit_fields(|fields| fields.emoji = emoji.to_string());
    }

    pub fn set_title(&self, title: &str) {
        self.edit_fields(|fields| fields.title = title.to_string());
    }

    pub fn set_color(&self, color: &str) {
        self.edit_fields(|fields| fields.color = color.to_string());
    }

    pub fn set_date_ymd(&self, date_ymd: &str) {
        self.edit_fields(|fields| fields.date_ymd = date_ymd.to_string());
    }

    pub fn set_content_md(&self, content_md: &str) {
        self.edit_fields(|fields| fields.content_md = content_md.to_string());
    }

    pub fn set_todo_done(&self, todo_done: bool) {
        self.edit_fields(|fields| fields.todo_done = todo_done);
    }

    /// Background save: failures are logged, never returned.
    pub async fn flush(&self) -> SaveOutcome {
        self.inner.flush().await
    }

    /// User-initiated save. Retries the draft if it failed and reports errors.
    pub async fn save(&self) -> AppResult<SaveOutcome> {
        self.inner.debouncer.cancel();
        let _guard = self.inner.save_lock.lock().await;
        if self.memo_id().is_none() {
            let draft = self.fields().persisted();
            self.inner.create_draft(draft).await?;
        }
        self.inner.persist_locked().await
    }

    /// Final flush before the editor goes away. Further edits are ignored.
    pub async fn close(&self) -> SaveOutcome {
        self.inner.lock_state().closed = true;
        self.inner.debouncer.cancel();
        let outcome = self.inner.flush().await;
        tracing::debug!(memo_id = ?self.memo_id(), ?outcome, "editor closed");
        outcome
    }
}

impl SessionInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_autosave(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.debouncer.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                inner.flush().await;
            }
        });
    }

    async fn open_draft(self: Arc<Self>, draft: MemoFields, _guard: OwnedMutexGuard<()>) {
        if let Err(error) = self.create_draft(draft).await {
            tracing::warn!(error = %error, "draft creation failed; editing stays local");
            return;
        }
        let changed = {
            let state = self.lock_state();
            !state.closed && state.last_saved.as_ref() != Some(&state.fields.persisted())
        };
        if changed {
            self.schedule_autosave();
        }
    }

    /// Caller holds the save lock.
    async fn create_draft(&self, draft: MemoFields) -> AppResult<Id> {
        let category_id = {
            let mut state = self.lock_state();
            state.draft = DraftState::Creating;
            state.category_id.clone()
        };

        match self.store.create_memo(draft.create_input(&category_id)).await {
            Ok(memo) => {
                tracing::info!(memo_id = %memo.id, category_id = %category_id, "draft memo created");
                let mut state = self.lock_state();
                state.memo_id = Some(memo.id.clone());
                state.category_id = memo.category_id.clone();
                state.draft = DraftState::Ready;
                state.last_saved = Some(MemoFields::from_memo(&memo).persisted());
                Ok(memo.id)
            }
            Err(error) => {
                self.lock_state().draft = DraftState::Failed;
                Err(error)
            }
        }
    }

    async fn flush(&self) -> SaveOutcome {
        let _guard = self.save_lock.lock().await;
        match self.persist_locked().await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(error = %error, "autosave failed");
                SaveOutcome::Failed
            }
        }
    }

    /// Caller holds the save lock.
    async fn persist_locked(&self) -> AppResult<SaveOutcome> {
        let (memo_id, snapshot) = {
            let state = self.lock_state();
            let Some(memo_id) = state.memo_id.clone() else {
                return Ok(SaveOutcome::NoRecord);
            };
            let snapshot = state.fields.persisted();
            if state.last_saved.as_ref() == Some(&snapshot) {
                return Ok(SaveOutcome::Unchanged);
            }
            (memo_id, snapshot)
        };

        self.store.update_memo(snapshot.update_input(&memo_id)).await?;
        self.lock_state().last_saved = Some(snapshot);
        Ok(SaveOutcome::Saved)
    }
}
