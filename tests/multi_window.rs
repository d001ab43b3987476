use async_trait::async_trait;
use ideanode_client_lib::bus::ChangeSubscription;
use ideanode_client_lib::models::{CreateCategoryInput, CreateMemoInput};
use ideanode_client_lib::{
    App, AppError, AppResult, ChangeBus, ClientConfig, ClientStore, Invoker, LocalBackend, RemoteStoreClient,
    SaveOutcome, WindowRuntime, WindowTarget,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(done(), "condition never became true");
}

fn work() -> CreateCategoryInput {
    CreateCategoryInput {
        emoji: None,
        title: "Work".to_string(),
        color: "#fff".to_string(),
        is_todo: false,
    }
}

#[tokio::test]
async fn sibling_windows_converge_after_a_mutation() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let main = app.start_window(WindowTarget::Main).await.expect("main");
    let archive = app.start_window(WindowTarget::Archive).await.expect("archive");

    let created = main.store().create_category(work()).await.expect("create");
    wait_until(|| archive.store().find_category(&created.id).is_some()).await;

    archive
        .store()
        .toggle_archived(&archive.store().find_category(&created.id).expect("cached"))
        .await
        .expect("archive");
    wait_until(|| main.store().main_board("").is_empty()).await;
    assert_eq!(main.store().archive_listing("").len(), 1);

    main.shutdown().await.expect("main shutdown");
    archive.shutdown().await.expect("archive shutdown");
}

#[tokio::test]
async fn memo_window_edit_reaches_the_board_on_close() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let main = app.start_window(WindowTarget::Main).await.expect("main");
    let category = main.store().create_category(work()).await.expect("create");
    let memo = main
        .store()
        .create_memo(CreateMemoInput {
            category_id: category.id.clone(),
            emoji: None,
            title: "Draft title".to_string(),
            color: "#fff".to_string(),
            date_ymd: None,
            content_md: String::new(),
        })
        .await
        .expect("memo");

    let target = WindowTarget::from_query(&WindowTarget::Memo { memo_id: memo.id.clone() }.url());
    app.request_window(&target).expect("open memo window");
    let editor_window = app.start_window(target).await.expect("memo window");
    let editor = editor_window.open_editor().expect("editor");

    editor.set_title("Final title");
    editor.set_content_md("<p>body</p>");
    assert_eq!(editor.close().await, SaveOutcome::Saved);

    wait_until(|| main.store().find_memo(&memo.id).map(|memo| memo.title) == Some("Final title".to_string())).await;
    let fresh = main.store().find_memo(&memo.id).expect("cached");
    assert_eq!(fresh.content_md, "<p>body</p>");

    editor_window.shutdown().await.expect("editor shutdown");
    main.shutdown().await.expect("main shutdown");
}

#[tokio::test]
async fn create_window_draft_appears_on_the_board() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let main = app.start_window(WindowTarget::Main).await.expect("main");
    let category = main.store().create_category(work()).await.expect("create");

    let target = WindowTarget::CreateMemo {
        category_id: category.id.clone(),
        default_color: Some("#ffeeaa".to_string()),
    };
    let create_window = app.start_window(target).await.expect("create window");
    let editor = create_window.open_editor().expect("editor");
    wait_until(|| editor.memo_id().is_some()).await;

    let memo_id = editor.memo_id().expect("draft id");
    wait_until(|| main.store().find_memo(&memo_id).is_some()).await;
    let draft = main.store().find_memo(&memo_id).expect("draft");
    assert_eq!(draft.title, "New memo");
    assert_eq!(draft.color, "#ffeeaa");

    editor.set_title("   ");
    assert_eq!(editor.close().await, SaveOutcome::Saved);
    wait_until(|| main.store().find_memo(&memo_id).map(|memo| memo.title) == Some("Untitled".to_string())).await;

    create_window.shutdown().await.expect("create shutdown");
    main.shutdown().await.expect("main shutdown");
}

#[tokio::test(start_paused = true)]
async fn autosave_in_one_window_is_seen_by_another() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let main = app.start_window(WindowTarget::Main).await.expect("main");
    let category = main.store().create_category(work()).await.expect("create");
    let memo = main
        .store()
        .create_memo(CreateMemoInput {
            category_id: category.id,
            emoji: None,
            title: "Before".to_string(),
            color: "#fff".to_string(),
            date_ymd: Some("2024-03-05".to_string()),
            content_md: String::new(),
        })
        .await
        .expect("memo");

    let editor_window = app
        .start_window(WindowTarget::Memo { memo_id: memo.id.clone() })
        .await
        .expect("memo window");
    let editor = editor_window.open_editor().expect("editor");
    editor.set_title("After");

    tokio::time::sleep(Duration::from_millis(1_300)).await;
    wait_until(|| main.store().find_memo(&memo.id).map(|memo| memo.title) == Some("After".to_string())).await;

    editor_window.shutdown().await.expect("editor shutdown");
    main.shutdown().await.expect("main shutdown");
}

struct BrokenBus;

impl ChangeBus for BrokenBus {
    fn publish(&self, topic: &str) -> AppResult<()> {
        Err(AppError::Bus(format!("{topic} is unreachable")))
    }

    fn subscribe(&self, topic: &str) -> AppResult<ChangeSubscription> {
        Err(AppError::Bus(format!("{topic} is unreachable")))
    }
}

#[tokio::test]
async fn failed_publish_does_not_fail_the_mutation() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let store = ClientStore::new(app.client().clone(), Arc::new(BrokenBus), app.config());

    let created = store.create_category(work()).await.expect("create despite bus");
    assert_eq!(store.find_category(&created.id).expect("cached").title, "Work");
    assert!(store.error().is_none());
}

#[tokio::test]
async fn window_without_a_bus_fails_to_start() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let result = WindowRuntime::start(WindowTarget::Main, app.client().clone(), Arc::new(BrokenBus), app.config()).await;
    assert!(matches!(result, Err(AppError::Bus(_))));
}

/// Counts round trips so tests can see what a window fetched.
struct Counting {
    backend: LocalBackend,
    lists: AtomicUsize,
}

#[async_trait]
impl Invoker for Counting {
    async fn invoke(&self, command: &str, args: Value) -> AppResult<Value> {
        if command == "list_categories_with_memos" {
            self.lists.fetch_add(1, Ordering::SeqCst);
        }
        self.backend.invoke(command, args).await
    }
}

#[tokio::test]
async fn each_notification_triggers_a_full_refresh() {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let counting = Arc::new(Counting {
        backend: LocalBackend::new(app.database().clone()),
        lists: AtomicUsize::new(0),
    });
    let watcher = WindowRuntime::start(
        WindowTarget::Archive,
        RemoteStoreClient::new(counting.clone()),
        app.bus(),
        app.config(),
    )
    .await
    .expect("watcher");
    assert_eq!(counting.lists.load(Ordering::SeqCst), 1);

    let topic = &app.config().change_topic;
    app.bus().publish(topic).expect("publish");
    wait_until(|| counting.lists.load(Ordering::SeqCst) == 2).await;
    app.bus().publish(topic).expect("publish");
    wait_until(|| counting.lists.load(Ordering::SeqCst) == 3).await;

    watcher.shutdown().await.expect("shutdown");
    app.bus().publish(topic).expect("publish after shutdown");
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(counting.lists.load(Ordering::SeqCst), 3);
}
