use ideanode_client_lib::drag::{drop_zone_key, memo_key, Point};
use ideanode_client_lib::models::{CategoryWithMemos, CreateCategoryInput, CreateMemoInput, Memo, ReorderMemosInput};
use ideanode_client_lib::{App, ClientConfig, ClientStore, DragOutcome, OrderCommand, WindowRuntime, WindowTarget};

async fn main_window() -> (App, WindowRuntime) {
    let app = App::open_in_memory(ClientConfig::default()).expect("app");
    let runtime = app.start_window(WindowTarget::Main).await.expect("main window");
    (app, runtime)
}

async fn category(store: &ClientStore, title: &str, is_todo: bool) -> String {
    store
        .create_category(CreateCategoryInput {
            emoji: None,
            title: title.to_string(),
            color: "#fff".to_string(),
            is_todo,
        })
        .await
        .expect("create category")
        .id
}

async fn memo(store: &ClientStore, category_id: &str, title: &str) -> Memo {
    store
        .create_memo(CreateMemoInput {
            category_id: category_id.to_string(),
            emoji: None,
            title: title.to_string(),
            color: "#fff".to_string(),
            date_ymd: None,
            content_md: String::new(),
        })
        .await
        .expect("create memo")
}

fn titles(item: &CategoryWithMemos) -> Vec<String> {
    item.sorted_memos().into_iter().map(|memo| memo.title.clone()).collect()
}

fn listed<'a>(categories: &'a [CategoryWithMemos], id: &str) -> &'a CategoryWithMemos {
    categories
        .iter()
        .find(|item| item.category.id == id)
        .expect("category listed")
}

#[tokio::test]
async fn reordering_two_memos_lists_them_swapped() {
    let (_app, window) = main_window().await;
    let store = window.store();
    let work = category(store, "Work", false).await;
    let a = memo(store, &work, "A").await;
    let b = memo(store, &work, "B").await;
    assert!(a.position < b.position);

    store
        .reorder_memos(ReorderMemosInput {
            category_id: work.clone(),
            ordered_ids: vec![b.id.clone(), a.id.clone()],
        })
        .await
        .expect("reorder");

    let fresh = store.client().list_categories_with_memos().await.expect("list");
    assert_eq!(titles(listed(&fresh, &work)), vec!["B", "A"]);
    assert_eq!(titles(listed(&store.categories(), &work)), vec!["B", "A"]);
}

#[tokio::test]
async fn toggling_a_todo_checks_it() {
    let (_app, window) = main_window().await;
    let store = window.store();
    let todo = category(store, "Errands", true).await;
    let milk = memo(store, &todo, "Milk").await;
    assert!(!milk.todo_done);

    let updated = store.toggle_todo_done(&milk).await.expect("toggle");
    assert!(updated.todo_done);
    assert_eq!(updated.title, "Milk");
    assert!(store.find_memo(&milk.id).expect("cached").todo_done);
}

#[tokio::test]
async fn archive_and_restore_move_between_listings() {
    let (_app, window) = main_window().await;
    let store = window.store();
    let old = category(store, "Old", false).await;
    category(store, "Current", false).await;

    let archived = store
        .toggle_archived(&store.find_category(&old).expect("cached"))
        .await
        .expect("archive");
    assert!(archived.archived);
    assert!(store.main_board("").iter().all(|item| item.category.id != old));
    assert_eq!(store.archive_listing("").len(), 1);

    store.toggle_archived(&archived).await.expect("restore");
    assert!(store.main_board("").iter().any(|item| item.category.id == old));
    assert!(store.archive_listing("").is_empty());
}

#[tokio::test]
async fn dragging_onto_a_category_zone_reparents_regardless_of_its_size() {
    let (app, window) = main_window().await;
    let store = window.store();
    let a = category(store, "A", false).await;
    let b = category(store, "B", false).await;
    let moved = memo(store, &a, "M").await;
    let mut drag = app.drag_controller();

    assert!(drag.pointer_down(&memo_key(&moved.id), Point::new(0.0, 0.0), &store.board()));
    assert!(drag.pointer_move(Point::new(0.0, 25.0)));
    let outcome = drag.release(Some(drop_zone_key(&b).as_str()), store).await.expect("drop");
    assert!(matches!(outcome, DragOutcome::Dropped(OrderCommand::MoveMemo(_))));
    assert_eq!(store.find_memo(&moved.id).expect("cached").category_id, b);
    assert!(store.board().memo_ids(&a).is_empty());

    // Back into A, which now holds another memo: the mover lands last.
    let resident = memo(store, &a, "Resident").await;
    assert!(drag.pointer_down(&memo_key(&moved.id), Point::new(0.0, 0.0), &store.board()));
    assert!(drag.pointer_move(Point::new(30.0, 0.0)));
    drag.release(Some(drop_zone_key(&a).as_str()), store).await.expect("drop back");
    assert_eq!(store.board().memo_ids(&a), [resident.id.clone(), moved.id.clone()].as_slice());
    assert!(store.board().memo_ids(&b).is_empty());
}

#[tokio::test]
async fn dropping_a_memo_on_its_own_zone_issues_nothing() {
    let (app, window) = main_window().await;
    let store = window.store();
    let a = category(store, "A", false).await;
    let only = memo(store, &a, "Only").await;
    let before = store.find_memo(&only.id).expect("cached");

    let mut drag = app.drag_controller();
    assert!(drag.pointer_down(&memo_key(&only.id), Point::new(0.0, 0.0), &store.board()));
    assert!(drag.pointer_move(Point::new(5.0, 5.0)));
    let outcome = drag.release(Some(drop_zone_key(&a).as_str()), store).await.expect("drop");
    assert_eq!(outcome, DragOutcome::NoChange);
    assert_eq!(store.find_memo(&only.id), Some(before));
}

#[tokio::test]
async fn deleting_a_category_removes_all_of_its_memos() {
    let (app, window) = main_window().await;
    let store = window.store();
    let doomed = category(store, "Doomed", false).await;
    let keep = category(store, "Keep", false).await;
    for title in ["one", "two", "three"] {
        memo(store, &doomed, title).await;
    }
    memo(store, &keep, "survivor").await;

    store.delete_category(&doomed).await.expect("delete");

    let fresh = app.client().list_categories_with_memos().await.expect("list");
    assert_eq!(fresh.len(), 1);
    assert!(fresh
        .iter()
        .flat_map(|item| item.memos.iter())
        .all(|memo| memo.category_id != doomed));
    assert_eq!(titles(&fresh[0]), vec!["survivor"]);
}

#[tokio::test]
async fn search_hides_non_matches_and_disables_drag() {
    let (app, window) = main_window().await;
    let store = window.store();
    let work = category(store, "Work", false).await;
    memo(store, &work, "Budget review").await;
    memo(store, &work, "Standup").await;
    category(store, "Home", false).await;

    let results = store.main_board("budget");
    assert_eq!(results.len(), 1);
    assert_eq!(titles(&results[0]), vec!["Budget review"]);

    let mut drag = app.drag_controller();
    drag.set_search_active(ideanode_client_lib::views::is_search_active("budget"));
    assert!(!drag.pointer_down(&memo_key("anything"), Point::new(0.0, 0.0), &store.board()));
}
