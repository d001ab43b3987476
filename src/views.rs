use crate::models::{CategoryWithMemos, Memo};

fn normalized(query: &str) -> Option<String> {
    let query = query.trim().to_lowercase();
    (!query.is_empty()).then_some(query)
}

pub fn is_search_active(query: &str) -> bool {
    normalized(query).is_some()
}

fn sorted(mut items: Vec<CategoryWithMemos>) -> Vec<CategoryWithMemos> {
    items.sort_by_key(|item| item.category.position);
    for item in &mut items {
        item.memos.sort_by_key(|memo| memo.position);
    }
    items
}

fn title_matches(title: &str, query: &str) -> bool {
    title.to_lowercase().contains(query)
}

/// Non-archived categories in board order. With a query, memos are narrowed to
/// title matches and a category survives if its own title or any memo matches.
pub fn main_board(categories: &[CategoryWithMemos], query: &str) -> Vec<CategoryWithMemos> {
    let visible = categories
        .iter()
        .filter(|item| !item.category.archived)
        .cloned()
        .collect::<Vec<_>>();
    let Some(query) = normalized(query) else {
        return sorted(visible);
    };

    let filtered = visible
        .into_iter()
        .filter_map(|item| {
            let category_matches = title_matches(&item.category.title, &query);
            let memos = item
                .memos
                .into_iter()
                .filter(|memo| title_matches(&memo.title, &query))
                .collect::<Vec<Memo>>();
            (category_matches || !memos.is_empty()).then(|| CategoryWithMemos {
                category: item.category,
                memos,
            })
        })
        .collect();
    sorted(filtered)
}

/// Archived categories only. A query keeps whole categories; memos are never narrowed.
pub fn archive_listing(categories: &[CategoryWithMemos], query: &str) -> Vec<CategoryWithMemos> {
    let query = normalized(query);
    let archived = categories
        .iter()
        .filter(|item| item.category.archived)
        .filter(|item| match query.as_deref() {
            None => true,
            Some(query) => {
                title_matches(&item.category.title, query)
                    || item.memos.iter().any(|memo| title_matches(&memo.title, query))
            }
        })
        .cloned()
        .collect();
    sorted(archived)
}

#[cfg(test)]
mod tests {
    use super::{archive_listing, is_search_active, main_board};
    use crate::models::{Category, CategoryWithMemos, Memo};

    fn item(id: &str, title: &str, position: i64, archived: bool, memos: &[(&str, &str, i64)]) -> CategoryWithMemos {
        CategoryWithMemos {
            category: Category {
                id: id.to_string(),
                emoji: String::new(),
                title: title.to_string(),
                color: "#fff".to_string(),
                position,
                archived,
                is_todo: false,
                is_collapsed: false,
                created_at: 0,
                updated_at: 0,
            },
            memos: memos
                .iter()
                .map(|(memo_id, memo_title, memo_position)| Memo {
                    id: memo_id.to_string(),
                    category_id: id.to_string(),
                    emoji: String::new(),
                    title: memo_title.to_string(),
                    color: "#fff".to_string(),
                    date_ymd: "2024-01-01".to_string(),
                    content_md: String::new(),
                    todo_done: false,
                    position: *memo_position,
                    created_at: 0,
                    updated_at: 0,
                })
                .collect(),
        }
    }

    fn fixture() -> Vec<CategoryWithMemos> {
        vec![
            item("home", "Home", 2, false, &[("m2", "Groceries", 1), ("m1", "Plants", 0)]),
            item("work", "Work", 1, false, &[("m3", "Quarterly plan", 0)]),
            item("old", "Old ideas", 0, true, &[("m4", "Plan B", 0)]),
        ]
    }

    #[test]
    fn main_board_hides_archived_and_sorts() {
        let board = main_board(&fixture(), "");
        let ids = board.iter().map(|item| item.category.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["work", "home"]);
        assert_eq!(board[1].memos[0].id, "m1");
    }

    #[test]
    fn search_narrows_memos_and_keeps_matching_categories() {
        let board = main_board(&fixture(), "  PLAN ");
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].category.id, "work");
        assert_eq!(board[1].memos.len(), 1);
        assert_eq!(board[1].memos[0].title, "Plants");

        let by_title = main_board(&fixture(), "home");
        assert_eq!(by_title.len(), 1);
        assert!(by_title[0].memos.is_empty());
    }

    #[test]
    fn archive_lists_only_archived_with_full_memos() {
        assert_eq!(archive_listing(&fixture(), "").len(), 1);
        let hit = archive_listing(&fixture(), "plan b");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].memos.len(), 1);
        assert!(archive_listing(&fixture(), "groceries").is_empty());
    }

    #[test]
    fn blank_query_is_not_a_search() {
        assert!(!is_search_active("   "));
        assert!(is_search_active("x"));
    }
}
