use serde::{Deserialize, Serialize};

pub type Id = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub emoji: String,
    pub title: String,
    pub color: String,
    pub position: i64,
    pub archived: bool,
    pub is_todo: bool,
    pub is_collapsed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: Id,
    pub category_id: Id,
    pub emoji: String,
    pub title: String,
    pub color: String,
    pub date_ymd: String,
    pub content_md: String,
    pub todo_done: bool,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A category together with the memos it owns, as returned by
/// `list_categories_with_memos`. Memos are in ascending `position` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithMemos {
    pub category: Category,
    pub memos: Vec<Memo>,
}

impl CategoryWithMemos {
    pub fn sorted_memos(&self) -> Vec<&Memo> {
        let mut memos = self.memos.iter().collect::<Vec<_>>();
        memos.sort_by_key(|memo| memo.position);
        memos
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBackgroundColorInput {
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub title: String,
    pub color: String,
    pub is_todo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    pub id: Id,
    pub emoji: String,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCategoryCollapsedInput {
    pub id: Id,
    pub is_collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCategoryArchivedInput {
    pub id: Id,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderCategoriesInput {
    pub ordered_ids: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderMemosInput {
    pub category_id: Id,
    pub ordered_ids: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMemoInput {
    pub category_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub title: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_ymd: Option<String>,
    pub content_md: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMemoInput {
    pub id: Id,
    pub emoji: String,
    pub title: String,
    pub color: String,
    pub date_ymd: String,
    pub content_md: String,
    pub todo_done: bool,
}

impl UpdateMemoInput {
    /// Copies every editable field of `memo`, so callers only override what changed.
    pub fn from_memo(memo: &Memo) -> Self {
        Self {
            id: memo.id.clone(),
            emoji: memo.emoji.clone(),
            title: memo.title.clone(),
            color: memo.color.clone(),
            date_ymd: memo.date_ymd.clone(),
            content_md: memo.content_md.clone(),
            todo_done: memo.todo_done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMemoInput {
    pub memo_id: Id,
    pub to_category_id: Id,
}

#[cfg(test)]
mod tests {
    use super::{AppSettings, CreateMemoInput, UpdateMemoInput};

    #[test]
    fn optional_create_fields_are_omitted_on_the_wire() {
        let input = CreateMemoInput {
            category_id: "c1".to_string(),
            emoji: None,
            title: "A".to_string(),
            color: "#fff".to_string(),
            date_ymd: None,
            content_md: String::new(),
        };
        let value = serde_json::to_value(&input).expect("serialize");
        assert!(value.get("emoji").is_none());
        assert!(value.get("date_ymd").is_none());
        assert_eq!(value["category_id"], "c1");
    }

    #[test]
    fn settings_tolerate_missing_fields() {
        let settings: AppSettings = serde_json::from_str("{}").expect("parse");
        assert_eq!(settings.background_color, "");
    }

    #[test]
    fn update_input_rejects_missing_todo_flag() {
        let raw = r##"{"id":"m","emoji":"","title":"t","color":"#fff","date_ymd":"2024-01-01","content_md":""}"##;
        assert!(serde_json::from_str::<UpdateMemoInput>(raw).is_err());
    }
}
