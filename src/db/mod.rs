use crate::date::today_ymd;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, Category, CategoryWithMemos, CreateCategoryInput, CreateMemoInput, Memo, MoveMemoInput,
    ReorderCategoriesInput, ReorderMemosInput, SetBackgroundColorInput, SetCategoryArchivedInput,
    SetCategoryCollapsedInput, UpdateCategoryInput, UpdateMemoInput,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const CATEGORY_COLUMNS: &str =
    "id, emoji, title, color, position, archived, is_todo, is_collapsed, created_at, updated_at";
const MEMO_COLUMNS: &str =
    "id, category_id, emoji, title, color, date_ymd, content_md, todo_done, position, created_at, updated_at";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    pub fn list_categories_with_memos(&self) -> AppResult<Vec<CategoryWithMemos>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY position ASC, created_at ASC"
        ))?;
        let categories = stmt
            .query_map([], parse_category_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut memo_stmt = conn.prepare(&format!(
            "SELECT {MEMO_COLUMNS} FROM memos WHERE category_id = ?1 ORDER BY position ASC, created_at ASC"
        ))?;
        let mut out = Vec::with_capacity(categories.len());
        for category in categories {
            let memos = memo_stmt
                .query_map(params![&category.id], parse_memo_row)?
                .collect::<Result<Vec<_>, _>>()?;
            out.push(CategoryWithMemos { category, memos });
        }
        Ok(out)
    }

    pub fn get_app_settings(&self) -> AppResult<AppSettings> {
        let conn = self.conn()?;
        let background_color = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'background_color'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(AppSettings {
            background_color: background_color.unwrap_or_default(),
        })
    }

    pub fn set_background_color(&self, input: &SetBackgroundColorInput) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES ('background_color', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![&input.background_color],
        )?;
        Ok(())
    }

    pub fn create_category(&self, input: &CreateCategoryInput) -> AppResult<Category> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput("category title must not be empty".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = Uuid::new_v4().to_string();
        let now = now_ms();
        let position: i64 = tx.query_row("SELECT COALESCE(MAX(position), -1) + 1 FROM categories", [], |row| {
            row.get(0)
        })?;

        tx.execute(
            "INSERT INTO categories (id, emoji, title, color, position, archived, is_todo, is_collapsed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 0, ?7, ?7)",
            params![
                &id,
                input.emoji.as_deref().unwrap_or(""),
                title,
                &input.color,
                position,
                input.is_todo,
                now
            ],
        )?;
        let category = fetch_category(&tx, &id)?;
        tx.commit()?;
        Ok(category)
    }

    /// Only display fields change; `is_todo` is fixed at creation.
    pub fn update_category(&self, input: &UpdateCategoryInput) -> AppResult<Category> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput("category title must not be empty".to_string()));
        }
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE categories SET emoji = ?1, title = ?2, color = ?3, updated_at = ?4 WHERE id = ?5",
            params![&input.emoji, title, &input.color, now_ms(), &input.id],
        )?;
        if changed == 0 {
            return Err(category_not_found(&input.id));
        }
        fetch_category(&conn, &input.id)
    }

    pub fn set_category_collapsed(&self, input: &SetCategoryCollapsedInput) -> AppResult<Category> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE categories SET is_collapsed = ?1, updated_at = ?2 WHERE id = ?3",
            params![input.is_collapsed, now_ms(), &input.id],
        )?;
        if changed == 0 {
            return Err(category_not_found(&input.id));
        }
        fetch_category(&conn, &input.id)
    }

    pub fn set_category_archived(&self, input: &SetCategoryArchivedInput) -> AppResult<Category> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE categories SET archived = ?1, updated_at = ?2 WHERE id = ?3",
            params![input.archived, now_ms(), &input.id],
        )?;
        if changed == 0 {
            return Err(category_not_found(&input.id));
        }
        fetch_category(&conn, &input.id)
    }

    /// Owned memos go with the category through the foreign key cascade.
    pub fn delete_category(&self, id: &str) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn reorder_categories(&self, input: &ReorderCategoriesInput) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();
        for (index, id) in input.ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE categories SET position = ?1, updated_at = ?2 WHERE id = ?3",
                params![index as i64, now, id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Ids that do not belong to `category_id` are ignored.
    pub fn reorder_memos(&self, input: &ReorderMemosInput) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();
        for (index, memo_id) in input.ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE memos SET position = ?1, updated_at = ?2 WHERE id = ?3 AND category_id = ?4",
                params![index as i64, now, memo_id, &input.category_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn create_memo(&self, input: &CreateMemoInput) -> AppResult<Memo> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !category_exists(&tx, &input.category_id)? {
            return Err(category_not_found(&input.category_id));
        }

        let id = Uuid::new_v4().to_string();
        let now = now_ms();
        let position = next_memo_position(&tx, &input.category_id)?;
        let date_ymd = match input.date_ymd.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ => today_ymd(),
        };

        tx.execute(
            "INSERT INTO memos (id, category_id, emoji, title, color, date_ymd, content_md, todo_done, position, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?9)",
            params![
                &id,
                &input.category_id,
                input.emoji.as_deref().unwrap_or(""),
                &input.title,
                &input.color,
                date_ymd,
                &input.content_md,
                position,
                now
            ],
        )?;
        let memo = fetch_memo(&tx, &id)?;
        tx.commit()?;
        Ok(memo)
    }

    pub fn update_memo(&self, input: &UpdateMemoInput) -> AppResult<Memo> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE memos
             SET emoji = ?1, title = ?2, color = ?3, date_ymd = ?4, content_md = ?5, todo_done = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                &input.emoji,
                &input.title,
                &input.color,
                &input.date_ymd,
                &input.content_md,
                input.todo_done,
                now_ms(),
                &input.id
            ],
        )?;
        if changed == 0 {
            return Err(memo_not_found(&input.id));
        }
        fetch_memo(&conn, &input.id)
    }

    /// Closes the gap left in the owning category's positions.
    pub fn delete_memo(&self, id: &str) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if let Some((category_id, position)) = memo_category_and_position(&tx, id)? {
            tx.execute("DELETE FROM memos WHERE id = ?1", params![id])?;
            tx.execute(
                "UPDATE memos SET position = position - 1 WHERE category_id = ?1 AND position > ?2",
                params![category_id, position],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn move_memo(&self, input: &MoveMemoInput) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let Some((from_category_id, from_position)) = memo_category_and_position(&tx, &input.memo_id)? else {
            return Err(memo_not_found(&input.memo_id));
        };
        if !category_exists(&tx, &input.to_category_id)? {
            return Err(category_not_found(&input.to_category_id));
        }

        tx.execute(
            "UPDATE memos SET position = position - 1 WHERE category_id = ?1 AND position > ?2",
            params![&from_category_id, from_position],
        )?;
        // Parked below every slot so a same-category move still lands at the end.
        tx.execute("UPDATE memos SET position = -1 WHERE id = ?1", params![&input.memo_id])?;
        let new_position = next_memo_position(&tx, &input.to_category_id)?;
        tx.execute(
            "UPDATE memos SET category_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
            params![&input.to_category_id, new_position, now_ms(), &input.memo_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn category_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("category {id} not found"))
}

fn memo_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("memo {id} not found"))
}

fn category_exists(conn: &Connection, id: &str) -> AppResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(1) > 0 FROM categories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn next_memo_position(conn: &Connection, category_id: &str) -> AppResult<i64> {
    let position = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM memos WHERE category_id = ?1",
        params![category_id],
        |row| row.get(0),
    )?;
    Ok(position)
}

fn memo_category_and_position(conn: &Connection, memo_id: &str) -> AppResult<Option<(String, i64)>> {
    let meta = conn
        .query_row(
            "SELECT category_id, position FROM memos WHERE id = ?1",
            params![memo_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(meta)
}

fn fetch_category(conn: &Connection, id: &str) -> AppResult<Category> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        params![id],
        parse_category_row,
    )
    .optional()?
    .ok_or_else(|| category_not_found(id))
}

fn fetch_memo(conn: &Connection, id: &str) -> AppResult<Memo> {
    conn.query_row(
        &format!("SELECT {MEMO_COLUMNS} FROM memos WHERE id = ?1"),
        params![id],
        parse_memo_row,
    )
    .optional()?
    .ok_or_else(|| memo_not_found(id))
}

fn parse_category_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        emoji: row.get(1)?,
        title: row.get(2)?,
        color: row.get(3)?,
        position: row.get(4)?,
        archived: row.get(5)?,
        is_todo: row.get(6)?,
        is_collapsed: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn parse_memo_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memo> {
    Ok(Memo {
        id: row.get(0)?,
        category_id: row.get(1)?,
        emoji: row.get(2)?,
        title: row.get(3)?,
        color: row.get(4)?,
        date_ymd: row.get(5)?,
        content_md: row.get(6)?,
        todo_done: row.get(7)?,
        position: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
