use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::remote::Invoker;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const COMMANDS: &[&str] = &[
    "list_categories_with_memos",
    "get_app_settings",
    "set_background_color",
    "create_category",
    "update_category",
    "set_category_collapsed",
    "set_category_archived",
    "delete_category",
    "reorder_categories",
    "reorder_memos",
    "create_memo",
    "update_memo",
    "delete_memo",
    "move_memo",
];

/// In-process command handler over the SQLite store.
#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<Database>,
}

impl LocalBackend {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

#[async_trait]
impl Invoker for LocalBackend {
    async fn invoke(&self, command: &str, args: Value) -> AppResult<Value> {
        dispatch(&self.db, command, args)
    }
}

fn dispatch(db: &Database, command: &str, mut args: Value) -> AppResult<Value> {
    match command {
        "list_categories_with_memos" => respond(db.list_categories_with_memos()?),
        "get_app_settings" => respond(db.get_app_settings()?),
        "set_background_color" => respond(db.set_background_color(&arg(&mut args, "input")?)?),
        "create_category" => respond(db.create_category(&arg(&mut args, "input")?)?),
        "update_category" => respond(db.update_category(&arg(&mut args, "input")?)?),
        "set_category_collapsed" => respond(db.set_category_collapsed(&arg(&mut args, "input")?)?),
        "set_category_archived" => respond(db.set_category_archived(&arg(&mut args, "input")?)?),
        "delete_category" => respond(db.delete_category(&arg::<String>(&mut args, "id")?)?),
        "reorder_categories" => respond(db.reorder_categories(&arg(&mut args, "input")?)?),
        "reorder_memos" => respond(db.reorder_memos(&arg(&mut args, "input")?)?),
        "create_memo" => respond(db.create_memo(&arg(&mut args, "input")?)?),
        "update_memo" => respond(db.update_memo(&arg(&mut args, "input")?)?),
        "delete_memo" => respond(db.delete_memo(&arg::<String>(&mut args, "id")?)?),
        "move_memo" => respond(db.move_memo(&arg(&mut args, "input")?)?),
        other => Err(AppError::InvalidInput(format!("unknown command {other}"))),
    }
}

fn arg<T: DeserializeOwned>(args: &mut Value, key: &str) -> AppResult<T> {
    let value = args
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| AppError::InvalidInput(format!("missing argument `{key}`")))?;
    Ok(serde_json::from_value(value)?)
}

fn respond<T: Serialize>(value: T) -> AppResult<Value> {
    Ok(serde_json::to_value(value)?)
}
