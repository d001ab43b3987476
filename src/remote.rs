use crate::errors::AppResult;
use crate::models::{
    AppSettings, Category, CategoryWithMemos, CreateCategoryInput, CreateMemoInput, Memo, MoveMemoInput,
    ReorderCategoriesInput, ReorderMemosInput, SetBackgroundColorInput, SetCategoryArchivedInput,
    SetCategoryCollapsedInput, UpdateCategoryInput, UpdateMemoInput,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Transport for named backend commands. Arguments and results are plain JSON
/// records, the same shape a webview `invoke` call carries.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> AppResult<Value>;
}

/// Typed wrapper over an [`Invoker`]: one method per backend command.
#[derive(Clone)]
pub struct RemoteStoreClient {
    invoker: Arc<dyn Invoker>,
}

impl RemoteStoreClient {
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self { invoker }
    }

    async fn call<T: DeserializeOwned>(&self, command: &str, args: Value) -> AppResult<T> {
        tracing::debug!(command, "invoking backend command");
        let raw = self.invoker.invoke(command, args).await.map_err(|error| {
            tracing::debug!(command, error = %error, "backend command failed");
            error
        })?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn call_with_input<I: Serialize, T: DeserializeOwned>(&self, command: &str, input: &I) -> AppResult<T> {
        self.call(command, json!({ "input": input })).await
    }

    pub async fn list_categories_with_memos(&self) -> AppResult<Vec<CategoryWithMemos>> {
        self.call("list_categories_with_memos", json!({})).await
    }

    pub async fn get_app_settings(&self) -> AppResult<AppSettings> {
        self.call("get_app_settings", json!({})).await
    }

    pub async fn set_background_color(&self, input: &SetBackgroundColorInput) -> AppResult<()> {
        self.call_with_input("set_background_color", input).await
    }

    pub async fn create_category(&self, input: &CreateCategoryInput) -> AppResult<Category> {
        self.call_with_input("create_category", input).await
    }

    pub async fn update_category(&self, input: &UpdateCategoryInput) -> AppResult<Category> {
        self.call_with_input("update_category", input).await
    }

    pub async fn set_category_collapsed(&self, input: &SetCategoryCollapsedInput) -> AppResult<Category> {
        self.call_with_input("set_category_collapsed", input).await
    }

    pub async fn set_category_archived(&self, input: &SetCategoryArchivedInput) -> AppResult<Category> {
        self.call_with_input("set_category_archived", input).await
    }

    pub async fn delete_category(&self, id: &str) -> AppResult<()> {
        self.call("delete_category", json!({ "id": id })).await
    }

    pub async fn reorder_categories(&self, input: &ReorderCategoriesInput) -> AppResult<()> {
        self.call_with_input("reorder_categories", input).await
    }

    pub async fn reorder_memos(&self, input: &ReorderMemosInput) -> AppResult<()> {
        self.call_with_input("reorder_memos", input).await
    }

    pub async fn create_memo(&self, input: &CreateMemoInput) -> AppResult<Memo> {
        self.call_with_input("create_memo", input).await
    }

    pub async fn update_memo(&self, input: &UpdateMemoInput) -> AppResult<Memo> {
        self.call_with_input("update_memo", input).await
    }

    pub async fn delete_memo(&self, id: &str) -> AppResult<()> {
        self.call("delete_memo", json!({ "id": id })).await
    }

    pub async fn move_memo(&self, input: &MoveMemoInput) -> AppResult<()> {
        self.call_with_input("move_memo", input).await
    }
}
