/*
 * Responsibility
 * - drinks CRUD behind a trait (storage engine is not this crate's concern)
 * - title is unique; ids are assigned monotonically from 1
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePart {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrinkRow {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<RecipePart>,
}

#[async_trait]
pub trait DrinkRepo: Send + Sync {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError>;

    async fn create(&self, title: &str, recipe: Vec<RecipePart>) -> Result<DrinkRow, RepoError>;

    // `None` fields are left untouched. Returns `Ok(None)` when `id` does not exist.
    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<Vec<RecipePart>>,
    ) -> Result<Option<DrinkRow>, RepoError>;

    async fn delete(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, DrinkRow>,
}

impl Table {
    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|row| row.title == title && Some(row.id) != except)
    }
}

/// Process-local drinks table.
#[derive(Debug, Default)]
pub struct InMemoryDrinkRepo {
    table: RwLock<Table>,
}

impl InMemoryDrinkRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DrinkRepo for InMemoryDrinkRepo {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn create(&self, title: &str, recipe: Vec<RecipePart>) -> Result<DrinkRow, RepoError> {
        let mut table = self.table.write().await;
        if table.title_taken(title, None) {
            return Err(RepoError::Conflict);
        }

        table.next_id += 1;
        let row = DrinkRow {
            id: table.next_id,
            title: title.to_string(),
            recipe,
        };
        table.rows.insert(row.id, row.clone());

        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<Vec<RecipePart>>,
    ) -> Result<Option<DrinkRow>, RepoError> {
        let mut table = self.table.write().await;

        if !table.rows.contains_key(&id) {
            return Ok(None);
        }

        if let Some(title) = title
            && table.title_taken(title, Some(id))
        {
            return Err(RepoError::Conflict);
        }

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = title {
            row.title = title.to_string();
        }
        if let Some(recipe) = recipe {
            row.recipe = recipe;
        }

        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}
