/*
 * Responsibility
 * - Drinks request/response DTOs
 * - Two representations: short (public, colors and proportions only) and long (full recipe)
 */
use serde::{Deserialize, Serialize};

use crate::repos::drink_repo::{DrinkRow, RecipePart};

/// A recipe may be posted as one part or as a list of parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<RecipePart>),
    One(RecipePart),
}

impl RecipeInput {
    pub fn into_parts(self) -> Vec<RecipePart> {
        match self {
            RecipeInput::Many(parts) => parts,
            RecipeInput::One(part) => vec![part],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl CreateDrinkRequest {
    pub fn validate(self) -> Result<(String, Vec<RecipePart>), &'static str> {
        let title = match self.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => return Err("title is required"),
        };
        let recipe = self.recipe.ok_or("recipe is required")?;

        Ok((title, recipe.into_parts()))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl UpdateDrinkRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err("title cannot be empty");
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeShort {
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Serialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<RecipeShort>,
}

impl From<DrinkRow> for DrinkShort {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            recipe: row
                .recipe
                .into_iter()
                .map(|part| RecipeShort {
                    color: part.color,
                    parts: part.parts,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinkLong {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<RecipePart>,
}

impl From<DrinkRow> for DrinkLong {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            recipe: row.recipe,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub deleted: i64,
}
