use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub extra_property: String,
}

/// An ad joined with its owning user and its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ad {
    pub id: i64,
    pub user: User,
    pub category: Category,
    pub title: String,
    pub description: String,
    #[schema(example = 199.99)]
    pub price: f64,
    /// Image filename inside the image store.
    pub image: String,
    pub is_enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserCreate {
    #[schema(example = "Alice")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
}

// Validated commands handed to the persistence layer
#[derive(Debug, Clone, PartialEq)]
pub struct AdCreate {
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdUpdate {
    pub title: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleResponse {
    pub status: String,
    pub enabled: bool,
}
