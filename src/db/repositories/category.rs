use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::categories;

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<categories::Model>> {
        let all = categories::Entity::find()
            .order_by_asc(categories::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list categories")?;

        Ok(all)
    }

    pub async fn get(&self, id: i32) -> Result<Option<categories::Model>> {
        let category = categories::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category")?;

        Ok(category)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<categories::Model>> {
        let category = categories::Entity::find()
            .filter(categories::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query category by name")?;

        Ok(category)
    }

    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<categories::Model> {
        let category = categories::ActiveModel {
            name: Set(name),
            description: Set(description),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert category")?;

        Ok(category)
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Option<categories::Model>> {
        let Some(category) = categories::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category for update")?
        else {
            return Ok(None);
        };

        let mut active: categories::ActiveModel = category.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(description) = description {
            active.description = Set(description);
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update category")?;

        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = categories::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;

        Ok(result.rows_affected > 0)
    }
}
