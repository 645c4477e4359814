use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, LoaderTrait, PaginatorTrait, QueryOrder,
    Set,
};

use crate::entities::prelude::*;
use crate::entities::{categories, courses, users};

/// A course together with the rows it references, for serialization.
#[derive(Debug, Clone)]
pub struct CourseDetail {
    pub course: courses::Model,
    pub category: categories::Model,
    pub instructor: users::Model,
}

/// Partial update input; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
}

pub struct CourseRepository {
    conn: DatabaseConnection,
}

impl CourseRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<CourseDetail>> {
        let courses_list = Courses::find()
            .order_by_asc(courses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list courses")?;

        self.with_references(courses_list).await
    }

    pub async fn get(&self, id: i32) -> Result<Option<CourseDetail>> {
        let Some(course) = Courses::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query course")?
        else {
            return Ok(None);
        };

        let mut details = self.with_references(vec![course]).await?;
        Ok(details.pop())
    }

    /// Bare row lookup for ownership checks.
    pub async fn get_model(&self, id: i32) -> Result<Option<courses::Model>> {
        let course = Courses::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query course")?;

        Ok(course)
    }

    pub async fn create(
        &self,
        title: String,
        description: String,
        category_id: i32,
        instructor_id: i32,
    ) -> Result<CourseDetail> {
        let now = chrono::Utc::now().to_rfc3339();

        let course = courses::ActiveModel {
            title: Set(title),
            description: Set(description),
            category_id: Set(category_id),
            instructor_id: Set(instructor_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert course")?;

        let mut details = self.with_references(vec![course]).await?;
        details
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Failed to load created course"))
    }

    pub async fn update(&self, id: i32, update: CourseUpdate) -> Result<Option<CourseDetail>> {
        let Some(course) = Courses::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query course for update")?
        else {
            return Ok(None);
        };

        let mut active: courses::ActiveModel = course.into();
        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(category_id) = update.category_id {
            active.category_id = Set(category_id);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update course")?;

        let mut details = self.with_references(vec![updated]).await?;
        Ok(details.pop())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Courses::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete course")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        let total = Courses::find()
            .count(&self.conn)
            .await
            .context("Failed to count courses")?;

        Ok(total)
    }

    /// Resolve category and instructor rows for a batch of courses.
    async fn with_references(&self, courses_list: Vec<courses::Model>) -> Result<Vec<CourseDetail>> {
        let category_refs = courses_list
            .load_one(Categories, &self.conn)
            .await
            .context("Failed to load course categories")?;
        let instructor_refs = courses_list
            .load_one(Users, &self.conn)
            .await
            .context("Failed to load course instructors")?;

        courses_list
            .into_iter()
            .zip(category_refs)
            .zip(instructor_refs)
            .map(|((course, category), instructor)| {
                let category = category.ok_or_else(|| {
                    anyhow::anyhow!("Course {} references a missing category", course.id)
                })?;
                let instructor = instructor.ok_or_else(|| {
                    anyhow::anyhow!("Course {} references a missing instructor", course.id)
                })?;
                Ok(CourseDetail {
                    course,
                    category,
                    instructor,
                })
            })
            .collect()
    }
}
