use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use super::course::CourseDetail;
use crate::entities::prelude::*;
use crate::entities::{courses, enrollments, users};

/// An enrollment with its course (fully resolved) and student rows.
#[derive(Debug, Clone)]
pub struct EnrollmentDetail {
    pub enrollment: enrollments::Model,
    pub course: CourseDetail,
    pub student: users::Model,
}

pub struct EnrollmentRepository {
    conn: DatabaseConnection,
}

impl EnrollmentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn exists(&self, course_id: i32, student_id: i32) -> Result<bool> {
        let existing = Enrollments::find()
            .filter(enrollments::Column::CourseId.eq(course_id))
            .filter(enrollments::Column::StudentId.eq(student_id))
            .one(&self.conn)
            .await
            .context("Failed to query enrollment")?;

        Ok(existing.is_some())
    }

    pub async fn create(&self, course_id: i32, student_id: i32) -> Result<EnrollmentDetail> {
        let enrollment = enrollments::ActiveModel {
            course_id: Set(course_id),
            student_id: Set(student_id),
            enrolled_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert enrollment")?;

        let mut details = self.with_references(vec![enrollment]).await?;
        details
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Failed to load created enrollment"))
    }

    /// Bare row lookup for ownership checks.
    pub async fn get_model(&self, id: i32) -> Result<Option<enrollments::Model>> {
        let enrollment = Enrollments::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query enrollment")?;

        Ok(enrollment)
    }

    pub async fn get(&self, id: i32) -> Result<Option<EnrollmentDetail>> {
        let Some(enrollment) = Enrollments::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query enrollment")?
        else {
            return Ok(None);
        };

        let mut details = self.with_references(vec![enrollment]).await?;
        Ok(details.pop())
    }

    pub async fn list_for_student(&self, student_id: i32) -> Result<Vec<EnrollmentDetail>> {
        let rows = Enrollments::find()
            .filter(enrollments::Column::StudentId.eq(student_id))
            .order_by_asc(enrollments::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list enrollments for student")?;

        self.with_references(rows).await
    }

    /// All enrollments for courses owned by the given instructor.
    pub async fn list_for_instructor(&self, instructor_id: i32) -> Result<Vec<EnrollmentDetail>> {
        let rows = Enrollments::find()
            .find_also_related(Courses)
            .filter(courses::Column::InstructorId.eq(instructor_id))
            .order_by_asc(enrollments::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list enrollments for instructor")?;

        let enrollments_only = rows.into_iter().map(|(e, _)| e).collect();
        self.with_references(enrollments_only).await
    }

    /// Repoint an enrollment at another course. The student field is
    /// immutable.
    pub async fn update_course(&self, id: i32, course_id: i32) -> Result<Option<EnrollmentDetail>> {
        let Some(enrollment) = Enrollments::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query enrollment for update")?
        else {
            return Ok(None);
        };

        let mut active: enrollments::ActiveModel = enrollment.into();
        active.course_id = Set(course_id);

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update enrollment")?;

        let mut details = self.with_references(vec![updated]).await?;
        Ok(details.pop())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Enrollments::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete enrollment")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        let total = Enrollments::find()
            .count(&self.conn)
            .await
            .context("Failed to count enrollments")?;

        Ok(total)
    }

    /// Resolve course (with its own references) and student rows for a
    /// batch of enrollments.
    async fn with_references(
        &self,
        rows: Vec<enrollments::Model>,
    ) -> Result<Vec<EnrollmentDetail>> {
        let course_refs = rows
            .load_one(Courses, &self.conn)
            .await
            .context("Failed to load enrollment courses")?;
        let student_refs = rows
            .load_one(Users, &self.conn)
            .await
            .context("Failed to load enrollment students")?;

        let course_rows: Vec<courses::Model> = course_refs
            .iter()
            .flatten()
            .cloned()
            .collect();
        let category_refs = course_rows
            .load_one(Categories, &self.conn)
            .await
            .context("Failed to load course categories")?;
        let instructor_refs = course_rows
            .load_one(Users, &self.conn)
            .await
            .context("Failed to load course instructors")?;

        let mut resolved_courses = course_rows
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
            .collect::<Result<Vec<_>>>()?
            .into_iter();

        rows.into_iter()
            .zip(course_refs)
            .zip(student_refs)
            .map(|((enrollment, course), student)| {
                course.ok_or_else(|| {
                    anyhow::anyhow!("Enrollment {} references a missing course", enrollment.id)
                })?;
                let course = resolved_courses
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Course resolution mismatch"))?;
                let student = student.ok_or_else(|| {
                    anyhow::anyhow!("Enrollment {} references a missing student", enrollment.id)
                })?;
                Ok(EnrollmentDetail {
                    enrollment,
                    course,
                    student,
                })
            })
            .collect()
    }
}
