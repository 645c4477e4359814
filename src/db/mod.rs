use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{categories, courses, enrollments, users};

pub mod migrator;
pub mod repositories;

pub use repositories::course::{CourseDetail, CourseUpdate};
pub use repositories::enrollment::EnrollmentDetail;
pub use repositories::user::{NewUser, ProfileUpdate};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("::memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn course_repo(&self) -> repositories::course::CourseRepository {
        repositories::course::CourseRepository::new(self.conn.clone())
    }

    fn enrollment_repo(&self) -> repositories::enrollment::EnrollmentRepository {
        repositories::enrollment::EnrollmentRepository::new(self.conn.clone())
    }

    // ---- users ----

    pub async fn create_user(
        &self,
        input: NewUser,
        security: Option<&SecurityConfig>,
    ) -> Result<users::Model> {
        self.user_repo().create(input, security).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<users::Model>> {
        self.user_repo().list().await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<users::Model>> {
        self.user_repo().verify_credentials(username, password).await
    }

    pub async fn update_profile(&self, id: i32, update: ProfileUpdate) -> Result<users::Model> {
        self.user_repo().update_profile(id, update).await
    }

    pub async fn update_user_password(
        &self,
        id: i32,
        new_password: &str,
        security: Option<&SecurityConfig>,
    ) -> Result<()> {
        self.user_repo()
            .update_password(id, new_password, security)
            .await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn count_users_by_role(&self) -> Result<Vec<(String, i64)>> {
        self.user_repo().count_by_role().await
    }

    // ---- categories ----

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        self.category_repo().list().await
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<categories::Model>> {
        self.category_repo().get(id).await
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<categories::Model>> {
        self.category_repo().get_by_name(name).await
    }

    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<categories::Model> {
        self.category_repo().create(name, description).await
    }

    pub async fn update_category(
        &self,
        id: i32,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Option<categories::Model>> {
        self.category_repo().update(id, name, description).await
    }

    pub async fn delete_category(&self, id: i32) -> Result<bool> {
        self.category_repo().delete(id).await
    }

    // ---- courses ----

    pub async fn list_courses(&self) -> Result<Vec<CourseDetail>> {
        self.course_repo().list().await
    }

    pub async fn get_course(&self, id: i32) -> Result<Option<CourseDetail>> {
        self.course_repo().get(id).await
    }

    pub async fn get_course_model(&self, id: i32) -> Result<Option<courses::Model>> {
        self.course_repo().get_model(id).await
    }

    pub async fn create_course(
        &self,
        title: String,
        description: String,
        category_id: i32,
        instructor_id: i32,
    ) -> Result<CourseDetail> {
        self.course_repo()
            .create(title, description, category_id, instructor_id)
            .await
    }

    pub async fn update_course(&self, id: i32, update: CourseUpdate) -> Result<Option<CourseDetail>> {
        self.course_repo().update(id, update).await
    }

    pub async fn delete_course(&self, id: i32) -> Result<bool> {
        self.course_repo().delete(id).await
    }

    pub async fn count_courses(&self) -> Result<u64> {
        self.course_repo().count().await
    }

    // ---- enrollments ----

    pub async fn enrollment_exists(&self, course_id: i32, student_id: i32) -> Result<bool> {
        self.enrollment_repo().exists(course_id, student_id).await
    }

    pub async fn create_enrollment(
        &self,
        course_id: i32,
        student_id: i32,
    ) -> Result<EnrollmentDetail> {
        self.enrollment_repo().create(course_id, student_id).await
    }

    pub async fn get_enrollment(&self, id: i32) -> Result<Option<EnrollmentDetail>> {
        self.enrollment_repo().get(id).await
    }

    pub async fn get_enrollment_model(&self, id: i32) -> Result<Option<enrollments::Model>> {
        self.enrollment_repo().get_model(id).await
    }

    pub async fn list_enrollments_for_student(
        &self,
        student_id: i32,
    ) -> Result<Vec<EnrollmentDetail>> {
        self.enrollment_repo().list_for_student(student_id).await
    }

    pub async fn list_enrollments_for_instructor(
        &self,
        instructor_id: i32,
    ) -> Result<Vec<EnrollmentDetail>> {
        self.enrollment_repo()
            .list_for_instructor(instructor_id)
            .await
    }

    pub async fn update_enrollment_course(
        &self,
        id: i32,
        course_id: i32,
    ) -> Result<Option<EnrollmentDetail>> {
        self.enrollment_repo().update_course(id, course_id).await
    }

    pub async fn delete_enrollment(&self, id: i32) -> Result<bool> {
        self.enrollment_repo().delete(id).await
    }

    pub async fn count_enrollments(&self) -> Result<u64> {
        self.enrollment_repo().count().await
    }
}
