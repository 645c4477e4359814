use serde::Serialize;

use crate::db::{CourseDetail, EnrollmentDetail};
use crate::entities::{categories, users};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Public user representation; the password hash never leaves the store
/// layer.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub date_joined: String,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            avatar: model.avatar,
            is_active: model.is_active,
            date_joined: model.date_joined,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<categories::Model> for CategoryDto {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseDto {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: i32,
    pub category_name: String,
    pub category_detail: CategoryDto,
    pub instructor: i32,
    pub instructor_name: String,
    pub instructor_detail: UserDto,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CourseDetail> for CourseDto {
    fn from(detail: CourseDetail) -> Self {
        Self {
            id: detail.course.id,
            title: detail.course.title,
            description: detail.course.description,
            category: detail.category.id,
            category_name: detail.category.name.clone(),
            category_detail: detail.category.into(),
            instructor: detail.instructor.id,
            instructor_name: detail.instructor.username.clone(),
            instructor_detail: detail.instructor.into(),
            created_at: detail.course.created_at,
            updated_at: detail.course.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentDto {
    pub id: i32,
    pub course: i32,
    pub course_title: String,
    pub course_detail: CourseDto,
    pub student: i32,
    pub student_name: String,
    pub enrolled_at: String,
}

impl From<EnrollmentDetail> for EnrollmentDto {
    fn from(detail: EnrollmentDetail) -> Self {
        Self {
            id: detail.enrollment.id,
            course: detail.course.course.id,
            course_title: detail.course.course.title.clone(),
            course_detail: detail.course.into(),
            student: detail.student.id,
            student_name: detail.student.username.clone(),
            enrolled_at: detail.enrollment.enrolled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStatsDto {
    pub total_users: u64,
    pub total_courses: u64,
    pub total_enrollments: u64,
    pub role_distribution: Vec<RoleCount>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
