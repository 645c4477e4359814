pub use super::categories::Entity as Categories;
pub use super::courses::Entity as Courses;
pub use super::enrollments::Entity as Enrollments;
pub use super::users::Entity as Users;
