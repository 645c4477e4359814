pub mod prelude;

pub mod categories;
pub mod courses;
pub mod enrollments;
pub mod users;
