//! Closed role type and the authorization predicates built on it.
//!
//! Roles are stored as plain strings in the database but parsed into this
//! enum at the boundary, so every permission check is an exhaustive match
//! rather than a string comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Course creation is limited to instructors and admins.
    #[must_use]
    pub const fn can_create_course(self) -> bool {
        matches!(self, Self::Admin | Self::Instructor)
    }

    /// Object-level check for course update/delete: admins unconditionally,
    /// instructors only on courses they own.
    #[must_use]
    pub fn may_mutate_course(self, actor_id: i32, instructor_id: i32) -> bool {
        match self {
            Self::Admin => true,
            Self::Instructor | Self::Student => actor_id == instructor_id,
        }
    }

    /// Enrollment records may be removed or repointed by the owning student
    /// or an admin.
    #[must_use]
    pub fn may_mutate_enrollment(self, actor_id: i32, student_id: i32) -> bool {
        match self {
            Self::Admin => true,
            Self::Instructor | Self::Student => actor_id == student_id,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Student
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "instructor" => Ok(Self::Instructor),
            "student" => Ok(Self::Student),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Instructor, Role::Student] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("teacher".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_course_creation_gate() {
        assert!(Role::Admin.can_create_course());
        assert!(Role::Instructor.can_create_course());
        assert!(!Role::Student.can_create_course());
    }

    #[test]
    fn test_course_mutation_ownership() {
        assert!(Role::Admin.may_mutate_course(99, 1));
        assert!(Role::Instructor.may_mutate_course(1, 1));
        assert!(!Role::Instructor.may_mutate_course(2, 1));
        assert!(!Role::Student.may_mutate_course(2, 1));
    }

    #[test]
    fn test_enrollment_mutation_ownership() {
        assert!(Role::Admin.may_mutate_enrollment(99, 5));
        assert!(Role::Student.may_mutate_enrollment(5, 5));
        assert!(!Role::Student.may_mutate_enrollment(6, 5));
    }
}
