//! Catalog entities
//!
//! Entities serialize with camelCase attribute names. Those attribute maps are what
//! ownership rules address (`instructorId`, `course.instructorId`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::auth::value_objects::{PasswordHash, UserId, UserRole};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: PasswordHash,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub subject: String,
    pub number: String,
    pub title: String,
    pub term: String,
    pub instructor_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub subject: String,
    pub number: String,
    pub title: String,
    pub term: String,
    pub instructor_id: UserId,
}

/// Partial course update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseChanges {
    pub subject: Option<String>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub term: Option<String>,
    pub instructor_id: Option<UserId>,
}

impl CourseChanges {
    pub fn apply(self, course: &mut Course) {
        if let Some(subject) = self.subject {
            course.subject = subject;
        }
        if let Some(number) = self.number {
            course.number = number;
        }
        if let Some(title) = self.title {
            course.title = title;
        }
        if let Some(term) = self.term {
            course.term = term;
        }
        if let Some(instructor_id) = self.instructor_id {
            course.instructor_id = instructor_id;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub points: i64,
    pub due: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub course_id: i64,
    pub title: String,
    pub points: i64,
    pub due: DateTime<Utc>,
}

/// Partial assignment update. `courseId` is not movable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentChanges {
    pub title: Option<String>,
    pub points: Option<i64>,
    pub due: Option<DateTime<Utc>>,
}

impl AssignmentChanges {
    pub fn apply(self, assignment: &mut Assignment) {
        if let Some(title) = self.title {
            assignment.title = title;
        }
        if let Some(points) = self.points {
            assignment.points = points;
        }
        if let Some(due) = self.due {
            assignment.due = due;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub grade: Option<f64>,
    /// Stored file reference as returned by the file store
    pub file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub assignment_id: i64,
    pub student_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_omits_password() {
        let user = User {
            id: UserId(1),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: PasswordHash::from("$argon2id$secret".to_string()),
            role: UserRole::Instructor,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "instructor");
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
    }

    #[test]
    fn test_course_attributes_are_camel_case() {
        let course = Course {
            id: 3,
            subject: "CS".to_string(),
            number: "493".to_string(),
            title: "Cloud".to_string(),
            term: "sp25".to_string(),
            instructor_id: UserId(9),
        };
        let value = serde_json::to_value(&course).unwrap();
        assert_eq!(value["instructorId"], 9);
    }

    #[test]
    fn test_course_changes_apply_only_present_fields() {
        let mut course = Course {
            id: 1,
            subject: "CS".to_string(),
            number: "101".to_string(),
            title: "Intro".to_string(),
            term: "fa24".to_string(),
            instructor_id: UserId(2),
        };
        let changes: CourseChanges = serde_json::from_str(r#"{"title": "Intro to CS"}"#).unwrap();
        changes.apply(&mut course);
        assert_eq!(course.title, "Intro to CS");
        assert_eq!(course.subject, "CS");
        assert_eq!(course.instructor_id, UserId(2));
    }
}
