//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use coursework_core::domain::auth::{UserId, UserRole};
use coursework_core::domain::catalog::{Assignment, Course, Submission};

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `201` body for created records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Login credentials. Both fields are checked by the handler so a partial
/// body gets the login-specific message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Student and instructor view of a user; `courses` are enrolled or taught ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub courses: Vec<i64>,
}

/// `page` and `numPerPage` are parsed leniently; anything unparsable falls back
/// to the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<String>,
    pub num_per_page: Option<String>,
}

impl PageQuery {
    /// 1-based page number, never below 1
    pub fn page_number(&self) -> usize {
        self.page
            .as_deref()
            .and_then(parse_positive)
            .unwrap_or(1)
    }

    pub fn page_size(&self, default: usize) -> usize {
        self.num_per_page
            .as_deref()
            .and_then(parse_positive)
            .unwrap_or(default)
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 1)
        .map(|n| n as usize)
}

/// Number of pages needed for `total` items
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePage {
    pub courses: Vec<Course>,
    pub page_number: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub subject: String,
    pub number: String,
    pub title: String,
    pub term: String,
    pub instructor_id: UserId,
}

impl From<Course> for CourseSummary {
    fn from(course: Course) -> Self {
        Self {
            subject: course.subject,
            number: course.number,
            title: course.title,
            term: course.term,
            instructor_id: course.instructor_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentRequest {
    #[serde(default)]
    pub add: Vec<UserId>,
    #[serde(default)]
    pub remove: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentIdsResponse {
    pub assignments: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub course_id: i64,
    pub title: String,
    pub points: i64,
    pub due: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            course_id: assignment.course_id,
            title: assignment.title,
            points: assignment.points,
            due: assignment.due,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPage {
    pub submissions: Vec<Submission>,
    pub page_number: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_count: usize,
}

/// Only the grade of a submission is client-writable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradeRequest {
    /// `None` when absent, `Some(None)` for an explicit `null`
    #[serde(default, deserialize_with = "present")]
    pub grade: Option<Option<f64>>,
}

/// Marks a field as present, keeping an explicit `null` apart from a missing key
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, num_per_page: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            num_per_page: num_per_page.map(str::to_string),
        }
    }

    #[test]
    fn test_grade_request_tells_absent_from_null() {
        let absent: GradeRequest = serde_json::from_str(r#"{"studentId": 5}"#).unwrap();
        assert_eq!(absent.grade, None);

        let cleared: GradeRequest = serde_json::from_str(r#"{"grade": null}"#).unwrap();
        assert_eq!(cleared.grade, Some(None));

        let graded: GradeRequest = serde_json::from_str(r#"{"grade": 88.5}"#).unwrap();
        assert_eq!(graded.grade, Some(Some(88.5)));
    }

    #[test]
    fn test_page_number_is_lenient() {
        assert_eq!(query(None, None).page_number(), 1);
        assert_eq!(query(Some("3"), None).page_number(), 3);
        assert_eq!(query(Some("-2"), None).page_number(), 1);
        assert_eq!(query(Some("abc"), None).page_number(), 1);
        assert_eq!(query(Some("0"), None).page_number(), 1);
    }

    #[test]
    fn test_page_size_falls_back_to_default() {
        assert_eq!(query(None, None).page_size(5), 5);
        assert_eq!(query(None, Some("2")).page_size(5), 2);
        assert_eq!(query(None, Some("0")).page_size(5), 5);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 5), 0);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(11, 5), 3);
    }

    #[test]
    fn test_course_page_uses_camel_case() {
        let page = CoursePage {
            courses: vec![],
            page_number: 1,
            total_pages: 0,
            page_size: 5,
            total_count: 0,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageNumber"], 1);
        assert_eq!(json["totalCount"], 0);
    }
}
