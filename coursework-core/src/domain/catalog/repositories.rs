//! Catalog repository traits

use async_trait::async_trait;

use crate::domain::auth::value_objects::UserId;

use super::entities::{
    Assignment, AssignmentChanges, Course, CourseChanges, NewAssignment, NewCourse, NewSubmission,
    NewUser, Submission, User,
};
use super::errors::CatalogError;
use super::lookup::RecordLookup;

/// User repository trait for user persistence
#[async_trait]
pub trait IUserRepository: Send + Sync {
    /// Create a user; emails are unique
    async fn create_user(&self, user: NewUser) -> Result<User, CatalogError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, CatalogError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CatalogError>;
}

#[async_trait]
pub trait ICourseRepository: Send + Sync {
    /// List courses ordered by id
    async fn list_courses(&self, offset: usize, limit: usize) -> Result<Vec<Course>, CatalogError>;

    async fn count_courses(&self) -> Result<usize, CatalogError>;

    async fn find_course_by_id(&self, id: i64) -> Result<Option<Course>, CatalogError>;

    async fn create_course(&self, course: NewCourse) -> Result<Course, CatalogError>;

    /// Apply changes; `Ok(None)` when the course does not exist
    async fn update_course(
        &self,
        id: i64,
        changes: CourseChanges,
    ) -> Result<Option<Course>, CatalogError>;

    /// Delete a course with its assignments, their submissions and its enrollments.
    /// Returns whether the course existed.
    async fn delete_course(&self, id: i64) -> Result<bool, CatalogError>;

    /// Ids of courses taught by an instructor
    async fn courses_taught_by(&self, instructor_id: UserId) -> Result<Vec<i64>, CatalogError>;
}

#[async_trait]
pub trait IAssignmentRepository: Send + Sync {
    async fn create_assignment(&self, assignment: NewAssignment)
    -> Result<Assignment, CatalogError>;

    async fn find_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>, CatalogError>;

    async fn update_assignment(
        &self,
        id: i64,
        changes: AssignmentChanges,
    ) -> Result<Option<Assignment>, CatalogError>;

    /// Delete an assignment and its submissions
    async fn delete_assignment(&self, id: i64) -> Result<bool, CatalogError>;

    async fn assignments_for_course(&self, course_id: i64) -> Result<Vec<i64>, CatalogError>;
}

#[async_trait]
pub trait ISubmissionRepository: Send + Sync {
    async fn create_submission(&self, submission: NewSubmission)
    -> Result<Submission, CatalogError>;

    async fn find_submission_by_id(&self, id: i64) -> Result<Option<Submission>, CatalogError>;

    /// Submissions for an assignment ordered by id
    async fn list_submissions(
        &self,
        assignment_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Submission>, CatalogError>;

    async fn count_submissions(&self, assignment_id: i64) -> Result<usize, CatalogError>;

    async fn grade_submission(
        &self,
        id: i64,
        grade: Option<f64>,
    ) -> Result<Option<Submission>, CatalogError>;
}

#[async_trait]
pub trait IEnrollmentRepository: Send + Sync {
    async fn enrolled_students(&self, course_id: i64) -> Result<Vec<UserId>, CatalogError>;

    async fn courses_for_student(&self, student_id: UserId) -> Result<Vec<i64>, CatalogError>;

    async fn is_enrolled(&self, course_id: i64, student_id: UserId) -> Result<bool, CatalogError>;

    /// Enroll `add` and unenroll `remove`. Every id in `add` must name an existing user.
    async fn update_enrollment(
        &self,
        course_id: i64,
        add: &[UserId],
        remove: &[UserId],
    ) -> Result<(), CatalogError>;
}

/// Everything the HTTP layer needs from the record store
pub trait Catalog:
    IUserRepository
    + ICourseRepository
    + IAssignmentRepository
    + ISubmissionRepository
    + IEnrollmentRepository
    + RecordLookup
{
}

impl<T> Catalog for T where
    T: IUserRepository
        + ICourseRepository
        + IAssignmentRepository
        + ISubmissionRepository
        + IEnrollmentRepository
        + RecordLookup
{
}
