//! In-process catalog
//!
//! All tables sit behind one `RwLock` so cascades and enrollment updates are
//! applied as a unit.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::auth::value_objects::{UserId, UserRole};
use crate::domain::catalog::{
    Assignment, AssignmentChanges, CatalogError, Course, CourseChanges, IAssignmentRepository,
    ICourseRepository, IEnrollmentRepository, ISubmissionRepository, IUserRepository,
    LookupError, NewAssignment, NewCourse, NewSubmission, NewUser, RecordAttributes, RecordKind,
    RecordLookup, Submission, User,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    courses: BTreeMap<i64, Course>,
    assignments: BTreeMap<i64, Assignment>,
    submissions: BTreeMap<i64, Submission>,
    /// (course id, student id)
    enrollments: BTreeSet<(i64, UserId)>,
    next_user_id: i64,
    next_course_id: i64,
    next_assignment_id: i64,
    next_submission_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn attributes(&self, kind: RecordKind, id: i64) -> Result<Option<RecordAttributes>, LookupError> {
        let value = match kind {
            RecordKind::User => self.users.get(&UserId(id)).map(serde_json::to_value),
            RecordKind::Course => self.courses.get(&id).map(serde_json::to_value),
            RecordKind::Assignment => self.assignments.get(&id).map(serde_json::to_value),
            RecordKind::Submission => self.submissions.get(&id).map(serde_json::to_value),
        };
        match value {
            None => Ok(None),
            Some(Ok(serde_json::Value::Object(map))) => Ok(Some(map)),
            Some(Ok(_)) => Err(LookupError::Backend {
                message: format!("{} {} did not serialize to an object", kind, id),
            }),
            Some(Err(e)) => Err(LookupError::Backend {
                message: e.to_string(),
            }),
        }
    }

    /// Embed each related record inside the previous one, following `<kind>Id`
    fn embed_related(
        &self,
        record: &mut RecordAttributes,
        related: &[RecordKind],
    ) -> Result<(), LookupError> {
        let Some((kind, rest)) = related.split_first() else {
            return Ok(());
        };

        let target = record
            .get(kind.reference_field())
            .and_then(serde_json::Value::as_i64);
        let embedded = match target {
            Some(id) => self.attributes(*kind, id)?,
            None => None,
        };

        match embedded {
            Some(mut child) => {
                self.embed_related(&mut child, rest)?;
                record.insert(kind.as_str().to_string(), serde_json::Value::Object(child));
            }
            None => {
                record.insert(kind.as_str().to_string(), serde_json::Value::Null);
            }
        }
        Ok(())
    }

    fn remove_assignment_cascade(&mut self, assignment_id: i64) {
        self.assignments.remove(&assignment_id);
        self.submissions
            .retain(|_, submission| submission.assignment_id != assignment_id);
    }
}

/// Catalog kept in process memory
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IUserRepository for InMemoryCatalog {
    async fn create_user(&self, user: NewUser) -> Result<User, CatalogError> {
        let mut tables = self.tables.write().await;
        let email = user.email.trim().to_lowercase();
        if tables.users.values().any(|u| u.email == email) {
            return Err(CatalogError::EmailAlreadyExists { email });
        }

        let id = UserId(next_id(&mut tables.next_user_id));
        let user = User {
            id,
            name: user.name,
            email,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.insert(id, user.clone());
        debug!(user_id = %id, role = %user.role, "Created user");
        Ok(user)
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, CatalogError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CatalogError> {
        let email = email.trim().to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ICourseRepository for InMemoryCatalog {
    async fn list_courses(&self, offset: usize, limit: usize) -> Result<Vec<Course>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_courses(&self) -> Result<usize, CatalogError> {
        Ok(self.tables.read().await.courses.len())
    }

    async fn find_course_by_id(&self, id: i64) -> Result<Option<Course>, CatalogError> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn create_course(&self, course: NewCourse) -> Result<Course, CatalogError> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_course_id);
        let course = Course {
            id,
            subject: course.subject,
            number: course.number,
            title: course.title,
            term: course.term,
            instructor_id: course.instructor_id,
        };
        tables.courses.insert(id, course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        id: i64,
        changes: CourseChanges,
    ) -> Result<Option<Course>, CatalogError> {
        let mut tables = self.tables.write().await;
        Ok(tables.courses.get_mut(&id).map(|course| {
            changes.apply(course);
            course.clone()
        }))
    }

    async fn delete_course(&self, id: i64) -> Result<bool, CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(&id).is_none() {
            return Ok(false);
        }

        let assignment_ids: Vec<i64> = tables
            .assignments
            .values()
            .filter(|a| a.course_id == id)
            .map(|a| a.id)
            .collect();
        for assignment_id in assignment_ids {
            tables.remove_assignment_cascade(assignment_id);
        }
        tables.enrollments.retain(|(course_id, _)| *course_id != id);

        debug!(course_id = id, "Deleted course with its assignments and enrollments");
        Ok(true)
    }

    async fn courses_taught_by(&self, instructor_id: UserId) -> Result<Vec<i64>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .values()
            .filter(|c| c.instructor_id == instructor_id)
            .map(|c| c.id)
            .collect())
    }
}

#[async_trait]
impl IAssignmentRepository for InMemoryCatalog {
    async fn create_assignment(
        &self,
        assignment: NewAssignment,
    ) -> Result<Assignment, CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&assignment.course_id) {
            return Err(CatalogError::invalid_reference(format!(
                "Course {} does not exist.",
                assignment.course_id
            )));
        }

        let id = next_id(&mut tables.next_assignment_id);
        let assignment = Assignment {
            id,
            course_id: assignment.course_id,
            title: assignment.title,
            points: assignment.points,
            due: assignment.due,
        };
        tables.assignments.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn find_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>, CatalogError> {
        Ok(self.tables.read().await.assignments.get(&id).cloned())
    }

    async fn update_assignment(
        &self,
        id: i64,
        changes: AssignmentChanges,
    ) -> Result<Option<Assignment>, CatalogError> {
        let mut tables = self.tables.write().await;
        Ok(tables.assignments.get_mut(&id).map(|assignment| {
            changes.apply(assignment);
            assignment.clone()
        }))
    }

    async fn delete_assignment(&self, id: i64) -> Result<bool, CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.assignments.contains_key(&id) {
            return Ok(false);
        }
        tables.remove_assignment_cascade(id);
        Ok(true)
    }

    async fn assignments_for_course(&self, course_id: i64) -> Result<Vec<i64>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .filter(|a| a.course_id == course_id)
            .map(|a| a.id)
            .collect())
    }
}

#[async_trait]
impl ISubmissionRepository for InMemoryCatalog {
    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<Submission, CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.assignments.contains_key(&submission.assignment_id) {
            return Err(CatalogError::invalid_reference(format!(
                "Assignment {} does not exist.",
                submission.assignment_id
            )));
        }

        let id = next_id(&mut tables.next_submission_id);
        let submission = Submission {
            id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            timestamp: submission.timestamp,
            grade: None,
            file: submission.file,
        };
        tables.submissions.insert(id, submission.clone());
        Ok(submission)
    }

    async fn find_submission_by_id(&self, id: i64) -> Result<Option<Submission>, CatalogError> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn list_submissions(
        &self,
        assignment_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Submission>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_submissions(&self, assignment_id: i64) -> Result<usize, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .count())
    }

    async fn grade_submission(
        &self,
        id: i64,
        grade: Option<f64>,
    ) -> Result<Option<Submission>, CatalogError> {
        let mut tables = self.tables.write().await;
        Ok(tables.submissions.get_mut(&id).map(|submission| {
            submission.grade = grade;
            submission.clone()
        }))
    }
}

#[async_trait]
impl IEnrollmentRepository for InMemoryCatalog {
    async fn enrolled_students(&self, course_id: i64) -> Result<Vec<UserId>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .range((course_id, UserId(i64::MIN))..=(course_id, UserId(i64::MAX)))
            .map(|(_, student)| *student)
            .collect())
    }

    async fn courses_for_student(&self, student_id: UserId) -> Result<Vec<i64>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .iter()
            .filter(|(_, student)| *student == student_id)
            .map(|(course, _)| *course)
            .collect())
    }

    async fn is_enrolled(&self, course_id: i64, student_id: UserId) -> Result<bool, CatalogError> {
        Ok(self
            .tables
            .read()
            .await
            .enrollments
            .contains(&(course_id, student_id)))
    }

    async fn update_enrollment(
        &self,
        course_id: i64,
        add: &[UserId],
        remove: &[UserId],
    ) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&course_id) {
            return Err(CatalogError::NotFound {
                kind: "Course",
                id: course_id.to_string(),
            });
        }
        // Validate everything before touching the table
        for id in add {
            match tables.users.get(id) {
                Some(user) if user.role == UserRole::Student => {}
                Some(_) => {
                    return Err(CatalogError::invalid_reference(format!(
                        "User {} is not a student.",
                        id
                    )));
                }
                None => {
                    return Err(CatalogError::invalid_reference(format!(
                        "User {} does not exist.",
                        id
                    )));
                }
            }
        }

        for id in add {
            tables.enrollments.insert((course_id, *id));
        }
        for id in remove {
            tables.enrollments.remove(&(course_id, *id));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordLookup for InMemoryCatalog {
    async fn lookup(
        &self,
        kind: RecordKind,
        key: &str,
        related: &[RecordKind],
    ) -> Result<Option<RecordAttributes>, LookupError> {
        // A key that is not an id cannot match any record
        let Ok(id) = key.trim().parse::<i64>() else {
            return Ok(None);
        };

        let tables = self.tables.read().await;
        let Some(mut record) = tables.attributes(kind, id)? else {
            return Ok(None);
        };
        tables.embed_related(&mut record, related)?;
        Ok(Some(record))
    }
}
