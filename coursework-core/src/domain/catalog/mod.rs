//! Catalog domain: users, courses, assignments, submissions and enrollments

pub mod entities;
pub mod errors;
pub mod lookup;
pub mod repositories;

pub use entities::{
    Assignment, AssignmentChanges, Course, CourseChanges, NewAssignment, NewCourse, NewSubmission,
    NewUser, Submission, User,
};
pub use errors::CatalogError;
pub use lookup::{LookupError, RecordAttributes, RecordKind, RecordLookup};
pub use repositories::{
    Catalog, IAssignmentRepository, ICourseRepository, IEnrollmentRepository,
    ISubmissionRepository, IUserRepository,
};
