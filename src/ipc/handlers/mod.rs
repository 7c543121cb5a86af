pub mod assignments;
pub mod attendance;
pub mod backup;
pub mod classes;
pub mod core;
pub mod dashboard;
pub mod exams;
pub mod grades;
pub mod profile;
pub mod setup;
pub mod subjects;
