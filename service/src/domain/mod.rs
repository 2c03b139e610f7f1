use crate::domain::payment_provider::PaymentSettings;
use crate::domain::repository::{
    CourseRepository, EnrollmentStore, NotificationRepository, ProgressRepository, UserRepository,
};

pub mod course;
pub mod enrollment;
pub mod identity;
pub mod ids;
pub mod notification;
pub mod payment_provider;
pub mod progress;
pub mod repository;
pub mod user;

#[cfg(test)]
pub mod test_utils;

/// The global application state shared between all request handlers.
pub trait AppState: Clone + Send + Sync + 'static {
    type C: CourseRepository;
    type E: EnrollmentStore;
    type P: ProgressRepository;
    type N: NotificationRepository;
    type U: UserRepository;

    fn courses(&self) -> &Self::C;
    fn enrollments(&self) -> &Self::E;
    fn progress(&self) -> &Self::P;
    fn notifications(&self) -> &Self::N;
    fn users(&self) -> &Self::U;
    fn payment_settings(&self) -> &PaymentSettings;
    /// Name of the header carrying the authenticated user id
    fn identity_header(&self) -> &str;
}
