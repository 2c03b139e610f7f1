use crate::domain::AppState;
use crate::domain::payment_provider::PaymentSettings;
use crate::infrastructure::persistence::PostgresRepository;

pub mod http;
pub mod persistence;
pub mod settings;

#[derive(Clone)]
pub struct AppStateImpl {
    repository: PostgresRepository,
    payment_settings: PaymentSettings,
    identity_header: String,
}

impl AppStateImpl {
    pub fn new(
        repository: PostgresRepository,
        payment_settings: PaymentSettings,
        identity_header: String,
    ) -> Self {
        Self {
            repository,
            payment_settings,
            identity_header,
        }
    }
}

impl AppState for AppStateImpl {
    type C = PostgresRepository;
    type E = PostgresRepository;
    type P = PostgresRepository;
    type N = PostgresRepository;
    type U = PostgresRepository;

    fn courses(&self) -> &Self::C {
        &self.repository
    }

    fn enrollments(&self) -> &Self::E {
        &self.repository
    }

    fn progress(&self) -> &Self::P {
        &self.repository
    }

    fn notifications(&self) -> &Self::N {
        &self.repository
    }

    fn users(&self) -> &Self::U {
        &self.repository
    }

    fn payment_settings(&self) -> &PaymentSettings {
        &self.payment_settings
    }

    fn identity_header(&self) -> &str {
        &self.identity_header
    }
}
