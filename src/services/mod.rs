pub mod auth_service;
pub use auth_service::{AuthError, AuthService, RegisterInput};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod mailer;
pub use mailer::{ConsoleMailer, Mailer};

pub mod token;
pub use token::{Claims, TokenPair, TokenService};
