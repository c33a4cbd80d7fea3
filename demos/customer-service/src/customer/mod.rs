pub mod aggregate;
pub mod command;
pub mod errors;
pub mod events;
pub mod welcome_email;

pub use aggregate::Customer;
pub use command::{CreateCustomer, UpdateCustomer};
pub use welcome_email::{EmailGateway, LoggingEmailGateway, SendWelcomeEmail, SendWelcomeEmailHandler};
