pub mod classifier;
pub mod mailer;
pub mod notifier;

pub use classifier::classify;
pub use mailer::{Mailer, SmtpMailer};
pub use notifier::Notifier;
