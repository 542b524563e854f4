pub mod mailer;

#[allow(unused_imports)]
pub use mailer::Mailer;
