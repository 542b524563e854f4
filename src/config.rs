/// Runtime configuration resolved from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: String,
    pub database_url: Option<String>,
    pub amqp_url: Option<String>,
    pub jwt_secret: String,
}

impl Config {
    /// Reads configuration from the environment
    ///
    /// `DATABASE_URL` and `AMQP_URL` are optional; when unset the
    /// in-memory adapters are used instead.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT").unwrap_or_else(|_| "3000".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            amqp_url: std::env::var("AMQP_URL").ok(),
            jwt_secret: std::env::var("JWT_SECRET_KEY").unwrap_or_else(|_| "dev-secret".into()),
        }
    }
}
