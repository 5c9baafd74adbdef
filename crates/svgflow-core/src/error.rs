pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid rules YAML: {message}")]
    InvalidRulesYaml { message: String },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Failed to serialize rules: {message}")]
    SerializeRules { message: String },
}
