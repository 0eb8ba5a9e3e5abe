use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown strategy id '{0}'")]
    UnknownStrategy(String),

    #[error("Unknown reason tag '{0}'")]
    UnknownReasonTag(String),
}
