pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tree has no root node")]
    MissingRoot,

    #[error(transparent)]
    Core(#[from] envision_core::Error),
}
