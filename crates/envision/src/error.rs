pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] envision_core::Error),

    #[error(transparent)]
    Layout(#[from] envision_layout::Error),

    #[error(transparent)]
    Render(#[from] envision_render::Error),

    #[error("unknown confirmation ticket {ticket}")]
    UnknownConfirmation { ticket: u64 },

    #[error("no tree yet; start the session with a summary first")]
    NotStarted,
}
