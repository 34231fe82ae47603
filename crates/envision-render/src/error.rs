use envision_core::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("draw trigger `{id}` is not part of the visible tree")]
    UnknownTrigger { id: NodeId },
}
