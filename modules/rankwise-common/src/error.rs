use thiserror::Error;
use uuid::Uuid;

use crate::types::ChangeStatus;

#[derive(Error, Debug)]
pub enum RankwiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Change {id} has already been processed (status: {status})")]
    Conflict { id: Uuid, status: ChangeStatus },

    #[error("Not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
