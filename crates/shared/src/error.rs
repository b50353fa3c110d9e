use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a print job finished without producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum PrintFailureReason {
    #[error("platform print action reported failure")]
    PlatformRejected,
    #[error("print surface refused the job content")]
    SurfaceUnavailable,
    #[error("print surface did not signal readiness in time")]
    SurfaceTimeout,
    #[error("print surface was torn down before the job completed")]
    SurfaceClosed,
    #[error("print host is unavailable")]
    HostUnavailable,
}
