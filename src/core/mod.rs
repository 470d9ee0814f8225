pub mod chunker;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod manifest;
pub mod orchestrator;
pub mod planner;
pub mod space;
pub mod transport;

pub use chunker::Part;
pub use error::PipelineError;
pub use fingerprint::Digest;
pub use manifest::{ArtifactRecord, Manifest};
pub use orchestrator::{Orchestrator, RunReport, UploadFailure};
pub use planner::{TransferItem, TransferMode};
pub use space::{CapacityProvider, SpaceCheck, StatvfsCapacity};
pub use transport::{HttpTransport, RemoteTarget, Transport};
