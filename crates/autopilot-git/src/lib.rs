pub mod gateway;
pub mod mock;
pub mod outcome;
pub mod repo;
pub mod status;

pub use gateway::{GitCli, GitOutput, RepositoryGateway};
pub use mock::ScriptedGateway;
pub use outcome::{classify, classify_push, Outcome};
pub use repo::{discover_root, GitOps, NON_INTERACTIVE_ENV};
pub use status::parse_porcelain;
