//! The async boundary of formwork: the fetch provider contract, a reqwest
//! reference implementation, the remote URL allowlist, and option selection
//! from fetched responses.

pub mod options;
pub mod provider;
pub mod remote;

pub use options::{fetch_options, select_options};
pub use provider::{FetchProvider, HttpFetchProvider};
pub use remote::{is_fetchable, match_remote_pattern};
