//! Request dispatch: translate free text, execute it against a
//! [`DocumentStore`](parley_store::DocumentStore), and render the outcome.

mod config;
mod dispatcher;
mod error;
mod outcome;
mod request;

pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, MutationMode};
pub use error::DispatchError;
pub use outcome::{Outcome, render};
pub use request::StoreRequest;
