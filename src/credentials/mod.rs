//! Credential resolution for the backing store.

mod resolver;

pub use resolver::{CredentialsProvider, EnvCredentialsResolver, KEY_FILE_NAME};
