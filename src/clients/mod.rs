pub mod chsi_client;

pub use chsi_client::{ChsiClient, RemoteSession};
