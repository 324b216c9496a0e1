use crate::client::Client;

/// State shared across request handlers. Cloning is cheap; there is no
/// mutable data behind it, so requests never contend with each other.
#[derive(Clone)]
pub struct CommonState {
    pub client: Client,
}

impl CommonState {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}
