//! Client identity.

use std::fmt;

/// A client visiting the shop.
///
/// Deliberately not `Clone`: a client is consumed by exactly one visit, and the
/// operations that report completion take it by value.
#[derive(Debug, PartialEq, Eq)]
pub struct Client {
    name: String,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build `count` clients named `client-1` through `client-<count>`.
    pub fn numbered(count: usize) -> Vec<Client> {
        (1..=count).map(|i| Client::new(format!("client-{i}"))).collect()
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
