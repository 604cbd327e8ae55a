use std::{fmt, sync::Arc};

use crate::types::ClientId;

/// Who may read or write a replicated variable.
#[derive(Clone)]
pub enum Permission {
    Everyone,
    ServerOnly,
    OwnerOnly,
    /// Called with `(client, owner)`.
    Custom(Arc<dyn Fn(ClientId, ClientId) -> bool + Send + Sync>),
}

impl Permission {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(ClientId, ClientId) -> bool + Send + Sync + 'static,
    {
        Permission::Custom(Arc::new(predicate))
    }

    pub fn allows(&self, client: ClientId, owner: ClientId) -> bool {
        match self {
            Permission::Everyone => true,
            Permission::ServerOnly => client.is_server(),
            Permission::OwnerOnly => client == owner,
            Permission::Custom(predicate) => predicate(client, owner),
        }
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Everyone => write!(f, "Everyone"),
            Permission::ServerOnly => write!(f, "ServerOnly"),
            Permission::OwnerOnly => write!(f, "OwnerOnly"),
            Permission::Custom(_) => write!(f, "Custom"),
        }
    }
}
