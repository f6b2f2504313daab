use std::sync::RwLock;

/// Notebook servers the agent may send plans to.
///
/// Starts empty and keeps insertion order; the first registered server is the
/// one plans execute against. Registering a URL twice is a no-op.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: RwLock<Vec<String>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the URL was not registered before.
    pub fn connect(&self, url: &str) -> bool {
        let mut servers = self.servers.write().unwrap_or_else(|e| e.into_inner());
        if servers.iter().any(|s| s == url) {
            return false;
        }
        servers.push(url.to_string());
        log::info!("Registered notebook server {}", url);
        true
    }

    /// Returns true when the URL was registered.
    pub fn disconnect(&self, url: &str) -> bool {
        let mut servers = self.servers.write().unwrap_or_else(|e| e.into_inner());
        let before = servers.len();
        servers.retain(|s| s != url);
        let removed = servers.len() != before;
        if removed {
            log::info!("Removed notebook server {}", url);
        }
        removed
    }

    pub fn servers(&self) -> Vec<String> {
        self.servers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn primary(&self) -> Option<String> {
        self.servers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .first()
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn connect_is_set_like_and_ordered() {
        let registry = ServerRegistry::new();
        assert_eq!(registry.primary(), None);

        assert!(registry.connect("http://a:5001"));
        assert!(registry.connect("http://b:5001"));
        assert!(!registry.connect("http://a:5001"));

        assert_eq!(registry.servers(), vec!["http://a:5001", "http://b:5001"]);
        assert_eq!(registry.primary().as_deref(), Some("http://a:5001"));
    }

    #[test]
    fn disconnect_promotes_next_server() {
        let registry = ServerRegistry::new();
        registry.connect("http://a:5001");
        registry.connect("http://b:5001");

        assert!(registry.disconnect("http://a:5001"));
        assert!(!registry.disconnect("http://a:5001"));

        assert_eq!(registry.primary().as_deref(), Some("http://b:5001"));
    }
}
