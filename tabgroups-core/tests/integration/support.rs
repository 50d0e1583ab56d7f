//! Session fixtures over the in-memory host

use std::sync::Arc;

use tabgroups_core::{HostPorts, InMemoryHost, MemoryStorage, Settings, StorageAdapter, TabGroups};

/// Host, storage and engine of one test session
pub struct Session {
    pub host: Arc<InMemoryHost>,
    pub storage: Arc<MemoryStorage>,
    pub app: TabGroups,
}

/// Engine over an existing host and storage, not started
pub fn engine(host: &Arc<InMemoryHost>, storage: &Arc<MemoryStorage>) -> TabGroups {
    let storage = Arc::clone(storage) as Arc<dyn StorageAdapter>;
    TabGroups::new(HostPorts::in_memory(host, storage), Settings::default())
}

/// Started session with one window holding the given urls
pub async fn started(urls: &[&str]) -> Session {
    let host = Arc::new(InMemoryHost::new());
    let window = host.seed_window();
    for url in urls {
        host.seed_tab(window, url);
    }
    let storage = Arc::new(MemoryStorage::new());
    let app = engine(&host, &storage);
    app.init().await.expect("startup");
    Session { host, storage, app }
}
