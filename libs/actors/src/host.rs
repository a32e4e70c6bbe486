//! Collaborators outside the runtime
//!
//! Content loading and the host application are consumed through two narrow
//! traits. The headless implementations here accept every request and only
//! log, which is all a server or test run needs.

use tracing::info;

/// Loads world content by map name
pub trait MapLoader {
    fn load_maps(&mut self, names: &[String]) -> anyhow::Result<()>;
}

/// Application embedding the simulation
pub trait HostApplication {
    fn request_quit(&mut self);
}

/// Map loader that accepts any map list and remembers the last one
#[derive(Debug, Default)]
pub struct StaticMapLoader {
    loaded: Vec<String>,
}

impl StaticMapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }
}

impl MapLoader for StaticMapLoader {
    fn load_maps(&mut self, names: &[String]) -> anyhow::Result<()> {
        info!("Loading maps {:?}", names);
        self.loaded = names.to_vec();
        Ok(())
    }
}

/// Host without a window or event loop
#[derive(Debug, Default)]
pub struct HeadlessHost;

impl HostApplication for HeadlessHost {
    fn request_quit(&mut self) {
        info!("Quit requested by the simulation");
    }
}
