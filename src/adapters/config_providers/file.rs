use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{
    config::{loader::load_config, models::ProxyConfig},
    ports::config_provider::{ChangeEvent, ChangeKind, ConfigProvider},
};

/// Configuration provider that loads from a local file and watches for changes.
///
/// Watches the document's parent directory and forwards typed change events
/// for paths whose file name matches the watched document. Deciding whether
/// an event warrants a reload (remove events never do) is the consumer's job.
pub struct FileConfigProvider {
    path: PathBuf,
    // We keep the watcher alive by storing it, even though we don't access it directly after init
    _watcher: Option<notify::RecommendedWatcher>,
    // The channel receiver is moved out in `watch()`, so we store the sender to clone for the watcher
    update_tx: mpsc::Sender<ChangeEvent>,
    // We store the receiver in an Option so we can take it once
    update_rx: std::sync::Mutex<Option<mpsc::Receiver<ChangeEvent>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(8);

        let mut provider = Self {
            path,
            _watcher: None,
            update_tx: tx,
            update_rx: std::sync::Mutex::new(Some(rx)),
        };

        provider.init_watcher()?;
        Ok(provider)
    }

    fn init_watcher(&mut self) -> Result<()> {
        let tx = self.update_tx.clone();
        let config_filename = self
            .path
            .file_name()
            .ok_or_else(|| eyre::eyre!("Invalid config path"))?
            .to_owned();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        let kind = if event.kind.is_create() {
                            ChangeKind::Create
                        } else if event.kind.is_modify() {
                            ChangeKind::Modify
                        } else if event.kind.is_remove() {
                            ChangeKind::Remove
                        } else {
                            return;
                        };
                        for path in event
                            .paths
                            .iter()
                            .filter(|p| p.file_name() == Some(&config_filename))
                        {
                            tracing::debug!(?kind, path = %path.display(), "Config file changed");
                            // Try to send the event, ignore if channel full or closed
                            let _ = tx.try_send(ChangeEvent {
                                kind,
                                path: path.clone(),
                            });
                        }
                    }
                    Err(e) => tracing::error!("File watch error: {:?}", e),
                }
            })?;

        let watch_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch config directory")?;

        self._watcher = Some(watcher);
        Ok(())
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<ProxyConfig> {
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid path"))?;
        load_config(path_str).await
    }

    fn watch(&self) -> mpsc::Receiver<ChangeEvent> {
        self.update_rx
            .lock()
            .expect("failed to lock update_rx mutex")
            .take()
            .expect("Watch can only be called once")
    }
}
