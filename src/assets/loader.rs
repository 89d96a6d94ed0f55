//! Background garment loading, polled from the frame loop.
//!
//! Every request gets a ticket. Only the newest ticket's outcome is handed
//! back; superseded loads run to completion and are discarded (their parse
//! result still lands in the cache).

use super::gltf_import::{parse_garment, ParsedGarment};
use super::AssetError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Resolves an opaque asset path to bytes.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError>;

    /// Directory external buffers are resolved against.
    fn base_dir(&self, _path: &str) -> Option<PathBuf> {
        None
    }
}

/// Reads assets from disk below a root directory.
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.resolve(path);
        std::fs::read(&full).map_err(|source| AssetError::Fetch {
            path: full.display().to_string(),
            source,
        })
    }

    fn base_dir(&self, path: &str) -> Option<PathBuf> {
        self.resolve(path).parent().map(Path::to_path_buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: u64,
    pub garment: String,
    pub path: String,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub request: LoadRequest,
    pub result: Result<Arc<ParsedGarment>, AssetError>,
}

type Completion = (LoadRequest, Result<Arc<ParsedGarment>, AssetError>);

pub struct GarmentLoader {
    fetcher: Arc<dyn AssetFetcher>,
    cache: HashMap<String, Arc<ParsedGarment>>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    next_ticket: u64,
    current: Option<LoadRequest>,
    in_flight: usize,
    state: LoadState,
}

impl GarmentLoader {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        let (sender, receiver) = channel();
        Self {
            fetcher,
            cache: HashMap::new(),
            sender,
            receiver,
            next_ticket: 0,
            current: None,
            in_flight: 0,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn current(&self) -> Option<&LoadRequest> {
        self.current.as_ref()
    }

    /// Loads still running, superseded ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    /// Start loading `path` for `garment`, superseding any earlier request.
    pub fn request(&mut self, garment: &str, path: &str) -> LoadRequest {
        self.next_ticket += 1;
        let request = LoadRequest {
            ticket: self.next_ticket,
            garment: garment.to_string(),
            path: path.to_string(),
        };
        if let Some(previous) = self.current.replace(request.clone()) {
            if self.state == LoadState::Loading {
                log::debug!("Load of {} superseded by {}", previous.path, path);
            }
        }
        self.state = LoadState::Loading;
        self.in_flight += 1;
        log::info!("Loading garment '{}' from {}", garment, path);

        if let Some(parsed) = self.cache.get(path) {
            // still delivered through poll so callers see one code path
            let _ = self.sender.send((request.clone(), Ok(Arc::clone(parsed))));
            return request;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let sender = self.sender.clone();
        let job = request.clone();
        thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let bytes = fetcher.fetch(&job.path)?;
                let base = fetcher.base_dir(&job.path);
                parse_garment(&bytes, &job.path, base.as_deref()).map(Arc::new)
            }))
            .unwrap_or_else(|_| {
                Err(AssetError::WorkerLost {
                    path: job.path.clone(),
                })
            });
            let _ = sender.send((job, result));
        });
        request
    }

    /// Newest finished outcome for the current request, if any. Stale
    /// completions are cached when successful and otherwise dropped.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let mut latest = None;
        while let Ok((request, result)) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if let Ok(parsed) = &result {
                self.cache
                    .entry(request.path.clone())
                    .or_insert_with(|| Arc::clone(parsed));
            }
            let is_current = self
                .current
                .as_ref()
                .map_or(false, |current| current.ticket == request.ticket);
            if !is_current {
                log::debug!(
                    "Discarding stale load of '{}' (ticket {})",
                    request.garment,
                    request.ticket
                );
                continue;
            }
            self.state = if result.is_ok() {
                LoadState::Loaded
            } else {
                LoadState::Failed
            };
            latest = Some(LoadOutcome { request, result });
        }
        latest
    }
}
