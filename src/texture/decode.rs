//! Image sources for image decals, decoded off the frame thread.

use base64::Engine as _;
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed data URI")]
    MalformedDataUri,
    #[error("data URI is not base64 encoded")]
    UnsupportedDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to read image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("decode worker stopped before finishing")]
    WorkerLost,
}

/// Opaque encoded-bitmap source handed in by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    DataUri(String),
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl ImageSource {
    /// `data:` strings are data URIs, anything else is a file path.
    pub fn parse(value: &str) -> Self {
        if value.trim_start().starts_with("data:") {
            Self::DataUri(value.trim().to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    pub fn encoded_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        match self {
            Self::DataUri(uri) => decode_data_uri(uri),
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Path(path) => std::fs::read(path).map_err(|source| DecodeError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, DecodeError> {
    let rest = uri.strip_prefix("data:").ok_or(DecodeError::MalformedDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DecodeError::MalformedDataUri)?;
    if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(DecodeError::UnsupportedDataUri);
    }
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

pub fn source_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub source_hash: String,
    pub image: Arc<RgbaImage>,
}

/// Decoded pixels keyed by SHA-256 of the encoded bytes. Entries only live as
/// long as some consumer still holds the pixels.
pub type DecodeCache = Arc<Mutex<HashMap<String, Weak<RgbaImage>>>>;

pub fn decode_image(source: &ImageSource, cache: &DecodeCache) -> Result<DecodedImage, DecodeError> {
    let bytes = source.encoded_bytes()?;
    let hash = source_hash(&bytes);
    if let Some(image) = cache
        .lock()
        .ok()
        .and_then(|map| map.get(&hash).and_then(Weak::upgrade))
    {
        log::debug!("Image decode cache hit {}", &hash[..12]);
        return Ok(DecodedImage {
            source_hash: hash,
            image,
        });
    }
    let image = Arc::new(image::load_from_memory(&bytes)?.to_rgba8());
    if let Ok(mut map) = cache.lock() {
        map.retain(|_, cached| cached.strong_count() > 0);
        map.insert(hash.clone(), Arc::downgrade(&image));
    }
    Ok(DecodedImage {
        source_hash: hash,
        image,
    })
}

/// Ticketed background decodes, polled from the frame loop.
pub struct DecodeQueue {
    sender: Sender<(u64, Result<DecodedImage, DecodeError>)>,
    receiver: Receiver<(u64, Result<DecodedImage, DecodeError>)>,
    cache: DecodeCache,
    next_ticket: u64,
    pending: usize,
}

impl DecodeQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            cache: DecodeCache::default(),
            next_ticket: 0,
            pending: 0,
        }
    }

    pub fn submit(&mut self, source: ImageSource) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let sender = self.sender.clone();
        let cache = Arc::clone(&self.cache);
        self.pending += 1;
        thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                decode_image(&source, &cache)
            }))
            .unwrap_or(Err(DecodeError::WorkerLost));
            let _ = sender.send((ticket, result));
        });
        ticket
    }

    /// Completed decodes in completion order.
    pub fn poll(&mut self) -> Vec<(u64, Result<DecodedImage, DecodeError>)> {
        let done: Vec<_> = self.receiver.try_iter().collect();
        self.pending = self.pending.saturating_sub(done.len());
        done
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Cached images some consumer still holds.
    #[cfg(test)]
    pub(crate) fn live_cached(&self) -> usize {
        self.cache
            .lock()
            .map(|map| map.values().filter(|cached| cached.strong_count() > 0).count())
            .unwrap_or(0)
    }
}

impl Default for DecodeQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    pub(crate) fn png_data_uri(width: u32, height: u32, rgba: [u8; 4]) -> String {
        let image = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn wait_for(queue: &mut DecodeQueue) -> Vec<(u64, Result<DecodedImage, DecodeError>)> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while queue.pending() > 0 && Instant::now() < deadline {
            out.extend(queue.poll());
            std::thread::sleep(Duration::from_millis(2));
        }
        out
    }

    #[test]
    fn data_uri_round_trip() {
        let uri = png_data_uri(4, 3, [10, 20, 30, 255]);
        let cache = DecodeCache::default();
        let decoded = decode_image(&ImageSource::parse(&uri), &cache).unwrap();
        assert_eq!(decoded.image.dimensions(), (4, 3));
        assert_eq!(decoded.image.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(decoded.source_hash.len(), 64);
    }

    #[test]
    fn rejects_bad_sources() {
        assert!(matches!(
            decode_data_uri("data:image/png,rawbytes"),
            Err(DecodeError::UnsupportedDataUri)
        ));
        assert!(matches!(decode_data_uri("data:nocomma"), Err(DecodeError::MalformedDataUri)));
        let cache = DecodeCache::default();
        let garbage = ImageSource::Bytes(b"definitely not a png".to_vec());
        assert!(matches!(decode_image(&garbage, &cache), Err(DecodeError::Image(_))));
    }

    #[test]
    fn identical_sources_share_decoded_pixels() {
        let uri = png_data_uri(2, 2, [1, 2, 3, 255]);
        let cache = DecodeCache::default();
        let a = decode_image(&ImageSource::parse(&uri), &cache).unwrap();
        let b = decode_image(&ImageSource::parse(&uri), &cache).unwrap();
        assert!(Arc::ptr_eq(&a.image, &b.image));
    }

    #[test]
    fn cache_lets_go_once_every_consumer_drops() {
        let mut queue = DecodeQueue::new();
        queue.submit(ImageSource::parse(&png_data_uri(64, 64, [9, 9, 9, 255])));
        let results = wait_for(&mut queue);
        assert_eq!(results.len(), 1);
        assert_eq!(queue.live_cached(), 1);
        drop(results);
        assert_eq!(queue.live_cached(), 0);

        queue.submit(ImageSource::parse(&png_data_uri(2, 2, [1, 1, 1, 255])));
        let _kept = wait_for(&mut queue);
        let map = queue.cache.lock().unwrap();
        assert_eq!(map.len(), 1, "dead entries are pruned on insert");
    }

    #[test]
    fn queue_reports_every_submission() {
        let mut queue = DecodeQueue::new();
        let good = queue.submit(ImageSource::parse(&png_data_uri(2, 2, [0, 0, 0, 255])));
        let bad = queue.submit(ImageSource::Bytes(vec![0, 1, 2]));
        let results = wait_for(&mut queue);
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|(t, r)| *t == good && r.is_ok()));
        assert!(results.iter().any(|(t, r)| *t == bad && r.is_err()));
        assert_eq!(queue.pending(), 0);
    }
}
