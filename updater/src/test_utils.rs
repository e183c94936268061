//! Shared test utilities for the updater crate.
//!
//! Builders for zip archives, daily client archives, and installation roots,
//! plus a scripted [`HttpTransport`] so sources can be exercised offline.

use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use crate::artefact::download::{DownloadError, HttpRequest, HttpTransport};

/// Creates a temporary directory and returns it with its UTF-8 path.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
pub fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp dir");
    (dir, path)
}

/// Writes a zip archive at `path` holding the given entries.
///
/// Entries are stored uncompressed so that [`corrupt_first_entry`] can damage
/// payload bytes predictably. Names ending in `/` become directory entries.
///
/// # Panics
///
/// Panics on any I/O or zip error.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create zip");
    let mut writer = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add directory");
        } else {
            writer.start_file(*name, options).expect("start entry");
            writer.write_all(contents).expect("write entry");
        }
    }
    writer.finish().expect("finish zip");
}

/// Flips the first payload byte of the first entry in a zip archive.
///
/// The central directory stays readable, so the damage only shows when the
/// entry is decompressed and its CRC checked.
///
/// # Panics
///
/// Panics if the file is not a zip archive with a non-empty first entry.
pub fn corrupt_first_entry(path: &Path) {
    let mut bytes = fs::read(path).expect("read zip");
    assert_eq!(bytes.get(..4), Some(&b"PK\x03\x04"[..]), "not a zip local header");
    let name_len = usize::from(u16::from_le_bytes([bytes[26], bytes[27]]));
    let extra_len = usize::from(u16::from_le_bytes([bytes[28], bytes[29]]));
    let offset = 30 + name_len + extra_len;
    bytes[offset] ^= 0xFF;
    fs::write(path, bytes).expect("write corrupted zip");
}

/// Entries of a minimal daily client tree, relative to the archive root.
pub const CLIENT_TREE_ENTRIES: &[(&str, &[u8])] = &[
    ("GT New Horizons daily/mmc-pack.json", b"{\"components\": [\"new\"]}"),
    ("GT New Horizons daily/libraries/lwjgl3ify.jar", b"new library"),
    ("GT New Horizons daily/patches/net.minecraft.json", b"{\"patch\": \"new\"}"),
    ("GT New Horizons daily/.minecraft/config/GregTech.cfg", b"new config"),
    ("GT New Horizons daily/.minecraft/mods/GT5-Unofficial.jar", b"new mod"),
];

/// Writes a daily client archive at `path`.
///
/// When `nested` is true the client tree is wrapped in an inner
/// `gtnh-daily-mmcprism.zip`, the way CI artifacts are packaged.
///
/// # Panics
///
/// Panics on any I/O or zip error.
pub fn write_client_archive(path: &Path, nested: bool) {
    if !nested {
        write_zip(path, CLIENT_TREE_ENTRIES);
        return;
    }
    let inner_dir = tempfile::tempdir().expect("create inner dir");
    let inner = inner_dir.path().join("gtnh-daily-mmcprism.zip");
    write_zip(&inner, CLIENT_TREE_ENTRIES);
    let inner_bytes = fs::read(&inner).expect("read inner zip");
    write_zip(path, &[("gtnh-daily-mmcprism.zip", inner_bytes.as_slice())]);
}

/// Writes `contents` to `root/relative`, creating parent directories.
///
/// # Panics
///
/// Panics on any I/O error.
pub fn write_file(root: &Utf8Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

/// Builds a previously-launched installation root at `root`.
///
/// Besides the five replaceable paths it holds player data that an install
/// must leave alone, and one empty directory.
///
/// # Panics
///
/// Panics on any I/O error.
pub fn build_instance(root: &Utf8Path) {
    write_file(root, "mmc-pack.json", b"{\"components\": [\"old\"]}");
    write_file(root, "instance.cfg", b"name=GTNH daily");
    write_file(root, "libraries/lwjgl3ify.jar", b"old library");
    write_file(root, "patches/net.minecraft.json", b"{\"patch\": \"old\"}");
    write_file(root, ".minecraft/config/GregTech.cfg", b"old config");
    write_file(root, ".minecraft/mods/GT5-Unofficial.jar", b"old mod");
    write_file(root, ".minecraft/mods/old-only.jar", b"removed upstream");
    write_file(root, ".minecraft/saves/world/level.dat", b"precious world");
    fs::create_dir_all(root.join(".minecraft/screenshots")).expect("create empty dir");
}

/// Captures every file and directory under `root`.
///
/// Keys are `/`-separated paths relative to `root`; directories end in `/`
/// and map to an empty value.
///
/// # Panics
///
/// Panics on any I/O error or non-UTF-8 path.
pub fn snapshot_tree(root: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
    let mut snapshot = BTreeMap::new();
    collect_tree(root, root, &mut snapshot);
    snapshot
}

fn collect_tree(root: &Utf8Path, dir: &Utf8Path, out: &mut BTreeMap<String, Vec<u8>>) {
    for entry in dir.read_dir_utf8().expect("read dir") {
        let entry = entry.expect("dir entry");
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .expect("entry under root")
            .as_str()
            .replace('\\', "/");
        if entry.file_type().expect("file type").is_dir() {
            out.insert(format!("{relative}/"), Vec::new());
            collect_tree(root, path, out);
        } else {
            out.insert(relative, fs::read(path).expect("read file"));
        }
    }
}

/// Scripted reply for one URL on a [`StubTransport`].
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// A 200 response carrying these bytes.
    Body(Vec<u8>),
    /// A non-success status.
    Status(u16),
    /// A transport failure before any response.
    Fail(String),
}

/// A stub implementation of [`HttpTransport`] for testing.
///
/// Replies are keyed by URL and may be reused. Unscripted URLs fail with a
/// transport error. Every request is recorded.
#[derive(Debug, Default)]
pub struct StubTransport {
    heads: HashMap<String, u16>,
    gets: HashMap<String, StubResponse>,
    log: RefCell<Vec<(&'static str, HttpRequest)>>,
}

impl StubTransport {
    /// Creates a transport with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the status returned by `HEAD url`.
    #[must_use]
    pub fn on_head(mut self, url: &str, status: u16) -> Self {
        self.heads.insert(url.to_owned(), status);
        self
    }

    /// Scripts the reply to `GET url`.
    #[must_use]
    pub fn on_get(mut self, url: &str, response: StubResponse) -> Self {
        self.gets.insert(url.to_owned(), response);
        self
    }

    /// Returns `"METHOD url"` for every request, in order.
    pub fn calls(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .map(|(method, request)| format!("{method} {}", request.url))
            .collect()
    }

    /// Returns every request, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log
            .borrow()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    fn record(&self, method: &'static str, request: &HttpRequest) {
        self.log.borrow_mut().push((method, request.clone()));
    }

    fn reply(&self, request: &HttpRequest) -> Result<Vec<u8>, DownloadError> {
        match self.gets.get(&request.url) {
            Some(StubResponse::Body(body)) => Ok(body.clone()),
            Some(StubResponse::Status(status)) => Err(DownloadError::Status {
                url: request.url.clone(),
                status: *status,
            }),
            Some(StubResponse::Fail(reason)) => Err(DownloadError::HttpError {
                url: request.url.clone(),
                reason: reason.clone(),
            }),
            None => Err(DownloadError::HttpError {
                url: request.url.clone(),
                reason: "no scripted response".to_owned(),
            }),
        }
    }
}

impl HttpTransport for StubTransport {
    fn head(&self, request: &HttpRequest) -> Result<u16, DownloadError> {
        self.record("HEAD", request);
        self.heads
            .get(&request.url)
            .copied()
            .ok_or_else(|| DownloadError::HttpError {
                url: request.url.clone(),
                reason: "no scripted response".to_owned(),
            })
    }

    fn get_text(&self, request: &HttpRequest) -> Result<String, DownloadError> {
        self.record("GET", request);
        let body = self.reply(request)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn download_to_file(&self, request: &HttpRequest, dest: &Path) -> Result<u64, DownloadError> {
        self.record("GET", request);
        let body = self.reply(request)?;
        fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }
}
