//! Where a finished animation goes: a local file or a transport that uploads it.

use std::{
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, info};
use reqwest::blocking::multipart::{Form, Part};

pub const DEFAULT_FILE_NAME: &str = "animation.png";

/// Writes the animation to `path`, or to [`DEFAULT_FILE_NAME`] in the working directory.
pub async fn save_as_file(apng: &[u8], path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_FILE_NAME), Path::to_path_buf);
    let target: async_std::path::PathBuf = path.clone().into();
    async_std::fs::write(&target, apng)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} bytes to {}", apng.len(), path.display());
    Ok(path)
}

/// Reports upload progress as a fraction in `[0, 1]`.
pub type Progress = Box<dyn FnMut(f64) + Send>;

/// Delivers an [`Upload`] somewhere.
///
/// Returning `Ok` is the success signal; any error is the failure signal.
pub trait Transport {
    fn send(&mut self, upload: &Upload, progress: Progress) -> anyhow::Result<()>;
}

/// A form upload carrying the animation under `field_name`, plus any extra named fields.
pub struct Upload<'a> {
    pub field_name: String,
    pub file_name: String,
    pub fields: Vec<(String, String)>,
    pub apng: &'a [u8],
}

impl<'a> Upload<'a> {
    pub fn new(field_name: impl Into<String>, apng: &'a [u8]) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: DEFAULT_FILE_NAME.to_owned(),
            fields: vec![],
            apng,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn send<T: Transport>(
        &self,
        transport: &mut T,
        progress: impl FnMut(f64) + Send + 'static,
    ) -> anyhow::Result<()> {
        debug!(
            "Uploading {} bytes as {} with {} extra fields",
            self.apng.len(),
            self.field_name,
            self.fields.len()
        );
        transport
            .send(self, Box::new(progress))
            .context("Upload failed")
    }
}

/// POSTs uploads as `multipart/form-data`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, upload: &Upload, progress: Progress) -> anyhow::Result<()> {
        let total = upload.apng.len() as u64;
        let body = ProgressReader {
            inner: Cursor::new(upload.apng.to_vec()),
            read: 0,
            total,
            progress,
        };
        let file = Part::reader_with_length(body, total)
            .file_name(upload.file_name.clone())
            .mime_str("image/png")?;
        let mut form = Form::new().part(upload.field_name.clone(), file);
        for (name, value) in &upload.fields {
            form = form.text(name.clone(), value.clone());
        }

        let response = self
            .client
            .post(self.url.as_str())
            .multipart(form)
            .send()?
            .error_for_status()?;
        info!("Uploaded {total} bytes to {}: {}", self.url, response.status());
        Ok(())
    }
}

/// Counts the bytes handed to the request body.
struct ProgressReader<R> {
    inner: R,
    read: u64,
    total: u64,
    progress: Progress,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.read += n as u64;
            (self.progress)(self.read as f64 / self.total as f64);
        }
        Ok(n)
    }
}
