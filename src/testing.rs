//! Test doubles shared by the scraper tests.

use crate::error::ScrapeError;
use crate::http::HttpClient;
use crate::models::HttpResponse;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Serves canned responses by exact URL and records every request.
///
/// Unknown URLs fail with a transport error, like an unresolvable host.
#[derive(Debug, Default)]
pub struct FakeClient {
    routes: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), (status, body.into()));
        self
    }

    /// URLs requested so far, GETs and POSTs alike.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.posts.lock().unwrap().clone()
    }

    fn respond(&self, url: &str) -> Result<HttpResponse, ScrapeError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some((status, body)) => Ok(HttpResponse {
                url: url.to_string(),
                status: *status,
                body: body.clone(),
            }),
            None => Err(ScrapeError::Transport {
                url: url.to_string(),
                reason: "no route".to_string(),
            }),
        }
    }
}

impl HttpClient for FakeClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ScrapeError> {
        self.respond(url)
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, ScrapeError> {
        self.posts.lock().unwrap().push((
            url.to_string(),
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self.respond(url)
    }
}

/// Build an in-memory zip holding `members`.
pub fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Collects formatted log lines so tests can assert on operator output.
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route INFO and above on this thread into a fresh capture until the
    /// guard is dropped.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        (capture, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
