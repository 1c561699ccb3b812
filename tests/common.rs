//! Shared test helpers.

#![allow(dead_code)]

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;

use hostsync::block::{BEGIN_MARKER, END_MARKER};
use hostsync::error::SyncError;
use hostsync::fetch::RemoteSource;
use hostsync::hosts::HostsWriter;
use hostsync::platform::PrivilegeCheck;

/// Create a temp directory for use as HOSTSYNC_HOME and for hosts files.
/// Uses current dir (workspace) so sandbox allows full access.
pub fn temp_home() -> TempDir {
    tempfile::Builder::new()
        .prefix("hostsync_test_")
        .tempdir_in(std::env::current_dir().unwrap_or_else(|_| std::path::Path::new(".").into()))
        .expect("temp dir")
}

/// `lines` wrapped in the default markers, one terminator each.
pub fn block(lines: &[&str]) -> String {
    let mut s = format!("{BEGIN_MARKER}\n");
    for l in lines {
        s.push_str(l);
        s.push('\n');
    }
    s.push_str(END_MARKER);
    s.push('\n');
    s
}

/// Canned remote text; counts fetches.
pub struct StaticSource {
    text: String,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteSource for StaticSource {
    fn url(&self) -> &str {
        "test://static"
    }

    fn fetch(&self) -> Result<String, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Source that always fails like an unreachable server.
pub struct DownSource;

impl RemoteSource for DownSource {
    fn url(&self) -> &str {
        "test://down"
    }

    fn fetch(&self) -> Result<String, SyncError> {
        Err(SyncError::Fetch {
            url: self.url().to_string(),
            reason: "connection failed".to_string(),
        })
    }
}

pub struct Elevated;

impl PrivilegeCheck for Elevated {
    fn is_elevated(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn hint(&self) -> &'static str {
        "none needed"
    }
}

pub struct NotElevated;

impl PrivilegeCheck for NotElevated {
    fn is_elevated(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn hint(&self) -> &'static str {
        "re-run with sudo"
    }
}

/// Writer that refuses every write, like a full disk.
pub struct FailingWriter;

impl HostsWriter for FailingWriter {
    fn replace(&self, _path: &std::path::Path, _content: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
    }
}

/// What the fixture server answers to every request.
#[derive(Clone)]
pub struct Fixture {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Fixture {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }
}

/// Serve `fixture` on 127.0.0.1 from a background thread. Returns the URL.
/// The server lives until the test process exits.
pub fn serve(fixture: Fixture) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind fixture server");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let addr: SocketAddr = listener.local_addr().expect("local addr");

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("fixture runtime");
        rt.block_on(async move {
            let listener =
                tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let fixture = fixture.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |_req: Request<Incoming>| {
                        let fixture = fixture.clone();
                        async move {
                            if !fixture.delay.is_zero() {
                                tokio::time::sleep(fixture.delay).await;
                            }
                            let response = Response::builder()
                                .status(fixture.status)
                                .body(Full::new(Bytes::from(fixture.body)))
                                .expect("fixture response");
                            Ok::<_, Infallible>(response)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
    });

    format!("http://{addr}/hosts")
}

/// A 127.0.0.1 URL nothing is listening on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/hosts")
}

/// `hostsync` binary with an isolated home and no inherited hostsync env.
pub fn hostsync_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("hostsync").expect("hostsync binary");
    cmd.env("HOSTSYNC_HOME", home)
        .env("HOSTSYNC_SKIP_PRIVILEGE_CHECK", "1")
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env_remove("HOSTSYNC_URL")
        .env_remove("HOSTSYNC_HOSTS_FILE")
        .env_remove("HOSTSYNC_LOG");
    cmd
}
