use log::{error, info};
use std::fs;
use std::sync::{Mutex, PoisonError};

use super::http_status::HttpStatus;
use super::request::Request;
use super::response::Response;
use crate::resolver::{mime, FileResolver};

pub const CHAT_PATH: &str = "/chat";
const CACHE_CONTROL: &str = "max-age=300";

/// Routes requests to the file resolver or to the chat echo endpoint.
///
/// The resolver sits behind a mutex so that a pool of workers can share it;
/// with a single worker the lock is never contended.
pub struct Dispatcher {
    resolver: Mutex<FileResolver>,
    chat_enabled: bool,
}

impl Dispatcher {
    pub fn new(resolver: FileResolver, chat_enabled: bool) -> Self {
        Self {
            resolver: Mutex::new(resolver),
            chat_enabled,
        }
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        let path = request.path();
        info!("{} request for: {}", request.method(), path);

        if self.chat_enabled && is_chat_path(&path) {
            return handle_chat(request, &path);
        }

        match request.method() {
            "GET" => self.handle_file(&path),
            _ => Response::empty(HttpStatus::MethodNotAllowed),
        }
    }

    fn handle_file(&self, path: &str) -> Response {
        let requested = if path.ends_with('/') {
            format!("{}index.html", path)
        } else {
            path.to_string()
        };

        let Some(file) = self.with_resolver(|resolver| resolver.resolve(&requested)) else {
            info!("File not found: {}", requested);
            return Response::empty(HttpStatus::NotFound);
        };

        match fs::read(&file) {
            Ok(contents) => {
                info!("Sending file: {:?} ({} bytes)", file, contents.len());
                Response::ok(contents)
                    .with_header("Content-Type", mime::content_type(&file))
                    .with_header("Cache-Control", CACHE_CONTROL)
            }
            Err(e) => {
                error!("Error reading file {:?}: {}", file, e);
                self.with_resolver(FileResolver::rebuild);
                Response::empty(HttpStatus::InternalServerError)
            }
        }
    }

    fn with_resolver<T>(&self, f: impl FnOnce(&mut FileResolver) -> T) -> T {
        let mut resolver = self.resolver.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut resolver)
    }
}

/// `/chat` and everything below it belongs to the chat endpoint, so that
/// `/chat/...` never falls through to file serving.
fn is_chat_path(path: &str) -> bool {
    path.strip_prefix(CHAT_PATH)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn handle_chat(request: &Request, path: &str) -> Response {
    if request.method() != "POST" || path != CHAT_PATH {
        return Response::empty(HttpStatus::MethodNotAllowed);
    }

    let statement = String::from_utf8_lossy(request.body());
    info!("User said: {}", statement);
    Response::empty(HttpStatus::Ok)
}
