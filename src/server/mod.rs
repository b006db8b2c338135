pub mod config;
mod handlers;
pub mod http_status;
mod request;
mod response;

use log::{debug, error, info, warn};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use threadpool::ThreadPool;

use crate::resolver::FileResolver;
use config::ServerConfig;
use handlers::{CHAT_PATH, Dispatcher};
use request::Request;
use response::Response;

pub struct HttpServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    thread_pool: Option<ThreadPool>,
    max_body_size: usize,
}

impl HttpServer {
    /// Indexes the root folder and binds the listening socket.
    pub fn new(config: &ServerConfig) -> std::io::Result<Self> {
        let root = config.root_folder();
        let resolver = FileResolver::new(root, config.cache_interval());
        if resolver.index().is_empty() {
            warn!("No files found under {:?}", resolver.root());
        } else {
            info!(
                "Serving {} files from {:?}",
                resolver.index().len(),
                resolver.root()
            );
        }

        let addr = config.address();
        let listener = TcpListener::bind(&addr)?;
        info!("Server started on {}", addr);

        if config.chat {
            info!("Chat endpoint enabled at {}", CHAT_PATH);
        }

        let thread_pool = (config.threads > 1).then(|| ThreadPool::new(config.threads));

        Ok(Self {
            listener,
            dispatcher: Arc::new(Dispatcher::new(resolver, config.chat)),
            thread_pool,
            max_body_size: config.max_body_size,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process is terminated.
    pub fn run(&self) {
        match &self.thread_pool {
            Some(pool) => info!("Server running with {} threads", pool.max_count()),
            None => info!("Server running on a single thread"),
        }

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.serve(stream),
                Err(e) => error!("Error accepting connection: {}", e),
            }
        }
    }

    fn serve(&self, mut stream: TcpStream) {
        let peer_addr = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => "unknown".to_string(),
        };
        debug!("New connection from {}", peer_addr);

        let max_body_size = self.max_body_size;
        match &self.thread_pool {
            Some(pool) => {
                let dispatcher = Arc::clone(&self.dispatcher);
                pool.execute(move || {
                    handle_connection(&dispatcher, &mut stream, max_body_size);
                    debug!("Closed connection from {}", peer_addr);
                });
            }
            None => {
                handle_connection(&self.dispatcher, &mut stream, max_body_size);
                debug!("Closed connection from {}", peer_addr);
            }
        }
    }
}

/// Reads one request from `stream`, answers it and returns. The caller
/// closes the connection by dropping the stream.
fn handle_connection<S: Read + Write>(dispatcher: &Dispatcher, stream: &mut S, max_body_size: usize) {
    let response = match Request::read_from(stream, max_body_size) {
        Ok(request) => dispatcher.dispatch(&request),
        Err(e) => match e.status() {
            Some(status) => {
                warn!("Rejecting request: {}", e);
                Response::empty(status)
            }
            None => {
                debug!("Dropping connection: {}", e);
                return;
            }
        },
    };

    match response.write_to(stream) {
        Ok(()) if response.status().is_success() => {
            debug!("Responded {} with {} body bytes", response.status(), response.body().len())
        }
        Ok(()) => debug!("Responded {}", response.status()),
        Err(e) => error!("Error sending response: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DEFAULT_CACHE_INTERVAL;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    /// Sends `raw` over a real socket and returns everything the server wrote.
    fn exchange(dispatcher: &Dispatcher, raw: &[u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let raw = raw.to_vec();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&raw).unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).unwrap();
            String::from_utf8_lossy(&response).into_owned()
        });

        let (mut stream, _) = listener.accept().unwrap();
        handle_connection(dispatcher, &mut stream, 64);
        drop(stream);

        client.join().unwrap()
    }

    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<p>hi</p>").unwrap();
        fs::write(temp.path().join("style.css"), "p {}").unwrap();
        temp
    }

    #[test]
    fn test_serves_file_over_tcp() {
        let temp = site();
        let dispatcher = Dispatcher::new(FileResolver::new(temp.path(), DEFAULT_CACHE_INTERVAL), false);

        let response = exchange(&dispatcher, b"GET /style.css HTTP/1.1\r\nHost: localhost\r\n\r\n");

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/css\r\n"));
        assert!(response.contains("Cache-Control: max-age=300\r\n"));
        assert!(response.contains("Content-Length: 4\r\n"));
        assert!(response.ends_with("\r\n\r\np {}"));
    }

    #[test]
    fn test_root_path_over_tcp() {
        let temp = site();
        let dispatcher = Dispatcher::new(FileResolver::new(temp.path(), DEFAULT_CACHE_INTERVAL), false);

        let response = exchange(&dispatcher, b"GET / HTTP/1.1\r\n\r\n");

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/html\r\n"));
        assert!(response.ends_with("<p>hi</p>"));
    }

    #[test]
    fn test_chat_over_tcp() {
        let temp = site();
        let dispatcher = Dispatcher::new(FileResolver::new(temp.path(), DEFAULT_CACHE_INTERVAL), true);

        let response = exchange(&dispatcher, b"POST /chat HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Length: 0\r\n"));

        let response = exchange(&dispatcher, b"GET /chat HTTP/1.1\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[test]
    fn test_bad_requests_over_tcp() {
        let temp = site();
        let dispatcher = Dispatcher::new(FileResolver::new(temp.path(), DEFAULT_CACHE_INTERVAL), true);

        let response = exchange(&dispatcher, b"NONSENSE\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        let response = exchange(&dispatcher, b"POST /chat HTTP/1.1\r\nContent-Length: 100\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[test]
    fn test_new_binds_and_indexes() {
        let temp = site();
        let config = ServerConfig {
            root_folder: Some(temp.path().to_path_buf()),
            host: "127.0.0.1".to_string(),
            port: Some(0),
            ..ServerConfig::default()
        };

        let server = HttpServer::new(&config).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert!(server.thread_pool.is_none());

        let response = exchange(&server.dispatcher, b"GET /index.html HTTP/1.1\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_new_fails_when_port_taken() {
        let temp = site();
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            root_folder: Some(temp.path().to_path_buf()),
            host: "127.0.0.1".to_string(),
            port: Some(taken.local_addr().unwrap().port()),
            ..ServerConfig::default()
        };

        assert!(HttpServer::new(&config).is_err());
    }
}
