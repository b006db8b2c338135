use std::io::{self, Write};

use super::http_status::HttpStatus;

/// A complete response. The connection is always closed after it is sent,
/// so `Content-Length` and `Connection: close` are added on write.
#[derive(Debug)]
pub struct Response {
    status: HttpStatus,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn empty(status: HttpStatus) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: HttpStatus::Ok,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn status(&self) -> HttpStatus {
        self.status
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut head = self.status.as_response_line();
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));

        writer.write_all(head.as_bytes())?;
        writer.write_all(&self.body)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_with_headers_and_body() {
        let response = Response::ok(b"body {}".to_vec())
            .with_header("Content-Type", "text/css")
            .with_header("Cache-Control", "max-age=300");

        let mut out = Vec::new();
        response.write_to(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/css\r\n\
             Cache-Control: max-age=300\r\n\
             Content-Length: 7\r\n\
             Connection: close\r\n\
             \r\n\
             body {}"
        );
    }

    #[test]
    fn test_write_empty() {
        let mut out = Vec::new();
        Response::empty(HttpStatus::MethodNotAllowed)
            .write_to(&mut out)
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = Response::empty(HttpStatus::Ok).with_header("Content-Type", "text/html");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("Cache-Control"), None);
    }
}
