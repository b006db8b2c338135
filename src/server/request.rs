use log::debug;
use percent_encoding::percent_decode_str;
use std::fmt::Display;
use std::io::{self, BufRead, BufReader, Cursor, Read};

use super::http_status::HttpStatus;

const MAX_HEAD_SIZE: usize = 16 * 1024;

#[derive(Debug)]
pub enum ParseRequestError {
    /// The peer closed the connection before sending a full request head.
    Closed,
    Encoding,
    Request,
    Protocol,
    BodyTooLarge(usize),
    Network(io::Error),
}

impl ParseRequestError {
    /// Status to answer with, if the connection is still worth answering.
    pub fn status(&self) -> Option<HttpStatus> {
        match self {
            Self::Closed | Self::Network(_) => None,
            Self::BodyTooLarge(_) => Some(HttpStatus::PayloadTooLarge),
            Self::Encoding | Self::Request | Self::Protocol => Some(HttpStatus::BadRequest),
        }
    }
}

impl From<io::Error> for ParseRequestError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Closed
        } else {
            Self::Network(e)
        }
    }
}

impl Display for ParseRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "connection closed mid-request"),
            Self::Encoding => write!(f, "request head is not valid UTF-8"),
            Self::Request => write!(f, "malformed request"),
            Self::Protocol => write!(f, "unsupported protocol"),
            Self::BodyTooLarge(len) => write!(f, "request body of {} bytes is too large", len),
            Self::Network(e) => write!(f, "network I/O error: {}", e),
        }
    }
}

#[derive(Debug)]
pub struct Request {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    /// Reads one request: the head up to the first blank line, then the body,
    /// either `Content-Length` bytes of it or a chunked stream.
    pub fn read_from<R: Read>(reader: &mut R, max_body_size: usize) -> Result<Self, ParseRequestError> {
        let mut buffer = Vec::with_capacity(8192);
        let mut chunk = [0u8; 8192];

        let (head_len, body_start) = loop {
            if let Some(found) = find_head_end(&buffer) {
                break found;
            }
            if buffer.len() > MAX_HEAD_SIZE {
                return Err(ParseRequestError::Request);
            }
            match reader.read(&mut chunk) {
                Ok(0) => return Err(ParseRequestError::Closed),
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let head = std::str::from_utf8(&buffer[..head_len]).map_err(|_| ParseRequestError::Encoding)?;
        let mut request = Self::parse_head(head)?;

        let leftover = buffer.split_off(body_start);
        let body = match request.header("Transfer-Encoding") {
            Some(coding) if coding.eq_ignore_ascii_case("chunked") => {
                let mut rest = BufReader::new(Cursor::new(leftover).chain(reader));
                read_chunked_body(&mut rest, max_body_size)?
            }
            Some(_) => return Err(ParseRequestError::Request),
            None => read_sized_body(&request, leftover, reader, max_body_size)?,
        };
        request.body = body;

        debug!(
            "Parsed {} {} ({} headers, {} body bytes)",
            request.method,
            request.target,
            request.headers.len(),
            request.body.len()
        );
        Ok(request)
    }

    fn parse_head(head: &str) -> Result<Self, ParseRequestError> {
        let mut lines = head.lines();
        let request_line = lines.next().ok_or(ParseRequestError::Request)?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let [method, target, protocol] = parts[..] else {
            return Err(ParseRequestError::Request);
        };
        if !protocol.starts_with("HTTP/1.") {
            return Err(ParseRequestError::Protocol);
        }
        if !target.starts_with('/') {
            return Err(ParseRequestError::Request);
        }

        let headers = lines
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.split_once(':')
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                    .ok_or(ParseRequestError::Request)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            headers,
            body: Vec::new(),
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The decoded path of the request target, without query or fragment.
    pub fn path(&self) -> String {
        let end = self.target.find(['?', '#']).unwrap_or(self.target.len());
        percent_decode_str(&self.target[..end])
            .decode_utf8_lossy()
            .into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Returns the length of the head and the offset where the body starts.
fn find_head_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, i + 2));

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn read_sized_body<R: Read>(
    request: &Request,
    mut body: Vec<u8>,
    reader: &mut R,
    max_body_size: usize,
) -> Result<Vec<u8>, ParseRequestError> {
    let content_length = match request.header("Content-Length") {
        Some(value) => value.parse::<usize>().map_err(|_| ParseRequestError::Request)?,
        None => 0,
    };
    if content_length > max_body_size {
        return Err(ParseRequestError::BodyTooLarge(content_length));
    }

    body.truncate(content_length);
    if body.len() < content_length {
        let already_read = body.len();
        body.resize(content_length, 0);
        reader.read_exact(&mut body[already_read..])?;
    }
    Ok(body)
}

/// Decodes `Transfer-Encoding: chunked`. Chunk extensions and trailers are
/// read and dropped.
fn read_chunked_body<R: BufRead>(reader: &mut R, max_body_size: usize) -> Result<Vec<u8>, ParseRequestError> {
    let mut body = Vec::new();
    let mut line = String::new();

    loop {
        read_chunk_line(reader, &mut line)?;
        let size = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size, 16).map_err(|_| ParseRequestError::Request)?;

        if size == 0 {
            loop {
                read_chunk_line(reader, &mut line)?;
                if line.trim().is_empty() {
                    return Ok(body);
                }
            }
        }

        let total = body.len().saturating_add(size);
        if total > max_body_size {
            return Err(ParseRequestError::BodyTooLarge(total));
        }

        let start = body.len();
        body.resize(total, 0);
        reader.read_exact(&mut body[start..])?;

        read_chunk_line(reader, &mut line)?;
        if !line.trim().is_empty() {
            return Err(ParseRequestError::Request);
        }
    }
}

fn read_chunk_line<R: BufRead>(reader: &mut R, line: &mut String) -> Result<(), ParseRequestError> {
    line.clear();
    match reader.read_line(line) {
        Ok(0) => Err(ParseRequestError::Closed),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(ParseRequestError::Encoding),
        Err(e) => Err(e.into()),
    }
}
