//! `multipart/form-data` decoding
//!
//! Bodies are already buffered, so the parts are split out of the body in one
//! pass. Only what form field lookup needs is kept: the part's name, its file
//! name and content type when given, and the raw data.

use crate::error::{ApiError, Result};
use bytes::Bytes;

/// One part of a multipart form
#[derive(Clone, Debug)]
pub struct MultipartField {
    name: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl MultipartField {
    /// Field name from `Content-Disposition`
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// File name, for file uploads
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Content type of the part, if declared
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw part data
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Part data as text, invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Whether this part is a file upload
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Whether `content_type` names a multipart form
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("multipart/form-data"))
        .unwrap_or(false)
}

/// Decode `body` given its `Content-Type` header value
pub fn parse(content_type: &str, body: &Bytes) -> Result<Vec<MultipartField>> {
    if !is_multipart(content_type) {
        return Err(ApiError::bad_request(format!(
            "Expected multipart/form-data, got: {}",
            content_type
        )));
    }

    let boundary = extract_boundary(content_type)
        .ok_or_else(|| ApiError::bad_request("Missing boundary in Content-Type"))?;

    Ok(split_parts(body, &boundary))
}

fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let boundary = value.trim().trim_matches('"');
        (!boundary.is_empty()).then(|| boundary.to_string())
    })
}

fn split_parts(body: &Bytes, boundary: &str) -> Vec<MultipartField> {
    let delimiter = format!("--{}", boundary);
    let body = String::from_utf8_lossy(body);

    let mut fields = Vec::new();
    for part in body.split(delimiter.as_str()).skip(1) {
        // closing delimiter
        if part.starts_with("--") {
            break;
        }
        let part = part.trim_start_matches("\r\n").trim_start_matches('\n');

        let Some((headers, data)) = part
            .split_once("\r\n\r\n")
            .or_else(|| part.split_once("\n\n"))
        else {
            continue;
        };
        let data = data
            .strip_suffix("\r\n")
            .or_else(|| data.strip_suffix('\n'))
            .unwrap_or(data);

        let mut field = MultipartField {
            name: None,
            file_name: None,
            content_type: None,
            data: Bytes::copy_from_slice(data.as_bytes()),
        };

        for line in headers.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            if key.trim().eq_ignore_ascii_case("content-disposition") {
                for param in value.split(';').skip(1) {
                    match param.trim().split_once('=') {
                        Some(("name", v)) => field.name = Some(v.trim_matches('"').to_string()),
                        Some(("filename", v)) => {
                            field.file_name = Some(v.trim_matches('"').to_string())
                        }
                        _ => {}
                    }
                }
            } else if key.trim().eq_ignore_ascii_case("content-type") {
                field.content_type = Some(value.to_string());
            }
        }

        fields.push(field);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPE: &str = "multipart/form-data; boundary=----WebKitFormBoundary";

    fn body() -> Bytes {
        Bytes::from(
            "------WebKitFormBoundary\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\
             \r\n\
             hello\r\n\
             ------WebKitFormBoundary\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             line one\r\nline two\r\n\
             ------WebKitFormBoundary--\r\n",
        )
    }

    #[test]
    fn test_extract_boundary() {
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=abc").as_deref(),
            Some("abc")
        );
        assert_eq!(
            extract_boundary("multipart/form-data; charset=utf-8; boundary=\"x y\"").as_deref(),
            Some("x y")
        );
        assert_eq!(extract_boundary("multipart/form-data"), None);
        assert_eq!(extract_boundary("multipart/form-data; boundary="), None);
    }

    #[test]
    fn test_parse_text_and_file_parts() {
        let fields = parse(CONTENT_TYPE, &body()).unwrap();
        assert_eq!(fields.len(), 2);

        assert_eq!(fields[0].name(), Some("title"));
        assert_eq!(fields[0].text(), "hello");
        assert!(!fields[0].is_file());

        assert_eq!(fields[1].name(), Some("upload"));
        assert_eq!(fields[1].file_name(), Some("notes.txt"));
        assert_eq!(fields[1].content_type(), Some("text/plain"));
        assert_eq!(fields[1].text(), "line one\r\nline two");
    }

    #[test]
    fn test_empty_value_is_kept() {
        let body = Bytes::from_static(
            b"--b\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n\r\n--b--\r\n",
        );
        let fields = parse("multipart/form-data; boundary=b", &body).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].text(), "");
    }

    #[test]
    fn test_rejects_other_content_types() {
        assert!(is_multipart("Multipart/Form-Data; boundary=b"));
        assert!(!is_multipart("application/x-www-form-urlencoded"));

        let err = parse("application/json", &body()).unwrap_err();
        assert_eq!(err.status, http::StatusCode::BAD_REQUEST);

        let err = parse("multipart/form-data", &body()).unwrap_err();
        assert_eq!(err.message, "Missing boundary in Content-Type");
    }
}
