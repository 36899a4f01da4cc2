//! File uploads: categories, file payloads and multipart encoding.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use uuid::Uuid;

/// Multipart field name the backend reads the file from.
pub const FILE_FIELD: &str = "file";

/// Upload category. Each maps to a fixed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadCategory {
    Video,
    Document,
    Image,
    Cover,
}

impl UploadCategory {
    pub fn endpoint(self) -> &'static str {
        match self {
            UploadCategory::Video => "/file/upload/video",
            UploadCategory::Document => "/file/upload/document",
            UploadCategory::Image => "/file/upload/image",
            UploadCategory::Cover => "/file/upload/cover",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadCategory::Video => "video",
            UploadCategory::Document => "document",
            UploadCategory::Image => "image",
            UploadCategory::Cover => "cover",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown names fall back to `Image`, matching the mini-program's default
/// branch, so parsing never fails.
impl FromStr for UploadCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "video" => UploadCategory::Video,
            "document" => UploadCategory::Document,
            "cover" => UploadCategory::Cover,
            _ => UploadCategory::Image,
        })
    }
}

/// A file ready to be sent as the single `file` part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring the content type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FILE_FIELD.to_string());
        Ok(Self {
            content_type: content_type_for(path).to_string(),
            file_name,
            bytes,
        })
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// An encoded `multipart/form-data` body and its boundary.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub boundary: String,
    pub bytes: Vec<u8>,
}

impl MultipartBody {
    /// Encode `file` as the only part, named `file`, under a fresh boundary.
    pub fn single_file(file: &UploadFile) -> Self {
        Self::with_boundary(file, &format!("----StudyClient{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(file: &UploadFile, boundary: &str) -> Self {
        let file_name = file.file_name.replace('"', "%22");
        let mut bytes = Vec::with_capacity(file.bytes.len() + 256);
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        bytes.extend_from_slice(&file.bytes);
        bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Self {
            boundary: boundary.to_string(),
            bytes,
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn category_endpoints() {
        assert_eq!(UploadCategory::Video.endpoint(), "/file/upload/video");
        assert_eq!(UploadCategory::Document.endpoint(), "/file/upload/document");
        assert_eq!(UploadCategory::Image.endpoint(), "/file/upload/image");
        assert_eq!(UploadCategory::Cover.endpoint(), "/file/upload/cover");
    }

    #[test]
    fn unknown_category_falls_back_to_image() {
        assert_eq!("VIDEO".parse::<UploadCategory>().unwrap(), UploadCategory::Video);
        assert_eq!("cover".parse::<UploadCategory>().unwrap(), UploadCategory::Cover);
        assert_eq!("avatar".parse::<UploadCategory>().unwrap(), UploadCategory::Image);
    }

    #[test]
    fn multipart_layout() {
        let file = UploadFile::new("a.png", "image/png", b"PNGDATA".to_vec());
        let body = MultipartBody::with_boundary(&file, "XyZ");
        let expected = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n--XyZ--\r\n";
        assert_eq!(String::from_utf8(body.bytes).unwrap(), expected);
        assert_eq!(
            MultipartBody::with_boundary(&file, "XyZ").content_type(),
            "multipart/form-data; boundary=XyZ"
        );
    }

    #[test]
    fn fresh_boundaries_differ() {
        let file = UploadFile::new("a.txt", "text/plain", b"hi".to_vec());
        let a = MultipartBody::single_file(&file);
        let b = MultipartBody::single_file(&file);
        assert_ne!(a.boundary, b.boundary);
    }

    #[test]
    fn from_path_infers_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.MP4");
        std::fs::File::create(&path).unwrap().write_all(b"\x00\x01").unwrap();

        let file = UploadFile::from_path(&path).unwrap();
        assert_eq!(file.file_name, "lecture.MP4");
        assert_eq!(file.content_type, "video/mp4");
        assert_eq!(file.bytes, vec![0, 1]);
    }

    #[test]
    fn from_path_missing_file_errors() {
        assert!(UploadFile::from_path("/definitely/not/here.pdf").is_err());
    }
}
