/// A statement file received in a preview request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Only PDFs can be previewed; CSV/XLSX rows go straight to confirm.
    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case("application/pdf")
            || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_detection_accepts_mime_or_extension() {
        assert!(UploadedFile::new("a.bin", "application/pdf", vec![]).is_pdf());
        assert!(UploadedFile::new("March.PDF", "application/octet-stream", vec![]).is_pdf());
        assert!(!UploadedFile::new("march.csv", "text/csv", vec![]).is_pdf());
    }
}
