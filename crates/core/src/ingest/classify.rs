//! Type detection for uploaded artifacts.

use crate::file::FileType;

const AUTOCAD_EXTENSIONS: &[&str] = &["dwg", "dxf", "dwt"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "tif", "tiff",
];
const DOCUMENT_EXTENSIONS: &[&str] = &["doc", "docx", "txt", "rtf"];

/// Lowercased extension of a filename, without the dot.
///
/// A bare dotfile such as `.dwg` counts as having that extension.
fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify an artifact from its filename and declared MIME type.
///
/// Rules are checked in order: CAD extensions, PDF, images, documents.
/// Anything else is [`FileType::Other`].
pub fn classify(filename: &str, mime_type: &str) -> FileType {
    let ext = extension(filename);
    let ext = ext.as_deref().unwrap_or("");
    let mime = mime_type.to_ascii_lowercase();

    if AUTOCAD_EXTENSIONS.contains(&ext) {
        FileType::Autocad
    } else if ext == "pdf" || mime == "application/pdf" {
        FileType::Pdf
    } else if IMAGE_EXTENSIONS.contains(&ext) || mime.starts_with("image/") {
        FileType::Image
    } else if DOCUMENT_EXTENSIONS.contains(&ext)
        || mime.contains("document")
        || mime.contains("text")
    {
        FileType::Document
    } else {
        FileType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cad_extensions() {
        assert_eq!(classify("plan.dwg", "application/octet-stream"), FileType::Autocad);
        assert_eq!(classify("site.DXF", ""), FileType::Autocad);
        assert_eq!(classify("template.dwt", "text/plain"), FileType::Autocad);
    }

    #[test]
    fn test_pdf_by_extension_or_mime() {
        assert_eq!(classify("spec.pdf", "application/octet-stream"), FileType::Pdf);
        assert_eq!(classify("download", "application/pdf"), FileType::Pdf);
        assert_eq!(classify("scan.bin", "Application/PDF"), FileType::Pdf);
    }

    #[test]
    fn test_images() {
        assert_eq!(classify("photo.JPEG", ""), FileType::Image);
        assert_eq!(classify("render.webp", "application/octet-stream"), FileType::Image);
        assert_eq!(classify("blob", "image/heic"), FileType::Image);
    }

    #[test]
    fn test_documents() {
        assert_eq!(classify("notes.txt", ""), FileType::Document);
        assert_eq!(classify("report.docx", "application/zip"), FileType::Document);
        assert_eq!(
            classify(
                "sheet",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            FileType::Document
        );
        assert_eq!(classify("data.csv", "text/csv"), FileType::Document);
    }

    #[test]
    fn test_other() {
        assert_eq!(classify("archive.zip", "application/zip"), FileType::Other);
        assert_eq!(classify("Makefile", ""), FileType::Other);
        assert_eq!(classify("drawing.", "application/octet-stream"), FileType::Other);
    }

    #[test]
    fn test_dotfile_uses_its_suffix() {
        assert_eq!(classify(".dwg", "application/octet-stream"), FileType::Autocad);
        assert_eq!(classify(".PDF", ""), FileType::Pdf);
    }
}
