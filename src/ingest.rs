//! Recepción de ficheros subidos: directorio temporal por petición, extracción
//! de texto (.txt/.pdf) y construcción del corpus que se envía al LLM.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use mime_guess::{mime, Mime};
use tempfile::TempDir;
use tracing::{info, warn};
use uuid::Uuid;

/// Máximo de ficheros por petición de análisis.
pub const MAX_FILES: usize = 20;
/// Tamaño máximo de cada fichero (20 MB).
pub const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// Texto extraído de un fichero, junto con su nombre.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub name: String,
    pub text: String,
}

/// Directorio temporal exclusivo de una petición. Se borra al soltarse,
/// sea cual sea el camino de salida.
#[derive(Debug)]
pub struct UploadStaging {
    dir: TempDir,
}

impl UploadStaging {
    pub fn new() -> Result<Self> {
        let tag = Uuid::new_v4().simple().to_string();
        let dir = tempfile::Builder::new()
            .prefix(&format!("igbx-{}-", &tag[..6]))
            .tempdir()
            .context("No se pudo crear el directorio temporal")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Guarda el contenido bajo el nombre base del fichero y devuelve la ruta.
    pub fn store(&self, filename: Option<&str>, data: &[u8]) -> Result<PathBuf> {
        let name = safe_file_name(filename);
        let path = self.dir.path().join(&name);
        fs::write(&path, data)
            .with_context(|| format!("No se pudo escribir {}", path.display()))?;
        Ok(path)
    }
}

/// Reduce el nombre subido a su componente final; `doc` si no queda nada útil.
pub fn safe_file_name(filename: Option<&str>) -> String {
    filename
        .and_then(|f| Path::new(f).file_name())
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "doc".to_string())
}

/// Extrae texto plano de un fichero. Nunca falla: ante cualquier problema
/// devuelve un texto indicativo en lugar del contenido.
pub fn extract_text_from_file(path: &Path, declared: Option<&str>) -> String {
    let kind = detect_kind(path, declared);
    match kind {
        Kind::Pdf => match pdf_extract::extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("No se pudo extraer texto del PDF {}: {}", path.display(), e);
                placeholder(kind, &file_name(path))
            }
        },
        Kind::Text => match fs::read(path) {
            Ok(bytes) => decode_ignoring_invalid(&bytes),
            Err(e) => {
                warn!("No se pudo leer {}: {}", path.display(), e);
                placeholder(kind, &file_name(path))
            }
        },
        Kind::Unsupported => {
            info!("Tipo de fichero no soportado: {}", path.display());
            placeholder(kind, &file_name(path))
        }
    }
}

/// Igual que [`extract_text_from_file`] pero fuera del runtime async. Si la
/// tarea falla (p. ej. un pánico de la librería de PDF) se devuelve el texto
/// de fallo que corresponde al tipo del fichero.
pub async fn extract_text_blocking(path: PathBuf, declared: Option<String>) -> String {
    let name = file_name(&path);
    let kind = detect_kind(&path, declared.as_deref());
    tokio::task::spawn_blocking(move || extract_text_from_file(&path, declared.as_deref()))
        .await
        .unwrap_or_else(|e| {
            warn!("La extracción de {} terminó de forma anómala: {}", name, e);
            placeholder(kind, &name)
        })
}

/// Une los documentos con una cabecera `# FILE:` por fichero.
pub fn build_corpus(docs: &[ExtractedDocument]) -> String {
    docs.iter()
        .map(|d| format!("# FILE: {}\n{}", d.name, d.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Pdf,
    Text,
    Unsupported,
}

fn detect_kind(path: &Path, declared: Option<&str>) -> Kind {
    let guessed = mime_guess::from_path(path).first();
    let declared = declared.and_then(|d| d.parse::<Mime>().ok());
    // La extensión manda; el tipo declarado sólo si la extensión no dice nada.
    match guessed.or(declared) {
        Some(m) if m.essence_str() == mime::APPLICATION_PDF.essence_str() => Kind::Pdf,
        Some(m) if m.type_() == mime::TEXT => Kind::Text,
        _ => Kind::Unsupported,
    }
}

/// Conserva sólo los tramos UTF-8 válidos; los bytes inválidos se descartan.
fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn placeholder(kind: Kind, name: &str) -> String {
    match kind {
        Kind::Pdf => format!("[PDF: {name}; text extraction failed]"),
        Kind::Text => format!("[TXT: {name}; read failed]"),
        Kind::Unsupported => format!("[Unsupported file type: {name}]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_directory_is_removed_on_drop() {
        let staging = UploadStaging::new().unwrap();
        let path = staging.path().to_path_buf();
        staging.store(Some("a.txt"), b"hola").unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("igbx-"));

        drop(staging);
        assert!(!path.exists());
    }

    #[test]
    fn stored_files_cannot_escape_the_staging_dir() {
        let staging = UploadStaging::new().unwrap();
        let stored = staging.store(Some("../../etc/passwd.txt"), b"x").unwrap();
        assert_eq!(stored.parent(), Some(staging.path()));
        assert_eq!(safe_file_name(None), "doc");
        assert_eq!(safe_file_name(Some("")), "doc");
        assert_eq!(safe_file_name(Some("dir/report.pdf")), "report.pdf");
    }

    #[test]
    fn text_files_are_read_dropping_invalid_bytes() {
        let staging = UploadStaging::new().unwrap();
        let path = staging.store(Some("notes.txt"), b"caf\xff\xfee ok").unwrap();
        assert_eq!(extract_text_from_file(&path, None), "cafe ok");
    }

    #[tokio::test]
    async fn unsupported_and_broken_files_yield_placeholders() {
        let staging = UploadStaging::new().unwrap();

        let bin = staging.store(Some("image.png"), &[0x89, 0x50]).unwrap();
        assert_eq!(
            extract_text_from_file(&bin, None),
            "[Unsupported file type: image.png]"
        );

        let pdf = staging.store(Some("broken.pdf"), b"not a pdf").unwrap();
        assert_eq!(
            extract_text_blocking(pdf, None).await,
            "[PDF: broken.pdf; text extraction failed]"
        );
    }

    #[test]
    fn valid_replacement_characters_are_kept() {
        let mut bytes = "a\u{FFFD}b".as_bytes().to_vec();
        bytes.push(0xff);
        assert_eq!(decode_ignoring_invalid(&bytes), "a\u{FFFD}b");
        assert_eq!(decode_ignoring_invalid(b"\xc3"), "");
    }

    #[test]
    fn unreadable_text_file_yields_read_placeholder() {
        let staging = UploadStaging::new().unwrap();
        let missing = staging.path().join("gone.txt");
        assert_eq!(
            extract_text_from_file(&missing, None),
            "[TXT: gone.txt; read failed]"
        );
    }

    #[test]
    fn failure_placeholder_follows_the_file_kind() {
        assert_eq!(placeholder(Kind::Text, "a.txt"), "[TXT: a.txt; read failed]");
        assert_eq!(
            placeholder(Kind::Pdf, "a.pdf"),
            "[PDF: a.pdf; text extraction failed]"
        );
        assert_eq!(
            placeholder(Kind::Unsupported, "a.bin"),
            "[Unsupported file type: a.bin]"
        );
        assert_eq!(detect_kind(Path::new("notes.txt"), None), Kind::Text);
        assert_eq!(detect_kind(Path::new("paper.pdf"), None), Kind::Pdf);
    }

    #[tokio::test]
    async fn blocking_extraction_of_missing_text_file_keeps_text_placeholder() {
        let staging = UploadStaging::new().unwrap();
        let missing = staging.path().join("gone.txt");
        assert_eq!(
            extract_text_blocking(missing, None).await,
            "[TXT: gone.txt; read failed]"
        );
    }

    #[test]
    fn declared_type_is_used_when_extension_is_unknown() {
        let staging = UploadStaging::new().unwrap();
        let path = staging.store(Some("README"), b"plain body").unwrap();
        assert_eq!(extract_text_from_file(&path, Some("text/plain")), "plain body");
        assert_eq!(
            extract_text_from_file(&path, None),
            "[Unsupported file type: README]"
        );
    }

    #[tokio::test]
    async fn blocking_extraction_matches_direct_call() {
        let staging = UploadStaging::new().unwrap();
        let path = staging.store(Some("a.md"), b"# titulo").unwrap();
        assert_eq!(extract_text_blocking(path, None).await, "# titulo");
    }

    #[test]
    fn corpus_prefixes_each_file() {
        let docs = vec![
            ExtractedDocument { name: "a.txt".into(), text: "uno".into() },
            ExtractedDocument { name: "b.pdf".into(), text: "dos".into() },
        ];
        assert_eq!(
            build_corpus(&docs),
            "# FILE: a.txt\nuno\n\n# FILE: b.pdf\ndos"
        );
    }
}
