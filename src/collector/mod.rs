//! 파일 수집 모듈
//!
//! 업로드할 로컬 파일과 폴더를 수집합니다.
//! .gitignore 패턴을 존중하고, 백엔드가 파싱할 수 있는 확장자만 수집합니다.
//! 프록시 본문 한도(30MB)를 넘는 파일은 건너뜁니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

use crate::proxy::MAX_BODY_BYTES;

// ============================================================================
// Document Kinds
// ============================================================================

/// 업로드 가능한 문서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF, Word, RTF, EPUB
    Document,
    /// PowerPoint
    Presentation,
    /// Excel, CSV
    Spreadsheet,
    /// 텍스트, 마크다운, HTML, JSON, XML
    Text,
    /// 이미지 (백엔드 OCR)
    Image,
}

/// 확장자 → (종류, MIME)
fn lookup(ext: &str) -> Option<(DocumentKind, &'static str)> {
    let entry = match ext.to_lowercase().as_str() {
        "pdf" => (DocumentKind::Document, "application/pdf"),
        "docx" => (
            DocumentKind::Document,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        "doc" => (DocumentKind::Document, "application/msword"),
        "rtf" => (DocumentKind::Document, "application/rtf"),
        "epub" => (DocumentKind::Document, "application/epub+zip"),
        "pptx" => (
            DocumentKind::Presentation,
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        "xlsx" => (
            DocumentKind::Spreadsheet,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        "csv" => (DocumentKind::Spreadsheet, "text/csv"),
        "txt" => (DocumentKind::Text, "text/plain"),
        "md" => (DocumentKind::Text, "text/markdown"),
        "html" | "htm" => (DocumentKind::Text, "text/html"),
        "json" => (DocumentKind::Text, "application/json"),
        "xml" => (DocumentKind::Text, "application/xml"),
        "png" => (DocumentKind::Image, "image/png"),
        "jpg" | "jpeg" => (DocumentKind::Image, "image/jpeg"),
        _ => return None,
    };
    Some(entry)
}

impl DocumentKind {
    /// 확장자로 종류 결정
    pub fn from_extension(ext: &str) -> Option<Self> {
        lookup(ext).map(|(kind, _)| kind)
    }

    /// 파일 경로에서 종류 결정
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// 확장자의 MIME 타입 (모르는 확장자는 `application/octet-stream`)
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(lookup)
        .map(|(_, mime)| mime)
        .unwrap_or("application/octet-stream")
}

// ============================================================================
// Collected File
// ============================================================================

/// 수집된 파일 정보
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// 파일 절대 경로
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub mime_type: &'static str,
    /// 파일 크기 (바이트)
    pub size: u64,
}

impl CollectedFile {
    /// 파일에서 CollectedFile 생성 (지원하지 않는 확장자면 None)
    pub fn from_path(path: PathBuf) -> Result<Option<Self>> {
        let kind = match DocumentKind::from_path(&path) {
            Some(kind) => kind,
            None => return Ok(None),
        };

        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata: {:?}", path))?;

        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            mime_type: mime_for_path(&path),
            path,
            kind,
            size: metadata.len(),
        }))
    }

    /// 업로드 파일 이름
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

// ============================================================================
// File Collector
// ============================================================================

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
    /// 이미지 파일 건너뛰기
    pub skip_images: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: MAX_BODY_BYTES as u64,
            skip_images: false,
        }
    }
}

/// 파일 수집기
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 경로 목록 수집 (파일은 그대로, 폴더는 재귀)
    pub fn collect_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<CollectedFile>> {
        let mut files = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                files.extend(self.collect_directory(path)?);
            } else {
                match self.collect_file(path)? {
                    Some(file) => files.push(file),
                    None => tracing::warn!("Skipping unsupported or oversized file: {:?}", path),
                }
            }
        }

        Ok(files)
    }

    /// 단일 파일 수집
    pub fn collect_file(&self, path: &Path) -> Result<Option<CollectedFile>> {
        let abs_path = absolute(path)?;

        if !abs_path.exists() {
            anyhow::bail!("File not found: {:?}", abs_path);
        }

        if !abs_path.is_file() {
            anyhow::bail!("Not a file: {:?}", abs_path);
        }

        let file = CollectedFile::from_path(abs_path)?;
        Ok(file.filter(|f| self.should_include(f)))
    }

    /// 폴더 재귀 수집
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<CollectedFile>> {
        let abs_path = absolute(path)?;

        if !abs_path.is_dir() {
            anyhow::bail!("Not a directory: {:?}", abs_path);
        }

        let mut files = Vec::new();

        let walker = WalkBuilder::new(&abs_path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            match CollectedFile::from_path(entry.path().to_path_buf()) {
                Ok(Some(file)) if self.should_include(&file) => files.push(file),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to collect file: {}", e),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!("Collected {} files from {:?}", files.len(), abs_path);
        Ok(files)
    }

    fn should_include(&self, file: &CollectedFile) -> bool {
        if self.config.max_file_size > 0 && file.size > self.config.max_file_size {
            tracing::warn!(
                "Skipping {:?}: {} bytes exceeds upload limit of {} bytes",
                file.path,
                file.size,
                self.config.max_file_size
            );
            return false;
        }

        if self.config.skip_images && file.kind == DocumentKind::Image {
            return false;
        }

        true
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// 수집 통계
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub total_files: usize,
    pub documents: usize,
    pub presentations: usize,
    pub spreadsheets: usize,
    pub text_files: usize,
    pub images: usize,
    pub total_size: u64,
}

impl CollectionStats {
    pub fn from_files(files: &[CollectedFile]) -> Self {
        let mut stats = Self::default();

        for file in files {
            stats.total_files += 1;
            stats.total_size += file.size;

            match file.kind {
                DocumentKind::Document => stats.documents += 1,
                DocumentKind::Presentation => stats.presentations += 1,
                DocumentKind::Spreadsheet => stats.spreadsheets += 1,
                DocumentKind::Text => stats.text_files += 1,
                DocumentKind::Image => stats.images += 1,
            }
        }

        stats
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("PDF"), Some(DocumentKind::Document));
        assert_eq!(DocumentKind::from_extension("pptx"), Some(DocumentKind::Presentation));
        assert_eq!(DocumentKind::from_extension("csv"), Some(DocumentKind::Spreadsheet));
        assert_eq!(DocumentKind::from_extension("htm"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_extension("jpeg"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_extension("rs"), None);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a/report.pdf")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("notes.MD")), "text/markdown");
        assert_eq!(mime_for_path(Path::new("archive.tar")), "application/octet-stream");
    }

    #[test]
    fn test_default_limit_matches_proxy() {
        assert_eq!(CollectorConfig::default().max_file_size, 30 * 1024 * 1024);
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# a").unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("c.exe"), b"MZ").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("d.csv"), "a,b").unwrap();

        let files = FileCollector::with_defaults()
            .collect_directory(dir.path())
            .unwrap();
        let names: Vec<String> = files.iter().map(CollectedFile::file_name).collect();
        assert_eq!(names, vec!["a.md", "b.pdf", "d.csv"]);

        let stats = CollectionStats::from_files(&files);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.spreadsheets, 1);
        assert_eq!(stats.total_size, 3 + 8 + 3);
    }

    #[test]
    fn test_oversized_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();

        let collector = FileCollector::new(CollectorConfig {
            max_file_size: 16,
            ..Default::default()
        });
        assert!(collector.collect_file(&path).unwrap().is_none());
        assert!(collector.collect_file(&dir.path().join("missing.txt")).is_err());
    }
}
