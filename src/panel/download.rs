use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const IFC_MIME: &str = "application/ifc";

/// A file handed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Receives finished downloads; returns where the file ended up.
pub trait DownloadSink {
    fn deliver(&mut self, download: Download) -> io::Result<PathBuf>;
}

/// Saves downloads into a directory.
///
/// Each file is first written as `<name>.part` and renamed into place, so
/// an interrupted write never leaves a truncated file under the real name.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectoryDownloads {
    fn deliver(&mut self, download: Download) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        // Keep only the final component of the suggested name
        let file_name = Path::new(&download.file_name)
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid download name '{}'", download.file_name),
                )
            })?
            .to_owned();

        let target = self.dir.join(&file_name);
        let mut part_name = file_name;
        part_name.push(".part");
        let part = self.dir.join(part_name);

        let written = fs::write(&part, &download.bytes).and_then(|()| fs::rename(&part, &target));
        if let Err(e) = written {
            let _ = fs::remove_file(&part);
            return Err(e);
        }

        tracing::debug!(path = %target.display(), mime = download.mime, bytes = download.bytes.len(), "download saved");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_under_final_name_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectoryDownloads::new(dir.path().join("out"));

        let path = sink
            .deliver(Download {
                file_name: "../model.ifc".to_string(),
                mime: IFC_MIME,
                bytes: b"ISO-10303-21;".to_vec(),
            })
            .unwrap();

        assert_eq!(path, dir.path().join("out").join("model.ifc"));
        assert_eq!(fs::read(&path).unwrap(), b"ISO-10303-21;");
        assert!(!dir.path().join("out").join("model.ifc.part").exists());
    }
}
