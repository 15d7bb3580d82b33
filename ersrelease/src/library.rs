//! Inventaire des fichiers audio du répertoire média

use crate::filename::FilenamePolicy;
use crate::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Liste les fichiers audio directement présents dans `dir`, triés par nom
///
/// Seul le premier niveau est parcouru. Un répertoire illisible est une
/// erreur ; une entrée illisible est ignorée.
pub fn list_media(dir: impl AsRef<Path>, policy: &FilenamePolicy) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let walker = WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true);

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::storage(dir, e.into())),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable media entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) if policy.has_allowed_extension(name) => files.push(name.to_string()),
            Some(_) => {}
            None => debug!(path = %entry.path().display(), "Skipping non UTF-8 file name"),
        }
    }

    files.sort();
    Ok(files)
}
