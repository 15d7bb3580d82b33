//! Validation des noms de fichiers audio
//!
//! Un nom valide désigne un fichier directement dans le répertoire média :
//! pas de séparateur, pas de `..`, et une extension audio autorisée.

/// Extensions acceptées par défaut (comparaison insensible à la casse)
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["mp3", "wav", "flac"];

/// Longueur maximale d'un nom, en caractères
pub const MAX_FILENAME_LEN: usize = 255;

/// Règles de validation des noms de fichiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePolicy {
    extensions: Vec<String>,
    max_len: usize,
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_len: MAX_FILENAME_LEN,
        }
    }
}

impl FilenamePolicy {
    /// Crée une politique ; les extensions sont normalisées (sans point, minuscules)
    pub fn new<I, S>(extensions: I, max_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Self { extensions, max_len }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Vrai si `name` est un nom de fichier audio sûr
    pub fn is_valid(&self, name: &str) -> bool {
        let len = name.chars().count();

        len > 0
            && len <= self.max_len
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains("..")
            && self.has_allowed_extension(name)
    }

    /// Vrai si l'extension de `name` fait partie de la liste autorisée
    pub fn has_allowed_extension(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }

    /// Retourne les noms rejetés, dans l'ordre d'entrée
    pub fn invalid_names<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .filter(|name| !self.is_valid(name))
            .cloned()
            .collect()
    }
}

/// Validation avec la politique par défaut
pub fn is_valid_filename(name: &str) -> bool {
    FilenamePolicy::default().is_valid(name)
}
