//! User-dictionary helpers and the blacklist file protocol.
//!
//! Dictionary files are plain text, one `word[ \t]pos_tag` entry per line;
//! this layer only passes paths through, the native libraries persist the
//! contents themselves. The blacklist import, however, carries a file-level
//! undo protocol around the native call: the active blacklist data file is
//! shelved to a `.bak` sibling before importing, a failed import rolls the
//! shelving back, and [`clean_blacklist`]/[`recover_blacklist`] expose the
//! same single-level undo directly. Only one backup generation is kept.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::components::{KeywordBlacklist, UserDictionary};
use crate::error::Result;

/// File name of the active blacklist data inside a component's data root.
pub const BLACKLIST_FILE: &str = "KeyBlackList.pdat";

/// Suffix appended to the shelved blacklist file.
pub const BACKUP_SUFFIX: &str = "bak";

/// Add words to a component's in-memory user dictionary.
///
/// Entries may be bare words or `word pos` pairs. Returns the entries the
/// native library rejected.
pub fn import_words<C: UserDictionary>(component: &C, words: &[&str]) -> Result<Vec<String>> {
    let mut rejected = Vec::new();
    for word in words {
        if !component.add_user_word(word)? {
            rejected.push(word.to_string());
        }
    }
    Ok(rejected)
}

/// Remove words from a component's in-memory user dictionary. Returns the
/// words that were not present.
pub fn delete_words<C: UserDictionary>(component: &C, words: &[&str]) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for word in words {
        if !component.delete_user_word(word)? {
            missing.push(word.to_string());
        }
    }
    Ok(missing)
}

/// Write `words` as a dictionary file and import it in one step.
///
/// The temporary file lives until the native call returns; the library
/// copies the contents into its own data directory.
pub fn import_word_file<C: UserDictionary>(
    component: &C,
    words: &[&str],
    overwrite: bool,
) -> Result<u32> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("user_dict.txt");
    let mut file = fs::File::create(&path)?;
    for word in words {
        writeln!(file, "{}", word)?;
    }
    drop(file);
    component.import_user_dict(&path, overwrite)
}

/// Import a blacklist file into a component, shelving any active blacklist
/// first.
///
/// `pos_tags` restricts the import to entries with the given POS tags; an
/// empty slice imports everything. On native failure the active file left by
/// the partial import is discarded and the previous blacklist is restored,
/// then the error is returned.
pub fn import_blacklist<C: KeywordBlacklist>(
    component: &C,
    source: &Path,
    pos_tags: &[&str],
) -> Result<u32> {
    let active = component.data_dir().join(BLACKLIST_FILE);
    let backed_up = shelve(&active, &backup_path(&active))?;
    match component.import_blacklist_file(source, pos_tags) {
        Ok(status) => Ok(status),
        Err(err) => {
            // Roll back: the import may have left a partial active file.
            if active.exists() {
                if let Err(cleanup) = fs::remove_file(&active) {
                    log::warn!("could not discard partial blacklist: {}", cleanup);
                }
            }
            if backed_up {
                if let Err(restore) = unshelve(&backup_path(&active), &active) {
                    log::warn!("could not restore blacklist backup: {}", restore);
                }
            }
            Err(err)
        }
    }
}

/// Deactivate the current blacklist by shelving its data file.
///
/// Returns whether a file was shelved. Calling this twice in a row leaves
/// nothing to shelve the second time: the call is a no-op and the existing
/// backup is kept.
pub fn clean_blacklist(data_dir: &Path) -> Result<bool> {
    let active = data_dir.join(BLACKLIST_FILE);
    shelve(&active, &backup_path(&active))
}

/// Restore the shelved blacklist, if one exists.
pub fn recover_blacklist(data_dir: &Path) -> Result<bool> {
    let active = data_dir.join(BLACKLIST_FILE);
    unshelve(&backup_path(&active), &active)
}

fn backup_path(active: &Path) -> PathBuf {
    let mut name = active.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    active.with_file_name(name)
}

/// Move `src` to `dst`, replacing any previous `dst`. Returns `false` when
/// there is no `src` to move.
fn shelve(src: &Path, dst: &Path) -> Result<bool> {
    if !src.exists() {
        return Ok(false);
    }
    // `rename` does not replace on every platform; clear the slot first.
    if dst.exists() {
        fs::remove_file(dst)?;
    }
    fs::rename(src, dst)?;
    if !dst.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("rename to '{}' did not take effect", dst.display()),
        )
        .into());
    }
    Ok(true)
}

fn unshelve(src: &Path, dst: &Path) -> Result<bool> {
    shelve(src, dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlpirError;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn clean_then_recover_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join(BLACKLIST_FILE);
        write(&active, "涉赌 n");

        assert!(clean_blacklist(dir.path()).unwrap());
        assert!(!active.exists());

        assert!(recover_blacklist(dir.path()).unwrap());
        assert_eq!(read(&active), "涉赌 n");
    }

    #[test]
    fn double_clean_is_a_noop_and_keeps_the_backup() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join(BLACKLIST_FILE);
        write(&active, "original");

        assert!(clean_blacklist(dir.path()).unwrap());
        // Nothing left to shelve; the first backup survives.
        assert!(!clean_blacklist(dir.path()).unwrap());
        assert!(recover_blacklist(dir.path()).unwrap());
        assert_eq!(read(&active), "original");
    }

    #[test]
    fn recover_without_backup_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!recover_blacklist(dir.path()).unwrap());
    }

    #[test]
    fn only_one_backup_generation_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join(BLACKLIST_FILE);

        write(&active, "first");
        assert!(clean_blacklist(dir.path()).unwrap());
        write(&active, "second");
        assert!(clean_blacklist(dir.path()).unwrap());

        assert!(recover_blacklist(dir.path()).unwrap());
        assert_eq!(read(&active), "second");
    }

    struct FailingImport {
        data_dir: PathBuf,
    }

    impl KeywordBlacklist for FailingImport {
        fn import_blacklist_file(&self, _path: &Path, _tags: &[&str]) -> Result<u32> {
            // Simulate a native import that wrote a partial file, then
            // failed.
            write(&self.data_dir.join(BLACKLIST_FILE), "partial");
            Err(NlpirError::NativeFailure {
                operation: "ImportKeyBlackList",
                detail: "simulated".into(),
            })
        }

        fn data_dir(&self) -> &Path {
            &self.data_dir
        }
    }

    #[test]
    fn failed_import_rolls_back_to_previous_blacklist() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join(BLACKLIST_FILE);
        write(&active, "original");
        let source = dir.path().join("incoming.txt");
        write(&source, "六合彩 涉赌 8");

        let component = FailingImport {
            data_dir: dir.path().to_path_buf(),
        };
        let err = import_blacklist(&component, &source, &["user"]).unwrap_err();
        assert!(matches!(err, NlpirError::NativeFailure { .. }));
        assert_eq!(read(&active), "original");
        assert!(!backup_path(&active).exists());
    }

    struct SucceedingImport {
        data_dir: PathBuf,
    }

    impl KeywordBlacklist for SucceedingImport {
        fn import_blacklist_file(&self, _path: &Path, _tags: &[&str]) -> Result<u32> {
            write(&self.data_dir.join(BLACKLIST_FILE), "imported");
            Ok(1)
        }

        fn data_dir(&self) -> &Path {
            &self.data_dir
        }
    }

    #[test]
    fn successful_import_keeps_exactly_one_backup() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join(BLACKLIST_FILE);
        write(&active, "original");

        let component = SucceedingImport {
            data_dir: dir.path().to_path_buf(),
        };
        assert_eq!(import_blacklist(&component, &active, &[]).unwrap(), 1);
        assert_eq!(read(&active), "imported");
        assert_eq!(read(&backup_path(&active)), "original");
    }
}
