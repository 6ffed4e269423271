// ファイルシステムセッションストア: キー → ファイル
//
// Each key is one file directly under the store directory. Writes go to a
// hidden temporary file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use super::{SessionStore, validate_key};
use crate::error::InkScrubError;

/// ファイルシステムベースのセッションストア。
///
/// `<state_dir>/<key>` にバイト列をそのまま格納する。
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    dir: PathBuf,
}

impl FsSessionStore {
    /// 指定されたディレクトリをルートとして新しいストアを作成する。
    ///
    /// ディレクトリが存在しない場合は自動的に作成する。
    pub fn open(dir: impl AsRef<Path>) -> crate::error::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| InkScrubError::persistence(e.to_string()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// キーからファイルパスを計算する。
    fn key_path(&self, key: &str) -> crate::error::Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

impl SessionStore for FsSessionStore {
    fn get(&self, key: &str) -> crate::error::Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(InkScrubError::persistence(e.to_string())),
        }
    }

    /// 書き込みはアトミック: 一時ファイルに書き込み、renameで最終パスに移動する。
    fn set(&self, key: &str, value: &[u8]) -> crate::error::Result<()> {
        let path = self.key_path(key)?;
        // 先頭が '.' の名前は有効なキーにならないので衝突しない
        let tmp_path = self.dir.join(format!(".{key}.tmp"));

        fs::write(&tmp_path, value).map_err(|e| InkScrubError::persistence(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            InkScrubError::persistence(e.to_string())
        })
    }

    fn delete(&self, key: &str) -> crate::error::Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InkScrubError::persistence(e.to_string())),
        }
    }

    fn clear(&self) -> crate::error::Result<()> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| InkScrubError::persistence(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| InkScrubError::persistence(e.to_string()))?;
            if entry.path().is_file() {
                fs::remove_file(entry.path())
                    .map_err(|e| InkScrubError::persistence(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn keys(&self) -> crate::error::Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| InkScrubError::persistence(e.to_string()))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InkScrubError::persistence(e.to_string()))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && validate_key(name).is_ok()
            {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
