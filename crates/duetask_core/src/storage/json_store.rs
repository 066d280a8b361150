use crate::error::{AppError, StorageError};
use crate::storage::Persistence;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const STORE_DIR_ENV_VAR: &str = "DUETASK_STORE_DIR";
const APP_DIR_NAME: &str = "duetask";

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

pub fn store_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    app_dir()
}

pub(crate) fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

impl Persistence for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::read_failed(
                key,
                format!("{}: {}", path.display(), err),
            )),
        }
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let write_failed = |err: std::io::Error| {
            StorageError::write_failed(key, format!("{}: {}", path.display(), err))
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_failed)?;
        tokio::fs::write(&path, blob).await.map_err(write_failed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&path, permissions)
                .await
                .map_err(write_failed)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::JsonFileStore;
    use crate::storage::{PENDING_KEY, Persistence};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("duetask-{nanos}-{name}"))
    }

    #[tokio::test]
    async fn load_missing_key_returns_none() {
        let dir = temp_dir("missing");
        let store = JsonFileStore::new(&dir);

        assert_eq!(store.load(PENDING_KEY).await.unwrap(), None);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn save_creates_dir_and_round_trips() {
        let dir = temp_dir("round-trip");
        let store = JsonFileStore::new(&dir);

        store.save(PENDING_KEY, "[]").await.unwrap();
        let loaded = store.load(PENDING_KEY).await.unwrap();
        let path = store.path_for(PENDING_KEY);
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded.as_deref(), Some("[]"));
        assert!(path.ends_with("tasks.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir("perms");
        let store = JsonFileStore::new(&dir);
        store.save(PENDING_KEY, "[]").await.unwrap();

        let mode = std::fs::metadata(store.path_for(PENDING_KEY))
            .unwrap()
            .permissions()
            .mode();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn unreadable_key_reports_read_failed() {
        let dir = temp_dir("unreadable");
        let store = JsonFileStore::new(&dir);
        std::fs::create_dir_all(store.path_for(PENDING_KEY)).unwrap();

        let err = store.load(PENDING_KEY).await.unwrap_err();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(err.code(), "read_failed");
    }

    #[tokio::test]
    async fn save_over_directory_reports_write_failed() {
        let dir = temp_dir("unwritable");
        let store = JsonFileStore::new(&dir);
        std::fs::create_dir_all(store.path_for(PENDING_KEY)).unwrap();

        let err = store.save(PENDING_KEY, "[]").await.unwrap_err();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(err.code(), "write_failed");
    }
}
