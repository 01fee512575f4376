use std::{io::ErrorKind, path::Path};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// Reads the whole file under a shared lock. A missing file is not an error, it just has no
/// contents yet.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    async fn read(path: &Path) -> Result<String, io::Error> {
        debug!("Reading {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut contents = String::new();
        let result = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        result.map(|_| contents)
    }

    match read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Replaces file contents under an exclusive lock. The file is truncated only after the lock is
/// held, so readers never observe a half written document from another process.
pub async fn write_locked(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    debug!("Writing {} bytes into {path:?}", contents.len());
    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await?;
    file.lock_exclusive()?;
    let result = replace_contents(&mut file, contents).await;
    file.unlock_async().await?;
    result
}

async fn replace_contents(file: &mut File, contents: &[u8]) -> Result<(), io::Error> {
    file.set_len(0).await?;
    file.rewind().await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Removes the file, treating an already missing file as removed.
pub async fn remove_if_exists(path: &Path) -> Result<(), io::Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
