//! Finding AppleSingle files on disk without parsing them.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_stream::try_stream;
use futures::stream::Stream;
use tokio::{
    fs,
    io::AsyncReadExt as _,
};
use tracing::trace;

use crate::apple::sniff;

/// Reads at most four bytes of `path` and checks them for the magic.
pub async fn might_be_applesingle(path: &Path) -> io::Result<bool> {
    let file = fs::File::open(path).await?;
    let mut magic = Vec::with_capacity(4);
    file.take(4).read_to_end(&mut magic).await?;
    Ok(sniff(&magic))
}

/// Every regular file under `root` that starts with the AppleSingle magic.
///
/// Directories are walked depth first; the first i/o error ends the stream.
pub fn candidates(root: PathBuf) -> impl Stream<Item = io::Result<PathBuf>> {
    try_stream! {
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            trace!("scanning {dir:?}");
            let mut listing = fs::read_dir(&dir).await?;
            while let Some(entry) = listing.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && might_be_applesingle(&path).await? {
                    yield path;
                }
            }
        }
    }
}
