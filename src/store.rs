use crate::crypto::{self, EncryptedEnvelope};
use crate::errors::{StoreError, StoreResult};
use crate::models::{ErrorPlaceholder, Record, RecordEntry};
use crate::naming::FileKey;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Reads every record stored in `dir`, optionally narrowed to one date.
///
/// Entries that do not follow the naming convention are skipped silently.
/// A file that fails to read, decrypt or parse becomes an error placeholder
/// attributed from its filename; one bad file never hides the rest of the
/// team. A missing or unreadable directory is a normal not-yet-synced state
/// and yields an empty listing.
pub async fn list_records(
    dir: &Path,
    passphrase: &str,
    date_filter: Option<&str>,
) -> StoreResult<Vec<RecordEntry>> {
    let mut dir_entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %error, "sync directory is not listable");
            }
            return Ok(Vec::new());
        }
    };

    let mut entries = Vec::new();
    while let Some(entry) = dir_entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(key) = FileKey::parse(name) else {
            continue;
        };
        if let Some(date) = date_filter {
            if key.date != date {
                continue;
            }
        }

        match load_record(&entry.path(), passphrase).await {
            Ok(record) => entries.push(RecordEntry::Record(record)),
            Err(error) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %error,
                    "listing record file as error placeholder"
                );
                entries.push(RecordEntry::Error(ErrorPlaceholder {
                    user: key.user,
                    date: key.date,
                    message: placeholder_message(&error),
                }));
            }
        }
    }
    Ok(entries)
}

/// Encrypts and writes one record as `{date}_{username}.enc`, fully
/// replacing any previous file for that (date, user). The write goes through
/// a temp file and a rename so the watcher and concurrent readers never see
/// a partial file.
pub async fn save_record(
    dir: &Path,
    username: &str,
    passphrase: &str,
    record: &Record,
) -> StoreResult<PathBuf> {
    // The stored user field is owned by this process, not by the caller's
    // payload.
    let mut record = record.clone();
    record.user = username.to_string();
    record.validate()?;

    let path = dir.join(FileKey::new(&record.date, username).file_name());
    let envelope = crypto::encrypt(&serde_json::to_vec(&record)?, passphrase)?;
    let payload = serde_json::to_vec(&envelope)?;

    tokio::fs::create_dir_all(dir).await?;
    let tmp_path = dir.join(format!(
        "{}.tmp.{}",
        FileKey::new(&record.date, username).file_name(),
        std::process::id()
    ));
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(&payload).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp_path, &path).await?;

    tracing::debug!(path = %path.display(), user = username, date = %record.date, "record saved");
    Ok(path)
}

async fn load_record(path: &Path, passphrase: &str) -> StoreResult<Record> {
    let bytes = tokio::fs::read(path).await?;
    let envelope: EncryptedEnvelope = serde_json::from_slice(&bytes)?;
    let plaintext = crypto::decrypt(&envelope, passphrase)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

fn placeholder_message(error: &StoreError) -> String {
    match error {
        StoreError::Authentication(_) => "decryption failed: team passphrase mismatch".to_string(),
        other => other.to_string(),
    }
}
