//! Purpose: Hold top-level CLI command dispatch for `endure`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `show` never writes; `set` prints the previous record before storing.
//! Invariants: Without `--handle`, state goes through the process default codec.

use super::*;
use endure::api::{FileStorage, Storage, load, store};
use std::path::Path;

pub(super) fn dispatch_command(
    command: Command,
    file: PathBuf,
    format: Format,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Show => {
            let record = load_record(&file, None)?;
            emit_json(&record)?;
            Ok(RunOutcome::ok())
        }
        Command::Set { foo, bar, handle } => {
            let storage = handle.then(|| FileStorage::with_format(&file, format));
            let previous = load_record(&file, storage.as_ref())?;
            emit_json(&previous)?;

            let record = Record { foo, bar };
            match &storage {
                Some(storage) => storage.store(&record)?,
                None => store(&file, &record)?,
            }
            tracing::info!(file = %file.display(), "stored record");
            Ok(RunOutcome::ok())
        }
    }
}

fn load_record(file: &Path, storage: Option<&FileStorage>) -> Result<Record, Error> {
    let mut record = Record::default();
    let result = match storage {
        Some(storage) => storage.load(&mut record),
        None => load(file, &mut record),
    };
    match result {
        Ok(()) => Ok(record),
        Err(err) if err.is_not_found() => {
            tracing::debug!(file = %file.display(), "no saved state");
            Ok(Record::default())
        }
        Err(err) => Err(err.with_hint("Remove the file or pick the --format it was written with.")),
    }
}
