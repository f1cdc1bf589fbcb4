use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::PermGraphError;
use crate::resource::ServiceDump;
use crate::types::SkipReport;

/// Parse one service's dump text. The JSON must be valid; its shape is
/// checked later by the canonicalizer.
///
/// ```rust
/// use permgraph_core::parse_service_dump;
/// let dump = parse_service_dump("s3", r#"{"arn:aws:s3:::b": {"Policy": {"Statement": []}}}"#).unwrap();
/// assert_eq!(dump.service, "s3");
/// ```
pub fn parse_service_dump(service: &str, text: &str) -> Result<ServiceDump, PermGraphError> {
    let document: Value = serde_json::from_str(text)?;
    Ok(ServiceDump::new(service, document))
}

/// Service name for a dump file: its file stem, e.g. `sqs` for `sqs.json`.
fn service_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, PermGraphError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every `*.json` file in `dir`, in file name order.
///
/// A missing or unreadable directory, unreadable files and invalid JSON are
/// all recorded in the report; whatever could be loaded is returned.
pub fn load_service_dumps(dir: impl AsRef<Path>) -> (Vec<ServiceDump>, SkipReport) {
    let dir = dir.as_ref();
    let mut report = SkipReport::new();
    let scope = dir.display().to_string();

    let files = match json_files(dir) {
        Ok(files) => files,
        Err(e) => {
            report.skip(scope, "directory", e);
            return (Vec::new(), report);
        }
    };

    let mut dumps = Vec::with_capacity(files.len());
    for path in files {
        let service = service_name(&path);
        let loaded = fs::read_to_string(&path)
            .map_err(PermGraphError::from)
            .and_then(|text| parse_service_dump(&service, &text));
        match loaded {
            Ok(dump) => {
                debug!(event = "Load", phase = "File", service = service, path = %path.display());
                dumps.push(dump);
            }
            Err(e) => report.skip(&scope, service, e),
        }
    }

    info!(
        event = "Load",
        phase = "Done",
        dir = %dir.display(),
        services = dumps.len(),
        skipped = report.len()
    );
    (dumps, report)
}

/// Read a whole JSON input file, e.g. the identity set or a decision set.
pub fn read_json_file(path: impl AsRef<Path>) -> Result<String, PermGraphError> {
    Ok(fs::read_to_string(path)?)
}
