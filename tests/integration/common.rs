//! Common test utilities.

use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use waflogs::athena::{QueryContext, ResultPage, Row, ScriptedBackend};
use waflogs::query::{PollSettings, QueryExecutor};

/// Preview sink that can be inspected after the executor took ownership.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn context() -> QueryContext {
    QueryContext {
        catalog: "AwsDataCatalog".to_string(),
        database: "waflogs".to_string(),
        workgroup: "athena3".to_string(),
        output_location: "s3://test-results/".to_string(),
    }
}

/// Executor without backoff delays that previews into `preview`.
pub fn executor(
    backend: Arc<ScriptedBackend>,
    cancel: CancellationToken,
    preview: SharedBuf,
) -> QueryExecutor {
    QueryExecutor::new(backend, context(), cancel)
        .with_poll_settings(PollSettings {
            backoff_step: std::time::Duration::ZERO,
            ..PollSettings::default()
        })
        .with_preview(Box::new(preview))
}

/// Rows `[prefix0, 0] .. [prefix{n-1}, n-1]`.
pub fn rows(prefix: &str, n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| vec![Some(format!("{prefix}{i}")), Some(i.to_string())])
        .collect()
}

/// Splits `rows` into pages of `size`, chaining them with tokens.
pub fn paginate(rows: Vec<Row>, size: usize) -> Vec<ResultPage> {
    let chunks: Vec<Vec<Row>> = rows.chunks(size).map(|c| c.to_vec()).collect();
    let count = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let token = (i + 1 < count).then(|| format!("token-{}", i + 1));
            ResultPage::new(chunk, token)
        })
        .collect()
}

/// Runs the waflogs binary and returns (exit code, stdout, stderr).
pub fn run_binary(args: &[&str], cwd: &Path) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_waflogs"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "info")
        .env_remove("WAFLOGS_OUTPUT_LOCATION")
        .output()
        .expect("Failed to execute command");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
