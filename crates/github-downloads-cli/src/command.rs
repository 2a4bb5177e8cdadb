//! Command handlers.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, bail};
use github_downloads::{Download, GitHubDownloads, UploadRequest};

use crate::TRACING_TARGET_COMMAND;
use crate::config::Command;

/// Runs one command against the client.
pub fn execute(client: &GitHubDownloads, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { project, account } => {
            let account = account.as_deref().unwrap_or(client.login());
            let downloads = client
                .list_account_downloads(account, &project)
                .with_context(|| format!("failed to list downloads of {account}/{project}"))?;

            let mut stdout = io::stdout().lock();
            write_listing(&mut stdout, &downloads)?;
        }
        Command::Upload {
            project,
            file,
            name,
            content_type,
            description,
        } => {
            let file_name = match name {
                Some(name) => name,
                None => default_file_name(&file)?,
            };

            let request =
                UploadRequest::new(file_name, content_type).with_description(description);
            client
                .upload_file(&project, &request, &file)
                .with_context(|| format!("failed to upload {}", file.display()))?;

            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                project = %project,
                file_name = %request.file_name,
                "uploaded"
            );
        }
        Command::Delete { project, id } => {
            let downloads = client
                .list_downloads(&project)
                .with_context(|| format!("failed to list downloads of {project}"))?;

            let Some(download) = find_download(&downloads, &id) else {
                bail!("no download with id {id} in {project}");
            };

            download
                .delete()
                .with_context(|| format!("failed to delete download {id}"))?;

            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                project = %project,
                id = %id,
                file_name = %download.file_name(),
                "deleted"
            );
        }
    }

    Ok(())
}

/// Writes one `id<TAB>file name<TAB>url` line per download.
fn write_listing(out: &mut impl Write, downloads: &[Download]) -> io::Result<()> {
    for download in downloads {
        writeln!(
            out,
            "{}\t{}\t{}",
            download.id(),
            download.file_name(),
            download.url()
        )?;
    }
    out.flush()
}

fn find_download<'a>(downloads: &'a [Download], id: &str) -> Option<&'a Download> {
    downloads.iter().find(|download| download.id() == id)
}

fn default_file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .with_context(|| format!("cannot derive a file name from {}", path.display()))
}
