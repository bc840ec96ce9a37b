//! Human review of an action list.
use std::io::{self, Write};

use byte_unit::{AdjustedByte, Byte, UnitType};
use camino::Utf8Path;

use crate::{
    action::{Action, Direction},
    Error, Result,
};

/// Actions grouped by direction, each group sorted by kind and path.
#[derive(Debug, Clone, Default)]
pub struct Report {
    groups: [Vec<Action>; 4],
}

impl Report {
    pub fn new(actions: &[Action]) -> Self {
        let mut report = Report::default();
        for action in actions {
            report.groups[group_index(action.direction)].push(action.clone());
        }
        for group in report.groups.iter_mut() {
            group.sort_by(|a, b| (a.kind, &a.path).cmp(&(b.kind, &b.path)));
        }
        report
    }

    pub fn group(&self, direction: Direction) -> &[Action] {
        &self.groups[group_index(direction)]
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of files sent to the remote store
    pub fn upload_count(&self) -> usize {
        self.group(Direction::Upload).len() + self.group(Direction::UploadOverwrite).len()
    }

    /// Number of files written to the local directory
    pub fn download_count(&self) -> usize {
        self.group(Direction::Download).len() + self.group(Direction::DownloadOverwrite).len()
    }

    pub fn upload_size(&self) -> u64 {
        self.size_of(Direction::Upload) + self.size_of(Direction::UploadOverwrite)
    }

    pub fn download_size(&self) -> u64 {
        self.size_of(Direction::Download) + self.size_of(Direction::DownloadOverwrite)
    }

    fn size_of(&self, direction: Direction) -> u64 {
        self.group(direction).iter().filter_map(|a| a.size).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files will be uploaded and {} files will be downloaded.",
            self.upload_count(),
            self.download_count()
        )
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for direction in Direction::ALL {
            writeln!(out, "{}", heading(direction))?;
            for action in self.group(direction) {
                writeln!(
                    out,
                    "{} {:10} {}",
                    arrow(direction),
                    action.kind.as_str(),
                    action.path
                )?;
            }
            writeln!(out)?;
        }
        writeln!(
            out,
            "Upload: {:#.2}, download: {:#.2}",
            adjusted_byte(self.upload_size()),
            adjusted_byte(self.download_size())
        )?;
        writeln!(out, "{}", self.summary())
    }

    pub fn print_out(&self) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(err) = self.write_to(&mut out) {
            log::error!("failed to print the action report: {err}");
        }
    }
}

fn group_index(direction: Direction) -> usize {
    match direction {
        Direction::Upload => 0,
        Direction::Download => 1,
        Direction::UploadOverwrite => 2,
        Direction::DownloadOverwrite => 3,
    }
}

fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Upload => "⇧",
        Direction::Download => "⇩",
        Direction::UploadOverwrite => "⇧ OW",
        Direction::DownloadOverwrite => "⇩ OW",
    }
}

fn heading(direction: Direction) -> &'static str {
    match direction {
        Direction::Upload => "The following files will be uploaded to the data lake store:",
        Direction::Download => "The following files will be downloaded from the data lake store:",
        Direction::UploadOverwrite => {
            "The following files will be uploaded, overwriting the files of the data lake store:"
        }
        Direction::DownloadOverwrite => {
            "The following files will be downloaded, overwriting the local files:"
        }
    }
}

pub fn adjusted_byte(val: u64) -> AdjustedByte {
    Byte::from(val).get_appropriate_unit(UnitType::Binary)
}

/// Persist the action list as pretty JSON.
pub async fn save_action_list(actions: &[Action], path: &Utf8Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let json = serde_json::to_string_pretty(actions)?;
    tokio::fs::write(path, json).await?;
    log::info!("saved {} actions to {path}", actions.len());
    Ok(())
}

pub async fn load_action_list(path: &Utf8Path) -> Result<Vec<Action>> {
    let json = tokio::fs::read(path).await?;
    serde_json::from_slice(&json)
        .map_err(|err| Error::Other(format!("failed to parse the action list {path}: {err}")))
}
