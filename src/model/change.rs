use serde::Serialize;
use std::fmt;

/// Changelog schema version written with every row
pub const CHANGELOG_VERSION: f64 = 1.0;

/// A single filesystem mutation performed by the replacer (the action family)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChangeStep {
    RemoveTemp,
    CreateTempSymlink,
    AddSuffix,
    MoveSymlink,
    SymlinkCopyContent,
    SymlinkContentRename,
}

impl ChangeStep {
    const ALL: [ChangeStep; 6] = [
        ChangeStep::RemoveTemp,
        ChangeStep::CreateTempSymlink,
        ChangeStep::AddSuffix,
        ChangeStep::MoveSymlink,
        ChangeStep::SymlinkCopyContent,
        ChangeStep::SymlinkContentRename,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStep::RemoveTemp => "REMOVE_TEMP",
            ChangeStep::CreateTempSymlink => "CREATE_TEMP_SYMLINK",
            ChangeStep::AddSuffix => "ADD_SUFFIX",
            ChangeStep::MoveSymlink => "MOVE_SYMLINK",
            ChangeStep::SymlinkCopyContent => "SYMLINK_COPY_CONTENT",
            ChangeStep::SymlinkContentRename => "SYMLINK_CONTENT_RENAME",
        }
    }

    pub fn start(self) -> ChangeAction {
        ChangeAction { step: self, phase: ChangePhase::Start }
    }

    pub fn commit(self) -> ChangeAction {
        ChangeAction { step: self, phase: ChangePhase::Commit }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChangePhase {
    /// Written before the filesystem call
    Start,
    /// Written once the filesystem call succeeded
    Commit,
}

/// Action tag stored in the changelog, e.g. `MOVE_SYMLINK_COMMIT`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChangeAction {
    pub step: ChangeStep,
    pub phase: ChangePhase,
}

impl ChangeAction {
    pub fn tag(self) -> String {
        let phase = match self.phase {
            ChangePhase::Start => "START",
            ChangePhase::Commit => "COMMIT",
        };
        format!("{}_{}", self.step.as_str(), phase)
    }

    /// Parse a stored tag; unknown tags yield `None`
    pub fn parse(tag: &str) -> Option<Self> {
        let (family, phase) = tag.rsplit_once('_')?;
        let phase = match phase {
            "START" => ChangePhase::Start,
            "COMMIT" => ChangePhase::Commit,
            _ => return None,
        };
        let step = ChangeStep::ALL.into_iter().find(|s| s.as_str() == family)?;
        Some(Self { step, phase })
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// One changelog row as read back from the store
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub id: i64,
    /// Seconds since the epoch
    pub date: f64,
    /// The file the whole mutation is about
    pub fullpath: String,
    /// The path this step touches
    pub filechanged: String,
    /// Symlink target or reference path
    pub target: String,
    pub action: String,
    pub version: f64,
}

impl ChangeRecord {
    pub fn parsed_action(&self) -> Option<ChangeAction> {
        ChangeAction::parse(&self.action)
    }
}
