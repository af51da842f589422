//! Permission vocabulary for forms and submissions.
//!
//! Two fixed, deliberately small vocabularies:
//!
//! - Record-access permissions ([`FormPermissions`], [`SubmissionPermissions`])
//!   granted by the access resolver for a (form, submission) pair.
//! - Capability-token permissions ([`CapabilityPermission`]) carried inside a
//!   signed token. `Export` exists only here: it governs data extraction, not
//!   record access, so it never appears in the submission-level set.

use bitflags::bitflags;

bitflags! {
    /// Form-level permissions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormPermissions: u8 {
        const VIEW = 0b01;
        const EDIT = 0b10;
    }
}

bitflags! {
    /// Submission-level permissions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SubmissionPermissions: u8 {
        const CREATE      = 0b00_0001;
        const VIEW        = 0b00_0010;
        const EDIT        = 0b00_0100;
        const VIEW_FILES  = 0b00_1000;
        const UPLOAD_FILE = 0b01_0000;
        const DELETE_FILE = 0b10_0000;
    }
}

impl FormPermissions {
    /// Human-readable names, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::VIEW) {
            names.push("View");
        }
        if self.contains(Self::EDIT) {
            names.push("Edit");
        }
        names
    }
}

impl SubmissionPermissions {
    /// Full self-service set granted to a continuation-token holder:
    /// everything needed to resume, finish, and manage attachments of an
    /// existing submission. Notably not `CREATE`.
    pub const SELF_SERVICE: Self = Self::VIEW
        .union(Self::EDIT)
        .union(Self::VIEW_FILES)
        .union(Self::UPLOAD_FILE)
        .union(Self::DELETE_FILE);

    /// Set granted to anonymous respondents on a public form: start a new
    /// submission and attach files inline, nothing else.
    pub const ANONYMOUS_RESPONDENT: Self = Self::CREATE.union(Self::UPLOAD_FILE);

    /// Human-readable names, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::CREATE) {
            names.push("Create");
        }
        if self.contains(Self::VIEW) {
            names.push("View");
        }
        if self.contains(Self::EDIT) {
            names.push("Edit");
        }
        if self.contains(Self::VIEW_FILES) {
            names.push("ViewFiles");
        }
        if self.contains(Self::UPLOAD_FILE) {
            names.push("UploadFile");
        }
        if self.contains(Self::DELETE_FILE) {
            names.push("DeleteFile");
        }
        names
    }
}

bitflags! {
    /// RBAC-checkable action set held by an authenticated caller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Actions: u8 {
        const FORM_VIEW              = 0b0000_0001;
        const FORM_EDIT              = 0b0000_0010;
        const SUBMISSION_CREATE      = 0b0000_0100;
        const SUBMISSION_VIEW        = 0b0000_1000;
        const SUBMISSION_EDIT        = 0b0001_0000;
        const SUBMISSION_VIEW_FILES  = 0b0010_0000;
        const SUBMISSION_UPLOAD_FILE = 0b0100_0000;
        const SUBMISSION_DELETE_FILE = 0b1000_0000;
    }
}

/// A single RBAC-checkable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    FormView,
    FormEdit,
    SubmissionCreate,
    SubmissionView,
    SubmissionEdit,
    SubmissionViewFiles,
    SubmissionUploadFile,
    SubmissionDeleteFile,
}

impl Action {
    /// Configuration name, as written in `[[authz.role]]` grant lists.
    pub fn name(self) -> &'static str {
        match self {
            Self::FormView => "form.view",
            Self::FormEdit => "form.edit",
            Self::SubmissionCreate => "submission.create",
            Self::SubmissionView => "submission.view",
            Self::SubmissionEdit => "submission.edit",
            Self::SubmissionViewFiles => "submission.view_files",
            Self::SubmissionUploadFile => "submission.upload_file",
            Self::SubmissionDeleteFile => "submission.delete_file",
        }
    }

    /// Parse a configuration name back to an action.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "form.view" => Some(Self::FormView),
            "form.edit" => Some(Self::FormEdit),
            "submission.create" => Some(Self::SubmissionCreate),
            "submission.view" => Some(Self::SubmissionView),
            "submission.edit" => Some(Self::SubmissionEdit),
            "submission.view_files" => Some(Self::SubmissionViewFiles),
            "submission.upload_file" => Some(Self::SubmissionUploadFile),
            "submission.delete_file" => Some(Self::SubmissionDeleteFile),
            _ => None,
        }
    }

    /// The corresponding bit in an [`Actions`] set.
    pub fn flag(self) -> Actions {
        match self {
            Self::FormView => Actions::FORM_VIEW,
            Self::FormEdit => Actions::FORM_EDIT,
            Self::SubmissionCreate => Actions::SUBMISSION_CREATE,
            Self::SubmissionView => Actions::SUBMISSION_VIEW,
            Self::SubmissionEdit => Actions::SUBMISSION_EDIT,
            Self::SubmissionViewFiles => Actions::SUBMISSION_VIEW_FILES,
            Self::SubmissionUploadFile => Actions::SUBMISSION_UPLOAD_FILE,
            Self::SubmissionDeleteFile => Actions::SUBMISSION_DELETE_FILE,
        }
    }
}

/// A permission encodable in a capability token.
///
/// The wire codes form the fixed alphabet `r` (view), `w` (edit), `x`
/// (export), always written in that canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityPermission {
    View,
    Edit,
    Export,
}

impl CapabilityPermission {
    /// Canonical encoding order.
    pub const CANONICAL: [Self; 3] = [Self::View, Self::Edit, Self::Export];

    /// Single-letter wire code.
    pub fn code(self) -> char {
        match self {
            Self::View => 'r',
            Self::Edit => 'w',
            Self::Export => 'x',
        }
    }

    /// Application-level name.
    pub fn name(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Export => "export",
        }
    }

    /// Parse an application-level name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            "export" => Some(Self::Export),
            _ => None,
        }
    }

    /// Parse a wire code letter.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'r' => Some(Self::View),
            'w' => Some(Self::Edit),
            'x' => Some(Self::Export),
            _ => None,
        }
    }
}

/// A set of capability-token permissions with canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityPermissionSet(u8);

impl CapabilityPermissionSet {
    const fn bit(perm: CapabilityPermission) -> u8 {
        match perm {
            CapabilityPermission::View => 0b001,
            CapabilityPermission::Edit => 0b010,
            CapabilityPermission::Export => 0b100,
        }
    }

    /// Build a set from application-level names.
    ///
    /// Unrecognized names are collected and returned as the error so the
    /// caller can report all of them at once.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, Vec<String>> {
        let mut bits = 0u8;
        let mut unknown = Vec::new();
        for name in names {
            match CapabilityPermission::from_name(name.as_ref()) {
                Some(perm) => bits |= Self::bit(perm),
                None => unknown.push(name.as_ref().to_string()),
            }
        }
        if unknown.is_empty() {
            Ok(Self(bits))
        } else {
            Err(unknown)
        }
    }

    /// Build a set from wire code letters. `None` if any letter is outside
    /// the permission alphabet.
    pub fn from_codes(codes: &str) -> Option<Self> {
        let mut bits = 0u8;
        for code in codes.chars() {
            bits |= Self::bit(CapabilityPermission::from_code(code)?);
        }
        Some(Self(bits))
    }

    pub fn contains(self, perm: CapabilityPermission) -> bool {
        self.0 & Self::bit(perm) != 0
    }

    /// Wire encoding: code letters in canonical order, never repeated.
    pub fn codes(self) -> String {
        CapabilityPermission::CANONICAL
            .iter()
            .filter(|p| self.contains(**p))
            .map(|p| p.code())
            .collect()
    }

    /// Application-level names in canonical order.
    pub fn names(self) -> Vec<&'static str> {
        CapabilityPermission::CANONICAL
            .iter()
            .filter(|p| self.contains(**p))
            .map(|p| p.name())
            .collect()
    }
}
