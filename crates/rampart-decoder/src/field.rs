//! Registry of the semantic fields an SCA event may carry.
//!
//! [`Field`] is the single source of truth for field-to-path mapping: no
//! other module literalizes an event path. Each field has one canonical
//! relative JSON pointer which the dispatcher roots at the configured source
//! prefix on one side and at [`DEST_ROOT`] on the other.

/// Destination prefix under which normalized output is materialized.
pub const DEST_ROOT: &str = "/sca";

/// Semantic names of the fields an SCA event may carry.
///
/// The enumeration is closed: every value has a defined relative path, and
/// [`Field::ALL`] provides the total, stable iteration order used to build
/// path maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The whole event payload.
    Root,
    Id,
    ScanId,
    Description,
    References,
    StartTime,
    EndTime,
    Passed,
    Failed,
    Invalid,
    TotalChecks,
    Score,
    Hash,
    HashFile,
    File,
    Name,
    FirstScan,
    ForceAlert,
    Policy,
    PolicyId,
    Policies,
    Check,
    CheckId,
    CheckTitle,
    CheckDescription,
    CheckRationale,
    CheckRemediation,
    CheckReferences,
    CheckCompliance,
    CheckCondition,
    CheckDirectory,
    CheckProcess,
    CheckRegistry,
    CheckCommand,
    CheckRules,
    CheckStatus,
    CheckReason,
    CheckResult,
    CheckFile,
    CheckPreviousResult,
    ElementsSent,
    Type,
}

impl Field {
    /// All fields in their stable registry order.
    pub const ALL: [Self; 42] = [
        Self::Root,
        Self::Id,
        Self::ScanId,
        Self::Description,
        Self::References,
        Self::StartTime,
        Self::EndTime,
        Self::Passed,
        Self::Failed,
        Self::Invalid,
        Self::TotalChecks,
        Self::Score,
        Self::Hash,
        Self::HashFile,
        Self::File,
        Self::Name,
        Self::FirstScan,
        Self::ForceAlert,
        Self::Policy,
        Self::PolicyId,
        Self::Policies,
        Self::Check,
        Self::CheckId,
        Self::CheckTitle,
        Self::CheckDescription,
        Self::CheckRationale,
        Self::CheckRemediation,
        Self::CheckReferences,
        Self::CheckCompliance,
        Self::CheckCondition,
        Self::CheckDirectory,
        Self::CheckProcess,
        Self::CheckRegistry,
        Self::CheckCommand,
        Self::CheckRules,
        Self::CheckStatus,
        Self::CheckReason,
        Self::CheckResult,
        Self::CheckFile,
        Self::CheckPreviousResult,
        Self::ElementsSent,
        Self::Type,
    ];

    /// Number of registered fields.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the field's canonical relative JSON pointer.
    ///
    /// [`Field::Root`] maps to the empty pointer, denoting the payload
    /// itself.
    #[must_use]
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Id => "/id",
            Self::ScanId => "/scan_id",
            Self::Description => "/description",
            Self::References => "/references",
            Self::StartTime => "/start_time",
            Self::EndTime => "/end_time",
            Self::Passed => "/passed",
            Self::Failed => "/failed",
            Self::Invalid => "/invalid",
            Self::TotalChecks => "/total_checks",
            Self::Score => "/score",
            Self::Hash => "/hash",
            Self::HashFile => "/hash_file",
            Self::File => "/file",
            Self::Name => "/name",
            Self::FirstScan => "/first_scan",
            Self::ForceAlert => "/force_alert",
            Self::Policy => "/policy",
            Self::PolicyId => "/policy_id",
            Self::Policies => "/policies",
            Self::Check => "/check",
            Self::CheckId => "/check/id",
            Self::CheckTitle => "/check/title",
            Self::CheckDescription => "/check/description",
            Self::CheckRationale => "/check/rationale",
            Self::CheckRemediation => "/check/remediation",
            Self::CheckReferences => "/check/references",
            Self::CheckCompliance => "/check/compliance",
            Self::CheckCondition => "/check/condition",
            Self::CheckDirectory => "/check/directory",
            Self::CheckProcess => "/check/process",
            Self::CheckRegistry => "/check/registry",
            Self::CheckCommand => "/check/command",
            Self::CheckRules => "/check/rules",
            Self::CheckStatus => "/check/status",
            Self::CheckReason => "/check/reason",
            Self::CheckResult => "/check/result",
            Self::CheckFile => "/check/file",
            Self::CheckPreviousResult => "/check/previous_result",
            Self::ElementsSent => "/elements_sent",
            Self::Type => "/type",
        }
    }

    /// Returns the field's position in the registry order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Absolute source and destination pointers for every registered field.
///
/// Built once at decoder construction; both maps are populated for all
/// fields simultaneously so handlers can address either side by [`Field`]
/// alone.
#[derive(Debug, Clone)]
pub struct FieldPaths {
    paths: [String; Field::COUNT],
}

impl FieldPaths {
    /// Builds the path map for all fields rooted at the given prefix.
    #[must_use]
    pub fn rooted(prefix: &str) -> Self {
        let paths = Field::ALL.map(|field| format!("{prefix}{}", field.relative_path()));
        Self { paths }
    }

    /// Returns the absolute pointer for the given field.
    #[must_use]
    pub fn path(&self, field: Field) -> &str {
        &self.paths[field.index()]
    }
}
