//! Source rows and the normalized assignment item

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column names of the LMS assignment extract
pub mod columns {
    pub const USERNAME: &str = "Username";
    pub const ACTIVITY_ID: &str = "ActivityIDSource";
    pub const CALNET_UID: &str = "SourceIDEmpPk";
    pub const EMPL_ID: &str = "LocalEmployeeID";
    pub const FULL_NAME: &str = "EmpFullName1";
    pub const GIVEN_NAME: &str = "FirstName";
    pub const FAMILY_NAME: &str = "LastName";
    pub const ORG_CODE: &str = "UserPrimaryOrganizationCode";
    pub const MANAGER_EMPL_ID: &str = "ManagerLocalEmployeeID";
    pub const ACTIVITY_CODE: &str = "ActivityCode";
    pub const ACTIVITY_NAME: &str = "ActivityName";
    pub const ASSIGNMENT_STATUS: &str = "AssignmentStatus";
    pub const REQUIREMENT_STATUS: &str = "UCRequirementStatus";
    pub const PLAN_DATE: &str = "PlanDate";
    pub const DUE_DATE: &str = "DueDate";
    pub const EXPIRATION_DATE: &str = "ExpirationDate";
    pub const ATTEMPT_END_DATE: &str = "AttemptEndDate";
    pub const LAST_COMPLETION_DATE: &str = "LastCompletionDateRealtime";

    /// Every column the extract is expected to carry
    pub const ALL: [&str; 18] = [
        USERNAME,
        ACTIVITY_ID,
        CALNET_UID,
        EMPL_ID,
        FULL_NAME,
        GIVEN_NAME,
        FAMILY_NAME,
        ORG_CODE,
        MANAGER_EMPL_ID,
        ACTIVITY_CODE,
        ACTIVITY_NAME,
        ASSIGNMENT_STATUS,
        REQUIREMENT_STATUS,
        PLAN_DATE,
        DUE_DATE,
        EXPIRATION_DATE,
        ATTEMPT_END_DATE,
        LAST_COMPLETION_DATE,
    ];
}

/// One row of the CSV extract, keyed by header name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    /// 1-based line in the source file, 0 when the row was built in memory
    line: u64,
    fields: BTreeMap<String, String>,
}

impl SourceRecord {
    pub fn new(line: u64, fields: BTreeMap<String, String>) -> Self {
        Self { line, fields }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = line;
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            line: 0,
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Table key of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub lms_user_id: i64,
    pub activity_id: i64,
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lms_user_id, self.activity_id)
    }
}

/// A learner's assignment as persisted in the `lms_assignments` table.
///
/// Date fields hold `YYYY-MM-DDTHH:MM:SS` or the empty string, and the
/// nullable employee ids hold the literal `"null"` when the extract left
/// them blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentItem {
    pub lms_user_id: i64,
    pub activity_id: i64,
    pub calnet_uid: String,
    pub empl_id: String,
    pub full_name: String,
    pub given_name: String,
    pub family_name: String,
    pub empl_org_code: String,
    pub manager_empl_id: String,
    pub activity_code: String,
    pub activity_name: String,
    pub is_required: bool,
    pub assignment_status: String,
    pub assigned_date: String,
    pub due_date: String,
    pub expiration_date: String,
    pub last_attempt_date: String,
    pub last_completion_date: String,
    pub last_updated_datetime: String,
    pub last_updated_event_id: i64,
}

impl AssignmentItem {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            lms_user_id: self.lms_user_id,
            activity_id: self.activity_id,
        }
    }
}
