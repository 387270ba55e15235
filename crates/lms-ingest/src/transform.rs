//! Row validation and normalization
//!
//! [`build_item`] turns one extract row into an [`AssignmentItem`]. Rows whose
//! `Username` is not a plain run of digits describe non-person accounts and
//! are skipped (`Ok(None)`); every other problem is a [`RowBuildError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::num::ParseIntError;
use thiserror::Error;
use tracing::debug;

use crate::model::{columns, AssignmentItem, SourceRecord};

/// Literal stored in place of an absent employee id
pub const NULL_SENTINEL: &str = "null";

/// Campus prefix stripped from `UserPrimaryOrganizationCode`
pub const ORG_CODE_PREFIX: &str = "01HD";

/// Date layout used by the extract
pub const SOURCE_DATE_FORMAT: &str = "%m/%d/%y";

/// Layout of every timestamp written to the store
pub const ITEM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Why a row could not be turned into an item
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildCause {
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("invalid integer '{value}' in column '{column}'")]
    InvalidInteger {
        column: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid date '{value}' in column '{column}', expected MM/DD/YY")]
    InvalidDate {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// A row that passed the person check but could not be normalized
#[derive(Debug, Clone, Error)]
#[error("unable to build item from line {}: {cause}", .row.line())]
pub struct RowBuildError {
    pub row: SourceRecord,
    #[source]
    pub cause: BuildCause,
}

/// Blank values become the `"null"` sentinel
pub fn convert_nullable(value: &str) -> String {
    if value.is_empty() {
        NULL_SENTINEL.to_string()
    } else {
        value.to_string()
    }
}

/// Strip one leading `01HD` from an organization code
pub fn convert_orgcode(code: &str) -> String {
    code.strip_prefix(ORG_CODE_PREFIX).unwrap_or(code).to_string()
}

/// Convert `MM/DD/YY` into an ISO-8601 midnight timestamp; blank stays blank
pub fn convert_date(date: &str) -> Result<String, chrono::ParseError> {
    if date.is_empty() {
        return Ok(String::new());
    }

    let mut parsed = NaiveDate::parse_from_str(date, SOURCE_DATE_FORMAT)?;
    // chrono puts `69` in 2069; the extract's two-digit years pivot at 69 like strptime
    if parsed.year() >= 2069 {
        parsed = parsed.with_year(parsed.year() - 100).unwrap_or(parsed);
    }
    Ok(parsed.and_time(chrono::NaiveTime::MIN).format(ITEM_DATETIME_FORMAT).to_string())
}

/// True when `value` is one or more ASCII digits and nothing else.
///
/// Digits from other scripts (e.g. fullwidth `１２３`) do not count, unlike a
/// Unicode-aware `\d+` match; LMS usernames for people are ASCII.
pub fn is_person_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Normalize one row.
///
/// `updated_at` becomes `last_updated_datetime`, truncated to seconds.
pub fn build_item(
    row: &SourceRecord,
    updated_at: NaiveDateTime,
) -> Result<Option<AssignmentItem>, RowBuildError> {
    let username = row.get(columns::USERNAME).unwrap_or_default();
    if !is_person_id(username) {
        return Ok(None);
    }

    convert_row(row, username, updated_at)
        .map(Some)
        .map_err(|cause| {
            debug!(line = row.line(), error = %cause, "Exception while building item");
            RowBuildError {
                row: row.clone(),
                cause,
            }
        })
}

fn convert_row(
    row: &SourceRecord,
    username: &str,
    updated_at: NaiveDateTime,
) -> Result<AssignmentItem, BuildCause> {
    let required = |column: &'static str| row.get(column).ok_or(BuildCause::MissingColumn(column));
    let optional = |column: &'static str| row.get(column).unwrap_or_default();
    let date = |column: &'static str| {
        let value = optional(column);
        convert_date(value).map_err(|source| BuildCause::InvalidDate {
            column,
            value: value.to_string(),
            source,
        })
    };

    Ok(AssignmentItem {
        lms_user_id: parse_integer(columns::USERNAME, username)?,
        activity_id: parse_integer(columns::ACTIVITY_ID, required(columns::ACTIVITY_ID)?)?,
        calnet_uid: required(columns::CALNET_UID)?.to_string(),
        empl_id: convert_nullable(optional(columns::EMPL_ID)),
        full_name: required(columns::FULL_NAME)?.to_string(),
        given_name: required(columns::GIVEN_NAME)?.to_string(),
        family_name: required(columns::FAMILY_NAME)?.to_string(),
        empl_org_code: convert_orgcode(required(columns::ORG_CODE)?),
        manager_empl_id: convert_nullable(optional(columns::MANAGER_EMPL_ID)),
        activity_code: required(columns::ACTIVITY_CODE)?.to_string(),
        activity_name: required(columns::ACTIVITY_NAME)?.to_string(),
        is_required: required(columns::ASSIGNMENT_STATUS)? == "Required",
        assignment_status: required(columns::REQUIREMENT_STATUS)?.to_string(),
        assigned_date: date(columns::PLAN_DATE)?,
        due_date: date(columns::DUE_DATE)?,
        expiration_date: date(columns::EXPIRATION_DATE)?,
        last_attempt_date: date(columns::ATTEMPT_END_DATE)?,
        last_completion_date: date(columns::LAST_COMPLETION_DATE)?,
        last_updated_datetime: updated_at.format(ITEM_DATETIME_FORMAT).to_string(),
        last_updated_event_id: 0,
    })
}

fn parse_integer(column: &'static str, value: &str) -> Result<i64, BuildCause> {
    value
        .trim()
        .parse()
        .map_err(|source| BuildCause::InvalidInteger {
            column,
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_milli_opt(9, 30, 12, 845)
            .unwrap()
    }

    fn valid_row() -> SourceRecord {
        [
            ("Username", "100234"),
            ("ActivityIDSource", "5512"),
            ("SourceIDEmpPk", "1234567"),
            ("LocalEmployeeID", "010203040"),
            ("EmpFullName1", "Lovelace, Ada"),
            ("FirstName", "Ada"),
            ("LastName", "Lovelace"),
            ("UserPrimaryOrganizationCode", "01HDCSCI"),
            ("ManagerLocalEmployeeID", ""),
            ("ActivityCode", "CYBER-101"),
            ("ActivityName", "Cyber Security Awareness"),
            ("AssignmentStatus", "Required"),
            ("UCRequirementStatus", "Completed"),
            ("PlanDate", "01/05/24"),
            ("DueDate", "02/04/24"),
            ("ExpirationDate", ""),
            ("AttemptEndDate", "1/31/24"),
            ("LastCompletionDateRealtime", "01/31/24"),
        ]
        .into_iter()
        .collect::<SourceRecord>()
        .with_line(2)
    }

    fn with_field(row: &SourceRecord, column: &str, value: &str) -> SourceRecord {
        let mut fields = row.fields().clone();
        fields.insert(column.to_string(), value.to_string());
        SourceRecord::new(row.line(), fields)
    }

    fn without_field(row: &SourceRecord, column: &str) -> SourceRecord {
        let mut fields = row.fields().clone();
        fields.remove(column);
        SourceRecord::new(row.line(), fields)
    }

    #[test]
    fn test_convert_nullable() {
        assert_eq!(convert_nullable(""), "null");
        assert_eq!(convert_nullable("X"), "X");
        assert_eq!(convert_nullable(" "), " ");
    }

    #[test]
    fn test_convert_orgcode() {
        assert_eq!(convert_orgcode("01HD1234"), "1234");
        assert_eq!(convert_orgcode("ABCD"), "ABCD");
        assert_eq!(convert_orgcode("01HD01HD99"), "01HD99");
        assert_eq!(convert_orgcode("9901HD"), "9901HD");
        assert_eq!(convert_orgcode(""), "");
    }

    #[test]
    fn test_convert_date() {
        assert_eq!(convert_date("").unwrap(), "");
        assert_eq!(convert_date("01/05/24").unwrap(), "2024-01-05T00:00:00");
        assert_eq!(convert_date("12/31/99").unwrap(), "1999-12-31T00:00:00");
        assert_eq!(convert_date("2/9/07").unwrap(), "2007-02-09T00:00:00");
        assert_eq!(convert_date("01/01/69").unwrap(), "1969-01-01T00:00:00");
        assert_eq!(convert_date("12/31/68").unwrap(), "2068-12-31T00:00:00");
        assert_eq!(convert_date("07/04/70").unwrap(), "1970-07-04T00:00:00");
    }

    #[test]
    fn test_convert_date_round_trips_calendar_date() {
        for (input, (y, m, d)) in [("03/01/20", (2020, 3, 1)), ("02/29/24", (2024, 2, 29)), ("10/10/10", (2010, 10, 10))] {
            let iso = convert_date(input).unwrap();
            let parsed = NaiveDateTime::parse_from_str(&iso, ITEM_DATETIME_FORMAT).unwrap();
            assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(y, m, d).unwrap());
        }
    }

    #[test]
    fn test_convert_date_rejects_other_layouts() {
        assert!(convert_date("2024-01-05").is_err());
        assert!(convert_date("13/01/24").is_err());
        assert!(convert_date("02/30/24").is_err());
        assert!(convert_date("01/05/2024").is_err());
        assert!(convert_date("TBD").is_err());
    }

    #[test]
    fn test_is_person_id() {
        assert!(is_person_id("100234"));
        assert!(is_person_id("0"));
        assert!(!is_person_id(""));
        assert!(!is_person_id("svc-account"));
        assert!(!is_person_id("12a"));
        assert!(!is_person_id(" 12"));
        assert!(!is_person_id("-12"));
        assert!(!is_person_id("\u{ff11}\u{ff12}"));
    }

    #[test]
    fn test_build_item_full_row() {
        let item = build_item(&valid_row(), fixed_now()).unwrap().unwrap();

        assert_eq!(item.lms_user_id, 100234);
        assert_eq!(item.activity_id, 5512);
        assert_eq!(item.calnet_uid, "1234567");
        assert_eq!(item.empl_id, "010203040");
        assert_eq!(item.full_name, "Lovelace, Ada");
        assert_eq!(item.empl_org_code, "CSCI");
        assert_eq!(item.manager_empl_id, "null");
        assert!(item.is_required);
        assert_eq!(item.assignment_status, "Completed");
        assert_eq!(item.assigned_date, "2024-01-05T00:00:00");
        assert_eq!(item.due_date, "2024-02-04T00:00:00");
        assert_eq!(item.expiration_date, "");
        assert_eq!(item.last_attempt_date, "2024-01-31T00:00:00");
        assert_eq!(item.last_updated_datetime, "2024-03-15T09:30:12");
        assert_eq!(item.last_updated_event_id, 0);
    }

    #[test]
    fn test_build_item_is_deterministic() {
        let row = valid_row();
        assert_eq!(build_item(&row, fixed_now()).unwrap(), build_item(&row, fixed_now()).unwrap());
    }

    #[test]
    fn test_not_required_status() {
        let row = with_field(&valid_row(), "AssignmentStatus", "Optional");
        assert!(!build_item(&row, fixed_now()).unwrap().unwrap().is_required);

        let row = with_field(&valid_row(), "AssignmentStatus", "required");
        assert!(!build_item(&row, fixed_now()).unwrap().unwrap().is_required);
    }

    #[test]
    fn test_non_person_rows_are_skipped() {
        for username in ["training-admin", "", "12 34", "x100"] {
            let row = with_field(&valid_row(), "Username", username);
            assert!(build_item(&row, fixed_now()).unwrap().is_none(), "{username:?}");
        }

        let row = without_field(&valid_row(), "Username");
        assert!(build_item(&row, fixed_now()).unwrap().is_none());
    }

    #[test]
    fn test_skip_wins_over_malformed_fields() {
        let row = with_field(&valid_row(), "Username", "svc");
        let row = with_field(&row, "DueDate", "garbage");
        assert!(build_item(&row, fixed_now()).unwrap().is_none());
    }

    #[test]
    fn test_absent_nullable_and_date_columns() {
        let row = without_field(&valid_row(), "LocalEmployeeID");
        let row = without_field(&row, "PlanDate");
        let item = build_item(&row, fixed_now()).unwrap().unwrap();

        assert_eq!(item.empl_id, "null");
        assert_eq!(item.assigned_date, "");
    }

    #[test]
    fn test_bad_date_is_build_error() {
        let row = with_field(&valid_row(), "DueDate", "2024-02-04");
        let err = build_item(&row, fixed_now()).unwrap_err();

        assert_eq!(err.row, row);
        assert!(matches!(
            err.cause,
            BuildCause::InvalidDate { column: "DueDate", ref value, .. } if value == "2024-02-04"
        ));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_bad_activity_id_is_build_error() {
        let row = with_field(&valid_row(), "ActivityIDSource", "A-17");
        let err = build_item(&row, fixed_now()).unwrap_err();
        assert!(matches!(err.cause, BuildCause::InvalidInteger { column: "ActivityIDSource", .. }));
    }

    #[test]
    fn test_overflowing_username_is_build_error() {
        let row = with_field(&valid_row(), "Username", "99999999999999999999999");
        let err = build_item(&row, fixed_now()).unwrap_err();
        assert!(matches!(err.cause, BuildCause::InvalidInteger { column: "Username", .. }));
    }

    #[test]
    fn test_missing_required_column_is_build_error() {
        let row = without_field(&valid_row(), "ActivityName");
        let err = build_item(&row, fixed_now()).unwrap_err();
        assert_eq!(err.cause, BuildCause::MissingColumn("ActivityName"));
    }
}
