//! Shared fixtures for the loader integration tests
//!
//! Extracts are written to a temporary directory with the full header row so
//! tests exercise the same path as a real load.

#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;

pub const HEADER: &str = "Username,ActivityIDSource,SourceIDEmpPk,LocalEmployeeID,EmpFullName1,FirstName,LastName,UserPrimaryOrganizationCode,ManagerLocalEmployeeID,ActivityCode,ActivityName,AssignmentStatus,UCRequirementStatus,PlanDate,DueDate,ExpirationDate,AttemptEndDate,LastCompletionDateRealtime";

/// A person row for `username`/`activity_id`
pub fn person_row(username: &str, activity_id: &str) -> String {
    format!(
        "{username},{activity_id},1234567,010203040,\"Lovelace, Ada\",Ada,Lovelace,01HDCSCI,,CYBER-101,Cyber Security Awareness,Required,Completed,01/05/24,02/05/24,,01/20/24,01/20/24"
    )
}

/// A CSV extract on disk; the directory is removed on drop
pub struct Extract {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Extract {
    pub fn write(rows: &[String]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("assignments.csv");

        let mut contents = String::from(HEADER);
        for row in rows {
            contents.push('\n');
            contents.push_str(row);
        }
        contents.push('\n');
        std::fs::write(&path, contents).expect("Failed to write extract");

        Self { _dir: dir, path }
    }

    /// `count` person rows for one user, activity ids 1..=count
    pub fn with_people(count: usize) -> Self {
        let rows: Vec<String> = (1..=count).map(|id| person_row("100234", &id.to_string())).collect();
        Self::write(&rows)
    }
}
