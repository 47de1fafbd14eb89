//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::cell::RefCell;

use chrono::{NaiveDate, NaiveDateTime};
use tidalcore_core::{Account, Checkin, Store, StoreError, StoreResult, TableName, Visit};

/// One interaction with the store, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read(TableName),
    Clear(TableName),
    Execute(String),
}

/// Store double that serves fixed records and records every call
#[derive(Default)]
pub struct RecordingStore {
    pub accounts: Vec<Account>,
    pub checkins: Vec<Checkin>,
    pub visits: Vec<Visit>,
    pub fail_clear: Option<TableName>,
    pub fail_execute_containing: Option<String>,
    calls: RefCell<Vec<Call>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `clear_table` fails for `table`
    pub fn failing_clear(table: TableName) -> Self {
        Self {
            fail_clear: Some(table),
            ..Self::default()
        }
    }

    /// A store whose `execute` fails for statements containing `needle`
    pub fn failing_execute(needle: &str) -> Self {
        Self {
            fail_execute_containing: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clears(&self) -> Vec<TableName> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Clear(table) => Some(table),
                _ => None,
            })
            .collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute(statement) => Some(statement),
                _ => None,
            })
            .collect()
    }
}

impl Store for RecordingStore {
    fn read_accounts(&self) -> StoreResult<Vec<Account>> {
        self.calls.borrow_mut().push(Call::Read(TableName::Users));
        Ok(self.accounts.clone())
    }

    fn read_checkins(&self) -> StoreResult<Vec<Checkin>> {
        self.calls.borrow_mut().push(Call::Read(TableName::Checkins));
        Ok(self.checkins.clone())
    }

    fn read_visits(&self) -> StoreResult<Vec<Visit>> {
        self.calls.borrow_mut().push(Call::Read(TableName::Visits));
        Ok(self.visits.clone())
    }

    fn clear_table(&self, table: TableName) -> StoreResult<()> {
        self.calls.borrow_mut().push(Call::Clear(table));
        if self.fail_clear == Some(table) {
            return Err(StoreError::Query("database is locked".to_string()));
        }
        Ok(())
    }

    fn execute(&self, statement: &str) -> StoreResult<usize> {
        self.calls
            .borrow_mut()
            .push(Call::Execute(statement.to_string()));
        match &self.fail_execute_containing {
            Some(needle) if statement.contains(needle.as_str()) => {
                Err(StoreError::Query("FOREIGN KEY constraint failed".to_string()))
            }
            _ => Ok(1),
        }
    }
}

pub fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, day)
        .unwrap()
        .and_hms_opt(hour, 15, 30)
        .unwrap()
}

pub fn account(id: u64, username: &str) -> Account {
    Account {
        id,
        username: username.to_string(),
        display_name: format!("{} display", username),
        password_hash: "$2a$10$N9qo8uLOickgx2ZMRZoMye".to_string(),
        is_admin: id == 1,
        title: String::new(),
        streak: 2,
        max_streak: 9,
        total_checkin: 40,
        last_checkin: None,
        created_at: ts(1, 8),
        updated_at: ts(2, 9),
        deleted_at: None,
    }
}

pub fn checkin(id: u64, user_id: u64) -> Checkin {
    Checkin {
        id,
        user_id,
        duration: 1500,
        cycles: 4,
        checked_at: ts(3, 7),
        created_at: ts(3, 7),
    }
}

pub fn visit(id: u64, visitor_id: &str) -> Visit {
    Visit {
        id,
        visitor_id: visitor_id.to_string(),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
        visited_date: "2024-04-03".to_string(),
        created_at: ts(3, 12),
    }
}

/// Two accounts (one soft-deleted), two check-ins and one visit
pub fn populated_store() -> RecordingStore {
    let mut deleted = account(2, "bob");
    deleted.deleted_at = Some(ts(5, 10));
    deleted.last_checkin = Some(ts(4, 6));

    RecordingStore {
        accounts: vec![account(1, "alice"), deleted],
        checkins: vec![checkin(1, 1), checkin(2, 2)],
        visits: vec![visit(1, "f3a9")],
        ..Default::default()
    }
}
