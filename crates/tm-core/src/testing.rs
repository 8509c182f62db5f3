//! In-memory test doubles for the engine tests
//!
//! `MockDb` stands in for one database: its driver and handle share a
//! `MockState` cell, and every backend call is appended to a journal that
//! can be shared across several mock databases to assert cross-database
//! ordering.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;
use tm_db::{DbError, DbResult, Driver, Handle, Wildcards};

pub(crate) type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Default, Debug)]
pub(crate) struct MockState {
    /// Remaining pings that fail before ping starts succeeding.
    pub ping_failures: usize,
    /// Total pings observed.
    pub pings: usize,
    /// Whether the database "exists".
    pub exists: bool,
    pub created: usize,
    pub dropped: usize,
    /// Whether the ledger table exists.
    pub table_exists: bool,
    /// Applied versions.
    pub ledger: HashSet<String>,
    /// Successfully executed SQL batches.
    pub statements: Vec<String>,
    /// When set, `execute_batch` fails for SQL containing this substring.
    pub fail_on: Option<String>,
    /// When set, `dump_schema` fails.
    pub dump_fails: bool,
    pub wildcards: Wildcards,
}

pub(crate) struct MockDb {
    pub name: &'static str,
    pub state: Rc<RefCell<MockState>>,
    pub journal: Journal,
}

impl MockDb {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            state: Rc::new(RefCell::new(MockState::default())),
            journal: Rc::clone(journal),
        }
    }

    pub fn driver(&self) -> Box<dyn Driver> {
        Box::new(MockDriver {
            name: self.name,
            state: Rc::clone(&self.state),
            journal: Rc::clone(&self.journal),
        })
    }

    /// Journal entries belonging to this database, without the name prefix.
    pub fn events(&self) -> Vec<String> {
        let prefix = format!("{}:", self.name);
        self.journal
            .borrow()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

#[derive(Debug)]
pub(crate) struct MockDriver {
    name: &'static str,
    state: Rc<RefCell<MockState>>,
    journal: Journal,
}

impl MockDriver {
    fn record(&self, event: &str) {
        self.journal
            .borrow_mut()
            .push(format!("{}:{event}", self.name));
    }
}

impl Driver for MockDriver {
    fn open(&self) -> DbResult<Box<dyn Handle>> {
        Ok(Box::new(MockHandle {
            name: self.name,
            state: Rc::clone(&self.state),
            journal: Rc::clone(&self.journal),
        }))
    }

    fn ping(&self) -> DbResult<()> {
        let mut state = self.state.borrow_mut();
        state.pings += 1;
        if state.ping_failures > 0 {
            state.ping_failures -= 1;
            return Err(DbError::ExecutionError("connection refused".to_string()));
        }
        Ok(())
    }

    fn database_exists(&self) -> DbResult<bool> {
        Ok(self.state.borrow().exists)
    }

    fn create_database(&self) -> DbResult<()> {
        let mut state = self.state.borrow_mut();
        state.created += 1;
        state.exists = true;
        drop(state);
        self.record("create_database");
        Ok(())
    }

    fn drop_database(&self) -> DbResult<()> {
        let mut state = self.state.borrow_mut();
        state.dropped += 1;
        state.exists = false;
        drop(state);
        self.record("drop_database");
        Ok(())
    }

    fn wildcards(&self) -> Wildcards {
        self.state.borrow().wildcards.clone()
    }
}

pub(crate) struct MockHandle {
    name: &'static str,
    state: Rc<RefCell<MockState>>,
    journal: Journal,
}

impl MockHandle {
    fn record(&self, event: &str) {
        self.journal
            .borrow_mut()
            .push(format!("{}:{event}", self.name));
    }
}

impl Handle for MockHandle {
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let fail = self
            .state
            .borrow()
            .fail_on
            .as_deref()
            .is_some_and(|needle| sql.contains(needle));
        if fail {
            self.record("exec-failed");
            return Err(DbError::ExecutionError("simulated failure".to_string()));
        }

        self.state.borrow_mut().statements.push(sql.to_string());
        self.record("exec");
        Ok(())
    }

    fn transaction(&self, body: &mut dyn FnMut() -> DbResult<()>) -> DbResult<()> {
        self.record("begin");
        let snapshot = self.state.borrow().ledger.clone();

        match body() {
            Ok(()) => {
                self.record("commit");
                Ok(())
            }
            Err(err) => {
                self.state.borrow_mut().ledger = snapshot;
                self.record("rollback");
                Err(err)
            }
        }
    }

    fn migrations_table_exists(&self) -> DbResult<bool> {
        Ok(self.state.borrow().table_exists)
    }

    fn create_migrations_table(&self) -> DbResult<()> {
        self.state.borrow_mut().table_exists = true;
        self.record("create_table");
        Ok(())
    }

    fn applied_migrations(&self) -> DbResult<HashSet<String>> {
        Ok(self.state.borrow().ledger.clone())
    }

    fn latest_migration(&self) -> DbResult<Option<String>> {
        Ok(self.state.borrow().ledger.iter().max().cloned())
    }

    fn insert_migration(&self, version: &str) -> DbResult<()> {
        self.state.borrow_mut().ledger.insert(version.to_string());
        self.record(&format!("insert {version}"));
        Ok(())
    }

    fn delete_migration(&self, version: &str) -> DbResult<()> {
        self.state.borrow_mut().ledger.remove(version);
        self.record(&format!("delete {version}"));
        Ok(())
    }

    fn dump_schema(&self) -> DbResult<Vec<u8>> {
        if self.state.borrow().dump_fails {
            return Err(DbError::DumpError("simulated dump failure".to_string()));
        }
        self.record("dump");
        Ok(b"-- mock schema\n".to_vec())
    }
}

/// A `Write` sink that can be cloned into a `Migrator` and read back
/// afterwards.
#[derive(Clone, Default)]
pub(crate) struct SharedLog(Rc<RefCell<Vec<u8>>>);

impl SharedLog {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl io::Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
