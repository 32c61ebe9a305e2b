//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for column customization integration tests.

#![allow(dead_code)]

use column_engine::{ColumnCustomSession, ColumnCustomSnapshot};
use engine::{ColumnDefinition, FixedSide};
use serde_json::json;

/// Test harness holding a column set and a customization session over it.
pub struct TestHarness {
    pub columns: Vec<ColumnDefinition>,
    pub session: ColumnCustomSession,
}

impl TestHarness {
    /// Create a harness over the given columns with no persisted state.
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        let session = ColumnCustomSession::new(&columns, None);
        TestHarness { columns, session }
    }

    /// Create a harness with a sample order table (seq, 5 data columns, one unkeyed).
    pub fn with_sample_columns() -> Self {
        Self::new(sample_columns())
    }

    /// Create a harness that starts from a persisted snapshot.
    pub fn with_persisted(snapshot: &ColumnCustomSnapshot) -> Self {
        let columns = sample_columns();
        let session = ColumnCustomSession::new(&columns, Some(snapshot));
        TestHarness { columns, session }
    }

    pub fn open(&mut self) {
        self.session.open(&self.columns);
    }

    pub fn cancel(&mut self) {
        self.session.cancel(&self.columns);
    }

    pub fn confirm(&mut self) -> ColumnCustomSnapshot {
        self.session.confirm(&self.columns).clone()
    }

    pub fn reset(&mut self) -> ColumnCustomSnapshot {
        self.session.reset(&self.columns).clone()
    }

    /// Replace the column set, as when the host reconfigures the table.
    pub fn replace_columns(&mut self, columns: Vec<ColumnDefinition>) {
        self.columns = columns;
    }

    pub fn draft_order(&self) -> Vec<&str> {
        self.session.draft.order.iter().map(String::as_str).collect()
    }

    pub fn current_order(&self) -> Vec<&str> {
        self.session.current.order.iter().map(String::as_str).collect()
    }
}

pub fn sample_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("index").with_type("seq").with_fixed(FixedSide::Left),
        ColumnDefinition::new("orderNo").with_title("Order No.").with_sortable(true),
        ColumnDefinition::from_data_index("customer").with_title("Customer"),
        ColumnDefinition::new("amount")
            .with_title("Amount")
            .with_sorter(json!("number"))
            .with_filters(vec![json!({"text": "> 100", "value": 100})]),
        ColumnDefinition::new("status").with_title("Status").with_hidden(true),
        ColumnDefinition::new("actions").with_title("Actions").with_fixed(FixedSide::Right),
        ColumnDefinition::default().with_title("Notes"),
    ]
}
