//! Row access rules of the embedded backend, matching the hosted project's
//! row-level security setup.

use crate::backend::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

pub fn allows(table: Table, operation: Operation, authenticated: bool) -> bool {
    if authenticated {
        return true;
    }
    matches!(
        (table, operation),
        (Table::Courses, Operation::Select)
            | (Table::Updates, Operation::Select)
            | (Table::Applications, Operation::Insert)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visitors_read_catalog_and_submit_applications() {
        assert!(allows(Table::Courses, Operation::Select, false));
        assert!(allows(Table::Updates, Operation::Select, false));
        assert!(allows(Table::Applications, Operation::Insert, false));
    }

    #[test]
    fn visitors_cannot_review_or_manage() {
        assert!(!allows(Table::Applications, Operation::Select, false));
        assert!(!allows(Table::Applications, Operation::Update, false));
        assert!(!allows(Table::Courses, Operation::Insert, false));
        assert!(!allows(Table::Updates, Operation::Delete, false));
    }

    #[test]
    fn sessions_may_do_everything() {
        for table in [Table::Courses, Table::Updates, Table::Applications] {
            for op in [Operation::Select, Operation::Insert, Operation::Update, Operation::Delete] {
                assert!(allows(table, op, true));
            }
        }
    }
}
