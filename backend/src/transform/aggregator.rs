//! Group normalized sales by their full dimension tuple.
//!
//! ```text
//! Normalized records                        Aggregated rows
//! ┌──────────────────────────────┐         ┌──────────────────────────────┐
//! │ 202401 A X Y R1  100.00  2   │         │ 202401 A X Y R1  150.50  3   │
//! │ 202401 A X Y R1   50.50  1   │   →     ├──────────────────────────────┤
//! │ 202402 B X Y R2   10.00  1   │         │ 202402 B X Y R2   10.00  1   │
//! └──────────────────────────────┘         └──────────────────────────────┘
//! ```
//!
//! Rows come out in the order their group first appears in the input, so
//! every later tie-break is reproducible.

use std::collections::HashMap;

use crate::models::{AggregatedRow, GroupKey, NormalizedRecord};

/// Sum revenue and quantity per distinct (period, store, client,
/// manufacturer, description, reference).
pub fn aggregate(records: &[NormalizedRecord]) -> Vec<AggregatedRow> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut rows: Vec<AggregatedRow> = Vec::new();

    for record in records {
        let key = GroupKey::from_record(record);
        match slots.get(&key) {
            Some(&slot) => {
                let row = &mut rows[slot];
                row.revenue += record.revenue;
                row.quantity += record.quantity;
            }
            None => {
                slots.insert(key.clone(), rows.len());
                rows.push(AggregatedRow {
                    key,
                    revenue: record.revenue,
                    quantity: record.quantity,
                });
            }
        }
    }

    rows
}
