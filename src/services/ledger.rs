use crate::models::{EntryType, LedgerEntry, Purchase, Sale};

/// Merges a product's purchases and sales into one ledger ordered by date.
///
/// Every entry carries the product's current unit price. Entries sharing a
/// timestamp list inflows before outflows, then by id.
pub fn merge(unit: i64, purchases: Vec<Purchase>, sales: Vec<Sale>) -> Vec<LedgerEntry> {
    let inflows = purchases.into_iter().map(|p| LedgerEntry {
        id: p.id,
        unit,
        quantity: p.quantity,
        entry_type: EntryType::Inflow,
        date: p.purchase_date,
    });
    let outflows = sales.into_iter().map(|s| LedgerEntry {
        id: s.id,
        unit,
        quantity: s.quantity,
        entry_type: EntryType::Outflow,
        date: s.sales_date,
    });

    let mut entries: Vec<LedgerEntry> = inflows.chain(outflows).collect();
    entries.sort_by(|a, b| (a.date, a.entry_type, a.id).cmp(&(b.date, b.entry_type, b.id)));
    entries
}
