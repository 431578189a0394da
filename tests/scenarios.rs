//! Row identity, write-back timing and severance through the public API

mod common;

use common::{memory_table, record, records};
use csvtie::{Table, TableOptions, Warning, WriteBack};

// ========================================================================
// Identity
// ========================================================================

#[test]
fn test_repeated_get_returns_same_row() {
    let table = memory_table(&["a,b,c", "d,e,f"], TableOptions::default());
    let first = table.get(0).unwrap().unwrap();
    let second = table.get(0).unwrap().unwrap();

    first.set(1, "B").unwrap();
    assert_eq!(second.get(1).as_deref(), Some("B"));
    assert!(first.same_row(&second));
}

#[test]
fn test_released_row_is_decoded_fresh() {
    let table = memory_table(&["a,b,c"], TableOptions::default());
    let first = table.get(0).unwrap().unwrap();
    first.set(0, "X").unwrap();
    drop(first);

    let second = table.get(0).unwrap().unwrap();
    assert_eq!(second.fields(), record(&["X", "b", "c"]));
    assert!(!second.is_dirty());
}

#[test]
fn test_cache_does_not_grow_with_rows_touched() {
    let lines: Vec<String> = (0..500).map(|i| format!("row{},{}", i, i)).collect();
    let table = Table::in_memory(&lines, TableOptions::default()).unwrap();

    for index in 0..table.len() {
        let row = table.get(index).unwrap().unwrap();
        assert_eq!(row.get(0), Some(format!("row{}", index)));
    }
    assert_eq!(table.cached_rows(), 0);
}

// ========================================================================
// Write-back timing
// ========================================================================

#[test]
fn test_deferred_write_visible_only_after_release() {
    let table = memory_table(&["a,b,c"], TableOptions::default());
    let row = table.get(0).unwrap().unwrap();
    assert_eq!(row.write_back(), WriteBack::Deferred);

    row.set(0, "X").unwrap();
    assert_eq!(records(&table), vec![record(&["a", "b", "c"])]);

    row.release().unwrap();
    assert_eq!(records(&table), vec![record(&["X", "b", "c"])]);
}

#[test]
fn test_deferred_write_visible_after_explicit_flush() {
    let table = memory_table(&["a,b,c"], TableOptions::default());
    let row = table.get(0).unwrap().unwrap();

    row.resize(1).unwrap();
    row.flush().unwrap();
    assert_eq!(records(&table), vec![record(&["a"])]);

    // Flushing again with nothing pending writes nothing new
    row.flush().unwrap();
    assert!(!row.is_dirty());
}

#[test]
fn test_immediate_write_visible_at_once() {
    let table = memory_table(&["a,b,c"], TableOptions::immediate());
    let row = table.get(0).unwrap().unwrap();

    row.set(2, "C").unwrap();
    assert_eq!(records(&table), vec![record(&["a", "b", "C"])]);

    row.unshift("first").unwrap();
    assert_eq!(records(&table), vec![record(&["first", "a", "b", "C"])]);
}

// ========================================================================
// Scenario A: a held row follows its line when earlier lines go away
// ========================================================================

#[test]
fn test_scenario_held_row_is_reindexed() {
    let mut table = memory_table(&["a,b,c", "d,e,f", "g,h,i"], TableOptions::default());

    let held = table.get(1).unwrap().unwrap();
    assert_eq!(held.fields(), record(&["d", "e", "f"]));

    let removed = table.remove_range(0, 1).unwrap();
    assert_eq!(removed, vec![record(&["a", "b", "c"])]);

    let now_first = table.get(0).unwrap().unwrap();
    assert_eq!(now_first.fields(), record(&["d", "e", "f"]));
    assert_eq!(held.index(), Some(0));
    assert!(held.same_row(&now_first));

    // The moved row still writes to the right line
    held.set(0, "D").unwrap();
    drop(held);
    drop(now_first);
    assert_eq!(
        records(&table),
        vec![record(&["D", "e", "f"]), record(&["g", "h", "i"])]
    );
}

// ========================================================================
// Scenario B: writing through a row whose line was removed
// ========================================================================

#[test]
fn test_scenario_write_to_severed_row() {
    for options in [TableOptions::default(), TableOptions::immediate()] {
        let mut table = memory_table(&["a,b,c", "d,e,f", "g,h,i"], options);
        let held = table.get(0).unwrap().unwrap();

        table.remove_range(0, 1).unwrap();
        assert!(held.is_severed());
        let before = records(&table);

        held.set(0, "X").unwrap();
        held.release().unwrap();

        assert_eq!(records(&table), before);
        assert_eq!(
            table.take_warnings(),
            vec![Warning::SeveredWrite {
                fields: record(&["X", "b", "c"])
            }]
        );
    }
}

#[test]
fn test_severed_row_stays_usable_in_memory() {
    let mut table = memory_table(&["a,b", "c,d"], TableOptions::default());
    let held = table.get(1).unwrap().unwrap();
    table.pop().unwrap();

    held.push("e").unwrap();
    held.shift().unwrap();
    assert_eq!(held.fields(), record(&["d", "e"]));
    assert!(held.is_severed());

    // A new row appended at the old index is a different row
    table.push(&[["new"]]).unwrap();
    let fresh = table.get(1).unwrap().unwrap();
    assert!(!fresh.same_row(&held));
    assert_eq!(fresh.fields(), record(&["new"]));
}

#[test]
fn test_dirty_row_severed_before_flush_writes_nothing() {
    let mut table = memory_table(&["a", "b", "c"], TableOptions::default());
    let held = table.get(1).unwrap().unwrap();
    held.set(0, "pending").unwrap();

    table.splice(1, 1, &[["replacement"]]).unwrap();
    drop(held);

    assert_eq!(
        records(&table),
        vec![record(&["a"]), record(&["replacement"]), record(&["c"])]
    );
    assert_eq!(table.take_warnings().len(), 1);
}

#[test]
fn test_dirty_row_reindexed_before_flush_writes_new_index() {
    let mut table = memory_table(&["a", "b", "c"], TableOptions::default());
    let held = table.get(2).unwrap().unwrap();
    held.set(0, "pending").unwrap();

    table.unshift(&[["x"], ["y"]]).unwrap();
    assert_eq!(held.index(), Some(4));
    drop(held);

    assert_eq!(
        records(&table),
        vec![
            record(&["x"]),
            record(&["y"]),
            record(&["a"]),
            record(&["b"]),
            record(&["pending"])
        ]
    );
}

// ========================================================================
// Derived operations
// ========================================================================

#[test]
fn test_push_pop_shift_unshift() {
    let mut table = memory_table(&[], TableOptions::default());
    assert!(table.is_empty());
    assert_eq!(table.pop().unwrap(), None);
    assert_eq!(table.shift().unwrap(), None);

    table.push(&[["1", "one"], ["2", "two"]]).unwrap();
    table.unshift(&[["0", "zero"]]).unwrap();
    assert_eq!(table.len(), 3);

    assert_eq!(table.pop().unwrap(), Some(record(&["2", "two"])));
    assert_eq!(table.shift().unwrap(), Some(record(&["0", "zero"])));
    assert_eq!(records(&table), vec![record(&["1", "one"])]);
}

#[test]
fn test_insert_moves_later_rows() {
    let mut table = memory_table(&["a", "b"], TableOptions::default());
    let first = table.get(0).unwrap().unwrap();
    let second = table.get(1).unwrap().unwrap();

    table.insert(1, &[vec!["mid"]]).unwrap();
    assert_eq!(first.index(), Some(0));
    assert_eq!(second.index(), Some(2));
    assert!(table.exists(2));
    assert!(!table.exists(3));
}

#[test]
fn test_resize_and_clear() {
    let mut table = memory_table(&["a", "b", "c"], TableOptions::default());
    let last = table.get(2).unwrap().unwrap();

    table.resize(2).unwrap();
    assert!(last.is_severed());
    table.resize(4).unwrap();
    assert_eq!(
        records(&table),
        vec![record(&["a"]), record(&["b"]), vec![], vec![]]
    );

    table.clear().unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_splice_replace_in_middle() {
    let mut table = memory_table(&["a", "b", "c", "d"], TableOptions::default());
    let rows: Vec<_> = (0..4).map(|i| table.get(i).unwrap().unwrap()).collect();

    let removed = table
        .splice(1, 2, &[["x"], ["y"], ["z"]])
        .unwrap();
    assert_eq!(removed, vec![record(&["b"]), record(&["c"])]);

    let indices: Vec<_> = rows.iter().map(|r| r.index()).collect();
    assert_eq!(indices, vec![Some(0), None, None, Some(4)]);
    assert_eq!(table.get(4).unwrap().unwrap().fields(), record(&["d"]));
}

#[test]
fn test_set_with_live_row_keeps_index_fidelity() {
    let mut table = memory_table(&["a,b"], TableOptions::default());
    let row = table.get(0).unwrap().unwrap();
    table.set(0, &["c", "d"]).unwrap();
    assert_eq!(row.fields(), record(&["c", "d"]));

    row.set(1, "D").unwrap();
    drop(row);
    assert_eq!(records(&table), vec![record(&["c", "D"])]);
}

#[test]
fn test_encode_error_on_set_leaves_table_unchanged() {
    let mut table = memory_table(&["a,b"], TableOptions::default());
    let err = table.set(0, &["line\nbreak"]).unwrap_err();
    assert!(err.is_encode());
    assert_eq!(records(&table), vec![record(&["a", "b"])]);
}
