//! Randomized checks that every derived view stays consistent with its source.
//!
//! Each view is observed by a [`Replay`], a plain `Vec` rebuilt only from the
//! operations the view dispatches. After every committed batch of source
//! edits the replay must equal the view, and the view must equal what a
//! from-scratch rebuild over the source would show.

use std::sync::Arc;

use horizon_grid::Subscription;
use horizon_grid::model::{
    ArrayTableModel, CellValue, ColumnOrder, FilteredTableModel, Operation, SelectionModel,
    SortedTableModel, TableModel, TranslatedTableModel,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;

type Rows = Vec<Vec<CellValue>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn snapshot(model: &dyn TableModel) -> Rows {
    (0..model.row_count())
        .map(|index| model.row(index).unwrap().values().to_vec())
        .collect()
}

fn keys(rows: &Rows) -> Vec<(i64, i64)> {
    rows.iter()
        .map(|row| (row[0].as_int().unwrap(), row[1].as_int().unwrap()))
        .collect()
}

fn apply(rows: &mut Rows, operation: &Operation) {
    match operation {
        Operation::AddRow { index, row } => rows.insert(*index, row.values().to_vec()),
        Operation::RemoveRow { index, row } => {
            let removed = rows.remove(*index);
            assert_eq!(removed, row.values(), "removed row snapshot is stale");
        }
        Operation::MoveRow {
            source,
            destination,
        } => {
            let row = rows.remove(*source);
            rows.insert(*destination, row);
        }
        Operation::UpdateValue {
            row,
            column,
            previous,
            current,
        } => {
            assert_eq!(&rows[*row][*column], previous, "update carries a stale value");
            rows[*row][*column] = current.clone();
        }
    }
}

/// A copy of a model maintained from its dispatched operations alone.
struct Replay {
    rows: Arc<Mutex<Rows>>,
    dispatches: Arc<Mutex<usize>>,
    _subscription: Subscription,
}

impl Replay {
    fn attach(model: &dyn TableModel) -> Self {
        let rows = Arc::new(Mutex::new(snapshot(model)));
        let dispatches = Arc::new(Mutex::new(0));
        let subscription = {
            let rows = rows.clone();
            let dispatches = dispatches.clone();
            model.signals().connect(move |operations| {
                assert!(!operations.is_empty(), "empty transaction was dispatched");
                *dispatches.lock() += 1;
                let mut rows = rows.lock();
                for operation in operations {
                    apply(&mut rows, operation);
                }
            })
        };
        Self {
            rows,
            dispatches,
            _subscription: subscription,
        }
    }

    fn rows(&self) -> Rows {
        self.rows.lock().clone()
    }

    fn dispatches(&self) -> usize {
        *self.dispatches.lock()
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Add(i64, i64),
    Insert(usize, i64, i64),
    Remove(usize),
    Move(usize, usize),
    Set(usize, usize, i64),
    Reorder(usize, usize),
    Clear,
}

fn edit() -> impl Strategy<Value = Edit> {
    let value = -4i64..5;
    prop_oneof![
        3 => (value.clone(), value.clone()).prop_map(|(a, b)| Edit::Add(a, b)),
        2 => (any::<usize>(), value.clone(), value.clone())
            .prop_map(|(at, a, b)| Edit::Insert(at, a, b)),
        2 => any::<usize>().prop_map(Edit::Remove),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(from, to)| Edit::Move(from, to)),
        3 => (any::<usize>(), 0usize..2, value.clone())
            .prop_map(|(at, column, v)| Edit::Set(at, column, v)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(from, to)| Edit::Reorder(from, to)),
        1 => Just(Edit::Clear),
    ]
}

fn row(a: i64, b: i64) -> Vec<CellValue> {
    vec![CellValue::from(a), CellValue::from(b)]
}

fn run(
    edit: &Edit,
    source: &ArrayTableModel,
    translated: &TranslatedTableModel<ArrayTableModel>,
) {
    let len = source.row_count();
    let result = match *edit {
        Edit::Add(a, b) => source.add_row(row(a, b)),
        Edit::Insert(at, a, b) => source.insert_row(at % (len + 1), row(a, b)),
        Edit::Remove(at) if len > 0 => source.remove_row(at % len).map(drop),
        Edit::Move(from, to) if len > 0 => source.move_row(from % len, to % len),
        Edit::Set(at, column, value) if len > 0 => source.set(at % len, column, value),
        Edit::Reorder(from, to) => {
            // The translated view lags behind the source inside a transaction.
            let len = translated.row_count();
            if len == 0 {
                return;
            }
            translated.move_row(from % len, to % len)
        }
        Edit::Clear => {
            source.clear();
            Ok(())
        }
        _ => Ok(()),
    };
    result.unwrap();
}

fn positive(value: &CellValue) -> bool {
    value.as_int().is_some_and(|n| n > 0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn views_match_replay_and_rebuild(
        initial in prop::collection::vec((-4i64..5, -4i64..5), 0..8),
        batches in prop::collection::vec((prop::collection::vec(edit(), 1..6), any::<bool>()), 1..16),
    ) {
        init_tracing();

        let rows = initial.iter().map(|&(a, b)| row(a, b)).collect();
        let source = Arc::new(ArrayTableModel::from_rows(rows).unwrap());
        let translated = TranslatedTableModel::new(source.clone());
        let filtered = FilteredTableModel::new(source.clone(), 0, positive).unwrap();
        let sorted = SortedTableModel::builder(filtered.clone())
            .then_by(ColumnOrder::ascending(0))
            .then_by(ColumnOrder::ascending(1))
            .build()
            .unwrap();
        let selection = SelectionModel::new(&*sorted);

        let source_replay = Replay::attach(&*source);
        let translated_replay = Replay::attach(&*translated);
        let filtered_replay = Replay::attach(&*filtered);
        let sorted_replay = Replay::attach(&*sorted);

        for (edits, batched) in &batches {
            let before = source_replay.dispatches();
            if *batched {
                source.transaction(|| {
                    for edit in edits {
                        run(edit, &source, &translated);
                    }
                });
                prop_assert!(source_replay.dispatches() <= before + 1);
            } else {
                for edit in edits {
                    run(edit, &source, &translated);
                }
            }

            let source_rows = snapshot(&*source);
            prop_assert_eq!(&source_replay.rows(), &source_rows);

            // Translated: a permutation of the source, reproduced by its replay.
            let translated_rows = snapshot(&*translated);
            prop_assert_eq!(&translated_replay.rows(), &translated_rows);
            let mut references = translated.references();
            references.sort_unstable();
            prop_assert_eq!(references, (0..source_rows.len()).collect::<Vec<_>>());
            for (logical, physical) in translated.references().into_iter().enumerate() {
                prop_assert_eq!(&translated_rows[logical], &source_rows[physical]);
            }

            // Filtered: exactly the passing source rows, in source order.
            let rebuilt: Rows = source_rows
                .iter()
                .filter(|row| positive(&row[0]))
                .cloned()
                .collect();
            let filtered_rows = snapshot(&*filtered);
            prop_assert_eq!(&filtered_rows, &rebuilt);
            prop_assert_eq!(&filtered_replay.rows(), &filtered_rows);

            // Sorted: ordered, and a permutation of the filtered rows.
            let sorted_rows = snapshot(&*sorted);
            prop_assert_eq!(&sorted_replay.rows(), &sorted_rows);
            let sorted_keys = keys(&sorted_rows);
            prop_assert!(sorted_keys.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", sorted_keys);
            let mut expected = keys(&rebuilt);
            expected.sort_unstable();
            prop_assert_eq!(sorted_keys, expected);

            prop_assert_eq!(selection.row_count(), sorted.row_count());
            prop_assert!(selection.selected_rows().iter().all(|&row| row < sorted.row_count()));
        }
    }
}
