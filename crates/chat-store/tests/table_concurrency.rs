// crates/chat-store/tests/table_concurrency.rs
use std::sync::{Arc, Barrier};
use std::thread;

use chat_core::{IdentityRecord, IdentityRegistry, RegistryError};
use chat_store::{TableRegistry, TableSettings};

const HANDLES: usize = 8;

fn settings(dir: &tempfile::TempDir) -> TableSettings {
    TableSettings::parse(&format!(
        "DataSource={}",
        dir.path().join("race.db").display()
    ))
    .unwrap()
}

/// One handle per "process", all on the same file.
fn open_handles(dir: &tempfile::TempDir) -> Vec<Arc<TableRegistry>> {
    let settings = settings(dir);
    (0..HANDLES)
        .map(|i| Arc::new(TableRegistry::open(&settings, &format!("instance-{}", i)).unwrap()))
        .collect()
}

#[test]
fn racing_handles_have_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let handles = open_handles(&dir);

    for round in 0..20 {
        let barrier = Arc::new(Barrier::new(HANDLES));
        let name = format!("Alice{}", round);

        let threads: Vec<_> = handles
            .iter()
            .enumerate()
            .map(|(i, table)| {
                let table = table.clone();
                let barrier = barrier.clone();
                let rec = IdentityRecord::new(
                    if i % 2 == 0 { name.clone() } else { name.to_uppercase() },
                    format!("r{}-c{}", round, i),
                    "lobby",
                )
                .unwrap();
                thread::spawn(move || {
                    barrier.wait();
                    table.upsert(rec)
                })
            })
            .collect();

        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "round {}: {:?}", round, results);
        for result in &results {
            match result {
                Ok(()) | Err(RegistryError::NameInUse { .. }) => {}
                Err(other) => panic!("round {}: unexpected error {:?}", round, other),
            }
        }

        let holder = handles[0].get_by_name(&name).unwrap();
        assert!(holder.is_some(), "round {}", round);
    }

    assert_eq!(handles[0].count().unwrap(), 20);
}

#[test]
fn racing_renames_keep_one_row_per_connection() {
    let dir = tempfile::tempdir().unwrap();
    let handles = open_handles(&dir);
    let barrier = Arc::new(Barrier::new(HANDLES));

    // Each handle renames its own connection back and forth.
    let threads: Vec<_> = handles
        .iter()
        .enumerate()
        .map(|(i, table)| {
            let table = table.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for step in 0..25 {
                    let name = format!("user{}-{}", i, step % 2);
                    let rec = IdentityRecord::new(name, format!("c{}", i), "lobby").unwrap();
                    table.upsert(rec).unwrap();
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(handles[0].count().unwrap(), HANDLES);
    for i in 0..HANDLES {
        let rec = handles[0].get_by_connection_id(&format!("c{}", i)).unwrap().unwrap();
        assert_eq!(rec.name(), format!("user{}-0", i));
    }
}
