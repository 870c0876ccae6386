//! Several handles opening one fresh database file at the same moment.

use std::sync::Barrier;
use std::thread;

use bizmate_db::Database;

const HANDLES: usize = 4;

#[test]
fn simultaneous_opens_of_a_fresh_file_all_succeed() {
    for round in 0..20 {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bizmate.db");
        let barrier = Barrier::new(HANDLES);

        let handles: Vec<Database> = thread::scope(|s| {
            let workers: Vec<_> = (0..HANDLES)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        Database::open(&path)
                    })
                })
                .collect();

            workers
                .into_iter()
                .map(|w| {
                    w.join()
                        .unwrap()
                        .unwrap_or_else(|e| panic!("round {round}: open failed: {e}"))
                })
                .collect()
        });

        let versions: i64 = handles[0]
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(versions, 1, "round {round}");

        // Every handle sees the same, fully migrated schema.
        let id = handles[1].create_user("first@example.com", "hash").unwrap().id;
        for db in &handles {
            assert_eq!(db.get_user_by_id(id).unwrap().unwrap().email, "first@example.com");
        }
    }
}
