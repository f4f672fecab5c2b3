use entitystore::db::open_db_in_memory;
use entitystore::{Entity, EntityRepository, EntityScanQuery, RepoError, SqliteEntityRepository};
use std::collections::HashSet;

#[test]
fn put_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    repo.put(b"user:1", b"alice").unwrap();

    let value = repo.get(b"user:1").unwrap();
    assert_eq!(value, b"alice");
}

#[test]
fn put_overwrites_previous_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    repo.put(b"user:1", b"alice").unwrap();
    repo.put(b"user:1", b"bob").unwrap();

    assert_eq!(repo.get(b"user:1").unwrap(), b"bob");
    assert_eq!(repo.get_all().unwrap().len(), 1);
}

#[test]
fn get_missing_key_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    let err = repo.get(b"missing").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(key) if key == b"missing"));
}

#[test]
fn key_exists_tracks_entry_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    assert!(!repo.key_exists(b"k").unwrap());

    repo.put(b"k", b"v").unwrap();
    assert!(repo.key_exists(b"k").unwrap());

    repo.delete(b"k").unwrap();
    assert!(!repo.key_exists(b"k").unwrap());
}

#[test]
fn get_all_returns_every_entry_exactly_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    let written: Vec<(Vec<u8>, Vec<u8>)> = (0..10)
        .map(|n| {
            (
                format!("key:{n}").into_bytes(),
                format!("value:{n}").into_bytes(),
            )
        })
        .collect();
    for (key, value) in &written {
        repo.put(key, value).unwrap();
    }

    let entities = repo.get_all().unwrap();
    assert_eq!(entities.len(), written.len());

    let expected: HashSet<(Vec<u8>, Vec<u8>)> = written.into_iter().collect();
    let actual: HashSet<(Vec<u8>, Vec<u8>)> = entities
        .into_iter()
        .map(|entity| (entity.key, entity.value))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn get_all_is_ordered_by_key_bytes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    repo.put(b"b", b"2").unwrap();
    repo.put(b"a", b"1").unwrap();
    repo.put(b"c", b"3").unwrap();

    let keys: Vec<Vec<u8>> = repo
        .get_all()
        .unwrap()
        .into_iter()
        .map(|entity| entity.key)
        .collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn delete_of_absent_key_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    repo.delete(b"never-written").unwrap();
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    repo.put(b"k", b"v").unwrap();
    repo.delete(b"k").unwrap();
    repo.delete(b"k").unwrap();

    assert!(!repo.key_exists(b"k").unwrap());
}

#[test]
fn binary_keys_and_values_survive_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    let key = vec![0x00, 0xff, 0x10, 0x00];
    let value = vec![0xde, 0xad, 0xbe, 0xef, 0x00];
    repo.put(&key, &value).unwrap();

    assert_eq!(repo.get(&key).unwrap(), value);
    assert_eq!(repo.get_all().unwrap(), vec![Entity::new(key, value)]);
}

#[test]
fn scan_pages_through_the_keyspace_in_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    for n in 0..7 {
        repo.put(format!("key:{n}").as_bytes(), b"v").unwrap();
    }

    let mut collected = Vec::new();
    let mut after_key: Option<Vec<u8>> = None;
    loop {
        let page = repo
            .scan_entities(&EntityScanQuery {
                after_key: after_key.clone(),
                limit: Some(3),
            })
            .unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 3);
        after_key = Some(page.last().unwrap().key.clone());
        collected.extend(page.into_iter().map(|entity| entity.key));
    }

    let expected: Vec<Vec<u8>> = (0..7).map(|n| format!("key:{n}").into_bytes()).collect();
    assert_eq!(collected, expected);
}

#[test]
fn scan_after_key_is_exclusive() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::new(&conn);

    repo.put(b"a", b"1").unwrap();
    repo.put(b"b", b"2").unwrap();

    let page = repo
        .scan_entities(&EntityScanQuery {
            after_key: Some(b"a".to_vec()),
            limit: None,
        })
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].key, b"b");
}
