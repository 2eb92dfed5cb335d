//! Contract tests every metadata backend must pass.
//!
//! The key-value store, the document store and the mock are run through
//! identical assertions: any divergence between them would make a
//! backend swap (and therefore migration) observable to callers.

#[cfg(test)]
mod contract_tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::errors::GalleryError;
    use crate::metadata::document_store::DocumentMetadataStore;
    use crate::metadata::keyvalue_store::KeyValueMetadataStore;
    use crate::metadata::mock_store::MockMetadataStore;
    use crate::metadata::{MetadataStore, PhotoRecord, UpsertOutcome, UserRecord};

    fn with_each_backend(check: impl Fn(&str, &dyn MetadataStore)) {
        let dir = TempDir::new().unwrap();
        let kv = KeyValueMetadataStore::open(dir.path().join("kv.sqlite")).unwrap();
        check("keyvalue", &kv);
        let doc = DocumentMetadataStore::open(dir.path().join("doc.sqlite")).unwrap();
        check("document", &doc);
        let mock = MockMetadataStore::new();
        check("mock", &mock);
    }

    fn user(name: &str) -> UserRecord {
        UserRecord {
            username: name.to_string(),
            password_hash: "0123abcd".to_string(),
            email: Some(format!("{name}@example.com")),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn photo_at(id: &str, owner: &str, minutes: i64) -> PhotoRecord {
        PhotoRecord {
            photo_id: id.to_string(),
            owner: owner.to_string(),
            filename: format!("{id}.png"),
            blob_key: format!("photos/{owner}/{id}_{id}.png"),
            tags: String::new(),
            description: String::new(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_username_uniqueness() {
        with_each_backend(|name, store| {
            store.create_user(&user("alice")).unwrap();
            let mut second = user("alice");
            second.password_hash = "ffff0000".to_string();
            let result = store.create_user(&second);
            assert!(
                matches!(result, Err(GalleryError::Conflict { .. })),
                "{name}: duplicate username must conflict"
            );
            // store state unchanged by the failed create
            let stored = store.get_user("alice").unwrap().unwrap();
            assert_eq!(stored, user("alice"), "{name}");
        });
    }

    #[test]
    fn test_absent_lookups_are_none_not_errors() {
        with_each_backend(|name, store| {
            assert!(store.get_user("nobody").unwrap().is_none(), "{name}");
            assert!(store.get_photo("no-such-id").unwrap().is_none(), "{name}");
        });
    }

    #[test]
    fn test_photo_id_collision_conflicts() {
        with_each_backend(|name, store| {
            store.create_photo(&photo_at("p1", "alice", 0)).unwrap();
            let result = store.create_photo(&photo_at("p1", "bob", 1));
            assert!(
                matches!(result, Err(GalleryError::Conflict { .. })),
                "{name}: duplicate photo id must conflict"
            );
        });
    }

    #[test]
    fn test_single_photo_listing() {
        // scenario: alice uploads one photo and sees exactly it
        with_each_backend(|name, store| {
            store.create_user(&user("alice")).unwrap();
            let p1 = PhotoRecord {
                tags: "pet".to_string(),
                ..photo_at("p1", "alice", 0)
            };
            store.create_photo(&p1).unwrap();
            let listed = store.list_photos_by_owner("alice").unwrap();
            assert_eq!(listed, vec![p1], "{name}");
        });
    }

    #[test]
    fn test_listing_orders_newest_first() {
        with_each_backend(|name, store| {
            let p1 = PhotoRecord {
                tags: "pet".to_string(),
                ..photo_at("p1", "alice", 0)
            };
            let p2 = PhotoRecord {
                filename: "dog.jpg".to_string(),
                tags: "pet walk".to_string(),
                ..photo_at("p2", "alice", 5)
            };
            store.create_photo(&p1).unwrap();
            store.create_photo(&p2).unwrap();

            let listed = store.list_photos_by_owner("alice").unwrap();
            let ids: Vec<&str> = listed.iter().map(|p| p.photo_id.as_str()).collect();
            assert_eq!(ids, vec!["p2", "p1"], "{name}");

            let found = store.search_photos_by_owner("alice", "pet").unwrap();
            let ids: Vec<&str> = found.iter().map(|p| p.photo_id.as_str()).collect();
            assert_eq!(ids, vec!["p2", "p1"], "{name}: search keeps list order");

            let found = store.search_photos_by_owner("alice", "p1").unwrap();
            let ids: Vec<&str> = found.iter().map(|p| p.photo_id.as_str()).collect();
            assert_eq!(ids, vec!["p1"], "{name}");
        });
    }

    #[test]
    fn test_listing_ties_keep_insertion_order() {
        with_each_backend(|name, store| {
            // same timestamp for all three
            store.create_photo(&photo_at("first", "alice", 0)).unwrap();
            store.create_photo(&photo_at("second", "alice", 0)).unwrap();
            store.create_photo(&photo_at("third", "alice", 0)).unwrap();

            let listed = store.list_photos_by_owner("alice").unwrap();
            let ids: Vec<&str> = listed.iter().map(|p| p.photo_id.as_str()).collect();
            assert_eq!(ids, vec!["first", "second", "third"], "{name}");
        });
    }

    #[test]
    fn test_owner_isolation() {
        with_each_backend(|name, store| {
            store.create_photo(&photo_at("pa", "alice", 0)).unwrap();
            store.create_photo(&photo_at("pb", "bob", 1)).unwrap();

            let bobs = store.list_photos_by_owner("bob").unwrap();
            assert!(bobs.iter().all(|p| p.owner == "bob"), "{name}");
            assert_eq!(bobs.len(), 1, "{name}");

            // a matching query never leaks across owners
            let found = store.search_photos_by_owner("bob", "pa").unwrap();
            assert!(found.is_empty(), "{name}");
            let found = store.search_photos_by_owner("carol", ".png").unwrap();
            assert!(found.is_empty(), "{name}");
        });
    }

    #[test]
    fn test_search_matches_all_three_text_fields() {
        with_each_backend(|name, store| {
            let photo = PhotoRecord {
                filename: "IMG_0042.png".to_string(),
                tags: "Beach Holiday".to_string(),
                description: "sunset over the bay".to_string(),
                ..photo_at("p1", "alice", 0)
            };
            store.create_photo(&photo).unwrap();

            for query in ["img_0042", "beach", "SUNSET", "0042"] {
                let found = store.search_photos_by_owner("alice", query).unwrap();
                assert_eq!(found.len(), 1, "{name}: query {query:?}");
            }
            let found = store.search_photos_by_owner("alice", "mountain").unwrap();
            assert!(found.is_empty(), "{name}");
        });
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        with_each_backend(|name, store| {
            store.create_photo(&photo_at("p1", "alice", 0)).unwrap();
            store.create_photo(&photo_at("p2", "alice", 1)).unwrap();
            let found = store.search_photos_by_owner("alice", "").unwrap();
            assert!(
                found.is_empty(),
                "{name}: empty query must match nothing, not everything"
            );
        });
    }

    #[test]
    fn test_delete_photo_is_idempotent() {
        with_each_backend(|name, store| {
            store.create_photo(&photo_at("p1", "alice", 0)).unwrap();
            store.delete_photo("p1").unwrap();
            assert!(store.get_photo("p1").unwrap().is_none(), "{name}");
            // second delete of the same id is a no-op, not an error
            store.delete_photo("p1").unwrap();
            store.delete_photo("never-existed").unwrap();
        });
    }

    #[test]
    fn test_upsert_reports_inserted_then_replaced() {
        with_each_backend(|name, store| {
            let outcome = store.upsert_user(&user("alice")).unwrap();
            assert_eq!(outcome, UpsertOutcome::Inserted, "{name}");

            let mut updated = user("alice");
            updated.email = Some("new@example.com".to_string());
            let outcome = store.upsert_user(&updated).unwrap();
            assert_eq!(outcome, UpsertOutcome::Replaced, "{name}");
            assert_eq!(store.get_user("alice").unwrap().unwrap(), updated, "{name}");

            let outcome = store.upsert_photo(&photo_at("p1", "alice", 0)).unwrap();
            assert_eq!(outcome, UpsertOutcome::Inserted, "{name}");
            let outcome = store.upsert_photo(&photo_at("p1", "alice", 3)).unwrap();
            assert_eq!(outcome, UpsertOutcome::Replaced, "{name}");
        });
    }

    #[test]
    fn test_scan_covers_every_record_across_pages() {
        with_each_backend(|name, store| {
            let total = 230;
            for i in 0..total {
                store
                    .create_photo(&photo_at(&format!("p{i:03}"), "alice", i as i64))
                    .unwrap();
            }

            let mut ids = Vec::new();
            let mut token = None;
            let mut pages = 0;
            loop {
                let page = store.scan_photos(token).unwrap();
                pages += 1;
                ids.extend(page.records.into_iter().map(|p| p.photo_id));
                match page.next {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
            assert!(pages > 1, "{name}: scan must actually paginate");
            assert_eq!(ids.len(), total, "{name}: no page may be dropped");
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), total, "{name}: no record may repeat");
        });
    }

    #[test]
    fn test_backends_agree_on_identical_data() {
        // the swap-transparency property stated directly: same inputs,
        // same outputs, backend by backend
        let dir = TempDir::new().unwrap();
        let kv = KeyValueMetadataStore::open(dir.path().join("kv.sqlite")).unwrap();
        let doc = DocumentMetadataStore::open(dir.path().join("doc.sqlite")).unwrap();
        let stores: [&dyn MetadataStore; 2] = [&kv, &doc];

        for store in stores {
            store.create_user(&user("alice")).unwrap();
            let mut p = photo_at("p1", "alice", 0);
            p.tags = "pet".to_string();
            store.create_photo(&p).unwrap();
            let mut p = photo_at("p2", "alice", 7);
            p.filename = "dog.jpg".to_string();
            p.tags = "pet walk".to_string();
            store.create_photo(&p).unwrap();
        }

        assert_eq!(
            kv.list_photos_by_owner("alice").unwrap(),
            doc.list_photos_by_owner("alice").unwrap()
        );
        for query in ["pet", "dog", "walk", "PET", ""] {
            assert_eq!(
                kv.search_photos_by_owner("alice", query).unwrap(),
                doc.search_photos_by_owner("alice", query).unwrap(),
                "query {query:?}"
            );
        }
        assert_eq!(kv.get_user("alice").unwrap(), doc.get_user("alice").unwrap());
    }
}
