use docstore::errors::ErrorKind;
use docstore::service::Status;
use docstore_int_test::test_util::{
    cleanup, create_positional_test_context, create_test_context, run_test,
};
use std::collections::HashSet;
use std::thread;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_ensure_is_idempotent() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            let registry = service.registry();

            let first = registry.ensure("books")?;
            let second = registry.ensure("books")?;
            assert_eq!(first.name(), second.name());
            assert!(second.identifier_indexed());

            let names = service.store().collection_names()?;
            assert_eq!(names.iter().filter(|n| n.as_str() == "books").count(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_first_create_makes_the_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            assert!(!service.store().has_collection("authors")?);

            service.create("authors", br#"{"name":"author1"}"#)?;
            assert!(service.store().has_collection("authors")?);
            assert_eq!(service.read_all("authors")?.len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_first_creates() {
    run_test(
        create_test_context,
        |ctx| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let service = ctx.service();
                    thread::spawn(move || {
                        let mut ids = Vec::new();
                        for i in 0..20 {
                            let body = format!(r#"{{"thread":{},"seq":{}}}"#, t, i);
                            let created = service.create("publishers", body.as_bytes())?;
                            ids.push(created.id().unwrap_or_default().to_string());
                        }
                        Ok::<_, docstore::errors::DocStoreError>(ids)
                    })
                })
                .collect();

            let mut ids = HashSet::new();
            for handle in handles {
                let created = handle.join().expect("writer thread panicked")?;
                ids.extend(created);
            }
            assert_eq!(ids.len(), 160);

            let service = ctx.service();
            let stored: HashSet<String> = service
                .read_all("publishers")?
                .iter()
                .filter_map(|doc| doc.id().map(str::to_string))
                .collect();
            assert_eq!(stored, ids);

            let names = service.store().collection_names()?;
            assert_eq!(names.iter().filter(|n| n.as_str() == "publishers").count(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_positional_ids_are_distinct() {
    run_test(
        create_positional_test_context,
        |ctx| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let service = ctx.service();
                    thread::spawn(move || {
                        (0..25)
                            .map(|_| {
                                service
                                    .create("books", br#"{"name":"book"}"#)
                                    .map(|doc| doc.id().unwrap_or_default().to_string())
                            })
                            .collect::<Result<Vec<_>, _>>()
                    })
                })
                .collect();

            let mut ids = HashSet::new();
            for handle in handles {
                ids.extend(handle.join().expect("writer thread panicked")?);
            }
            assert_eq!(ids.len(), 100);
            for id in &ids {
                assert!(id.parse::<u64>().is_ok(), "{} is not positional", id);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_names_create_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            let before = service.store().collection_names()?;

            for name in ["bad name", "books2", "my_books", "", "b\u{e4}cher"] {
                let err = service.create(name, br#"{"name":"x"}"#).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::InvalidName, "name {:?}", name);
                assert_eq!(Status::classify(&err).code(), 400);
            }

            assert_eq!(service.store().collection_names()?, before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_collection_read() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();

            let err = service.read_all("music").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CollectionNotFound);
            assert_eq!(Status::classify(&err).code(), 500);
            assert_eq!(err.message(), "could not use collection music");

            let err = service.delete("music", "AAAAAAAAAAA").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CollectionNotFound);

            // reads never create
            assert!(!service.store().has_collection("music")?);
            Ok(())
        },
        cleanup,
    )
}
