//! Integration tests for change tracking and incremental saves
//!
//! These tests drive a document the way a reader and an editor would:
//! load objects through a parser, finish loading, mutate, then collect and
//! write the increment.

use pdfcos::{
    CosArray, CosDictionary, CosDocument, CosObject, Error, MutationEvent, MutationObserver, Name,
    ObjectKey, ObjectParser, ObjectTable, ResolutionState, Result, UpdateInfo, Value,
};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Route library logs to the test harness; `RUST_LOG=pdfcos=trace` shows them
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A three-object document: catalog -> pages -> one page
fn sample_document() -> (Rc<ObjectTable>, CosDocument) {
    let table = Rc::new(ObjectTable::new());
    let trailer = CosDictionary::from_entries([
        ("Size", Value::from(4)),
        ("Root", Value::Null),
    ]);
    let document = CosDocument::with_parser(table.clone(), trailer.clone());

    let page_ref = document.object_from_pool(ObjectKey::new(3, 0));
    let pages_ref = document.object_from_pool(ObjectKey::new(2, 0));
    let catalog_ref = document.object_from_pool(ObjectKey::new(1, 0));

    table.insert(
        ObjectKey::new(1, 0),
        Value::from(CosDictionary::from_entries([
            ("Type", Value::name("Catalog")),
            ("Pages", Value::from(pages_ref)),
        ])),
    );
    table.insert(
        ObjectKey::new(2, 0),
        Value::from(CosDictionary::from_entries([
            ("Type", Value::name("Pages")),
            ("Kids", Value::from(CosArray::from_values(vec![Value::from(page_ref)]))),
            ("Count", Value::from(1)),
        ])),
    );
    table.insert(
        ObjectKey::new(3, 0),
        Value::from(CosDictionary::from_entries([
            ("Type", Value::name("Page")),
            ("Rotate", Value::from(0)),
            ("UserUnit", Value::from(1.0)),
        ])),
    );
    trailer.set("Root", catalog_ref).unwrap();
    (table, document)
}

/// Walk trailer -> catalog -> pages -> first kid, resolving on the way
fn page(document: &CosDocument) -> CosDictionary {
    let catalog = document.trailer().get_resolved(&Name::new("Root")).unwrap();
    let pages = catalog.as_dictionary().unwrap().get_resolved(&Name::new("Pages")).unwrap();
    let kids = pages.as_dictionary().unwrap().get_resolved(&Name::new("Kids")).unwrap();
    let page = kids.as_array().unwrap().get_resolved(0).unwrap();
    page.as_dictionary().unwrap().clone()
}

mod round_trip {
    use super::*;

    #[test]
    fn test_untouched_document_has_nothing_to_write() {
        let (_table, document) = sample_document();
        document.finish_loading();
        page(&document);
        assert!(document.build_increment().is_empty());

        let mut out = Vec::new();
        assert!(document.write_increment(&mut out, 0).unwrap().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_replace_one_of_three_entries() {
        init_tracing();
        let (_table, document) = sample_document();
        document.finish_loading();
        let page = page(&document);

        let resources = CosDictionary::new();
        page.set("Rotate", resources.clone()).unwrap();

        let increment = document.build_increment();
        assert!(increment.contains(&Value::from(page.clone())));
        assert!(increment.contains(&Value::from(resources)));
        assert_eq!(increment.len(), 2);
        assert_eq!(increment.objects().len(), 1);
        assert_eq!(increment.objects()[0].0, ObjectKey::new(3, 0));
        assert!(!increment.is_root_updated());
    }

    #[test]
    fn test_write_increment_offsets() {
        let (_table, document) = sample_document();
        document.finish_loading();
        page(&document).set("Rotate", 90).unwrap();

        let mut out = b"%PDF-1.7\n".to_vec();
        let start = out.len() as u64;
        let offsets = document.write_increment(&mut out, start).unwrap();
        assert_eq!(offsets, vec![(ObjectKey::new(3, 0), start)]);

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with(
            "3 0 obj\n<<\n/Type /Page\n/Rotate 90\n/UserUnit 1\n>>\nendobj\n"
        ));
    }

    #[test]
    fn test_new_object_linked_into_document() {
        let (_table, document) = sample_document();
        document.finish_loading();
        let annotation = document.create_object(CosDictionary::from_entries([(
            "Subtype",
            Value::name("Text"),
        )]))
        .unwrap();
        assert_eq!(annotation.key(), ObjectKey::new(4, 0));
        page(&document)
            .set("Annots", CosArray::from_values(vec![Value::from(annotation.clone())]))
            .unwrap();

        let increment = document.build_increment();
        assert!(increment.contains_key(ObjectKey::new(3, 0)));
        assert!(increment.contains_key(ObjectKey::new(4, 0)));
    }
}

mod loading {
    use super::*;

    #[test]
    fn test_mutations_before_load_are_invisible() {
        let (_table, document) = sample_document();
        let page = page(&document);
        page.set("Rotate", 180).unwrap();
        page.remove(&Name::new("UserUnit")).unwrap();

        document.finish_loading();
        assert!(document.build_increment().is_empty());
        assert!(!page.is_updated());
    }

    #[test]
    fn test_unresolved_objects_are_never_loaded_by_increment() {
        let (table, document) = sample_document();
        document.finish_loading();
        document.trailer().set("Info", Value::Null).unwrap();
        let increment = document.build_increment();
        assert!(increment.is_root_updated());
        assert_eq!(
            document.object_from_pool(ObjectKey::new(1, 0)).state(),
            ResolutionState::Unresolved
        );
        assert!(table.dereference(ObjectKey::new(1, 0)).is_ok());
    }
}

mod resolution {
    use super::*;

    struct FailOnce {
        calls: Cell<usize>,
    }

    impl ObjectParser for FailOnce {
        fn dereference(&self, key: ObjectKey) -> Result<Value> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == 1 {
                Err(Error::resolution(format!("xref entry for {} is damaged", key)))
            } else {
                Ok(Value::from(1))
            }
        }
    }

    #[test]
    fn test_parser_called_at_most_once() {
        init_tracing();
        let parser = Rc::new(FailOnce { calls: Cell::new(0) });
        let weak: Weak<dyn ObjectParser> = Rc::downgrade(&parser) as Weak<dyn ObjectParser>;
        let cell = CosObject::lazy(ObjectKey::new(8, 0), weak);

        assert!(cell.resolve().is_none());
        assert!(cell.resolve().is_none());
        assert_eq!(parser.calls.get(), 1);
        assert!(cell.load_error().unwrap().contains("damaged"));
    }

    #[test]
    fn test_set_to_null_is_idempotent() {
        let (_table, document) = sample_document();
        document.finish_loading();
        page(&document);
        let cell = document.object_from_pool(ObjectKey::new(3, 0));

        assert!(cell.set_to_null());
        assert!(!cell.set_to_null());
        assert!(cell.is_object_null());

        let increment = document.build_increment();
        assert_eq!(increment.objects().len(), 1);
        let (key, value) = &increment.objects()[0];
        assert_eq!(*key, ObjectKey::new(3, 0));
        assert!(value.is_null());
    }

    #[test]
    fn test_cyclic_references_resolve_and_collect() {
        let table = Rc::new(ObjectTable::new());
        let document = CosDocument::with_parser(table.clone(), CosDictionary::new());
        let a = document.object_from_pool(ObjectKey::new(1, 0));
        let b = document.object_from_pool(ObjectKey::new(2, 0));
        table.insert(
            ObjectKey::new(1, 0),
            Value::from(CosDictionary::from_entries([("Next", Value::from(b.clone()))])),
        );
        table.insert(
            ObjectKey::new(2, 0),
            Value::from(CosDictionary::from_entries([("Next", Value::from(a.clone()))])),
        );
        document.trailer().set("Root", a.clone()).unwrap();
        document.finish_loading();

        let first = a.resolve().unwrap();
        let second = b.resolve().unwrap();
        let back = second.as_dictionary().unwrap().get_resolved(&Name::new("Next")).unwrap();
        assert!(back.same_instance(&first));

        first.as_dictionary().unwrap().set("Marked", true).unwrap();
        let increment = document.build_increment();
        assert_eq!(increment.objects().len(), 1);
        assert!(increment.contains_key(ObjectKey::new(1, 0)));
    }

    /// Flags when the container holding it is freed
    struct DropFlag(Rc<Cell<bool>>);

    impl MutationObserver for DropFlag {
        fn on_mutation(&self, _event: &MutationEvent) -> Result<()> {
            Ok(())
        }
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_dropping_document_frees_parent_cycle() {
        let freed = Rc::new(Cell::new(false));
        let table = Rc::new(ObjectTable::new());
        let document = CosDocument::with_parser(table.clone(), CosDictionary::new());
        let pages_ref = document.object_from_pool(ObjectKey::new(1, 0));
        let page_ref = document.object_from_pool(ObjectKey::new(2, 0));
        table.insert(
            ObjectKey::new(1, 0),
            Value::from(CosDictionary::from_entries([
                ("Type", Value::name("Pages")),
                ("Kids", Value::from(CosArray::from_values(vec![Value::from(page_ref.clone())]))),
            ])),
        );
        table.insert(
            ObjectKey::new(2, 0),
            Value::from(CosDictionary::from_entries([
                ("Type", Value::name("Page")),
                ("Parent", Value::from(pages_ref.clone())),
            ])),
        );
        document.trailer().set("Root", pages_ref.clone()).unwrap();
        document.finish_loading();

        let page = {
            let pages = pages_ref.resolve().unwrap();
            let pages = pages.as_dictionary().unwrap();
            pages.subscribe(Rc::new(DropFlag(freed.clone())));
            let kids = pages.get_resolved(&Name::new("Kids")).unwrap();
            let page = kids.as_array().unwrap().get_resolved(0).unwrap();
            page.as_dictionary().unwrap().clone()
        };
        let parent = page.get(&Name::new("Parent")).unwrap();
        assert!(!freed.get());

        drop(pages_ref);
        drop(page_ref);
        drop(document);
        drop(table);

        assert!(freed.get());
        let parent = parent.as_reference().unwrap();
        assert!(parent.cached().is_none());
        assert_eq!(parent.state(), ResolutionState::PermanentlyNull);
    }
}
