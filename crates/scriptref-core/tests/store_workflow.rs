//! End-to-end workflow: ingest annotations, persist them, reload the store,
//! curate by hand and audit.

use pretty_assertions::assert_eq;
use scriptref_core::{
    audit_entries, read_collection, write_collection, CrossRefStore, NoteIngestor,
    ReferenceParser, Registry, RelationType, Scope, VerseCounts,
};
use tempfile::TempDir;

const TOB_SAMPLE: &str = "\
MARC 1 :
y 1.2 Ml 3.1 ; Ex 23.20
z 1.315.41 ; Lc 4.38
a 1.40 Lv 13.45 – 14.2
MARC 2 :
b 2.12 cf. Jn 7.27
";

#[test]
fn ingest_persist_and_reload() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::bundled();

    let ingestor = NoteIngestor::new(&registry, "MRK", None, VerseCounts::mark()).unwrap();
    let report = ingestor.ingest_text(TOB_SAMPLE);
    assert_eq!(report.entries.len(), 4);

    let path = temp.path().join("references_nt_tob.json");
    write_collection(&path, &report.into_collection("References for tob")).unwrap();

    let mut store = CrossRefStore::new(temp.path());
    let summary = store.load_all(None, Scope::Nt);
    assert_eq!(summary.files_merged, 1);

    let mark = store.get_references("MRK");
    let sources: Vec<&str> = mark.keys().map(String::as_str).collect();
    assert_eq!(sources, vec!["MRK.1.2", "MRK.1.31", "MRK.1.40", "MRK.2.12"]);

    let leper = &mark["MRK.1.40"];
    let targets: Vec<&str> = leper.relations.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(targets, vec!["LEV.13.45", "MRK.14.2"]);
}

#[test]
fn manual_curation_lands_next_to_ingested_data() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::bundled();
    let parser = ReferenceParser::new(&registry);

    let ingestor = NoteIngestor::new(&registry, "MRK", None, VerseCounts::mark()).unwrap();
    let collection = ingestor
        .ingest_text(TOB_SAMPLE)
        .into_collection("References for tob");
    write_collection(&temp.path().join("references_nt_tob.json"), &collection).unwrap();

    let store = CrossRefStore::new(temp.path());
    store
        .add_relation(&parser, "tob", "Mc 1:2", "Es 40:3", RelationType::Quotation, "voice")
        .unwrap();
    store
        .add_relation(&parser, "tob", "Es 40:3", "Mc 1:3", RelationType::Quotation, "")
        .unwrap();

    let nt = read_collection(&temp.path().join("references_nt_tob.json"))
        .unwrap()
        .unwrap();
    assert_eq!(nt.cross_references.len(), 4);
    assert_eq!(nt.cross_references[0].relations.len(), 3);
    // Notes written by ingestion survive the rewrite
    assert_eq!(nt.cross_references[0].notes.as_deref(), Some("Ml 3.1 ; Ex 23.20"));

    let mut store = CrossRefStore::new(temp.path());
    store.load_all(None, Scope::Ot);
    assert_eq!(store.index().len(), 1);
    assert_eq!(store.get("ISA.40.3").unwrap().relations[0].target, "MRK.1.3");

    store.load_all(None, Scope::All);
    assert_eq!(store.index().len(), 5);
    let before = store.index().clone();
    store.load_all(None, Scope::All);
    assert_eq!(store.index(), &before);
}

#[test]
fn audit_flags_misattributed_ingested_relation() {
    let registry = Registry::bundled();
    let ingestor = NoteIngestor::new(&registry, "MRK", None, VerseCounts::mark()).unwrap();
    // No space between "Jb" and the digits, so the tokenizer misses the book.
    let collection = ingestor
        .ingest_text("MARC 4 :\nc 4.12 Jb9.6\n")
        .into_collection("References for tob");
    assert_eq!(collection.cross_references[0].relations[0].target, "MRK.9.6");

    let findings = audit_entries(&registry, "MRK", &collection.cross_references);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].book_form, "Jb");
}
