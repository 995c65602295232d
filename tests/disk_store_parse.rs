//! The disk-backed store must be observationally identical to the
//! in-memory store.

use gffstream::{DiskStore, Feature, GffItem, GffSource, GffStream, MemoryStore, Result, TempStore};

const INPUT: &str = "\
##gff-version 3
chr\t.\tgene\t1\t100\t.\t+\t.\tID=g1
chr\t.\tmRNA\t1\t100\t.\t+\t.\tID=m1;Parent=g1
chr\t.\texon\t1\t50\t.\t+\t.\tParent=m1
chr\t.\texon\t60\t100\t.\t+\t.\tParent=m1
###
chr\t.\tgene\t200\t300\t.\t+\t.\tID=p1
chr\t.\tgene\t400\t500\t.\t+\t.\tID=p2
chr\t.\texon\t200\t250\t.\t+\t.\tID=c1;Parent=p1,p2
###
chr\t.\tmRNA\t500\t600\t.\t+\t.\tID=m2
chr\t.\tgene\t500\t600\t.\t+\t.\tID=g2
chr\t.\tmRNA\t500\t600\t.\t+\t.\tID=m2;Parent=g2
";

fn parse_with(store: Box<dyn TempStore>) -> Vec<GffItem> {
    GffStream::with_store(vec![GffSource::from_reader(INPUT.as_bytes())], store)
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

fn shape(feature: &Feature) -> (Vec<String>, usize, usize, usize) {
    (
        feature.ids(),
        feature.lines().len(),
        feature.children().len(),
        feature.derived().len(),
    )
}

#[test]
fn test_disk_store_matches_memory_store() {
    let memory = parse_with(Box::new(MemoryStore::new()));
    let disk = parse_with(Box::new(DiskStore::new().unwrap()));

    assert_eq!(memory.len(), disk.len());
    for (m, d) in memory.iter().zip(disk.iter()) {
        match (m, d) {
            (GffItem::Feature(m), GffItem::Feature(d)) => {
                assert_eq!(shape(m), shape(d));
            }
            (GffItem::Directive(m), GffItem::Directive(d)) => assert_eq!(m, d),
            (GffItem::Comment(m), GffItem::Comment(d)) => assert_eq!(m, d),
            other => panic!("item kinds diverge: {other:?}"),
        }
    }
}

#[test]
fn test_disk_store_preserves_shared_children() {
    let items = parse_with(Box::new(DiskStore::new().unwrap()));
    let features: Vec<&Feature> = items.iter().filter_map(GffItem::as_feature).collect();

    // Second window: p1 and p2 share c1.
    let p1 = features
        .iter()
        .find(|f| f.ids() == vec!["p1".to_string()])
        .unwrap();
    let p2 = features
        .iter()
        .find(|f| f.ids() == vec!["p2".to_string()])
        .unwrap();
    assert!(p1.children()[0].same(&p2.children()[0]));
}

#[test]
fn test_disk_store_resolves_forward_references() {
    let input = "chr\t.\texon\t1\t50\t.\t+\t.\tParent=m1\n\
                 chr\t.\tmRNA\t1\t100\t.\t+\t.\tID=m1\n";
    let items = GffStream::with_store(
        vec![GffSource::from_reader(input.as_bytes())],
        Box::new(DiskStore::new().unwrap()),
    )
    .unwrap()
    .collect::<Result<Vec<_>>>()
    .unwrap();

    assert_eq!(items.len(), 1);
    let mrna = items[0].as_feature().unwrap();
    assert_eq!(mrna.children().len(), 1);
}

#[test]
fn test_disk_store_orphan_error_matches_memory() {
    let input = "chr\t.\texon\t1\t50\t.\t+\t.\tParent=ghost\n";
    for store in [
        Box::new(MemoryStore::new()) as Box<dyn TempStore>,
        Box::new(DiskStore::new().unwrap()),
    ] {
        let mut parser =
            GffStream::with_store(vec![GffSource::from_reader(input.as_bytes())], store).unwrap();
        let err = parser.next_item().unwrap_err();
        assert!(err.to_string().contains("ghost (Parent)"));
    }
}
