#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end tests for seekable archives
//!
//! Archives are written with `ArchiveWriter`, then read back sequentially,
//! sliced by descriptor, and rescanned to check that all three views agree.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use seektar_format::{
    ArchiveError, ArchiveIndex, ArchiveReader, ArchiveWriter, GzipCodec, MappedArchive,
    OffsetDescriptor, StreamCodec, extract_entry, read_entries, rebuild_index,
};
use std::collections::HashSet;

fn write_archive(entries: &[(String, Vec<u8>)]) -> (Vec<u8>, Vec<OffsetDescriptor>, ArchiveIndex) {
    let mut writer = ArchiveWriter::new(Vec::new());
    let descriptors = entries
        .iter()
        .map(|(name, data)| writer.append(name, data).expect("append should succeed"))
        .collect();
    let (archive, index) = writer.finish().expect("finish should succeed");
    (archive, descriptors, index)
}

fn read_all(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    ArchiveReader::new(archive)
        .entries()
        .map(|entry| entry.map(|e| (e.filename, e.data)))
        .collect::<Result<_, _>>()
        .expect("archive should read back")
}

#[test]
fn foo_bar_scenario() {
    let mut writer = ArchiveWriter::new(Vec::new());
    let foo = writer.append("foo", b"foo2").unwrap();
    let bar = writer.append("bar", b"bar2").unwrap();
    writer.close().unwrap();
    let (archive, _) = writer.finish().unwrap();

    assert_eq!(foo.start, 0);
    assert_eq!(bar.start, foo.end);
    assert_eq!(extract_entry(&archive, &foo).unwrap(), b"foo2");
    assert_eq!(extract_entry(&archive, &bar).unwrap(), b"bar2");

    assert_eq!(
        read_all(&archive),
        vec![
            ("foo".to_string(), b"foo2".to_vec()),
            ("bar".to_string(), b"bar2".to_vec()),
        ]
    );
}

#[test]
fn whole_archive_is_one_gzip_stream() {
    let entries = vec![("a.txt".to_string(), b"hello".to_vec())];
    let (archive, _, _) = write_archive(&entries);

    let tar = GzipCodec::default().decode_segment(&archive).unwrap();
    // header block, one padded payload block, two terminator blocks
    assert_eq!(tar.len(), 4 * 512);
    assert_eq!(&tar[..5], b"a.txt");
    assert_eq!(&tar[257..263], b"ustar\0");
    assert_eq!(&tar[512..517], b"hello");
    assert!(tar[2 * 512..].iter().all(|&b| b == 0));
}

#[test]
fn independent_tar_parser_reads_archive() {
    let entries = vec![
        ("short.txt".to_string(), b"short".to_vec()),
        (
            format!("{}/{}", "prefix".repeat(20), "name".repeat(20)),
            b"split across prefix and name".to_vec(),
        ),
        ("x".repeat(300), b"pax path record".to_vec()),
        ("caf\u{e9}/\u{1f980}.txt".to_string(), b"utf-8 name".to_vec()),
        ("aligned.bin".to_string(), vec![7u8; 1024]),
        ("empty".to_string(), Vec::new()),
    ];
    let (archive, _, _) = write_archive(&entries);

    let mut parsed = Vec::new();
    let mut tar = tar::Archive::new(flate2::read::MultiGzDecoder::new(&archive[..]));
    for entry in tar.entries().unwrap() {
        let mut entry = entry.unwrap();
        assert!(entry.header().entry_type().is_file());
        let name = entry.path().unwrap().to_str().unwrap().to_string();
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut data).unwrap();
        parsed.push((name, data));
    }

    assert_eq!(parsed, entries);
}

#[test]
fn empty_archive() {
    let (archive, descriptors, index) = write_archive(&[]);
    assert!(descriptors.is_empty());
    assert!(index.is_empty());
    assert!(read_all(&archive).is_empty());
    assert!(rebuild_index(&archive).unwrap().is_empty());
}

#[test]
fn duplicate_names_rejected() {
    let mut writer = ArchiveWriter::new(Vec::new());
    writer.append("same", b"one").unwrap();
    let err = writer.append("same", b"two").unwrap_err();
    assert!(err.is_contract_violation());

    let (archive, _) = writer.finish().unwrap();
    assert_eq!(read_all(&archive), vec![("same".to_string(), b"one".to_vec())]);
}

#[test]
fn long_names_round_trip() {
    let entries = vec![
        (format!("{}/{}", "prefix".repeat(20), "leaf.txt"), b"split".to_vec()),
        ("x".repeat(250), b"pax".to_vec()),
        (format!("unicode/{}", "é".repeat(80)), b"utf8".to_vec()),
    ];
    let (archive, descriptors, _) = write_archive(&entries);

    assert_eq!(read_all(&archive), entries);
    for ((_, data), descriptor) in entries.iter().zip(&descriptors) {
        assert_eq!(&extract_entry(&archive, descriptor).unwrap(), data);
    }
}

#[test]
fn truncated_archive_yields_prior_entries_then_error() {
    let entries = vec![
        ("first".to_string(), vec![1u8; 600]),
        ("second".to_string(), vec![2u8; 600]),
    ];
    let (archive, descriptors, _) = write_archive(&entries);

    // Cut inside the second entry's payload member
    let cut = (descriptors[1].data_start + descriptors[1].data_size() / 2) as usize;
    let mut iter = ArchiveReader::new(&archive[..cut]).entries();

    let first = iter.next().unwrap().unwrap();
    assert_eq!(first.filename, "first");
    assert!(matches!(iter.next(), Some(Err(_))));
    assert!(iter.next().is_none());
}

#[test]
fn corrupted_header_is_an_error() {
    let entries = vec![("victim".to_string(), b"payload".to_vec())];
    let (mut archive, descriptors, _) = write_archive(&entries);

    // Flip a byte inside the deflate data of the header member
    let target = (descriptors[0].start + 12) as usize;
    archive[target] ^= 0xff;

    let results: Vec<_> = ArchiveReader::new(&archive).entries().collect();
    assert!(results.iter().any(Result::is_err));
}

#[test]
fn out_of_bounds_descriptor_rejected() {
    let entries = vec![("only".to_string(), b"data".to_vec())];
    let (archive, descriptors, _) = write_archive(&entries);

    let beyond = OffsetDescriptor::new(
        descriptors[0].start,
        descriptors[0].data_start,
        descriptors[0].padding_start,
        archive.len() as u64 + 100,
    )
    .unwrap();
    assert!(matches!(
        extract_entry(&archive, &beyond),
        Err(ArchiveError::DescriptorOutOfBounds { .. })
    ));
}

#[test]
fn index_persists_next_to_archive() {
    let entries = vec![
        ("docs/readme.md".to_string(), b"# readme".to_vec()),
        ("bin/tool".to_string(), vec![0x7f; 3000]),
    ];
    let (archive, _, index) = write_archive(&entries);

    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("bundle.tar.gz");
    let index_path = dir.path().join("bundle.tar.gz.index.json");
    std::fs::write(&archive_path, &archive).unwrap();
    index.save(&index_path).unwrap();

    let loaded = ArchiveIndex::load(&index_path).unwrap();
    let mapped = MappedArchive::open(&archive_path).unwrap();
    assert_eq!(mapped.extract_by_name(&loaded, "bin/tool").unwrap(), vec![0x7f; 3000]);
    assert_eq!(loaded.archive_len(), Some(mapped.len()));
}

#[test]
fn streaming_reader_matches_slice_reader() {
    let entries = vec![
        ("one".to_string(), b"1".to_vec()),
        ("two".to_string(), vec![2u8; 4096]),
    ];
    let (archive, _, _) = write_archive(&entries);

    let streamed: Vec<(String, Vec<u8>)> = read_entries(std::io::Cursor::new(archive.clone()))
        .map(|entry| entry.map(|e| (e.filename, e.data)))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(streamed, read_all(&archive));
}

fn entry_set() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::vec(
        (
            "[a-z]{1,12}(/[a-z0-9_.]{1,12}){0,3}",
            prop::collection::vec(any::<u8>(), 0..2048),
        ),
        0..8,
    )
    .prop_map(|entries| {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Sequential read returns exactly what was written, in order
    #[test]
    fn sequential_read_matches_input(entries in entry_set()) {
        let (archive, _, _) = write_archive(&entries);
        prop_assert_eq!(read_all(&archive), entries);
    }

    /// Descriptors tile the archive and each payload decodes alone
    #[test]
    fn descriptors_are_contiguous_and_independent(entries in entry_set()) {
        let (archive, descriptors, index) = write_archive(&entries);

        let mut expected_start = 0;
        for ((name, data), descriptor) in entries.iter().zip(&descriptors) {
            prop_assert_eq!(descriptor.start, expected_start);
            prop_assert!(descriptor.start < descriptor.data_start);
            prop_assert!(descriptor.data_start < descriptor.padding_start);
            prop_assert!(descriptor.padding_start < descriptor.end);
            prop_assert_eq!(&extract_entry(&archive, descriptor).unwrap(), data);
            prop_assert_eq!(index.get(name), Some(descriptor));
            expected_start = descriptor.end;
        }
        prop_assert!(descriptors.windows(2).all(|pair| pair[0].is_followed_by(&pair[1])));
        prop_assert!(expected_start < archive.len() as u64);
    }

    /// Scanning the archive recovers the writer's index
    #[test]
    fn rebuilt_index_matches_writer(entries in entry_set()) {
        let (archive, _, index) = write_archive(&entries);
        prop_assert_eq!(rebuild_index(&archive).unwrap(), index);
    }
}
