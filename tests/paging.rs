use jsonlens::{page_for_line, EngineConfig, PageReader, SparseIndexer};
use proptest::prelude::*;
use tempfile::NamedTempFile;

fn write_file(contents: &[u8]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp file");
    std::fs::write(file.path(), contents).expect("write contents");
    file
}

fn expected_lines(contents: &str) -> Vec<String> {
    let mut lines: Vec<String> = contents.split('\n').map(str::to_string).collect();
    if contents.ends_with('\n') || contents.is_empty() {
        lines.pop();
    }
    lines
}

fn small_config(window: usize) -> EngineConfig {
    EngineConfig {
        stride_lines: 3,
        index_chunk_bytes: 16,
        read_window_bytes: window,
        ..EngineConfig::default()
    }
}

/// Read pages until a short page comes back, collecting raw lines
async fn read_all_pages(reader: &PageReader, page_size: u64) -> Vec<String> {
    let mut raws = Vec::new();
    let mut page_number = 1;
    loop {
        let page = reader.read_page(page_number, page_size).await.unwrap();
        for (i, record) in page.records.iter().enumerate() {
            assert_eq!(record.line_number, (page_number - 1) * page_size + 1 + i as u64);
        }
        let short = (page.records.len() as u64) < page_size;
        raws.extend(page.records.into_iter().map(|r| r.raw));
        if short || page.is_indexed && page_number >= page.total_pages {
            break;
        }
        page_number += 1;
    }
    raws
}

async fn index_fully(indexer: &SparseIndexer, config: &EngineConfig) {
    if let Some(job) = indexer.start(config.stride_lines, config.index_chunk_bytes, |_| {}) {
        job.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn pages_reconstruct_file_before_and_after_indexing() {
    let contents: String = (1..=47)
        .map(|i| format!("{{\"id\":{i},\"name\":\"row-{i}\"}}\n"))
        .collect();
    let file = write_file(contents.as_bytes());
    let config = small_config(32);
    let indexer = SparseIndexer::new(file.path());
    let reader = PageReader::new(indexer.clone(), config.clone());

    let before = read_all_pages(&reader, 10).await;
    assert_eq!(before, expected_lines(&contents));

    index_fully(&indexer, &config).await;
    let after = read_all_pages(&reader, 10).await;
    assert_eq!(after, before);

    let last = reader.read_page(5, 10).await.unwrap();
    assert!(last.is_indexed);
    assert_eq!(last.total_lines, 47);
    assert_eq!(last.total_pages, 5);
    assert_eq!(last.records.len(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pages_stay_exact_while_indexing_runs() {
    let contents: String = (1..=3000)
        .map(|i| format!("{{\"id\":{i},\"tag\":\"t{}\"}}\n", i % 7))
        .collect();
    let expected = expected_lines(&contents);
    let file = write_file(contents.as_bytes());
    let config = small_config(64);
    let indexer = SparseIndexer::new(file.path());
    let reader = PageReader::new(indexer.clone(), config.clone());

    let job = indexer
        .start(config.stride_lines, config.index_chunk_bytes, |_| {})
        .unwrap();

    let mut passes = 0;
    while !job.is_finished() || passes == 0 {
        assert_eq!(read_all_pages(&reader, 97).await, expected);
        passes += 1;
    }

    job.await.unwrap().unwrap();
    assert_eq!(indexer.total_lines(), Some(3000));
    assert_eq!(read_all_pages(&reader, 97).await, expected);
}

#[tokio::test]
async fn multibyte_split_at_window_boundary_decodes_whole() {
    // "é" starts at byte 6, so a 7-byte window ends inside it
    let contents = "{\"a\":\"é\"}\n{\"b\":\"日本語\"}\n{\"c\":\"🦀\"}\n";
    let file = write_file(contents.as_bytes());

    let narrow = PageReader::new(SparseIndexer::new(file.path()), small_config(7));
    let wide = PageReader::new(SparseIndexer::new(file.path()), EngineConfig::default());

    let narrow_page = narrow.read_page(1, 10).await.unwrap();
    let wide_page = wide.read_page(1, 10).await.unwrap();
    assert_eq!(narrow_page.records, wide_page.records);
    assert_eq!(narrow_page.records[1].raw, "{\"b\":\"日本語\"}");
    assert_eq!(
        narrow_page.records[2].parsed,
        Some(serde_json::json!({"c": "🦀"}))
    );
    assert!(narrow_page.records.iter().all(|r| !r.raw.contains('\u{fffd}')));
}

#[tokio::test]
async fn byte_offsets_are_exact_with_crlf() {
    let contents = "{\"a\":1}\r\n{\"b\":2}\r\nnot json\r\n";
    let file = write_file(contents.as_bytes());
    let reader = PageReader::new(SparseIndexer::new(file.path()), small_config(5));

    let page = reader.read_page(1, 10).await.unwrap();
    let offsets: Vec<u64> = page.records.iter().map(|r| r.byte_offset).collect();
    assert_eq!(offsets, vec![0, 9, 18]);
    assert_eq!(page.records[0].raw, "{\"a\":1}");
    assert!(page.records[2].is_error());
}

#[tokio::test]
async fn empty_file_yields_one_empty_page() {
    let file = write_file(b"");
    let config = EngineConfig::default();
    let indexer = SparseIndexer::new(file.path());
    let reader = PageReader::new(indexer.clone(), config.clone());
    index_fully(&indexer, &config).await;

    let page = reader.read_page(1, 0).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.total_lines, 0);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.page_size, config.default_page_size);
    assert!(reader.read_line(1).await.unwrap().is_none());
}

#[tokio::test]
async fn unindexed_totals_are_lower_bounds() {
    let contents: String = (0..200).map(|i| format!("{{\"v\":{:04}}}\n", i)).collect();
    let file = write_file(contents.as_bytes());
    let reader = PageReader::new(SparseIndexer::new(file.path()), EngineConfig::default());

    let page = reader.read_page(3, 50).await.unwrap();
    assert!(!page.is_indexed);
    assert!(page.total_lines >= 150);
    assert_eq!(page.records.first().map(|r| r.line_number), Some(101));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn read_line_and_pages_agree_with_file(
        lines in prop::collection::vec("[a-z0-9é日 {}:\",]{0,12}", 0..60),
        trailing_newline in any::<bool>(),
        stride in 1u64..8,
        window in 1usize..24,
        page_size in 1u64..9,
    ) {
        let mut contents = lines.join("\n");
        if trailing_newline && !contents.is_empty() {
            contents.push('\n');
        }
        let expected = expected_lines(&contents);
        let file = write_file(contents.as_bytes());
        let config = EngineConfig {
            stride_lines: stride,
            index_chunk_bytes: window,
            read_window_bytes: window,
            ..EngineConfig::default()
        };

        let (before, after, singles) = tokio_test::block_on(async {
            let indexer = SparseIndexer::new(file.path());
            let reader = PageReader::new(indexer.clone(), config.clone());
            let before = read_all_pages(&reader, page_size).await;
            index_fully(&indexer, &config).await;
            let after = read_all_pages(&reader, page_size).await;
            let mut singles = Vec::new();
            for line in 1..=expected.len() as u64 {
                let record = reader.read_line(line).await.unwrap().unwrap();
                singles.push((record.line_number, record.raw));
            }
            (before, after, singles)
        });

        prop_assert_eq!(&before, &expected);
        prop_assert_eq!(&after, &expected);
        for (i, (number, raw)) in singles.iter().enumerate() {
            prop_assert_eq!(*number, i as u64 + 1);
            prop_assert_eq!(raw, &expected[i]);
        }
    }

    #[test]
    fn page_for_line_page_contains_line(
        line_count in 1u64..80,
        target in 1u64..80,
        page_size in 1u64..12,
    ) {
        prop_assume!(target <= line_count);
        let contents: String = (1..=line_count).map(|i| format!("{i}\n")).collect();
        let file = write_file(contents.as_bytes());

        let page = tokio_test::block_on(async {
            let reader = PageReader::new(SparseIndexer::new(file.path()), EngineConfig::default());
            reader.read_page(page_for_line(target, page_size), page_size).await.unwrap()
        });
        prop_assert!(page.records.iter().any(|r| r.line_number == target));
    }
}
