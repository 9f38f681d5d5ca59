use clap::Parser;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swob_qa_processor::cache::MemoryStationCache;
use swob_qa_processor::cli::{run, Cli};
use swob_qa_processor::models::{inverse, ChunkBy, QaCategory, SummaryStats};
use swob_qa_processor::processors::{
    ParallelProcessor, RecordComposer, SanityChecker, SanityOutcome,
};
use swob_qa_processor::readers::StationReader;
use swob_qa_processor::writers::BatchWriter;
use swob_qa_processor::ProcessingError;
use tempfile::TempDir;

const CATEGORIES: [&str; 5] = [
    "presence",
    "range",
    "integrity",
    "intervariable_comparison",
    "temporal",
];

fn file_name(i: usize) -> String {
    format!("2019-01-01-{:04}-CYVR-AUTO-minute-swob.xml", i)
}

fn source_uri(station: &str, name: &str) -> String {
    format!(
        "/data/raw/msc/observations/xml/partners/2019/20190101/nav-canada/{}/orig/{}",
        station, name
    )
}

fn natives() -> &'static str {
    r#"<qualifier name="error" group="quality" value="0"/>
    <qualifier name="suspect" group="quality" value="0"/>
    <qualifier name="suppressed" group="value" value="false"/>"#
}

fn category_block(category: &str, subtests: usize) -> String {
    let tests: String = (1..=subtests)
        .map(|i| {
            format!(
                r#"<element name="test" value="/qa/tests/{}/{}"><qualifier name="flag_value" value="100"/></element>"#,
                category, i
            )
        })
        .collect();
    format!(
        r#"<element name="{}_summary" group="assessment" value="100">{}</element>"#,
        category, tests
    )
}

/// Version-0 document with one presence-only observation and one fully assessed observation
fn original_document(station: &str, name: &str, declared_doubtful: u64) -> String {
    let full_categories: String = CATEGORIES.iter().map(|c| category_block(c, 3)).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<om:ObservationCollection xmlns:om="http://www.opengis.net/om/1.0">
<om:member>
<identification-elements>
  <element name="date_time" value="2019-01-01T00:00:00.000Z"/>
  <element name="tc_identifier" value="YVR"/>
  <element name="station_name" value="{station}"/>
  <element name="station_elevation" value="4.3"/>
  <element name="latitude" value="49.19"/>
  <element name="longitude" value="-123.18"/>
  <element name="version" value="0"/>
  <element name="correction" value="0"/>
  <element name="source_uri" value="{uri}"/>
  <element name="missing_count" group="qa_summary" value="0"/>
  <element name="erroneous_count" group="qa_summary" value="0"/>
  <element name="accepted_count" group="qa_summary" value="1"/>
  <element name="suppressed_count" group="qa_summary" value="0"/>
  <element name="doubtful_count" group="qa_summary" value="{declared_doubtful}"/>
  <element name="elements_quality_assessed_count" group="qa_summary" value="{total}"/>
  <element name="elements_count" group="qa_summary" value="2"/>
</identification-elements>
<elements>
  <element name="rel_hum" element-index="1" orig-name="14" value="80">
    {natives}
    <element name="overall_qa_summary" value="100">{presence}</element>
  </element>
  <element name="air_temp" element-index="2" orig-name="12" orig-value="3.25" value="3.2">
    {natives}
    <element name="overall_qa_summary" value="10">{full}</element>
  </element>
</elements>
</om:member>
</om:ObservationCollection>"#,
        station = station,
        uri = source_uri(station, name),
        declared_doubtful = declared_doubtful,
        total = 1 + declared_doubtful,
        natives = natives(),
        presence = category_block("presence", 0),
        full = full_categories,
    )
}

fn revised_document(station: &str, name: &str) -> String {
    format!(
        r#"<doc>
<identification-elements>
  <element name="station_name" value="{station}"/>
  <element name="version" value="1"/>
  <element name="source_uri" value="{uri}"/>
</identification-elements>
<elements>
  <element name="air_temp" element-index="1" orig-name="12" value="3.2">
    {natives}
    <element name="overall_qa_summary" value="100"/>
  </element>
  <element name="rel_hum" element-index="2" orig-name="14" value="80">
    {natives}
    <element name="overall_qa_summary" value="100"/>
    <status-indicators>
      <element name="value_override" value="81"/>
      <element name="qc_remark" value="sensor swapped"/>
    </status-indicators>
  </element>
</elements>
</doc>"#,
        station = station,
        uri = source_uri(station, name),
        natives = natives(),
    )
}

/// `<tmp>/raw/swob` populated with `count` version-0 documents
fn raw_folder(dir: &TempDir, count: usize) -> PathBuf {
    let input = dir.path().join("raw").join("swob");
    fs::create_dir_all(&input).unwrap();
    for i in 0..count {
        let station = if i % 2 == 0 { "CYVR" } else { "CYYZ" };
        let name = file_name(i);
        fs::write(input.join(&name), original_document(station, &name, 1)).unwrap();
    }
    input
}

fn write(dir: &Path, name: &str, contents: String) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_original_schema_record_shape() {
    let dir = TempDir::new().unwrap();
    let name = file_name(0);
    let path = write(dir.path(), &name, original_document("CYVR", &name, 1));

    let record = RecordComposer::default().compose(&path).unwrap();
    let flat = record.to_flat_map();

    let metadata = flat
        .keys()
        .filter(|k| !k.contains("rel_hum_14") && !k.contains("air_temp_12"))
        .filter(|k| k.as_str() != "origin_filename")
        .count();
    assert_eq!(metadata, 9);

    // value, overall summary, presence summary and three native codes
    assert_eq!(record.keys_containing("rel_hum_14_", false).len(), 6);
    // both values, overall summary, 5 summaries, 15 subtests, three native codes
    assert_eq!(record.keys_containing("air_temp_12_", false).len(), 26);
    assert_eq!(flat.len(), 9 + 6 + 26 + 1);

    assert!(!flat.keys().any(|k| k.ends_with("-derived")));
    assert_eq!(flat["air_temp_12_qa-temporal_3"], Some("100".to_string()));
    assert_eq!(flat["origin_filename"], Some(path.display().to_string()));
}

#[test]
fn test_revised_schema_skips_untransmitted_observations() {
    let dir = TempDir::new().unwrap();
    let name = file_name(1);
    let path = write(dir.path(), &name, revised_document("CYVR", &name));

    let record = RecordComposer::default().compose(&path).unwrap();

    assert!(record.keys_containing("air_temp", false).is_empty());
    let flat = record.to_flat_map();
    assert_eq!(flat["rel_hum_14_value_override"], Some("81".to_string()));
    assert_eq!(flat["rel_hum_14_qc_remark"], Some("sensor swapped".to_string()));
}

#[test]
fn test_sanity_check_against_declared_counts() {
    let dir = TempDir::new().unwrap();
    let good_name = file_name(2);
    let good = write(dir.path(), &good_name, original_document("CYVR", &good_name, 1));
    let bad_name = file_name(3);
    let bad = write(dir.path(), &bad_name, original_document("CYVR", &bad_name, 2));

    let composer = RecordComposer::default();
    let checker = SanityChecker::new();

    let (record, summary) = composer.compose_with_summary(&good).unwrap();
    assert!(summary.is_available());
    assert!(matches!(
        checker.check(&record, &summary).unwrap(),
        SanityOutcome::Matched(_)
    ));
    assert_eq!(
        checker.check(&record, &SummaryStats::Unavailable).unwrap(),
        SanityOutcome::Skipped
    );

    let (record, summary) = composer.compose_with_summary(&bad).unwrap();
    assert!(matches!(
        checker.check(&record, &summary),
        Err(ProcessingError::QaCountMismatch { .. })
    ));
}

#[test]
fn test_chunked_run_labels_and_contents() {
    let dir = TempDir::new().unwrap();
    let input = raw_folder(&dir, 5);

    let report = ParallelProcessor::new(3)
        .with_chunk_size(Some(2))
        .run(&input, None)
        .unwrap();

    assert!(report.is_clean());
    let output = dir.path().join("interim").join("swob");
    assert_eq!(report.output_dir, output);

    let mut chunks: Vec<(String, usize)> = report
        .completed_chunks()
        .map(|c| (c.chunk_id.clone(), c.records))
        .collect();
    chunks.sort();
    assert_eq!(
        chunks,
        vec![
            ("0_to_2".to_string(), 2),
            ("2_to_4".to_string(), 2),
            ("4_to_5".to_string(), 1),
        ]
    );

    let batch = BatchWriter::new()
        .read_batch(&output.join("4_to_5.json"))
        .unwrap();
    let expected_id = format!("CYVR_nav-canada_20190101_{}", file_name(4));
    assert_eq!(batch.keys().cloned().collect::<Vec<_>>(), vec![expected_id]);
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let input = raw_folder(&dir, 4);
    let output = dir.path().join("interim").join("swob");

    let processor = ParallelProcessor::new(2).with_chunk_size(Some(3));
    processor.run(&input, None).unwrap();
    let first = fs::read(output.join("0_to_3.json")).unwrap();

    processor.run(&input, None).unwrap();
    assert_eq!(fs::read(output.join("0_to_3.json")).unwrap(), first);
}

#[test]
fn test_station_mapping_round_trip() {
    let dir = TempDir::new().unwrap();
    let input = raw_folder(&dir, 7);
    let names: Vec<String> = (0..7).map(file_name).collect();

    let scan = StationReader::new(3)
        .build_file_to_station_map(&input, &names)
        .unwrap();
    assert!(scan.unmapped.is_empty());
    let mapping = scan.mapping;
    let stations = inverse(&mapping);

    let distinct: BTreeSet<String> = mapping.values().cloned().collect();
    assert_eq!(stations.keys().cloned().collect::<BTreeSet<_>>(), distinct);

    let mut members: Vec<String> = stations.values().flatten().cloned().collect();
    members.sort();
    assert_eq!(members, names);
}

#[test]
fn test_station_run_with_count_verification() {
    let dir = TempDir::new().unwrap();
    let input = raw_folder(&dir, 3);
    let bad_name = file_name(9);
    write(&input, &bad_name, original_document("CYYZ", &bad_name, 4));

    let report = ParallelProcessor::new(2)
        .with_chunk_by(ChunkBy::Station)
        .with_verify_counts(true)
        .with_cache(Arc::new(MemoryStationCache::new()))
        .run(&input, None)
        .unwrap();

    assert_eq!(report.total_files, 4);
    assert_eq!(report.records_written(), 3);
    let failures: Vec<_> = report.file_failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.contains("QA count mismatch"));

    let checked = ParallelProcessor::new(2).check_counts(&input, None).unwrap();
    assert_eq!(checked.matched, 3);
    assert_eq!(checked.mismatches.len(), 1);
}

#[test]
fn test_category_selection_limits_output() {
    let dir = TempDir::new().unwrap();
    let input = raw_folder(&dir, 1);
    let output = dir.path().join("selected");

    let options = swob_qa_processor::processors::FlattenOptions {
        categories: vec![QaCategory::Range],
        output_subtests: false,
        native_codes: false,
    };
    ParallelProcessor::new(1)
        .with_flatten_options(options)
        .with_output_dir(Some(output.clone()))
        .run(&input, None)
        .unwrap();

    let batch = BatchWriter::new().read_batch(&output.join("0_to_1.json")).unwrap();
    let record = batch.values().next().unwrap();
    assert!(record.contains_key("air_temp_12_qa-range_summary"));
    assert!(!record.keys().any(|k| k.contains("qa-presence") || k.contains("native")));
    assert!(!record.contains_key("air_temp_12_qa-range_1"));
}

#[tokio::test]
async fn test_cli_process_command() {
    let dir = TempDir::new().unwrap();
    let input = raw_folder(&dir, 3);
    let output = dir.path().join("cli-out");

    let cli = Cli::try_parse_from([
        "swob-qa-processor",
        "process",
        input.to_str().unwrap(),
        "--chunk-size",
        "2",
        "--sequential",
        "--output-dir",
        output.to_str().unwrap(),
    ])
    .unwrap();
    run(cli).await.unwrap();

    assert!(output.join("0_to_2.json").is_file());
    assert!(output.join("2_to_3.json").is_file());

    let info = BatchWriter::new().get_file_info(&output.join("0_to_2.json")).unwrap();
    assert_eq!(info.record_count, 2);
}
