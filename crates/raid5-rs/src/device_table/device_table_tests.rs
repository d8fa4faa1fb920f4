use super::*;

fn sized_file(blocks: u64, block_size: u64) -> tempfile::TempPath {
    let f = tempfile::NamedTempFile::new().unwrap();
    f.as_file().set_len(blocks * block_size).unwrap();
    f.into_temp_path()
}

fn path_spec(p: &tempfile::TempPath) -> DeviceSpec {
    DeviceSpec::Present(p.to_str().unwrap().to_string())
}

#[test]
fn parses_missing_and_prefixed_specs() {
    assert_eq!(DeviceSpec::parse("MISSING"), DeviceSpec::Missing);
    assert_eq!(
        DeviceSpec::parse("+/dev/foo"),
        DeviceSpec::RebuildTarget("/dev/foo".to_string())
    );
    assert_eq!(
        DeviceSpec::parse("/dev/bar"),
        DeviceSpec::Present("/dev/bar".to_string())
    );
}

#[test]
fn rejects_too_few_devices() {
    let a = sized_file(4, 8);
    let b = sized_file(4, 8);
    let specs = vec![path_spec(&a), path_spec(&b)];
    assert!(DeviceTable::open(&specs, 8).is_err());
}

#[test]
fn rejects_too_many_devices() {
    let files: Vec<_> = (0..17).map(|_| sized_file(4, 8)).collect();
    let specs: Vec<_> = files.iter().map(path_spec).collect();
    assert!(DeviceTable::open(&specs, 8).is_err());
}

#[test]
fn rejects_more_than_one_rebuild_target() {
    let a = sized_file(4, 8);
    let b = sized_file(4, 8);
    let c = sized_file(4, 8);
    let specs = vec![
        DeviceSpec::RebuildTarget(a.to_str().unwrap().to_string()),
        DeviceSpec::RebuildTarget(b.to_str().unwrap().to_string()),
        path_spec(&c),
    ];
    assert!(DeviceTable::open(&specs, 8).is_err());
}

#[test]
fn rejects_all_missing() {
    let specs = vec![DeviceSpec::Missing, DeviceSpec::Missing, DeviceSpec::Missing];
    assert!(DeviceTable::open(&specs, 8).is_err());
}

#[test]
fn rejects_unopenable_path() {
    let a = sized_file(4, 8);
    let specs = vec![
        path_spec(&a),
        DeviceSpec::Present("/nonexistent/path/for/raid5-rs-tests".to_string()),
        DeviceSpec::Missing,
    ];
    assert!(DeviceTable::open(&specs, 8).is_err());
}

#[test]
fn computes_min_blocks_and_virtual_size_from_smallest_device() {
    let a = sized_file(10, 4);
    let b = sized_file(6, 4);
    let c = sized_file(8, 4);
    let specs = vec![path_spec(&a), path_spec(&b), path_spec(&c)];
    let table = DeviceTable::open(&specs, 4).unwrap();
    assert_eq!(table.min_blocks(), 6);
    assert_eq!(table.stripe_count(), 6);
    assert_eq!(table.virtual_size(), 2 * 6 * 4);
}

#[test]
fn missing_slot_excluded_from_min_blocks() {
    let a = sized_file(10, 4);
    let b = sized_file(6, 4);
    let specs = vec![path_spec(&a), DeviceSpec::Missing, path_spec(&b)];
    let table = DeviceTable::open(&specs, 4).unwrap();
    assert_eq!(table.min_blocks(), 6);
    assert!(table.is_missing(1));
}

#[test]
fn read_write_round_trips_through_slot() {
    let a = sized_file(4, 8);
    let b = sized_file(4, 8);
    let c = sized_file(4, 8);
    let specs = vec![path_spec(&a), path_spec(&b), path_spec(&c)];
    let mut table = DeviceTable::open(&specs, 8).unwrap();
    table.write_block(1, 8, b"ABCDEFGH").unwrap();
    let mut out = [0u8; 8];
    table.read_block(1, 8, &mut out).unwrap();
    assert_eq!(&out, b"ABCDEFGH");
}

#[test]
#[should_panic(expected = "missing slot")]
fn read_block_on_missing_slot_panics() {
    let a = sized_file(4, 8);
    let specs = vec![path_spec(&a), DeviceSpec::Missing, path_spec(&a)];
    let table = DeviceTable::open(&specs, 8).unwrap();
    let mut out = [0u8; 8];
    let _ = table.read_block(1, 0, &mut out);
}

#[test]
fn rebuild_target_is_reported() {
    let a = sized_file(4, 8);
    let b = sized_file(4, 8);
    let specs = vec![
        path_spec(&a),
        DeviceSpec::RebuildTarget(b.to_str().unwrap().to_string()),
        path_spec(&a),
    ];
    let table = DeviceTable::open(&specs, 8).unwrap();
    assert_eq!(table.rebuild_target(), Some(1));
}

#[test]
fn flush_all_succeeds_on_healthy_table() {
    let a = sized_file(4, 8);
    let b = sized_file(4, 8);
    let c = sized_file(4, 8);
    let specs = vec![path_spec(&a), path_spec(&b), path_spec(&c)];
    let table = DeviceTable::open(&specs, 8).unwrap();
    table.flush_all().unwrap();
}

#[test]
fn zero_length_backend_yields_zero_min_blocks() {
    let empty = tempfile::NamedTempFile::new().unwrap().into_temp_path();
    let a = sized_file(4, 8);
    let specs = vec![path_spec(&a), path_spec(&empty), path_spec(&a)];
    let table = DeviceTable::open(&specs, 8).unwrap();
    assert_eq!(table.min_blocks(), 0);
}
